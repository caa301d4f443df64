//! HTTP request handlers.

use axum::extract::{FromRequest, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use sloth_types::{RelayRequest, RelayResponse};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::RelayError;
use crate::metrics::METRICS;
use crate::middleware::RequestId;
use crate::pipeline::RelayState;
use crate::response::{HealthResponse, RootResponse};
use crate::state::AppState;

/// Liveness root.
pub async fn root() -> impl IntoResponse {
    Json(RootResponse {
        status: "success",
        message: "Sloth Relayer API is running",
    })
}

/// Health check with basic counters.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        relayer_address: state.relayer.relayer_address().to_string(),
        chain_id: state.chain_id,
        factory_address: state.config.factory_address.to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        requests: state.request_count.load(Ordering::Relaxed),
    })
}

/// Prometheus metrics in text exposition format.
pub async fn metrics() -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        METRICS.render(),
    )
}

/// Verify, submit and extract one signed intent.
pub async fn relay(State(state): State<Arc<AppState>>, request_parts: Request) -> Response {
    let start = std::time::Instant::now();
    state.request_count.fetch_add(1, Ordering::Relaxed);

    // Extract correlation ID (set by middleware).
    let req_id = request_parts
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();
    debug!(req_id = %req_id, state = %RelayState::Received, "Relay state");

    // Parse JSON body
    let body: Value = match Json::<Value>::from_request(request_parts, &state).await {
        Ok(Json(v)) => v,
        Err(e) => {
            METRICS.rejected_shape.fetch_add(1, Ordering::Relaxed);
            warn!(req_id = %req_id, error = %e, "Invalid JSON body");
            return (
                StatusCode::BAD_REQUEST,
                Json(RelayResponse::err("Invalid JSON body")),
            )
                .into_response();
        }
    };

    let request = match RelayRequest::from_json(body) {
        Ok(r) => r,
        Err(e) => {
            let err = RelayError::from(e);
            METRICS.record_error(&err);
            warn!(
                req_id = %req_id,
                error = %err,
                state = %RelayState::Errored,
                "Rejected relay request"
            );
            return err.into_response();
        }
    };

    let kind = request.kind();
    let counters = METRICS.kind(kind);
    counters.total.fetch_add(1, Ordering::Relaxed);
    info!(req_id = %req_id, kind = %kind, nonce = %request.nonce(), "Relaying request");

    let result = state.relayer.relay(&req_id, &request).await;
    METRICS.record_relay_duration(start);

    match result {
        Ok(outcome) => {
            counters.success.fetch_add(1, Ordering::Relaxed);
            info!(
                req_id = %req_id,
                kind = %kind,
                tx_hash = outcome.response.tx_hash.as_deref().unwrap_or_default(),
                "Relay succeeded"
            );
            // Response is already decided; indexing runs on its own.
            let _ = state.forwarder.dispatch(req_id.clone(), outcome.notifications);
            debug!(req_id = %req_id, state = %RelayState::Notified, "Relay state");
            debug!(req_id = %req_id, state = %RelayState::Responded, "Relay state");
            (StatusCode::OK, Json(outcome.response)).into_response()
        }
        Err(err) => {
            counters.error.fetch_add(1, Ordering::Relaxed);
            METRICS.record_error(&err);
            match &err {
                RelayError::Verification(_) => {
                    warn!(req_id = %req_id, kind = %kind, "Signature rejected by contract");
                }
                RelayError::EventNotFound { tx_hash, event } => {
                    // Funds moved on-chain but the relay reports failure.
                    error!(
                        req_id = %req_id,
                        kind = %kind,
                        tx_hash = %tx_hash,
                        event = *event,
                        "Mandatory event missing after success, needs operator investigation"
                    );
                }
                _ => {
                    error!(
                        req_id = %req_id,
                        kind = %kind,
                        error_kind = err.label(),
                        error = %err,
                        "Relay failed"
                    );
                }
            }
            debug!(req_id = %req_id, state = %RelayState::Errored, "Relay state");
            err.into_response()
        }
    }
}
