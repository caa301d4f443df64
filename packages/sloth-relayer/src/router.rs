//! HTTP router setup.

use crate::handlers;
use crate::middleware::inject_request_id;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root).post(handlers::relay))
        .route("/relay", post(handlers::relay))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(axum::middleware::from_fn(inject_request_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
