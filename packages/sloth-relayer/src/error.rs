//! Error types for the relayer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sloth_types::{RelayKind, RelayResponse, RequestShapeError};

/// Startup and infrastructure errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),
    /// RPC communication error.
    #[error("rpc error: {0}")]
    Rpc(String),
}

/// Why a relay was aborted. Everything above the notification layer ends
/// up here; notification failures never do.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Unknown `type` or malformed fields. No chain interaction happened.
    #[error("{0}")]
    RequestShape(#[from] RequestShapeError),

    /// The contract's verification view returned `false`.
    #[error("Invalid {0} signature")]
    Verification(RelayKind),

    /// Node unreachable, call-level fault, or inclusion wait ended early.
    #[error("{stage} failed: {message}")]
    Transport { stage: Stage, message: String },

    /// Included with status = failure.
    #[error("transaction {tx_hash} reverted")]
    ChainRevert { tx_hash: String },

    /// The transaction succeeded but the mandatory event is missing.
    #[error("event not found: {event} missing from transaction {tx_hash}")]
    EventNotFound { event: &'static str, tx_hash: String },

    /// A matching log could not be decoded into the event's fields.
    #[error("failed to decode {event}: {message}")]
    Decode { event: &'static str, message: String },
}

/// Network-bound step a transport fault happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Verify,
    Submit,
    Inclusion,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Verify => "signature verification",
            Stage::Submit => "transaction submission",
            Stage::Inclusion => "waiting for inclusion",
        })
    }
}

impl RelayError {
    pub fn transport(stage: Stage, err: impl std::fmt::Display) -> Self {
        RelayError::Transport {
            stage,
            message: err.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::RequestShape(_)
            | RelayError::Verification(_)
            | RelayError::ChainRevert { .. }
            | RelayError::EventNotFound { .. } => StatusCode::BAD_REQUEST,
            RelayError::Transport { .. } | RelayError::Decode { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RelayError::RequestShape(_) => "request_shape",
            RelayError::Verification(_) => "verification",
            RelayError::Transport { .. } => "transport",
            RelayError::ChainRevert { .. } => "revert",
            RelayError::EventNotFound { .. } => "event_not_found",
            RelayError::Decode { .. } => "decode",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), Json(RelayResponse::err(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_message() {
        let err = RelayError::Verification(RelayKind::Sell);
        assert_eq!(err.to_string(), "Invalid sell signature");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_shape_message() {
        let err = RelayError::from(RequestShapeError::InvalidType);
        assert_eq!(err.to_string(), "invalid request type");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_transport_keeps_underlying_message() {
        let err = RelayError::transport(Stage::Verify, "connection refused");
        assert_eq!(
            err.to_string(),
            "signature verification failed: connection refused"
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
