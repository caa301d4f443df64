//! Response types for the auxiliary endpoints.

use serde::Serialize;

/// Response from the health endpoint.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub relayer_address: String,
    pub chain_id: u64,
    pub factory_address: String,
    pub uptime_secs: u64,
    pub requests: u64,
}

/// Response from the root liveness route.
#[derive(Serialize)]
pub struct RootResponse {
    pub status: &'static str,
    pub message: &'static str,
}
