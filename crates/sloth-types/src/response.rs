//! Normalized response body of the relay endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `{ success: true, txHash, ...fields }` or `{ success: false, error }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub success: bool,
    #[serde(rename = "txHash", skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Decoded event fields, flattened into the top-level object.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RelayResponse {
    pub fn ok(tx_hash: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            success: true,
            tx_hash: Some(tx_hash.into()),
            error: None,
            fields,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            tx_hash: None,
            error: Some(error.into()),
            fields: Map::new(),
        }
    }
}
