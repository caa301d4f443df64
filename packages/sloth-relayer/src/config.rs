//! Relayer configuration.

use alloy::primitives::Address;
use serde::Deserialize;

/// Configuration for the Sloth relayer.
///
/// Loaded from an optional `relayer.toml` plus `RELAYER_*` env overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::bind_address")]
    pub bind_address: String,

    #[serde(default = "defaults::rpc_url")]
    pub rpc_url: String,

    /// Fetched from the node at startup when unset.
    #[serde(default)]
    pub chain_id: Option<u64>,

    /// Factory hosting `createWithPermitRelayer`.
    #[serde(default)]
    pub factory_address: Address,

    #[serde(default = "defaults::indexer_api_url")]
    pub indexer_api_url: String,

    #[serde(default = "defaults::token_notify_path")]
    pub token_notify_path: String,

    #[serde(default = "defaults::trade_notify_path")]
    pub trade_notify_path: String,

    #[serde(default = "defaults::gas_limit")]
    pub gas_limit: u64,

    #[serde(default = "defaults::receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,

    #[serde(default = "defaults::notify_timeout_secs")]
    pub notify_timeout_secs: u64,

    #[serde(default = "defaults::token_decimals")]
    pub token_decimals: u8,

    /// File holding the relayer private key (hex). `RELAYER_PRIVATE_KEY` wins.
    #[serde(default)]
    pub keys_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: defaults::bind_address(),
            rpc_url: defaults::rpc_url(),
            chain_id: None,
            factory_address: Address::ZERO,
            indexer_api_url: defaults::indexer_api_url(),
            token_notify_path: defaults::token_notify_path(),
            trade_notify_path: defaults::trade_notify_path(),
            gas_limit: defaults::gas_limit(),
            receipt_timeout_secs: defaults::receipt_timeout_secs(),
            notify_timeout_secs: defaults::notify_timeout_secs(),
            token_decimals: defaults::token_decimals(),
            keys_path: None,
        }
    }
}

impl Config {
    /// Load from `relayer.toml` (optional) and `RELAYER_*` env vars.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("relayer").required(false))
            .add_source(config::Environment::with_prefix("RELAYER"))
            .build()?
            .try_deserialize()
    }

    pub fn receipt_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.receipt_timeout_secs)
    }

    pub fn notify_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.notify_timeout_secs)
    }

    /// Reject settings that would make every relay fail.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.factory_address == Address::ZERO {
            return Err(crate::Error::Config(
                "factory_address is not set (RELAYER_FACTORY_ADDRESS)".into(),
            ));
        }
        if self.gas_limit == 0 || self.gas_limit > crate::submitter::MAX_GAS_LIMIT {
            return Err(crate::Error::Config(format!(
                "gas_limit must be in 1..={}",
                crate::submitter::MAX_GAS_LIMIT
            )));
        }
        if reqwest::Url::parse(&self.indexer_api_url).is_err() {
            return Err(crate::Error::Config(format!(
                "indexer_api_url is not a valid URL: {}",
                self.indexer_api_url
            )));
        }
        Ok(())
    }
}

mod defaults {
    pub fn bind_address() -> String {
        "0.0.0.0:3040".into()
    }

    pub fn rpc_url() -> String {
        "http://127.0.0.1:8545".into()
    }

    pub fn indexer_api_url() -> String {
        "http://127.0.0.1:4000".into()
    }

    pub fn token_notify_path() -> String {
        "/tokens".into()
    }

    pub fn trade_notify_path() -> String {
        "/trades".into()
    }

    /// Fixed ceiling for every relayed transaction.
    pub fn gas_limit() -> u64 {
        5_000_000
    }

    pub fn receipt_timeout_secs() -> u64 {
        120
    }

    pub fn notify_timeout_secs() -> u64 {
        10
    }

    pub fn token_decimals() -> u8 {
        sloth_types::NATIVE_DECIMALS
    }
}
