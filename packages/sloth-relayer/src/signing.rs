//! Relayer credential and node connection.
//!
//! Built once at startup and shared by handle. Nothing else in the crate
//! touches the private key.

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use tracing::info;

use crate::config::Config;

/// Long-lived relayer credential plus a wallet-filled provider.
pub struct SigningContext {
    provider: DynProvider,
    address: Address,
    chain_id: u64,
}

impl SigningContext {
    /// Connect to `config.rpc_url` with the relayer key.
    ///
    /// The chain id comes from config when set, otherwise from the node.
    pub async fn connect(config: &Config) -> Result<Self, crate::Error> {
        let signer = load_signer(config)?;
        let address = signer.address();
        let url: reqwest::Url = config
            .rpc_url
            .parse()
            .map_err(|e| crate::Error::Config(format!("Invalid rpc_url: {e}")))?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        let chain_id = match config.chain_id {
            Some(id) => id,
            None => provider
                .get_chain_id()
                .await
                .map_err(|e| crate::Error::Rpc(format!("Failed to fetch chain id: {e}")))?,
        };

        info!(relayer = %address, chain_id, "Loaded relayer key");

        Ok(Self {
            provider,
            address,
            chain_id,
        })
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

/// `RELAYER_PRIVATE_KEY` first, then the file at `keys_path`.
fn load_signer(config: &Config) -> Result<PrivateKeySigner, crate::Error> {
    let raw = match std::env::var("RELAYER_PRIVATE_KEY") {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            let path = config.keys_path.as_deref().ok_or_else(|| {
                crate::Error::Config(
                    "No relayer key: set RELAYER_PRIVATE_KEY or keys_path".to_string(),
                )
            })?;
            std::fs::read_to_string(path)
                .map_err(|e| crate::Error::Config(format!("Failed to load key: {e}")))?
        }
    };
    parse_private_key(&raw)
}

fn parse_private_key(raw: &str) -> Result<PrivateKeySigner, crate::Error> {
    raw.trim()
        .parse::<PrivateKeySigner>()
        .map_err(|e| crate::Error::Config(format!("Invalid private key: {e}")))
}
