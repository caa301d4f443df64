//! Application state shared across handlers.

use alloy::primitives::Address;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::contract::{EvmContracts, SlothContracts};
use crate::notify::{HttpIndexer, IndexerSink, NotificationForwarder};
use crate::pipeline::{RelaySettings, Relayer};
use crate::signing::SigningContext;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub relayer: Relayer,
    pub forwarder: NotificationForwarder,
    pub chain_id: u64,
    pub start_time: Instant,
    pub request_count: AtomicU64,
}

impl AppState {
    /// Connect to the node and the indexer described by `config`.
    ///
    /// `cancel` ends any inclusion wait still in progress at shutdown.
    pub async fn new(config: Config, cancel: CancellationToken) -> Result<Self, crate::Error> {
        config.validate()?;
        let ctx = Arc::new(SigningContext::connect(&config).await?);
        let contracts = Arc::new(EvmContracts::new(Arc::clone(&ctx), config.factory_address));
        let sink = Arc::new(HttpIndexer::new(
            &config.indexer_api_url,
            &config.token_notify_path,
            &config.trade_notify_path,
            config.notify_timeout(),
        )?);

        info!(
            factory = %config.factory_address,
            indexer = %config.indexer_api_url,
            gas_limit = config.gas_limit,
            "Relay engine initialized"
        );

        Ok(Self::from_parts(
            config,
            contracts,
            ctx.address(),
            ctx.chain_id(),
            sink,
            cancel,
        ))
    }

    /// Assemble state from already-built collaborators.
    pub fn from_parts(
        config: Config,
        contracts: Arc<dyn SlothContracts>,
        relayer_address: Address,
        chain_id: u64,
        sink: Arc<dyn IndexerSink>,
        cancel: CancellationToken,
    ) -> Self {
        let settings = RelaySettings {
            gas_limit: config.gas_limit,
            receipt_timeout: config.receipt_timeout(),
            token_decimals: config.token_decimals,
        };
        Self {
            relayer: Relayer::new(contracts, relayer_address, settings, cancel),
            forwarder: NotificationForwarder::new(sink),
            config,
            chain_id,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        }
    }
}
