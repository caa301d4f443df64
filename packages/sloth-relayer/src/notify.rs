//! Best-effort forwarding of relay facts to the downstream indexing API.
//!
//! Payloads are built while the relay is still in flight, but the POSTs run
//! in a detached task once the response is already decided. Nothing here can
//! change a relay's outcome.

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use serde::Serialize;
use sloth_types::{to_decimal_units, TokenMetadata, NATIVE_DECIMALS};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::events::{SlothCreatedEvent, TokenBoughtEvent};
use crate::metrics::METRICS;

/// Token-creation record for the indexer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenNotification {
    pub token_address: Address,
    pub sloth_address: Address,
    pub creator: Address,
    pub factory: Address,
    pub name: String,
    pub symbol: String,
    pub token_id: String,
    pub total_supply: String,
    pub sale_amount: String,
    pub token_offset: String,
    pub native_offset: String,
    pub whitelist_enabled: bool,
    pub description: Option<String>,
    pub image: Option<String>,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub website: Option<String>,
    pub categories: Vec<String>,
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

impl TokenNotification {
    pub fn new(
        event: &SlothCreatedEvent,
        name: &str,
        symbol: &str,
        metadata: &TokenMetadata,
        tx_hash: TxHash,
        block_number: Option<u64>,
    ) -> Self {
        Self {
            token_address: event.token,
            sloth_address: event.sloth,
            creator: event.creator,
            factory: event.factory,
            name: name.to_string(),
            symbol: symbol.to_string(),
            token_id: event.token_id.to_string(),
            total_supply: event.total_supply.to_string(),
            sale_amount: event.sale_amount.to_string(),
            token_offset: event.token_offset.to_string(),
            native_offset: event.native_offset.to_string(),
            whitelist_enabled: event.whitelist_enabled,
            description: metadata.description.clone(),
            image: metadata.image.clone(),
            twitter: metadata.twitter.clone(),
            telegram: metadata.telegram.clone(),
            website: metadata.website.clone(),
            categories: metadata.categories.clone(),
            tx_hash,
            block_number,
        }
    }
}

/// Trade record for the indexer, amounts already normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeNotification {
    #[serde(rename = "type")]
    pub side: &'static str,
    pub user: Address,
    pub recipient: Address,
    /// Set only for the buy nested in a token creation, where `SlothCreated`
    /// names the token. A plain buy relay only knows its pool and is keyed
    /// by `slothAddress`, so this serializes as `null`.
    pub token_address: Option<Address>,
    pub sloth_address: Address,
    /// Token amount / 10^token_decimals.
    pub amount_token: f64,
    /// Native amount / 10^18.
    pub amount: f64,
    /// Pool price / 10^18.
    pub price: f64,
    pub tx_hash: TxHash,
}

impl TradeNotification {
    pub fn buy(
        event: &TokenBoughtEvent,
        token_address: Option<Address>,
        sloth_address: Address,
        price: U256,
        token_decimals: u8,
        tx_hash: TxHash,
    ) -> Self {
        Self {
            side: "buy",
            user: event.buyer,
            recipient: event.recipient,
            token_address,
            sloth_address,
            amount_token: to_decimal_units(event.token_amount, token_decimals),
            amount: to_decimal_units(event.native_amount, NATIVE_DECIMALS),
            price: to_decimal_units(price, NATIVE_DECIMALS),
            tx_hash,
        }
    }
}

/// One downstream POST.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Token(TokenNotification),
    Trade(TradeNotification),
}

impl Notification {
    fn label(&self) -> &'static str {
        match self {
            Notification::Token(_) => "token",
            Notification::Trade(_) => "trade",
        }
    }
}

/// A failed downstream POST. Logged and counted, never returned to callers.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("indexer request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("indexer returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Receiver of relay facts.
#[async_trait]
pub trait IndexerSink: Send + Sync {
    async fn post_token(&self, payload: &TokenNotification) -> Result<(), NotifyError>;
    async fn post_trade(&self, payload: &TradeNotification) -> Result<(), NotifyError>;
}

/// [`IndexerSink`] over HTTP JSON POSTs.
pub struct HttpIndexer {
    client: reqwest::Client,
    token_url: String,
    trade_url: String,
}

impl HttpIndexer {
    pub fn new(
        base_url: &str,
        token_path: &str,
        trade_path: &str,
        timeout: Duration,
    ) -> Result<Self, crate::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::Error::Config(format!("Failed to build HTTP client: {e}")))?;
        let base = base_url.trim_end_matches('/');
        Ok(Self {
            client,
            token_url: format!("{base}{token_path}"),
            trade_url: format!("{base}{trade_path}"),
        })
    }

    async fn post<T: Serialize + Sync>(&self, url: &str, payload: &T) -> Result<(), NotifyError> {
        let response = self.client.post(url).json(payload).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl IndexerSink for HttpIndexer {
    async fn post_token(&self, payload: &TokenNotification) -> Result<(), NotifyError> {
        self.post(&self.token_url, payload).await
    }

    async fn post_trade(&self, payload: &TradeNotification) -> Result<(), NotifyError> {
        self.post(&self.trade_url, payload).await
    }
}

/// Fire-and-forget dispatcher in front of an [`IndexerSink`].
#[derive(Clone)]
pub struct NotificationForwarder {
    sink: Arc<dyn IndexerSink>,
    in_flight: Arc<AtomicUsize>,
}

/// Counts one dispatched batch until its task ends, panics included.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl NotificationForwarder {
    pub fn new(sink: Arc<dyn IndexerSink>) -> Self {
        Self {
            sink,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Batches dispatched but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Post each notification independently on a detached task.
    ///
    /// Callers must not gate a response on the returned handle.
    pub fn dispatch(&self, req_id: String, batch: Vec<Notification>) -> Option<JoinHandle<()>> {
        if batch.is_empty() {
            return None;
        }
        let sink = Arc::clone(&self.sink);
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        Some(tokio::spawn(async move {
            let _guard = guard;
            for notification in &batch {
                let result = match notification {
                    Notification::Token(p) => sink.post_token(p).await,
                    Notification::Trade(p) => sink.post_trade(p).await,
                };
                match result {
                    Ok(()) => {
                        debug!(req_id = %req_id, kind = notification.label(), "Indexer notified");
                    }
                    Err(e) => {
                        METRICS.notify_errors.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            req_id = %req_id,
                            kind = notification.label(),
                            error = %e,
                            "Indexer notification failed"
                        );
                    }
                }
            }
        }))
    }

    /// Wait for dispatched batches to finish, giving up after `timeout`.
    ///
    /// Returns `false` when some batches were still running at the deadline.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let in_flight = self.in_flight();
            if in_flight == 0 {
                info!("All indexer notifications drained");
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(
                    remaining = in_flight,
                    "Drain timeout, some indexer notifications may be lost"
                );
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
