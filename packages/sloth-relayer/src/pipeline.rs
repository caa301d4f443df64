//! Per-request relay pipelines.
//!
//! Every request runs `verify → submit → include → extract` strictly in that
//! order; nothing is submitted unless verification succeeded for the same
//! request. Notifications are only *built* here. Dispatch happens after the
//! response is decided (see [`crate::notify::NotificationForwarder`]).

use alloy::primitives::{Address, U256};
use serde_json::{json, Map, Value};
use sloth_types::{BuyRequest, CreateTokenRequest, RelayRequest, RelayResponse};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::contract::{RelayReceipt, SlothContracts};
use crate::error::RelayError;
use crate::events::{find_event, require_event, RelayEvent, SlothCreatedEvent, TokenBoughtEvent};
use crate::notify::{Notification, TokenNotification, TradeNotification};
use crate::submitter::TransactionSubmitter;
use crate::verifier;

/// Lifecycle of one relay. `Errored` is reachable from every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Received,
    Validated,
    Verified,
    Submitted,
    Included,
    Extracted,
    Notified,
    Responded,
    Errored,
}

impl std::fmt::Display for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Result of a successful pipeline run.
#[derive(Debug)]
pub struct RelayOutcome {
    pub response: RelayResponse,
    /// Downstream posts to dispatch once the response is out.
    pub notifications: Vec<Notification>,
}

/// Tunables the pipelines need from config.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub gas_limit: u64,
    pub receipt_timeout: Duration,
    pub token_decimals: u8,
}

/// The relay engine: one instance per process, shared by all requests.
pub struct Relayer {
    contracts: Arc<dyn SlothContracts>,
    submitter: TransactionSubmitter,
    relayer: Address,
    token_decimals: u8,
}

impl Relayer {
    pub fn new(
        contracts: Arc<dyn SlothContracts>,
        relayer: Address,
        settings: RelaySettings,
        cancel: CancellationToken,
    ) -> Self {
        let submitter = TransactionSubmitter::new(
            Arc::clone(&contracts),
            relayer,
            settings.gas_limit,
            settings.receipt_timeout,
            cancel,
        );
        Self {
            contracts,
            submitter,
            relayer,
            token_decimals: settings.token_decimals,
        }
    }

    pub fn relayer_address(&self) -> Address {
        self.relayer
    }

    /// Run the pipeline matching `request`'s variant.
    pub async fn relay(
        &self,
        req_id: &str,
        request: &RelayRequest,
    ) -> Result<RelayOutcome, RelayError> {
        let kind = request.kind();
        trace_state(req_id, kind, RelayState::Validated);

        verifier::verify(self.contracts.as_ref(), request, self.relayer).await?;
        trace_state(req_id, kind, RelayState::Verified);

        let tx_hash = self.submitter.send(request).await?;
        trace_state(req_id, kind, RelayState::Submitted);

        let receipt = self.submitter.wait(tx_hash).await?;
        trace_state(req_id, kind, RelayState::Included);

        let outcome = match request {
            RelayRequest::CreateToken(r) => self.extract_create(req_id, r, &receipt).await?,
            RelayRequest::Buy(r) => self.extract_buy(req_id, r, &receipt).await,
            RelayRequest::Sell(_) => RelayOutcome {
                response: ok_response(&receipt, Map::new()),
                notifications: Vec::new(),
            },
        };
        trace_state(req_id, kind, RelayState::Extracted);
        Ok(outcome)
    }

    async fn extract_create(
        &self,
        req_id: &str,
        request: &CreateTokenRequest,
        receipt: &RelayReceipt,
    ) -> Result<RelayOutcome, RelayError> {
        let created: SlothCreatedEvent = require_event(receipt)?;
        let mut fields = created.to_fields();
        let mut notifications = vec![Notification::Token(TokenNotification::new(
            &created,
            &request.params.name,
            &request.params.symbol,
            &request.params.metadata,
            receipt.tx_hash,
            receipt.block_number,
        ))];

        // The nested buy only exists when the creator seeded the pool.
        if request.params.initial_deposit > U256::ZERO {
            if let Some((bought, trade)) = self
                .nested_buy(req_id, receipt, Some(created.token), created.sloth)
                .await
            {
                fields.insert("tokenBought".into(), Value::Object(bought.to_fields()));
                notifications.extend(trade.map(Notification::Trade));
            }
        }

        Ok(RelayOutcome {
            response: ok_response(receipt, fields),
            notifications,
        })
    }

    async fn extract_buy(
        &self,
        req_id: &str,
        request: &BuyRequest,
        receipt: &RelayReceipt,
    ) -> RelayOutcome {
        let mut fields = Map::new();
        let mut notifications = Vec::new();
        if let Some((bought, trade)) = self
            .nested_buy(req_id, receipt, None, request.sloth_contract_address)
            .await
        {
            fields.extend(bought.to_fields());
            notifications.extend(trade.map(Notification::Trade));
        }
        RelayOutcome {
            response: ok_response(receipt, fields),
            notifications,
        }
    }

    /// Optional `TokenBought` lookup plus the trade record built from it.
    ///
    /// The decoded event is returned whenever one is found. The price read
    /// only feeds the trade record, so its failure drops that record and
    /// nothing else.
    async fn nested_buy(
        &self,
        req_id: &str,
        receipt: &RelayReceipt,
        token: Option<Address>,
        sloth: Address,
    ) -> Option<(TokenBoughtEvent, Option<TradeNotification>)> {
        let bought: TokenBoughtEvent = match find_event(receipt) {
            Ok(Some(event)) => event,
            Ok(None) => {
                warn!(
                    req_id = %req_id,
                    tx_hash = %receipt.tx_hash,
                    "No TokenBought event in receipt"
                );
                return None;
            }
            Err(e) => {
                warn!(
                    req_id = %req_id,
                    tx_hash = %receipt.tx_hash,
                    error = %e,
                    "Skipping undecodable TokenBought"
                );
                return None;
            }
        };

        let trade = match self.contracts.current_price(sloth).await {
            Ok(price) => Some(TradeNotification::buy(
                &bought,
                token,
                sloth,
                price,
                self.token_decimals,
                receipt.tx_hash,
            )),
            Err(e) => {
                warn!(
                    req_id = %req_id,
                    sloth = %sloth,
                    error = %e,
                    "Price read failed, trade record skipped"
                );
                None
            }
        };
        Some((bought, trade))
    }
}

fn ok_response(receipt: &RelayReceipt, mut fields: Map<String, Value>) -> RelayResponse {
    if let Some(block) = receipt.block_number {
        fields.insert("blockNumber".into(), json!(block));
    }
    RelayResponse::ok(receipt.tx_hash.to_string(), fields)
}

fn trace_state(req_id: &str, kind: sloth_types::RelayKind, state: RelayState) {
    debug!(req_id = %req_id, kind = %kind, state = %state, "Relay state");
}
