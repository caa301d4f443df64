//! Stubs and fixtures shared by unit tests.

use alloy::primitives::{Address, Log, TxHash, B256, U256};
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use sloth_types::{
    BuyRequest, CreateTokenRequest, PermitSignature, SellRequest, SlothCreationParams,
    TokenMetadata,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::contract::{ChainError, ISloth, ISlothFactory, RelayReceipt, SlothContracts};
use crate::events::SlothCreatedEvent;
use crate::notify::{IndexerSink, NotifyError, TokenNotification, TradeNotification};

pub const STUB_TX_HASH: TxHash = B256::repeat_byte(0xab);

pub fn signature() -> PermitSignature {
    PermitSignature {
        v: 27,
        r: B256::repeat_byte(0x11),
        s: B256::repeat_byte(0x22),
    }
}

fn far_future() -> U256 {
    U256::from(4_102_444_800u64)
}

pub fn sell_request() -> SellRequest {
    SellRequest {
        sloth_contract_address: Address::with_last_byte(0xaa),
        seller: Address::with_last_byte(0xbb),
        recipient: Address::with_last_byte(0xbb),
        token_amount: U256::from(1000u64),
        nonce: U256::from(7u64),
        deadline: far_future(),
        signature: signature(),
    }
}

pub fn buy_request() -> BuyRequest {
    BuyRequest {
        sloth_contract_address: Address::with_last_byte(0xaa),
        buyer: Address::with_last_byte(0xbb),
        recipient: Address::with_last_byte(0xcc),
        native_amount: U256::from(1_000_000_000_000_000_000u128),
        nonce: U256::from(3u64),
        deadline: far_future(),
        signature: signature(),
    }
}

pub fn create_request(initial_deposit: u128) -> CreateTokenRequest {
    CreateTokenRequest {
        creator: Address::with_last_byte(0xbb),
        params: SlothCreationParams {
            name: "Sloth".into(),
            symbol: "SLO".into(),
            token_id: U256::from(42u64),
            initial_deposit: U256::from(initial_deposit),
            metadata: TokenMetadata {
                description: Some("slow and steady".into()),
                categories: vec!["meme".into()],
                ..Default::default()
            },
        },
        nonce: U256::from(1u64),
        deadline: far_future(),
        signature: signature(),
    }
}

/// `SlothCreated` as the factory emits it (first three arguments indexed).
pub fn sloth_created_log() -> Log {
    let factory = Address::with_last_byte(0xf1);
    let event = ISlothFactory::SlothCreated {
        token: Address::with_last_byte(0xa1),
        sloth: Address::with_last_byte(0xa2),
        creator: Address::with_last_byte(0xbb),
        totalSupply: U256::from(1_000_000u64),
        saleAmount: U256::from(800_000u64),
        tokenOffset: U256::from(200_000u64),
        nativeOffset: U256::from(5u64),
        tokenId: U256::from(42u64),
        whitelistEnabled: true,
        factory,
    };
    Log {
        address: factory,
        data: event.encode_log_data(),
    }
}

/// `TokenBought` as a sloth pool emits it.
pub fn token_bought_log(native_amount: U256, token_amount: U256) -> Log {
    let event = ISloth::TokenBought {
        buyer: Address::with_last_byte(0xbb),
        recipient: Address::with_last_byte(0xcc),
        nativeAmount: native_amount,
        tokenAmount: token_amount,
    };
    Log {
        address: Address::with_last_byte(0xa2),
        data: event.encode_log_data(),
    }
}

pub fn receipt_with_logs(logs: Vec<Log>) -> RelayReceipt {
    RelayReceipt {
        tx_hash: STUB_TX_HASH,
        success: true,
        block_number: Some(100),
        logs,
    }
}

pub fn token_notification() -> TokenNotification {
    let event = SlothCreatedEvent {
        token: Address::with_last_byte(0xa1),
        sloth: Address::with_last_byte(0xa2),
        creator: Address::with_last_byte(0xbb),
        total_supply: U256::from(1_000_000u64),
        sale_amount: U256::from(800_000u64),
        token_offset: U256::from(200_000u64),
        native_offset: U256::from(5u64),
        token_id: U256::from(42u64),
        whitelist_enabled: false,
        factory: Address::with_last_byte(0xf1),
    };
    TokenNotification::new(
        &event,
        "Sloth",
        "SLO",
        &TokenMetadata::default(),
        STUB_TX_HASH,
        Some(100),
    )
}

#[derive(Default)]
struct StubLog {
    calls: Vec<&'static str>,
    last_gas_limit: Option<u64>,
    last_relayer: Option<Address>,
    last_price_target: Option<Address>,
}

/// In-memory [`SlothContracts`] that records every call.
pub struct StubContracts {
    signatures_valid: bool,
    verify_fault: Option<String>,
    send_fault: Option<String>,
    reverts: bool,
    stalled: bool,
    logs: Vec<Log>,
    price: Option<U256>,
    send_delay: Option<Duration>,
    inclusion_gate: Option<Arc<Semaphore>>,
    sends_in_flight: AtomicUsize,
    max_sends_in_flight: AtomicUsize,
    log: Mutex<StubLog>,
}

impl StubContracts {
    pub fn new() -> Self {
        Self {
            signatures_valid: true,
            verify_fault: None,
            send_fault: None,
            reverts: false,
            stalled: false,
            logs: vec![sloth_created_log()],
            price: Some(U256::from(1_000_000_000_000_000_000u128)),
            send_delay: None,
            inclusion_gate: None,
            sends_in_flight: AtomicUsize::new(0),
            max_sends_in_flight: AtomicUsize::new(0),
            log: Mutex::new(StubLog::default()),
        }
    }

    pub fn rejecting_signatures(mut self) -> Self {
        self.signatures_valid = false;
        self
    }

    pub fn failing_verification(mut self, msg: &str) -> Self {
        self.verify_fault = Some(msg.to_string());
        self
    }

    pub fn failing_send(mut self, msg: &str) -> Self {
        self.send_fault = Some(msg.to_string());
        self
    }

    pub fn reverting(mut self) -> Self {
        self.reverts = true;
        self
    }

    /// Never includes anything; the wait only ends on timeout or cancel.
    pub fn stalled(mut self) -> Self {
        self.stalled = true;
        self
    }

    pub fn with_logs(mut self, logs: Vec<Log>) -> Self {
        self.logs = logs;
        self
    }

    pub fn with_price(mut self, price: U256) -> Self {
        self.price = Some(price);
        self
    }

    pub fn failing_price(mut self) -> Self {
        self.price = None;
        self
    }

    /// Every send takes `delay` before the node "accepts" it.
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = Some(delay);
        self
    }

    /// Inclusion waits block until `gate` hands out a permit.
    pub fn with_inclusion_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.inclusion_gate = Some(gate);
        self
    }

    /// Highest number of sends observed running at the same time.
    pub fn max_sends_in_flight(&self) -> usize {
        self.max_sends_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().calls.clone()
    }

    pub fn send_count(&self) -> usize {
        self.calls().iter().filter(|c| c.starts_with("send_")).count()
    }

    pub fn last_gas_limit(&self) -> Option<u64> {
        self.log.lock().unwrap().last_gas_limit
    }

    pub fn last_relayer(&self) -> Option<Address> {
        self.log.lock().unwrap().last_relayer
    }

    pub fn last_price_target(&self) -> Option<Address> {
        self.log.lock().unwrap().last_price_target
    }

    fn record(&self, call: &'static str) {
        self.log.lock().unwrap().calls.push(call);
    }

    fn verify(&self, call: &'static str, relayer: Address) -> Result<bool, ChainError> {
        self.record(call);
        self.log.lock().unwrap().last_relayer = Some(relayer);
        match &self.verify_fault {
            Some(msg) => Err(ChainError(msg.clone())),
            None => Ok(self.signatures_valid),
        }
    }

    async fn send(&self, call: &'static str, gas_limit: u64) -> Result<TxHash, ChainError> {
        self.record(call);
        self.log.lock().unwrap().last_gas_limit = Some(gas_limit);
        let in_flight = self.sends_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_sends_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }
        self.sends_in_flight.fetch_sub(1, Ordering::SeqCst);
        match &self.send_fault {
            Some(msg) => Err(ChainError(msg.clone())),
            None => Ok(STUB_TX_HASH),
        }
    }
}

#[async_trait]
impl SlothContracts for StubContracts {
    async fn verify_create(
        &self,
        _request: &CreateTokenRequest,
        relayer: Address,
    ) -> Result<bool, ChainError> {
        self.verify("verify_create", relayer)
    }

    async fn send_create(
        &self,
        _request: &CreateTokenRequest,
        gas_limit: u64,
    ) -> Result<TxHash, ChainError> {
        self.send("send_create", gas_limit).await
    }

    async fn verify_buy(
        &self,
        _request: &BuyRequest,
        relayer: Address,
    ) -> Result<bool, ChainError> {
        self.verify("verify_buy", relayer)
    }

    async fn send_buy(
        &self,
        _request: &BuyRequest,
        _relayer: Address,
        gas_limit: u64,
    ) -> Result<TxHash, ChainError> {
        self.send("send_buy", gas_limit).await
    }

    async fn verify_sell(
        &self,
        _request: &SellRequest,
        relayer: Address,
    ) -> Result<bool, ChainError> {
        self.verify("verify_sell", relayer)
    }

    async fn send_sell(
        &self,
        _request: &SellRequest,
        _relayer: Address,
        gas_limit: u64,
    ) -> Result<TxHash, ChainError> {
        self.send("send_sell", gas_limit).await
    }

    async fn current_price(&self, sloth: Address) -> Result<U256, ChainError> {
        self.record("current_price");
        self.log.lock().unwrap().last_price_target = Some(sloth);
        self.price
            .ok_or_else(|| ChainError("execution reverted".into()))
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RelayReceipt, ChainError> {
        self.record("wait_for_receipt");
        if let Some(gate) = &self.inclusion_gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|e| ChainError(e.to_string()))?;
        }
        if self.stalled {
            return tokio::select! {
                _ = cancel.cancelled() => Err(ChainError("cancelled".into())),
                _ = tokio::time::sleep(timeout) => Err(ChainError("timed out".into())),
            };
        }
        Ok(RelayReceipt {
            tx_hash,
            success: !self.reverts,
            block_number: Some(100),
            logs: if self.reverts { Vec::new() } else { self.logs.clone() },
        })
    }
}

/// [`IndexerSink`] that keeps what it receives.
#[derive(Default)]
pub struct RecordingSink {
    fail_tokens: bool,
    fail_trades: bool,
    delay: Option<Duration>,
    tokens: Mutex<Vec<TokenNotification>>,
    trades: Mutex<Vec<TradeNotification>>,
}

impl RecordingSink {
    pub fn failing_tokens() -> Self {
        Self {
            fail_tokens: true,
            ..Default::default()
        }
    }

    /// Every post takes `delay` before it is recorded.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn failing_all() -> Self {
        Self {
            fail_tokens: true,
            fail_trades: true,
            ..Default::default()
        }
    }

    pub fn tokens(&self) -> Vec<TokenNotification> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn trades(&self) -> Vec<TradeNotification> {
        self.trades.lock().unwrap().clone()
    }
}

fn unavailable() -> NotifyError {
    NotifyError::Status {
        status: 503,
        body: "indexer down".into(),
    }
}

#[async_trait]
impl IndexerSink for RecordingSink {
    async fn post_token(&self, payload: &TokenNotification) -> Result<(), NotifyError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_tokens {
            return Err(unavailable());
        }
        self.tokens.lock().unwrap().push(payload.clone());
        Ok(())
    }

    async fn post_trade(&self, payload: &TradeNotification) -> Result<(), NotifyError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_trades {
            return Err(unavailable());
        }
        self.trades.lock().unwrap().push(payload.clone());
        Ok(())
    }
}
