//! Privileged submission and inclusion wait.

use alloy::primitives::{Address, TxHash};
use sloth_types::RelayRequest;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::contract::{RelayReceipt, SlothContracts};
use crate::error::{RelayError, Stage};

/// Hard ceiling for the per-transaction gas budget.
pub const MAX_GAS_LIMIT: u64 = 5_000_000;

/// Sends verified requests under a fixed gas budget and waits for inclusion.
pub struct TransactionSubmitter {
    contracts: Arc<dyn SlothContracts>,
    relayer: Address,
    gas_limit: u64,
    receipt_timeout: Duration,
    /// Serializes sends from the single relayer account to keep nonces ordered.
    submit_lock: AsyncMutex<()>,
    cancel: CancellationToken,
}

impl TransactionSubmitter {
    pub fn new(
        contracts: Arc<dyn SlothContracts>,
        relayer: Address,
        gas_limit: u64,
        receipt_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            contracts,
            relayer,
            gas_limit,
            receipt_timeout,
            submit_lock: AsyncMutex::new(()),
            cancel,
        }
    }

    /// Send the privileged call for `request`. Returns once the node accepted it.
    pub async fn send(&self, request: &RelayRequest) -> Result<TxHash, RelayError> {
        if self.gas_limit > MAX_GAS_LIMIT {
            return Err(RelayError::transport(
                Stage::Submit,
                format!(
                    "gas limit {} exceeds ceiling {MAX_GAS_LIMIT}",
                    self.gas_limit
                ),
            ));
        }
        let _submit_guard = self.submit_lock.lock().await;
        let contracts = self.contracts.as_ref();
        let tx_hash = match request {
            RelayRequest::CreateToken(r) => contracts.send_create(r, self.gas_limit).await,
            RelayRequest::Buy(r) => contracts.send_buy(r, self.relayer, self.gas_limit).await,
            RelayRequest::Sell(r) => contracts.send_sell(r, self.relayer, self.gas_limit).await,
        }
        .map_err(|e| RelayError::transport(Stage::Submit, e))?;

        info!(kind = %request.kind(), tx_hash = %tx_hash, "Transaction submitted");
        Ok(tx_hash)
    }

    /// Wait for `tx_hash` to be included. A reverted receipt is an error.
    pub async fn wait(&self, tx_hash: TxHash) -> Result<RelayReceipt, RelayError> {
        let receipt = self
            .contracts
            .wait_for_receipt(tx_hash, self.receipt_timeout, &self.cancel)
            .await
            .map_err(|e| RelayError::transport(Stage::Inclusion, e))?;

        if !receipt.success {
            warn!(tx_hash = %tx_hash, block = ?receipt.block_number, "Transaction reverted");
            return Err(RelayError::ChainRevert {
                tx_hash: tx_hash.to_string(),
            });
        }

        info!(tx_hash = %tx_hash, block = ?receipt.block_number, "Transaction included");
        Ok(receipt)
    }
}
