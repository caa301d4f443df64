//! Typed handle to the deployed factory and sloth pool contracts.
//!
//! Argument order of every call below is part of the wire contract: the
//! contracts hash their typed-data digest over these parameters, so a
//! reordering breaks verification even though the values are unchanged.

use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, Log, TxHash, U256};
use alloy::providers::{PendingTransactionBuilder, Provider};
use alloy::rpc::types::TransactionReceipt;
use alloy::sol;
use async_trait::async_trait;
use sloth_types::{BuyRequest, CreateTokenRequest, SellRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::signing::SigningContext;

sol! {
    #[allow(missing_docs)]
    #[allow(clippy::too_many_arguments)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface ISlothFactory {
        struct SlothCreationParams {
            string name;
            string symbol;
            uint256 tokenId;
            uint256 initialDeposit;
        }

        function verifyCreateSignatureWithRelayer(
            address creator,
            SlothCreationParams calldata params,
            uint256 deadline,
            uint8 v,
            bytes32 r,
            bytes32 s,
            address relayer,
            uint256 nonce
        ) external view returns (bool);

        function createWithPermitRelayer(
            address creator,
            SlothCreationParams calldata params,
            uint256 deadline,
            uint8 v,
            bytes32 r,
            bytes32 s,
            uint256 nonce
        ) external;

        event SlothCreated(
            address indexed token,
            address indexed sloth,
            address indexed creator,
            uint256 totalSupply,
            uint256 saleAmount,
            uint256 tokenOffset,
            uint256 nativeOffset,
            uint256 tokenId,
            bool whitelistEnabled,
            address factory
        );
    }
}

sol! {
    #[allow(missing_docs)]
    #[allow(clippy::too_many_arguments)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface ISloth {
        function verifyBuySignatureWithRelayer(
            address buyer,
            address recipient,
            uint256 nativeAmount,
            uint256 nonce,
            uint256 deadline,
            address relayer,
            uint8 v,
            bytes32 r,
            bytes32 s
        ) external view returns (bool);

        function buyWithPermitRelayer(
            address buyer,
            address recipient,
            uint256 nativeAmount,
            uint256 nonce,
            uint256 deadline,
            address relayer,
            uint8 v,
            bytes32 r,
            bytes32 s
        ) external;

        function verifySellSignatureWithRelayer(
            address seller,
            address recipient,
            uint256 tokenAmount,
            uint256 nonce,
            uint256 deadline,
            address relayer,
            uint8 v,
            bytes32 r,
            bytes32 s
        ) external view returns (bool);

        function sellWithPermitRelayer(
            address seller,
            address recipient,
            uint256 tokenAmount,
            uint256 nonce,
            uint256 deadline,
            address relayer,
            uint8 v,
            bytes32 r,
            bytes32 s
        ) external;

        function getPrice() external view returns (uint256);

        event TokenBought(
            address indexed buyer,
            address indexed recipient,
            uint256 nativeAmount,
            uint256 tokenAmount
        );
    }
}

/// A call-level fault from the node (unreachable, rejected, timed out).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ChainError(pub String);

impl ChainError {
    fn from_debug(e: impl std::fmt::Debug) -> Self {
        ChainError(format!("{e:?}"))
    }
}

/// Chain-agnostic result of inclusion.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayReceipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub block_number: Option<u64>,
    pub logs: Vec<Log>,
}

impl From<TransactionReceipt> for RelayReceipt {
    fn from(receipt: TransactionReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            success: receipt.status(),
            block_number: receipt.block_number,
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|log| log.inner.clone())
                .collect(),
        }
    }
}

/// Callable surface of the deployed contracts.
///
/// `verify_*` are read-only views; `send_*` submit the privileged entry
/// point and return as soon as the node accepts the transaction.
#[async_trait]
pub trait SlothContracts: Send + Sync {
    async fn verify_create(
        &self,
        request: &CreateTokenRequest,
        relayer: Address,
    ) -> Result<bool, ChainError>;

    async fn send_create(
        &self,
        request: &CreateTokenRequest,
        gas_limit: u64,
    ) -> Result<TxHash, ChainError>;

    async fn verify_buy(&self, request: &BuyRequest, relayer: Address) -> Result<bool, ChainError>;

    async fn send_buy(
        &self,
        request: &BuyRequest,
        relayer: Address,
        gas_limit: u64,
    ) -> Result<TxHash, ChainError>;

    async fn verify_sell(&self, request: &SellRequest, relayer: Address)
        -> Result<bool, ChainError>;

    async fn send_sell(
        &self,
        request: &SellRequest,
        relayer: Address,
        gas_limit: u64,
    ) -> Result<TxHash, ChainError>;

    /// Current price quoted by a sloth pool, 18 decimals.
    async fn current_price(&self, sloth: Address) -> Result<U256, ChainError>;

    /// Block until `tx_hash` is included, `timeout` elapses, or `cancel` fires.
    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RelayReceipt, ChainError>;
}

/// [`SlothContracts`] over a live node via alloy.
pub struct EvmContracts {
    ctx: Arc<SigningContext>,
    factory: Address,
}

impl EvmContracts {
    pub fn new(ctx: Arc<SigningContext>, factory: Address) -> Self {
        Self { ctx, factory }
    }

    fn factory(&self) -> ISlothFactory::ISlothFactoryInstance<alloy::providers::DynProvider> {
        ISlothFactory::new(self.factory, self.ctx.provider().clone())
    }

    fn sloth(&self, address: Address) -> ISloth::ISlothInstance<alloy::providers::DynProvider> {
        ISloth::new(address, self.ctx.provider().clone())
    }
}

fn creation_params(request: &CreateTokenRequest) -> ISlothFactory::SlothCreationParams {
    ISlothFactory::SlothCreationParams {
        name: request.params.name.clone(),
        symbol: request.params.symbol.clone(),
        tokenId: request.params.token_id,
        initialDeposit: request.params.initial_deposit,
    }
}

#[async_trait]
impl SlothContracts for EvmContracts {
    async fn verify_create(
        &self,
        request: &CreateTokenRequest,
        relayer: Address,
    ) -> Result<bool, ChainError> {
        let sig = &request.signature;
        self.factory()
            .verifyCreateSignatureWithRelayer(
                request.creator,
                creation_params(request),
                request.deadline,
                sig.v,
                sig.r,
                sig.s,
                relayer,
                request.nonce,
            )
            .call()
            .await
            .map_err(ChainError::from_debug)
    }

    async fn send_create(
        &self,
        request: &CreateTokenRequest,
        gas_limit: u64,
    ) -> Result<TxHash, ChainError> {
        let sig = &request.signature;
        let pending = self
            .factory()
            .createWithPermitRelayer(
                request.creator,
                creation_params(request),
                request.deadline,
                sig.v,
                sig.r,
                sig.s,
                request.nonce,
            )
            .gas(gas_limit)
            .send()
            .await
            .map_err(ChainError::from_debug)?;
        Ok(*pending.tx_hash())
    }

    async fn verify_buy(&self, request: &BuyRequest, relayer: Address) -> Result<bool, ChainError> {
        let sig = &request.signature;
        self.sloth(request.sloth_contract_address)
            .verifyBuySignatureWithRelayer(
                request.buyer,
                request.recipient,
                request.native_amount,
                request.nonce,
                request.deadline,
                relayer,
                sig.v,
                sig.r,
                sig.s,
            )
            .call()
            .await
            .map_err(ChainError::from_debug)
    }

    async fn send_buy(
        &self,
        request: &BuyRequest,
        relayer: Address,
        gas_limit: u64,
    ) -> Result<TxHash, ChainError> {
        let sig = &request.signature;
        let pending = self
            .sloth(request.sloth_contract_address)
            .buyWithPermitRelayer(
                request.buyer,
                request.recipient,
                request.native_amount,
                request.nonce,
                request.deadline,
                relayer,
                sig.v,
                sig.r,
                sig.s,
            )
            .gas(gas_limit)
            .send()
            .await
            .map_err(ChainError::from_debug)?;
        Ok(*pending.tx_hash())
    }

    async fn verify_sell(
        &self,
        request: &SellRequest,
        relayer: Address,
    ) -> Result<bool, ChainError> {
        let sig = &request.signature;
        self.sloth(request.sloth_contract_address)
            .verifySellSignatureWithRelayer(
                request.seller,
                request.recipient,
                request.token_amount,
                request.nonce,
                request.deadline,
                relayer,
                sig.v,
                sig.r,
                sig.s,
            )
            .call()
            .await
            .map_err(ChainError::from_debug)
    }

    async fn send_sell(
        &self,
        request: &SellRequest,
        relayer: Address,
        gas_limit: u64,
    ) -> Result<TxHash, ChainError> {
        let sig = &request.signature;
        let pending = self
            .sloth(request.sloth_contract_address)
            .sellWithPermitRelayer(
                request.seller,
                request.recipient,
                request.token_amount,
                request.nonce,
                request.deadline,
                relayer,
                sig.v,
                sig.r,
                sig.s,
            )
            .gas(gas_limit)
            .send()
            .await
            .map_err(ChainError::from_debug)?;
        Ok(*pending.tx_hash())
    }

    async fn current_price(&self, sloth: Address) -> Result<U256, ChainError> {
        self.sloth(sloth)
            .getPrice()
            .call()
            .await
            .map_err(ChainError::from_debug)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RelayReceipt, ChainError> {
        let watcher = PendingTransactionBuilder::new(self.ctx.provider().root().clone(), tx_hash)
            .with_timeout(Some(timeout));

        tokio::select! {
            _ = cancel.cancelled() => Err(ChainError(format!(
                "inclusion wait for {tx_hash} cancelled by shutdown"
            ))),
            receipt = watcher.get_receipt() => receipt
                .map(RelayReceipt::from)
                .map_err(ChainError::from_debug),
        }
    }
}
