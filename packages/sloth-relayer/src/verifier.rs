//! On-chain signature verification.
//!
//! No local cryptography: the contract's `verify*SignatureWithRelayer` view is
//! the only authority on whether a permit is valid for this relayer.

use alloy::primitives::Address;
use sloth_types::RelayRequest;
use tracing::debug;

use crate::contract::SlothContracts;
use crate::error::{RelayError, Stage};

/// Ask the target contract whether `request`'s signature is valid for
/// `relayer`. `false` becomes [`RelayError::Verification`]; a faulting call
/// is a transport error, never folded into `false`.
pub async fn verify(
    contracts: &dyn SlothContracts,
    request: &RelayRequest,
    relayer: Address,
) -> Result<(), RelayError> {
    let valid = match request {
        RelayRequest::CreateToken(r) => contracts.verify_create(r, relayer).await,
        RelayRequest::Buy(r) => contracts.verify_buy(r, relayer).await,
        RelayRequest::Sell(r) => contracts.verify_sell(r, relayer).await,
    }
    .map_err(|e| RelayError::transport(Stage::Verify, e))?;

    debug!(kind = %request.kind(), valid, "Signature verification result");

    if valid {
        Ok(())
    } else {
        Err(RelayError::Verification(request.kind()))
    }
}
