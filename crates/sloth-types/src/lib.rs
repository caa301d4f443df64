//! Shared types and pure-logic utilities for the Sloth relayer.
//! No chain or HTTP dependency, so clients that build relay requests can use
//! it as well as the relayer.

mod error;
mod request;
mod response;
mod units;

pub use error::RequestShapeError;
pub use request::{
    BuyRequest, CreateTokenRequest, PermitSignature, RelayKind, RelayRequest, SellRequest,
    SlothCreationParams, TokenMetadata,
};
pub use response::RelayResponse;
pub use units::{to_decimal_units, NATIVE_DECIMALS};
