//! Sloth meta-transaction relayer.
//!
//! Accepts signed create/buy/sell intents, checks them against the Sloth
//! contracts, submits them from the relayer account and forwards the
//! resulting events to the indexer.

pub mod config;
pub mod contract;
pub mod error;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod notify;
pub mod pipeline;
pub mod response;
pub mod router;
pub mod signing;
pub mod state;
pub mod submitter;
pub mod verifier;

#[cfg(test)]
mod test_utils;

pub use config::Config;
pub use error::{Error, RelayError};
pub use router::create as create_router;
pub use state::AppState;
