//! Relay request bodies.
//!
//! The wire shape is a JSON object discriminated by `type`
//! (`create-token | buy | sell`). Field names are camelCase; integer fields
//! accept decimal strings, `0x` hex strings or JSON numbers.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::RequestShapeError;

/// One of the three signed intents the relayer accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RelayRequest {
    CreateToken(CreateTokenRequest),
    Buy(BuyRequest),
    Sell(SellRequest),
}

/// Request kind, for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayKind {
    CreateToken,
    Buy,
    Sell,
}

impl RelayKind {
    pub const ALL: [RelayKind; 3] = [RelayKind::CreateToken, RelayKind::Buy, RelayKind::Sell];

    /// The wire literal of the `type` discriminator.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelayKind::CreateToken => "create-token",
            RelayKind::Buy => "buy",
            RelayKind::Sell => "sell",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == tag)
    }
}

impl std::fmt::Display for RelayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RelayRequest {
    /// Parse a JSON body, separating an unknown discriminator from bad fields.
    pub fn from_json(body: Value) -> Result<Self, RequestShapeError> {
        let tag = match body.as_object() {
            Some(obj) => obj.get("type").and_then(Value::as_str),
            None => return Err(RequestShapeError::NotAnObject),
        };
        if tag.and_then(RelayKind::from_tag).is_none() {
            return Err(RequestShapeError::InvalidType);
        }
        serde_json::from_value(body).map_err(|e| RequestShapeError::InvalidFields(e.to_string()))
    }

    pub fn kind(&self) -> RelayKind {
        match self {
            RelayRequest::CreateToken(_) => RelayKind::CreateToken,
            RelayRequest::Buy(_) => RelayKind::Buy,
            RelayRequest::Sell(_) => RelayKind::Sell,
        }
    }

    pub fn nonce(&self) -> U256 {
        match self {
            RelayRequest::CreateToken(r) => r.nonce,
            RelayRequest::Buy(r) => r.nonce,
            RelayRequest::Sell(r) => r.nonce,
        }
    }
}

/// ECDSA signature over the contract's typed-data digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitSignature {
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

/// Launch a new token through the factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenRequest {
    pub creator: Address,
    pub params: SlothCreationParams,
    #[serde(deserialize_with = "de_u256")]
    pub nonce: U256,
    #[serde(deserialize_with = "de_u256")]
    pub deadline: U256,
    pub signature: PermitSignature,
}

/// Creation parameters. Only `name`, `symbol`, `token_id` and
/// `initial_deposit` are signed; the metadata rides along for the indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlothCreationParams {
    pub name: String,
    pub symbol: String,
    #[serde(deserialize_with = "de_u256")]
    pub token_id: U256,
    #[serde(default, deserialize_with = "de_u256")]
    pub initial_deposit: U256,
    #[serde(flatten)]
    pub metadata: TokenMetadata,
}

/// Free-form token metadata forwarded to the indexer, never signed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenMetadata {
    pub description: Option<String>,
    #[serde(alias = "imageUrl")]
    pub image: Option<String>,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub website: Option<String>,
    #[serde(alias = "tags")]
    pub categories: Vec<String>,
}

/// Buy tokens from a sloth pool with native currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyRequest {
    pub sloth_contract_address: Address,
    pub buyer: Address,
    pub recipient: Address,
    #[serde(alias = "amount", alias = "ethAmount", deserialize_with = "de_u256")]
    pub native_amount: U256,
    #[serde(deserialize_with = "de_u256")]
    pub nonce: U256,
    #[serde(deserialize_with = "de_u256")]
    pub deadline: U256,
    pub signature: PermitSignature,
}

/// Sell tokens back into a sloth pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellRequest {
    pub sloth_contract_address: Address,
    pub seller: Address,
    pub recipient: Address,
    #[serde(alias = "amount", deserialize_with = "de_u256")]
    pub token_amount: U256,
    #[serde(deserialize_with = "de_u256")]
    pub nonce: U256,
    #[serde(deserialize_with = "de_u256")]
    pub deadline: U256,
    pub signature: PermitSignature,
}

/// Accept `"1000"`, `"0x3e8"` or `1000`.
fn de_u256<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(u64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Str(s) => U256::from_str(s.trim()).map_err(serde::de::Error::custom),
        Raw::Num(n) => Ok(U256::from(n)),
    }
}
