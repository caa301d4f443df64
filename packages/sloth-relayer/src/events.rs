//! Event extraction from inclusion receipts.
//!
//! A log matches when its leading topic equals the keccak256 of the event's
//! canonical signature. Its arguments are then read positionally from the
//! remaining topics followed by the 32-byte words of the data section; every
//! parameter of both events is a static type, so each occupies exactly one
//! word wherever it lives (indexed parameters must precede the others).
//!
//! `SolEvent::decode_log` on the `sol!` declarations in `contract.rs` is not
//! used here: it checks the topic count against the declared `indexed`
//! split and rejects a log emitted by a deployment that indexes a different
//! subset of parameters. Those declarations still pin the topic hashes and
//! build the test fixtures.

use alloy::primitives::{keccak256, Address, Log, B256, U256};
use serde_json::{json, Map, Value};
use std::sync::LazyLock;

use crate::contract::RelayReceipt;
use crate::error::RelayError;

pub const SLOTH_CREATED_SIGNATURE: &str =
    "SlothCreated(address,address,address,uint256,uint256,uint256,uint256,uint256,bool,address)";
pub const TOKEN_BOUGHT_SIGNATURE: &str = "TokenBought(address,address,uint256,uint256)";

pub static SLOTH_CREATED_TOPIC: LazyLock<B256> =
    LazyLock::new(|| keccak256(SLOTH_CREATED_SIGNATURE));
pub static TOKEN_BOUGHT_TOPIC: LazyLock<B256> =
    LazyLock::new(|| keccak256(TOKEN_BOUGHT_SIGNATURE));

/// `SlothCreated`: emitted by the factory when a token and its pool launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlothCreatedEvent {
    pub token: Address,
    pub sloth: Address,
    pub creator: Address,
    pub total_supply: U256,
    pub sale_amount: U256,
    pub token_offset: U256,
    pub native_offset: U256,
    pub token_id: U256,
    pub whitelist_enabled: bool,
    pub factory: Address,
}

/// `TokenBought`: emitted by a sloth pool on every buy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBoughtEvent {
    pub buyer: Address,
    pub recipient: Address,
    pub native_amount: U256,
    pub token_amount: U256,
}

/// A known event and how to read it out of a log.
pub trait RelayEvent: Sized {
    const NAME: &'static str;
    /// Minimum number of positional arguments.
    const ARITY: usize;

    fn topic() -> B256;

    fn from_words(words: &Words<'_>) -> Result<Self, String>;

    /// Decoded fields as they appear in the relay response.
    fn to_fields(&self) -> Map<String, Value>;
}

impl RelayEvent for SlothCreatedEvent {
    const NAME: &'static str = "SlothCreated";
    const ARITY: usize = 10;

    fn topic() -> B256 {
        *SLOTH_CREATED_TOPIC
    }

    fn from_words(w: &Words<'_>) -> Result<Self, String> {
        Ok(Self {
            token: w.address(0)?,
            sloth: w.address(1)?,
            creator: w.address(2)?,
            total_supply: w.uint(3)?,
            sale_amount: w.uint(4)?,
            token_offset: w.uint(5)?,
            native_offset: w.uint(6)?,
            token_id: w.uint(7)?,
            whitelist_enabled: w.boolean(8)?,
            factory: w.address(9)?,
        })
    }

    fn to_fields(&self) -> Map<String, Value> {
        object(json!({
            "tokenAddress": self.token,
            "slothAddress": self.sloth,
            "creator": self.creator,
            "totalSupply": self.total_supply.to_string(),
            "saleAmount": self.sale_amount.to_string(),
            "tokenOffset": self.token_offset.to_string(),
            "nativeOffset": self.native_offset.to_string(),
            "tokenId": self.token_id.to_string(),
            "whitelistEnabled": self.whitelist_enabled,
            "factory": self.factory,
        }))
    }
}

impl RelayEvent for TokenBoughtEvent {
    const NAME: &'static str = "TokenBought";
    const ARITY: usize = 4;

    fn topic() -> B256 {
        *TOKEN_BOUGHT_TOPIC
    }

    fn from_words(w: &Words<'_>) -> Result<Self, String> {
        Ok(Self {
            buyer: w.address(0)?,
            recipient: w.address(1)?,
            native_amount: w.uint(2)?,
            token_amount: w.uint(3)?,
        })
    }

    fn to_fields(&self) -> Map<String, Value> {
        object(json!({
            "buyer": self.buyer,
            "recipient": self.recipient,
            "nativeAmount": self.native_amount.to_string(),
            "tokenAmount": self.token_amount.to_string(),
        }))
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Positional view over a log's non-leading topics and data words.
pub struct Words<'a> {
    words: Vec<&'a [u8]>,
}

impl<'a> Words<'a> {
    fn new(log: &'a Log) -> Result<Self, String> {
        let data = log.data.data.as_ref();
        if data.len() % 32 != 0 {
            return Err(format!("data length {} is not word aligned", data.len()));
        }
        let words = log
            .data
            .topics()
            .iter()
            .skip(1)
            .map(|t| t.as_slice())
            .chain(data.chunks_exact(32))
            .collect();
        Ok(Self { words })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn word(&self, i: usize) -> Result<&'a [u8], String> {
        self.words
            .get(i)
            .copied()
            .ok_or_else(|| format!("missing argument {i}"))
    }

    pub fn uint(&self, i: usize) -> Result<U256, String> {
        Ok(U256::from_be_slice(self.word(i)?))
    }

    pub fn address(&self, i: usize) -> Result<Address, String> {
        let word = self.word(i)?;
        if word[..12].iter().any(|b| *b != 0) {
            return Err(format!("argument {i} is not an address"));
        }
        Ok(Address::from_slice(&word[12..]))
    }

    pub fn boolean(&self, i: usize) -> Result<bool, String> {
        match self.uint(i)? {
            v if v == U256::ZERO => Ok(false),
            v if v == U256::from(1u8) => Ok(true),
            _ => Err(format!("argument {i} is not a bool")),
        }
    }
}

/// First log in `receipt` whose leading topic is `E`'s, decoded.
///
/// `Ok(None)` when no log matches; a matching log that cannot be decoded is
/// an error.
pub fn find_event<E: RelayEvent>(receipt: &RelayReceipt) -> Result<Option<E>, RelayError> {
    let topic = E::topic();
    let Some(log) = receipt
        .logs
        .iter()
        .find(|log| log.data.topics().first() == Some(&topic))
    else {
        return Ok(None);
    };

    let decode_err = |message: String| RelayError::Decode {
        event: E::NAME,
        message,
    };
    let words = Words::new(log).map_err(decode_err)?;
    if words.len() < E::ARITY {
        return Err(decode_err(format!(
            "expected at least {} fields, found {}",
            E::ARITY,
            words.len()
        )));
    }
    E::from_words(&words).map(Some).map_err(decode_err)
}

/// Like [`find_event`], but absence is [`RelayError::EventNotFound`].
pub fn require_event<E: RelayEvent>(receipt: &RelayReceipt) -> Result<E, RelayError> {
    find_event::<E>(receipt)?.ok_or_else(|| RelayError::EventNotFound {
        event: E::NAME,
        tx_hash: receipt.tx_hash.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ISloth, ISlothFactory};
    use crate::test_utils::{receipt_with_logs, sloth_created_log, token_bought_log};
    use alloy::primitives::{address, LogData};
    use alloy::sol_types::SolEvent;

    #[test]
    fn test_topics_match_sol_bindings() {
        assert_eq!(
            *SLOTH_CREATED_TOPIC,
            ISlothFactory::SlothCreated::SIGNATURE_HASH
        );
        assert_eq!(*TOKEN_BOUGHT_TOPIC, ISloth::TokenBought::SIGNATURE_HASH);
    }

    #[test]
    fn test_decode_sloth_created() {
        let receipt = receipt_with_logs(vec![sloth_created_log()]);
        let event: SlothCreatedEvent = require_event(&receipt).unwrap();
        assert_eq!(event.token, address!("00000000000000000000000000000000000000a1"));
        assert_eq!(event.sloth, address!("00000000000000000000000000000000000000a2"));
        assert_eq!(event.total_supply, U256::from(1_000_000u64));
        assert_eq!(event.token_id, U256::from(42u64));
        assert!(event.whitelist_enabled);
        assert_eq!(event.factory, address!("00000000000000000000000000000000000000f1"));
    }

    #[test]
    fn test_first_matching_log_wins() {
        let unrelated = Log {
            address: Address::ZERO,
            data: LogData::new_unchecked(vec![B256::repeat_byte(0x99)], Default::default()),
        };
        let first = token_bought_log(U256::from(1u64), U256::from(2u64));
        let second = token_bought_log(U256::from(3u64), U256::from(4u64));
        let receipt = receipt_with_logs(vec![unrelated, first, second]);
        let event: TokenBoughtEvent = require_event(&receipt).unwrap();
        assert_eq!(event.native_amount, U256::from(1u64));
        assert_eq!(event.token_amount, U256::from(2u64));
    }

    #[test]
    fn test_missing_event_is_deterministic() {
        let receipt =
            receipt_with_logs(vec![token_bought_log(U256::from(1u64), U256::from(1u64))]);
        for _ in 0..2 {
            let err = require_event::<SlothCreatedEvent>(&receipt).unwrap_err();
            assert!(matches!(
                err,
                RelayError::EventNotFound { event: "SlothCreated", .. }
            ));
        }
        assert_eq!(find_event::<SlothCreatedEvent>(&receipt).unwrap(), None);
    }

    #[test]
    fn test_too_few_fields_is_decode_error() {
        let mut log = sloth_created_log();
        let data = log.data.data.to_vec();
        log.data = LogData::new_unchecked(
            log.data.topics().to_vec(),
            data[..data.len() - 32].to_vec().into(),
        );
        let receipt = receipt_with_logs(vec![log]);
        let err = require_event::<SlothCreatedEvent>(&receipt).unwrap_err();
        assert!(matches!(err, RelayError::Decode { event: "SlothCreated", .. }));
    }

    #[test]
    fn test_dirty_address_word_rejected() {
        let log = Log {
            address: Address::ZERO,
            data: LogData::new_unchecked(
                vec![*TOKEN_BOUGHT_TOPIC, B256::repeat_byte(0xff), B256::ZERO],
                vec![0u8; 64].into(),
            ),
        };
        let receipt = receipt_with_logs(vec![log]);
        assert!(matches!(
            find_event::<TokenBoughtEvent>(&receipt),
            Err(RelayError::Decode { .. })
        ));
    }

    #[test]
    fn test_unindexed_layout_decodes_identically() {
        // Same event with every argument in the data section.
        let indexed = sloth_created_log();
        let mut data = Vec::new();
        for topic in indexed.data.topics().iter().skip(1) {
            data.extend_from_slice(topic.as_slice());
        }
        data.extend_from_slice(&indexed.data.data);
        let flat = Log {
            address: indexed.address,
            data: LogData::new_unchecked(vec![*SLOTH_CREATED_TOPIC], data.into()),
        };
        let a: SlothCreatedEvent = require_event(&receipt_with_logs(vec![indexed])).unwrap();
        let b: SlothCreatedEvent = require_event(&receipt_with_logs(vec![flat])).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fields_are_named() {
        let receipt = receipt_with_logs(vec![sloth_created_log()]);
        let event: SlothCreatedEvent = require_event(&receipt).unwrap();
        let fields = event.to_fields();
        assert_eq!(fields["tokenId"], "42");
        assert_eq!(fields["whitelistEnabled"], true);
        assert_eq!(fields.len(), 10);
    }
}
