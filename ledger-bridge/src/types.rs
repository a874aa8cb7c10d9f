//! Identifier and receipt types shared by every service
//!
//! Network entities are addressed as `shard.realm.num`. Identifiers are
//! parsed once at the edge and carried as typed values afterwards.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity number triple (`shard.realm.num`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityNum {
    /// Shard number
    pub shard: u64,
    /// Realm number
    pub realm: u64,
    /// Entity number
    pub num: u64,
}

impl EntityNum {
    /// Create from parts
    pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
        Self { shard, realm, num }
    }

    fn parse(kind: &str, s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(Error::Config(format!(
                "{} '{}' must have the form shard.realm.num",
                kind, s
            )));
        }

        let mut nums = [0u64; 3];
        for (slot, part) in nums.iter_mut().zip(parts) {
            *slot = part.parse().map_err(|_| {
                Error::Config(format!("{} '{}' contains a non-numeric segment", kind, s))
            })?;
        }

        Ok(Self::new(nums[0], nums[1], nums[2]))
    }
}

impl fmt::Display for EntityNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(EntityNum);

        impl $name {
            /// Create from parts
            pub const fn new(shard: u64, realm: u64, num: u64) -> Self {
                Self(EntityNum::new(shard, realm, num))
            }

            /// Entity number triple
            pub fn entity(&self) -> EntityNum {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                EntityNum::parse($kind, s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

entity_id!(
    /// Account identifier (operator, treasury, responder)
    AccountId,
    "account id"
);
entity_id!(
    /// Consensus log topic identifier
    TopicId,
    "topic id"
);
entity_id!(
    /// Write-once file identifier
    FileId,
    "file id"
);
entity_id!(
    /// Fungible token identifier
    TokenId,
    "token id"
);

/// Receipt of a consensus message submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    /// Network-reported status (e.g. `SUCCESS`)
    pub status: String,
    /// Position of the message within its topic
    pub sequence_number: Option<u64>,
}

/// Receipt of a token transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Network-reported status
    pub status: String,
}

/// A message read back from a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMessage {
    /// Sequence number within the topic
    pub sequence_number: u64,
    /// Consensus timestamp (`seconds.nanos`)
    pub consensus_timestamp: String,
    /// Decoded message text
    pub message: String,
}

/// Parameters for a new topic
#[derive(Debug, Clone, Default)]
pub struct TopicSpec {
    /// Free-form memo
    pub memo: Option<String>,
    /// Key allowed to submit messages
    pub submit_key: Option<[u8; 32]>,
    /// Key allowed to update or delete the topic
    pub admin_key: Option<[u8; 32]>,
}

/// Parameters for a new fungible token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpec {
    /// Token name
    pub name: String,
    /// Ticker symbol
    pub symbol: String,
    /// Decimal places
    pub decimals: u32,
    /// Units minted into the treasury at creation
    pub initial_supply: u64,
    /// Treasury account
    pub treasury: AccountId,
    /// Supply key (public key bytes)
    #[serde(with = "hex_key")]
    pub supply_key: [u8; 32],
}

pub(crate) mod hex_key {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(key))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 key bytes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entity_id() {
        let id: AccountId = "0.0.4521".parse().unwrap();
        assert_eq!(id, AccountId::new(0, 0, 4521));
        assert_eq!(id.to_string(), "0.0.4521");
    }

    #[test]
    fn test_reject_malformed_id() {
        assert!("0.0".parse::<TopicId>().is_err());
        assert!("0.0.YOUR_ACCOUNT_ID".parse::<AccountId>().is_err());
        assert!(matches!("".parse::<FileId>(), Err(Error::Config(_))));
    }

    #[test]
    fn test_id_serializes_as_string() {
        let json = serde_json::to_string(&FileId::new(0, 0, 77)).unwrap();
        assert_eq!(json, "\"0.0.77\"");
        let back: FileId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FileId::new(0, 0, 77));
    }
}
