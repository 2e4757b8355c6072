//! Ledger-assigned identifiers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::LandgrabError;

/// Parse `0x`-prefixed hex of up to 64 digits into a right-aligned 32-byte
/// word, so `0xabc` and its zero-padded form name the same value.
fn parse_word(raw: &str) -> Result<[u8; 32], LandgrabError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or_else(|| LandgrabError::InvalidHex(raw.to_string()))?;
    if digits.is_empty() || digits.len() > 64 {
        return Err(LandgrabError::InvalidHex(raw.to_string()));
    }
    let padded = format!("{digits:0>64}");
    let mut word = [0u8; 32];
    hex::decode_to_slice(&padded, &mut word)
        .map_err(|_| LandgrabError::InvalidHex(raw.to_string()))?;
    Ok(word)
}

macro_rules! bytes32_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name([u8; 32]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);

            pub fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn parse(raw: &str) -> Result<Self, LandgrabError> {
                parse_word(raw).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), hex::encode(&self.0[28..]))
            }
        }

        impl FromStr for $name {
            type Err = LandgrabError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::parse(&raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

bytes32_id!(
    /// Opaque `bytes32` identifier the market contract assigns to a claim request.
    RequestId
);

bytes32_id!(
    /// `bytes32` identifier of a swap proposal.
    ProposalId
);

bytes32_id!(
    /// Hash of a ledger transaction.
    TxHash
);

/// ERC-721 token id of a parcel.
///
/// The contract mints ids from a counter, so anything wider than 128 bits
/// is rejected as corrupt rather than carried around as a bignum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(u128);

impl TokenId {
    pub fn new(value: u128) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u128 {
        self.0
    }

    /// Decode a big-endian `uint256` ABI word.
    pub fn from_word(word: &[u8; 32]) -> Result<Self, LandgrabError> {
        if word[..16].iter().any(|b| *b != 0) {
            return Err(LandgrabError::TokenIdOverflow(hex::encode(word)));
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&word[16..]);
        Ok(Self(u128::from_be_bytes(low)))
    }

    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&self.0.to_be_bytes());
        word
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TokenId {
    type Err = LandgrabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u128>()
            .map(Self)
            .map_err(|_| LandgrabError::TokenIdOverflow(s.to_string()))
    }
}

// Token ids travel as decimal strings in JSON, matching how clients render uint256.
impl Serialize for TokenId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TokenId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_hex_is_left_padded() {
        let short = RequestId::parse("0xabc").unwrap();
        let long = RequestId::parse(
            "0x0000000000000000000000000000000000000000000000000000000000000abc",
        )
        .unwrap();
        assert_eq!(short, long);
        assert_eq!(short.as_bytes()[30..], [0x0a, 0xbc]);
    }

    #[test]
    fn rejects_missing_prefix_and_oversized_input() {
        assert!(RequestId::parse("abc").is_err());
        assert!(RequestId::parse("0x").is_err());
        assert!(TxHash::parse(&format!("0x{}", "1".repeat(65))).is_err());
    }

    #[test]
    fn token_id_word_round_trip() {
        let id = TokenId::new(7);
        let word = id.to_word();
        assert_eq!(word[31], 7);
        assert_eq!(TokenId::from_word(&word).unwrap(), id);
    }

    #[test]
    fn token_id_rejects_values_above_u128() {
        let mut word = [0u8; 32];
        word[0] = 1;
        assert!(TokenId::from_word(&word).is_err());
    }

    #[test]
    fn token_id_serializes_as_decimal_string() {
        let json = serde_json::to_string(&TokenId::new(42)).unwrap();
        assert_eq!(json, "\"42\"");
    }
}
