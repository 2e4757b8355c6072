//! `0x`-prefixed hex encodings used on the JSON-RPC wire.

use crate::error::LedgerError;

pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn decode_hex(raw: &str) -> Result<Vec<u8>, LedgerError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    hex::decode(digits).map_err(|e| LedgerError::Decode(format!("bad hex {raw:?}: {e}")))
}

pub fn decode_word(raw: &str) -> Result<[u8; 32], LedgerError> {
    let bytes = decode_hex(raw)?;
    bytes
        .try_into()
        .map_err(|_| LedgerError::Decode(format!("expected 32-byte word, got {raw:?}")))
}

/// Quantities carry no leading zeros; zero is `0x0`.
pub fn encode_quantity(value: u128) -> String {
    format!("0x{value:x}")
}

pub fn decode_quantity(raw: &str) -> Result<u128, LedgerError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| LedgerError::Decode(format!("quantity without 0x prefix: {raw:?}")))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|e| LedgerError::Decode(format!("bad quantity {raw:?}: {e}")))
}

pub fn decode_quantity_u64(raw: &str) -> Result<u64, LedgerError> {
    let value = decode_quantity(raw)?;
    u64::try_from(value).map_err(|_| LedgerError::Decode(format!("quantity too large: {raw}")))
}

/// Serde adapters for the wire encodings above.
pub mod serde_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub mod bytes {
        use super::*;

        pub fn serialize<S: Serializer>(value: &[u8], s: S) -> Result<S::Ok, S::Error> {
            s.serialize_str(&crate::hexutil::encode_hex(value))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
            let raw = String::deserialize(d)?;
            crate::hexutil::decode_hex(&raw).map_err(serde::de::Error::custom)
        }
    }

    pub mod words {
        use super::*;
        use serde::ser::SerializeSeq;

        pub fn serialize<S: Serializer>(value: &[[u8; 32]], s: S) -> Result<S::Ok, S::Error> {
            let mut seq = s.serialize_seq(Some(value.len()))?;
            for word in value {
                seq.serialize_element(&crate::hexutil::encode_hex(word))?;
            }
            seq.end()
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<[u8; 32]>, D::Error> {
            let raw = Vec::<String>::deserialize(d)?;
            raw.iter()
                .map(|w| crate::hexutil::decode_word(w).map_err(serde::de::Error::custom))
                .collect()
        }
    }

    pub mod quantity {
        use super::*;

        pub fn serialize<S: Serializer>(value: &u64, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_str(&crate::hexutil::encode_quantity(u128::from(*value)))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
            let raw = String::deserialize(d)?;
            crate::hexutil::decode_quantity_u64(&raw).map_err(serde::de::Error::custom)
        }
    }

    pub mod opt_quantity {
        use super::*;

        pub fn serialize<S: Serializer>(value: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => s.serialize_str(&crate::hexutil::encode_quantity(u128::from(*v))),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
            let raw = Option::<String>::deserialize(d)?;
            raw.map(|r| crate::hexutil::decode_quantity_u64(&r).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_encoding() {
        assert_eq!(encode_quantity(0), "0x0");
        assert_eq!(encode_quantity(0x1b4), "0x1b4");
        assert_eq!(decode_quantity("0x1b4").unwrap(), 0x1b4);
        assert_eq!(decode_quantity("0x").unwrap(), 0);
        assert!(decode_quantity("1b4").is_err());
    }

    #[test]
    fn word_requires_32_bytes() {
        assert!(decode_word("0x00").is_err());
        assert_eq!(decode_word(&format!("0x{}", "11".repeat(32))).unwrap(), [0x11; 32]);
    }
}
