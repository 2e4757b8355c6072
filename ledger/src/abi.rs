//! Minimal Solidity ABI codec.
//!
//! Covers the static types (`address`, `uint256`, `bytes32`, `bool`) and
//! `string`, which is all the three contracts expose.

use landgrab_types::{Address, TokenId};

use crate::error::LedgerError;

/// Selector of the standard `Error(string)` revert payload.
pub const ERROR_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

const WORD: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(u128),
    FixedBytes([u8; 32]),
    Bool(bool),
    String(String),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        matches!(self, Token::String(_))
    }

    fn head_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        match self {
            Token::Address(a) => word = a.to_word(),
            Token::Uint(v) => word[16..].copy_from_slice(&v.to_be_bytes()),
            Token::FixedBytes(b) => word = *b,
            Token::Bool(b) => word[31] = u8::from(*b),
            Token::String(_) => {}
        }
        word
    }
}

fn uint_word(value: usize) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

/// Encode arguments as a head/tail tuple.
pub fn encode_args(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for token in tokens {
        match token {
            Token::String(s) => {
                head.extend_from_slice(&uint_word(head_len + tail.len()));
                let bytes = s.as_bytes();
                tail.extend_from_slice(&uint_word(bytes.len()));
                tail.extend_from_slice(bytes);
                let padding = (WORD - bytes.len() % WORD) % WORD;
                tail.extend(std::iter::repeat(0u8).take(padding));
            }
            _ => {
                debug_assert!(!token.is_dynamic());
                head.extend_from_slice(&token.head_word());
            }
        }
    }
    head.extend_from_slice(&tail);
    head
}

/// Calldata: selector followed by the encoded arguments.
pub fn encode_call(selector: [u8; 4], tokens: &[Token]) -> Vec<u8> {
    let mut data = selector.to_vec();
    data.extend_from_slice(&encode_args(tokens));
    data
}

/// The `index`-th 32-byte word of `data`.
pub fn word(data: &[u8], index: usize) -> Result<[u8; 32], LedgerError> {
    let start = index.saturating_mul(WORD);
    data.get(start..start.saturating_add(WORD))
        .and_then(|w| w.try_into().ok())
        .ok_or_else(|| {
            LedgerError::Decode(format!("return data too short: {} bytes, wanted word {index}", data.len()))
        })
}

fn word_as_usize(word: &[u8; 32]) -> Result<usize, LedgerError> {
    if word[..24].iter().any(|b| *b != 0) {
        return Err(LedgerError::Decode("offset or length out of range".into()));
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&word[24..]);
    usize::try_from(u64::from_be_bytes(low))
        .map_err(|_| LedgerError::Decode("offset or length out of range".into()))
}

pub fn decode_bool(data: &[u8], index: usize) -> Result<bool, LedgerError> {
    Ok(word(data, index)?.iter().any(|b| *b != 0))
}

pub fn decode_address(data: &[u8], index: usize) -> Result<Address, LedgerError> {
    Ok(Address::from_word(&word(data, index)?))
}

pub fn decode_token_id(data: &[u8], index: usize) -> Result<TokenId, LedgerError> {
    Ok(TokenId::from_word(&word(data, index)?)?)
}

/// A `uint256` that must fit in a `u64` (counts and balances).
pub fn decode_u64(data: &[u8], index: usize) -> Result<u64, LedgerError> {
    let w = word(data, index)?;
    if w[..24].iter().any(|b| *b != 0) {
        return Err(LedgerError::Decode("count does not fit in u64".into()));
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&w[24..]);
    Ok(u64::from_be_bytes(low))
}

/// Decode the `string` whose offset sits in head word `index`.
pub fn decode_string(data: &[u8], index: usize) -> Result<String, LedgerError> {
    let offset = word_as_usize(&word(data, index)?)?;
    let start = offset
        .checked_add(WORD)
        .ok_or_else(|| LedgerError::Decode("string offset out of range".into()))?;
    let len_bytes: [u8; 32] = data
        .get(offset..start)
        .and_then(|w| w.try_into().ok())
        .ok_or_else(|| LedgerError::Decode("string offset past end of data".into()))?;
    let len = word_as_usize(&len_bytes)?;
    let end = start
        .checked_add(len)
        .ok_or_else(|| LedgerError::Decode("string length out of range".into()))?;
    let bytes = data
        .get(start..end)
        .ok_or_else(|| LedgerError::Decode("string length past end of data".into()))?;
    String::from_utf8(bytes.to_vec()).map_err(|e| LedgerError::Decode(format!("string is not UTF-8: {e}")))
}

/// Extract the reason from an `Error(string)` revert payload.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let payload = data.strip_prefix(&ERROR_SELECTOR[..])?;
    decode_string(payload, 0).ok()
}
