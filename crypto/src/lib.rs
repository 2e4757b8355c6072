//! Cryptographic primitives for LandGrab's ledger writes.
//!
//! - **Keccak-256** for function selectors, event topics, addresses and
//!   transaction hashes
//! - **secp256k1** ECDSA for the verifier signing identity
//! - **EIP-155** legacy transaction encoding and signing

pub mod error;
pub mod hash;
pub mod keys;
pub mod sign;
pub mod tx;

pub use error::CryptoError;
pub use hash::{event_topic, keccak256, keccak256_multi, selector};
pub use keys::{address_from_verifying_key, VerifierKey};
pub use sign::{recover_address, RecoverableSignature};
pub use tx::LegacyTransaction;
