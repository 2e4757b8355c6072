//! The verifier signing identity.

use k256::ecdsa::{SigningKey, VerifyingKey};
use landgrab_types::Address;
use std::fmt;

use crate::error::CryptoError;
use crate::hash::keccak256;
use crate::sign::RecoverableSignature;

/// Derive the ledger address of a public key: the last 20 bytes of the
/// Keccak-256 hash of the uncompressed point without its `0x04` tag.
pub fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address::new(bytes)
}

/// The secp256k1 key every settlement, release and swap write is signed with.
///
/// There is no default: a node without a configured key cannot write.
#[derive(Clone)]
pub struct VerifierKey {
    signing_key: SigningKey,
    address: Address,
}

impl VerifierKey {
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self, CryptoError> {
        let signing_key = SigningKey::from_slice(secret)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let address = address_from_verifying_key(signing_key.verifying_key());
        Ok(Self {
            signing_key,
            address,
        })
    }

    /// Parse a 32-byte hex secret, with or without a `0x` prefix.
    pub fn from_hex(raw: &str) -> Result<Self, CryptoError> {
        let digits = raw.trim();
        let digits = digits.strip_prefix("0x").unwrap_or(digits);
        let mut secret = [0u8; 32];
        hex::decode_to_slice(digits, &mut secret)
            .map_err(|_| CryptoError::InvalidKey("expected 64 hex digits".into()))?;
        Self::from_bytes(&secret)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a 32-byte digest, producing a low-s recoverable signature.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<RecoverableSignature, CryptoError> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|e| CryptoError::Signing(e.to_string()))?;
        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(RecoverableSignature {
            r,
            s,
            recovery_id: recovery_id.to_byte(),
        })
    }
}

// Never print the secret.
impl fmt::Debug for VerifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierKey")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HARDHAT_KEY_0: &str =
        "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn derives_known_address() {
        let key = VerifierKey::from_hex(HARDHAT_KEY_0).unwrap();
        assert_eq!(
            key.address().to_string(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn prefix_is_optional() {
        let a = VerifierKey::from_hex(HARDHAT_KEY_0).unwrap();
        let b = VerifierKey::from_hex(HARDHAT_KEY_0.trim_start_matches("0x")).unwrap();
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn rejects_bad_keys() {
        assert!(VerifierKey::from_hex("").is_err());
        assert!(VerifierKey::from_hex("0x1234").is_err());
        assert!(VerifierKey::from_bytes(&[0u8; 32]).is_err());
    }

    #[test]
    fn debug_hides_secret() {
        let key = VerifierKey::from_hex(HARDHAT_KEY_0).unwrap();
        let shown = format!("{key:?}");
        assert!(!shown.contains("ac0974"));
        assert!(shown.contains("f39fd6"));
    }
}
