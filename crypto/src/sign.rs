//! Recoverable secp256k1 signatures.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use landgrab_types::Address;

use crate::error::CryptoError;
use crate::keys::address_from_verifying_key;

/// An ECDSA signature with its recovery id (0 or 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: u8,
}

/// Recover the signer's address from a digest and signature.
pub fn recover_address(
    digest: &[u8; 32],
    signature: &RecoverableSignature,
) -> Result<Address, CryptoError> {
    let mut bytes = [0u8; 64];
    bytes[..32].copy_from_slice(&signature.r);
    bytes[32..].copy_from_slice(&signature.s);
    let sig = Signature::from_slice(&bytes)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    let recovery_id = RecoveryId::from_byte(signature.recovery_id)
        .ok_or_else(|| CryptoError::InvalidSignature("recovery id out of range".into()))?;
    let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    Ok(address_from_verifying_key(&key))
}
