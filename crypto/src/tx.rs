//! EIP-155 legacy transactions.

use landgrab_types::{Address, TxHash};
use rlp::RlpStream;

use crate::error::CryptoError;
use crate::hash::keccak256;
use crate::keys::VerifierKey;
use crate::sign::RecoverableSignature;

/// An unsigned legacy (type 0) contract call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

impl LegacyTransaction {
    fn append_body(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&self.gas_price);
        stream.append(&self.gas_limit);
        stream.append(&self.to.as_bytes().to_vec());
        stream.append(&self.value);
        stream.append(&self.data);
    }

    /// RLP of `[nonce, gasPrice, gas, to, value, data, chainId, 0, 0]`.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&self.chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        stream.out().to_vec()
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&self.signing_payload())
    }

    /// Encode with a signature; `v = chainId * 2 + 35 + recovery_id`.
    pub fn encode_signed(&self, signature: &RecoverableSignature) -> Vec<u8> {
        let v = self.chain_id * 2 + 35 + u64::from(signature.recovery_id);
        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&v);
        stream.append(&trim_leading_zeros(&signature.r));
        stream.append(&trim_leading_zeros(&signature.s));
        stream.out().to_vec()
    }

    /// Sign with the verifier key, returning the raw transaction and its hash.
    pub fn sign(&self, key: &VerifierKey) -> Result<(Vec<u8>, TxHash), CryptoError> {
        let signature = key.sign_digest(&self.signing_hash())?;
        let raw = self.encode_signed(&signature);
        let hash = TxHash::new(keccak256(&raw));
        Ok((raw, hash))
    }
}

// RLP integers carry no leading zero bytes.
fn trim_leading_zeros(word: &[u8; 32]) -> Vec<u8> {
    let start = word.iter().position(|b| *b != 0).unwrap_or(word.len());
    word[start..].to_vec()
}
