//! Top-level error type shared across crates.

use thiserror::Error;

/// Parsing and invariant errors for the core data model.
#[derive(Debug, Error)]
pub enum LandgrabError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid geocode {0:?}: expected word.word.word in lowercase")]
    InvalidGeoCode(String),

    #[error("invalid hex value: {0}")]
    InvalidHex(String),

    #[error("value does not fit in a token id: {0}")]
    TokenIdOverflow(String),

    #[error("invalid token metadata: {0}")]
    InvalidMetadata(String),

    #[error("invalid status transition for request {request_id}: {from:?} -> {to:?}")]
    InvalidTransition {
        request_id: String,
        from: crate::RequestStatus,
        to: crate::RequestStatus,
    },
}

/// Failure taxonomy shared by the oracle and ledger crates. Callers decide
/// retry versus terminal handling from the kind, never from message text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network or RPC failure; reads and simulations may be retried.
    Transport,
    /// Oracle billing or rate-limit terminal condition.
    Quota,
    /// The ledger rejected the call.
    Revert,
    /// The request no longer exists on the ledger; a benign no-op.
    StaleRequest,
    /// Missing or invalid configuration.
    Config,
    Other,
}
