use landgrab_types::{ErrorKind, TxHash};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger transport error: {0}")]
    Transport(String),

    #[error("execution reverted: {reason}")]
    Revert { reason: String },

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("no verifier key configured; ledger writes are disabled")]
    MissingSigner,

    #[error("failed to decode ledger data: {0}")]
    Decode(String),

    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("no receipt for {tx_hash} after {polls} polls")]
    ReceiptTimeout { tx_hash: TxHash, polls: u32 },
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Transport(_) | LedgerError::ReceiptTimeout { .. } => ErrorKind::Transport,
            LedgerError::Revert { .. } => ErrorKind::Revert,
            LedgerError::MissingSigner | LedgerError::NotConfigured(_) => ErrorKind::Config,
            LedgerError::Rpc { .. } | LedgerError::Decode(_) => ErrorKind::Other,
        }
    }

    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}

impl From<landgrab_types::LandgrabError> for LedgerError {
    fn from(e: landgrab_types::LandgrabError) -> Self {
        LedgerError::Decode(e.to_string())
    }
}
