use landgrab_geofence::GeofenceError;
use landgrab_ledger::LedgerError;
use landgrab_types::{ErrorKind, LandgrabError, RequestId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("no verification request {0} is being tracked")]
    UnknownRequest(RequestId),

    #[error(transparent)]
    InvalidTransition(LandgrabError),

    #[error(transparent)]
    Geofence(#[from] GeofenceError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("{party} does not own {code}")]
    OwnershipMismatch { code: String, party: String },

    #[error("a sender address is required")]
    MissingSender,

    #[error("invalid geocode: {0}")]
    InvalidCode(String),
}

impl VerificationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerificationError::Geofence(e) => e.kind(),
            VerificationError::Ledger(e) => e.kind(),
            _ => ErrorKind::Other,
        }
    }
}
