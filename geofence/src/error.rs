use landgrab_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeofenceError {
    #[error("geocoding quota exceeded or payment required: {0}")]
    Quota(String),

    #[error("geocoding service still rate limiting after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("geocoding API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("geocoding service unreachable: {0}")]
    Transport(String),

    #[error("invalid response from geocoding service: {0}")]
    InvalidResponse(String),

    #[error("invalid geocode: {0}")]
    InvalidCode(String),
}

impl GeofenceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GeofenceError::Quota(_) | GeofenceError::RateLimited { .. } => ErrorKind::Quota,
            GeofenceError::Transport(_) => ErrorKind::Transport,
            GeofenceError::Api { .. }
            | GeofenceError::InvalidResponse(_)
            | GeofenceError::InvalidCode(_) => ErrorKind::Other,
        }
    }
}
