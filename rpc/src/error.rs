//! Failure categories returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use landgrab_geofence::GeofenceError;
use landgrab_types::ErrorKind;
use landgrab_verification::VerificationError;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    InvalidRequest,
    NotFound,
    InvalidState,
    ConfigError,
    QuotaError,
    TransactionFailed,
    GenericFailure,
}

impl ErrorCategory {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCategory::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorCategory::NotFound => StatusCode::NOT_FOUND,
            ErrorCategory::InvalidState => StatusCode::CONFLICT,
            ErrorCategory::ConfigError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCategory::QuotaError => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCategory::TransactionFailed => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCategory::GenericFailure => StatusCode::BAD_GATEWAY,
        }
    }

    fn from_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Config => ErrorCategory::ConfigError,
            ErrorKind::Quota => ErrorCategory::QuotaError,
            ErrorKind::Revert | ErrorKind::StaleRequest => ErrorCategory::TransactionFailed,
            ErrorKind::Transport | ErrorKind::Other => ErrorCategory::GenericFailure,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Geofence(#[from] GeofenceError),

    #[error("metrics encoding failed: {0}")]
    Metrics(String),
}

impl ApiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::InvalidRequest(_) => ErrorCategory::InvalidRequest,
            ApiError::Verification(e) => match e {
                VerificationError::InvalidCode(_)
                | VerificationError::MissingSender
                | VerificationError::OwnershipMismatch { .. } => ErrorCategory::InvalidRequest,
                VerificationError::UnknownRequest(_) => ErrorCategory::NotFound,
                VerificationError::InvalidTransition(_) => ErrorCategory::InvalidState,
                VerificationError::Geofence(g) => Self::geofence_category(g),
                VerificationError::Ledger(l) => ErrorCategory::from_kind(l.kind()),
            },
            ApiError::Geofence(g) => Self::geofence_category(g),
            ApiError::Metrics(_) => ErrorCategory::GenericFailure,
        }
    }

    fn geofence_category(error: &GeofenceError) -> ErrorCategory {
        match error {
            GeofenceError::InvalidCode(_) => ErrorCategory::InvalidRequest,
            other => ErrorCategory::from_kind(other.kind()),
        }
    }

    /// Text safe to hand to a client.
    fn public_message(&self) -> String {
        match self.category() {
            ErrorCategory::InvalidRequest | ErrorCategory::NotFound | ErrorCategory::InvalidState => self.to_string(),
            ErrorCategory::TransactionFailed => match self {
                ApiError::Verification(VerificationError::Ledger(l)) => l.to_string(),
                _ => "transaction failed".into(),
            },
            ErrorCategory::ConfigError => "service is not configured for this operation".into(),
            ErrorCategory::QuotaError => "geocoding quota exhausted, try again later".into(),
            ErrorCategory::GenericFailure => "upstream service failure".into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let category = self.category();
        if category.status().is_server_error() {
            warn!(error = %self, ?category, "request failed");
        }
        (
            category.status(),
            Json(serde_json::json!({
                "success": false,
                "error": category,
                "message": self.public_message(),
            })),
        )
            .into_response()
    }
}
