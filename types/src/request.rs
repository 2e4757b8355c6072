//! Verification requests and their lifecycle.

use serde::{Deserialize, Serialize};

use crate::{Address, LandgrabError, RequestId, Timestamp};

/// Lifecycle of a claim request.
///
/// ```text
/// Requested ──► LocationVerified ──► Claimed
///     │  ▲             │
///     ▼  │             ▼
/// LocationRejected ─► Expired
/// ```
///
/// `Claimed` and `Expired` are terminal. A rejected location may be
/// re-asserted, so `LocationRejected` can move to `LocationVerified` or be
/// rejected again. A settlement observed on the ledger can complete a
/// request from any non-terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Requested,
    LocationVerified,
    LocationRejected,
    Claimed,
    Expired,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Claimed | RequestStatus::Expired)
    }

    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        match (self, next) {
            (Requested, LocationVerified | LocationRejected | Claimed | Expired) => true,
            (LocationRejected, LocationVerified | LocationRejected | Claimed | Expired) => true,
            (LocationVerified, Claimed | Expired) => true,
            _ => false,
        }
    }
}

/// An in-flight claim request as held by the verification workflow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub request_id: RequestId,
    pub user: Address,
    pub code: String,
    pub status: RequestStatus,
    /// Failed presence assertions so far.
    pub presence_attempts: u32,
    /// Why the request ended `Expired`, when it did.
    pub failure: Option<String>,
    pub observed_at: Timestamp,
}

impl VerificationRequest {
    pub fn new(request_id: RequestId, user: Address, code: impl Into<String>) -> Self {
        Self {
            request_id,
            user,
            code: code.into(),
            status: RequestStatus::Requested,
            presence_attempts: 0,
            failure: None,
            observed_at: Timestamp::now(),
        }
    }

    /// Move to `next`, rejecting moves the lifecycle does not allow.
    pub fn transition(&mut self, next: RequestStatus) -> Result<RequestStatus, LandgrabError> {
        if !self.status.can_transition_to(next) {
            return Err(LandgrabError::InvalidTransition {
                request_id: self.request_id.to_string(),
                from: self.status,
                to: next,
            });
        }
        let previous = self.status;
        self.status = next;
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequestStatus::*;

    fn request() -> VerificationRequest {
        VerificationRequest::new(RequestId::ZERO, Address::ZERO, "filled.count.soap")
    }

    #[test]
    fn happy_path() {
        let mut r = request();
        assert_eq!(r.transition(LocationVerified).unwrap(), Requested);
        assert_eq!(r.transition(Claimed).unwrap(), LocationVerified);
        assert!(r.status.is_terminal());
    }

    #[test]
    fn rejected_location_can_be_reasserted() {
        let mut r = request();
        r.transition(LocationRejected).unwrap();
        r.transition(LocationRejected).unwrap();
        r.transition(LocationVerified).unwrap();
        assert_eq!(r.status, LocationVerified);
    }

    #[test]
    fn terminal_states_do_not_move() {
        for terminal in [Claimed, Expired] {
            for next in [Requested, LocationVerified, LocationRejected, Claimed, Expired] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn verified_cannot_go_back() {
        let mut r = request();
        r.transition(LocationVerified).unwrap();
        let err = r.transition(LocationRejected).unwrap_err();
        assert!(matches!(err, LandgrabError::InvalidTransition { .. }));
        assert_eq!(r.status, LocationVerified);
    }
}
