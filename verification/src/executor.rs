//! Settlement of verified claims.

use landgrab_ledger::{ClaimSettlement, LedgerError, ParcelLedger};
use landgrab_types::{DomainEvent, TokenId, TxHash};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The settlement was mined. `token_id` is taken from the receipt's
    /// `LandClaimed` log when present.
    Settled { tx_hash: TxHash, token_id: Option<TokenId> },
    /// The request was no longer settleable; nothing was sent.
    Stale { reason: String },
}

/// Submits `claimLandAfterVerification` for verified requests.
///
/// Immediately before submitting, the market's record of the request and
/// the parcel's claim flag are read again. A request that has gone or a
/// parcel that is already claimed ends as [`ClaimOutcome::Stale`] with no
/// transaction sent, which makes repeated settlement of the same request
/// harmless.
pub struct ClaimExecutor {
    ledger: Arc<dyn ParcelLedger>,
}

impl ClaimExecutor {
    pub fn new(ledger: Arc<dyn ParcelLedger>) -> Self {
        Self { ledger }
    }

    pub async fn execute(&self, claim: &ClaimSettlement) -> Result<ClaimOutcome, LedgerError> {
        let request_id = claim.request_id;
        match self.ledger.pending_request(request_id).await? {
            None => {
                info!(%request_id, code = %claim.code, "request no longer pending, skipping settlement");
                return Ok(ClaimOutcome::Stale {
                    reason: "request no longer pending".into(),
                });
            }
            Some(pending) if pending.user != claim.user || pending.code != claim.code.as_str() => {
                warn!(%request_id, pending_user = %pending.user, pending_code = %pending.code, "pending request does not match event");
                return Ok(ClaimOutcome::Stale {
                    reason: "pending request does not match".into(),
                });
            }
            Some(_) => {}
        }
        if self.ledger.is_claimed(&claim.code).await? {
            info!(%request_id, code = %claim.code, "parcel already claimed, skipping settlement");
            return Ok(ClaimOutcome::Stale {
                reason: "parcel already claimed".into(),
            });
        }

        let tx = self.ledger.submit_claim_settlement(claim).await?;
        info!(%request_id, tx_hash = %tx.tx_hash, user = %claim.user, code = %claim.code, "settlement submitted");
        let receipt = self.ledger.wait_for_receipt(&tx).await?;
        let token_id = receipt.events().into_iter().find_map(|e| match e.event {
            DomainEvent::LandClaimed { token_id, code, .. } if code == claim.code.as_str() => Some(token_id),
            _ => None,
        });
        Ok(ClaimOutcome::Settled {
            tx_hash: tx.tx_hash,
            token_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landgrab_nullables::NullLedger;
    use landgrab_types::{Address, Coordinates, GeoCode, RequestId};

    fn user() -> Address {
        Address::new([0x42; 20])
    }

    fn claim(id: &str) -> ClaimSettlement {
        ClaimSettlement {
            request_id: RequestId::parse(id).unwrap(),
            code: GeoCode::parse("filled.count.soap").unwrap(),
            coordinates: Coordinates::new(51.5074, -0.1278),
            user: user(),
        }
    }

    #[tokio::test]
    async fn settles_pending_request() {
        let ledger = Arc::new(NullLedger::new());
        ledger.set_next_token_id(7);
        ledger.request_verification(RequestId::parse("0xabc").unwrap(), user(), "filled.count.soap");
        let executor = ClaimExecutor::new(ledger.clone());

        let outcome = executor.execute(&claim("0xabc")).await.unwrap();
        assert!(matches!(
            outcome,
            ClaimOutcome::Settled { token_id: Some(t), .. } if t == TokenId::new(7)
        ));
        assert_eq!(ledger.settlements(), 1);
    }

    #[tokio::test]
    async fn repeated_settlement_sends_nothing() {
        let ledger = Arc::new(NullLedger::new());
        ledger.request_verification(RequestId::parse("0xabc").unwrap(), user(), "filled.count.soap");
        let executor = ClaimExecutor::new(ledger.clone());

        executor.execute(&claim("0xabc")).await.unwrap();
        let second = executor.execute(&claim("0xabc")).await.unwrap();
        assert!(matches!(second, ClaimOutcome::Stale { .. }));
        assert_eq!(ledger.settlements(), 1);
    }

    #[tokio::test]
    async fn claimed_parcel_is_stale() {
        let ledger = Arc::new(NullLedger::new());
        ledger.request_verification(RequestId::parse("0x1").unwrap(), user(), "filled.count.soap");
        ledger.mint("filled.count.soap", Address::new([0x99; 20]));
        let executor = ClaimExecutor::new(ledger.clone());

        let outcome = executor.execute(&claim("0x1")).await.unwrap();
        assert_eq!(
            outcome,
            ClaimOutcome::Stale {
                reason: "parcel already claimed".into()
            }
        );
        assert_eq!(ledger.settlements(), 0);
    }

    #[tokio::test]
    async fn revert_is_surfaced() {
        let ledger = Arc::new(NullLedger::new());
        ledger.request_verification(RequestId::parse("0x2").unwrap(), user(), "filled.count.soap");
        ledger.revert_next_write("Location invalid");
        let executor = ClaimExecutor::new(ledger.clone());

        let err = executor.execute(&claim("0x2")).await.unwrap_err();
        assert!(matches!(err, LedgerError::Revert { ref reason } if reason == "Location invalid"));
    }
}
