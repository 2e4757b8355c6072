//! Read-only parcel queries and user-initiated writes that bypass the
//! verification workflow.

use landgrab_geofence::GeofenceOracle;
use landgrab_ledger::{ParcelLedger, SwapOrder};
use landgrab_types::{Address, Coordinates, DomainEvent, GeoCode, Parcel, ParcelMetadata, ProposalId, TokenId, TxHash};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::VerificationError;

/// Claim state of one geocode. Unclaimed parcels serialize as
/// `{"claimed":false}` and nothing else.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LandInfo {
    pub claimed: bool,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub details: Option<ClaimedLand>,
}

impl LandInfo {
    pub fn unclaimed() -> Self {
        Self {
            claimed: false,
            details: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimedLand {
    pub token_id: TokenId,
    pub owner: Address,
    pub code: String,
    #[serde(rename = "tokenURI")]
    pub token_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_place: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapSubmitted {
    pub tx_hash: TxHash,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal_id: Option<ProposalId>,
}

pub struct ParcelService {
    ledger: Arc<dyn ParcelLedger>,
    oracle: Arc<dyn GeofenceOracle>,
}

fn parse_code(raw: &str) -> Result<GeoCode, VerificationError> {
    GeoCode::parse(raw).map_err(|_| VerificationError::InvalidCode(raw.to_string()))
}

impl ParcelService {
    pub fn new(ledger: Arc<dyn ParcelLedger>, oracle: Arc<dyn GeofenceOracle>) -> Self {
        Self { ledger, oracle }
    }

    /// Ownership and location details for `code`. Location enrichment is
    /// best effort: an oracle failure leaves those fields empty.
    pub async fn land_info(&self, code: &str) -> Result<LandInfo, VerificationError> {
        let code = parse_code(code)?;
        if !self.ledger.is_claimed(&code).await? {
            return Ok(LandInfo::unclaimed());
        }
        let token_id = self.ledger.token_id_for(&code).await?;
        let owner = self.ledger.owner_of(token_id).await?;
        let token_uri = self.ledger.token_uri(token_id).await?;

        let mut coordinates = ParcelMetadata::from_token_uri(&token_uri)
            .ok()
            .and_then(|m| m.coordinates());
        let (mut country, mut nearest_place) = (None, None);
        match self.oracle.words_to_cell(code.as_str()).await {
            Ok(cell) => {
                coordinates = coordinates.or(Some(cell.centroid()));
                country = Some(cell.country).filter(|c| !c.is_empty());
                nearest_place = Some(cell.nearest_place).filter(|p| !p.is_empty());
            }
            Err(e) => warn!(%code, error = %e, "could not enrich land info"),
        }

        Ok(LandInfo {
            claimed: true,
            details: Some(ClaimedLand {
                token_id,
                owner,
                code: code.to_string(),
                token_uri,
                coordinates,
                country,
                nearest_place,
            }),
        })
    }

    pub async fn user_lands(&self, owner: Address) -> Result<Vec<Parcel>, VerificationError> {
        Ok(self.ledger.enumerate_parcels(owner).await?)
    }

    /// False for unclaimed parcels. Addresses compare by value, so hex case
    /// does not matter.
    pub async fn is_owner(&self, code: &GeoCode, address: Address) -> Result<bool, VerificationError> {
        if !self.ledger.is_claimed(code).await? {
            return Ok(false);
        }
        let token_id = self.ledger.token_id_for(code).await?;
        Ok(self.ledger.owner_of(token_id).await? == address)
    }

    /// Propose swapping `proposer_code` for `receiver_code`. Both parties
    /// must own their parcels now; nothing is sent otherwise.
    pub async fn propose_swap(
        &self,
        proposer: Option<Address>,
        proposer_code: &str,
        receiver: Address,
        receiver_code: &str,
    ) -> Result<SwapSubmitted, VerificationError> {
        let proposer = proposer.ok_or(VerificationError::MissingSender)?;
        let proposer_code = parse_code(proposer_code)?;
        let receiver_code = parse_code(receiver_code)?;

        if !self.is_owner(&proposer_code, proposer).await? {
            return Err(VerificationError::OwnershipMismatch {
                code: proposer_code.to_string(),
                party: proposer.to_string(),
            });
        }
        if !self.is_owner(&receiver_code, receiver).await? {
            return Err(VerificationError::OwnershipMismatch {
                code: receiver_code.to_string(),
                party: receiver.to_string(),
            });
        }

        let order = SwapOrder {
            proposer_code,
            receiver,
            receiver_code,
        };
        debug!(%proposer, %receiver, "ownership confirmed, proposing swap");
        let tx = self.ledger.submit_swap_proposal(&order).await?;
        let receipt = self.ledger.wait_for_receipt(&tx).await?;
        let proposal_id = receipt.events().into_iter().find_map(|e| match e.event {
            DomainEvent::SwapProposed { proposal_id, .. } => Some(proposal_id),
            _ => None,
        });
        info!(tx_hash = %tx.tx_hash, %proposer, %receiver, "swap proposed");
        Ok(SwapSubmitted {
            tx_hash: tx.tx_hash,
            proposal_id,
        })
    }

    pub async fn release(&self, code: &str) -> Result<TxHash, VerificationError> {
        let code = parse_code(code)?;
        let tx = self.ledger.submit_release(&code).await?;
        self.ledger.wait_for_receipt(&tx).await?;
        info!(tx_hash = %tx.tx_hash, %code, "land released");
        Ok(tx.tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landgrab_geofence::MockOracle;
    use landgrab_nullables::NullLedger;

    fn alice() -> Address {
        Address::new([0xa1; 20])
    }

    fn bob() -> Address {
        Address::new([0xb0; 20])
    }

    fn service() -> (Arc<NullLedger>, ParcelService) {
        let ledger = Arc::new(NullLedger::new());
        let service = ParcelService::new(ledger.clone(), Arc::new(MockOracle::new()));
        (ledger, service)
    }

    #[tokio::test]
    async fn unclaimed_land_has_no_details() {
        let (_, service) = service();
        let info = service.land_info("filled.count.soap").await.unwrap();
        assert_eq!(info, LandInfo::unclaimed());
        assert_eq!(serde_json::to_value(&info).unwrap(), serde_json::json!({"claimed": false}));
    }

    #[tokio::test]
    async fn claimed_land_is_enriched() {
        let (ledger, service) = service();
        let token_id = ledger.mint("filled.count.soap", alice());
        let info = service.land_info("filled.count.soap").await.unwrap();
        let details = info.details.unwrap();
        assert!(info.claimed);
        assert_eq!(details.token_id, token_id);
        assert_eq!(details.owner, alice());
        assert_eq!(details.country.as_deref(), Some("US"));
        assert_eq!(details.nearest_place.as_deref(), Some("Mock Location"));
        assert!(details.coordinates.is_some());
    }

    #[tokio::test]
    async fn malformed_code_is_rejected() {
        let (_, service) = service();
        let err = service.land_info("filled.count").await.unwrap_err();
        assert!(matches!(err, VerificationError::InvalidCode(_)));
    }

    #[tokio::test]
    async fn ownership_is_checked() {
        let (ledger, service) = service();
        ledger.mint("one.two.three", alice());
        let code = GeoCode::parse("one.two.three").unwrap();
        assert!(service.is_owner(&code, alice()).await.unwrap());
        assert!(!service.is_owner(&code, bob()).await.unwrap());
        let unclaimed = GeoCode::parse("four.five.six").unwrap();
        assert!(!service.is_owner(&unclaimed, alice()).await.unwrap());
    }

    #[tokio::test]
    async fn swap_requires_receiver_ownership() {
        let (ledger, service) = service();
        ledger.mint("one.two.three", alice());
        ledger.mint("four.five.six", alice());

        let err = service
            .propose_swap(Some(alice()), "one.two.three", bob(), "four.five.six")
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::OwnershipMismatch { ref code, .. } if code == "four.five.six"));
        assert!(ledger.submissions().is_empty());
    }

    #[tokio::test]
    async fn swap_requires_sender() {
        let (_, service) = service();
        let err = service
            .propose_swap(None, "one.two.three", bob(), "four.five.six")
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::MissingSender));
    }

    #[tokio::test]
    async fn valid_swap_is_submitted() {
        let (ledger, service) = service();
        ledger.mint("one.two.three", alice());
        ledger.mint("four.five.six", bob());

        let submitted = service
            .propose_swap(Some(alice()), "one.two.three", bob(), "four.five.six")
            .await
            .unwrap();
        assert!(submitted.proposal_id.is_some());
        assert_eq!(ledger.submissions().len(), 1);
    }

    #[tokio::test]
    async fn release_frees_the_parcel() {
        let (ledger, service) = service();
        ledger.mint("one.two.three", alice());
        service.release("one.two.three").await.unwrap();
        let info = service.land_info("one.two.three").await.unwrap();
        assert!(!info.claimed);
    }
}
