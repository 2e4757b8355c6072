//! Typed access to the parcel contracts.

use async_trait::async_trait;
use futures_util::future::join_all;
use landgrab_types::{Address, Coordinates, GeoCode, Parcel, ParcelMetadata, RequestId, TokenId};
use tracing::{debug, warn};

use crate::error::LedgerError;
use crate::receipt::{PendingTx, TransactionReceipt};

/// A claim request still held by the market contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    pub user: Address,
    pub code: String,
}

/// Arguments of `claimLandAfterVerification`.
#[derive(Clone, Debug, PartialEq)]
pub struct ClaimSettlement {
    pub request_id: RequestId,
    pub code: GeoCode,
    pub coordinates: Coordinates,
    pub user: Address,
}

/// Arguments of `proposeSwap`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapOrder {
    pub proposer_code: GeoCode,
    pub receiver: Address,
    pub receiver_code: GeoCode,
}

/// Queries and writes against the token, market and swap contracts.
///
/// Writes return as soon as the transaction is broadcast; callers await
/// the outcome with [`ParcelLedger::wait_for_receipt`].
#[async_trait]
pub trait ParcelLedger: Send + Sync {
    async fn is_claimed(&self, code: &GeoCode) -> Result<bool, LedgerError>;

    async fn token_id_for(&self, code: &GeoCode) -> Result<TokenId, LedgerError>;

    async fn owner_of(&self, token_id: TokenId) -> Result<Address, LedgerError>;

    /// The geocode a token was minted for.
    async fn get_code(&self, token_id: TokenId) -> Result<String, LedgerError>;

    async fn token_uri(&self, token_id: TokenId) -> Result<String, LedgerError>;

    async fn balance_of(&self, owner: Address) -> Result<u64, LedgerError>;

    async fn token_of_owner_by_index(&self, owner: Address, index: u64) -> Result<TokenId, LedgerError>;

    /// The market's record for `request_id`, or `None` once it has been
    /// settled or never existed.
    async fn pending_request(&self, request_id: RequestId) -> Result<Option<PendingRequest>, LedgerError>;

    async fn submit_claim_settlement(&self, claim: &ClaimSettlement) -> Result<PendingTx, LedgerError>;

    async fn submit_release(&self, code: &GeoCode) -> Result<PendingTx, LedgerError>;

    async fn submit_swap_proposal(&self, order: &SwapOrder) -> Result<PendingTx, LedgerError>;

    /// Wait until `tx` is mined. A mined-but-reverted transaction is a
    /// [`LedgerError::Revert`].
    async fn wait_for_receipt(&self, tx: &PendingTx) -> Result<TransactionReceipt, LedgerError>;

    /// Every parcel held by `owner`. Indices are looked up concurrently; an
    /// index that fails is logged and left out.
    async fn enumerate_parcels(&self, owner: Address) -> Result<Vec<Parcel>, LedgerError> {
        let balance = self.balance_of(owner).await?;
        debug!(%owner, balance, "enumerating parcels");
        if balance == 0 {
            return Ok(Vec::new());
        }

        let lookups = (0..balance).map(|index| async move {
            let token_id = self.token_of_owner_by_index(owner, index).await?;
            let code = self.get_code(token_id).await?;
            let uri = self.token_uri(token_id).await?;
            let metadata = match ParcelMetadata::from_token_uri(&uri) {
                Ok(m) => Some(m),
                Err(e) => {
                    debug!(%token_id, error = %e, "token metadata not decodable");
                    None
                }
            };
            Ok::<_, LedgerError>(Parcel {
                token_id,
                code,
                owner,
                metadata,
            })
        });

        let parcels = join_all(lookups)
            .await
            .into_iter()
            .enumerate()
            .filter_map(|(index, result)| match result {
                Ok(parcel) => Some(parcel),
                Err(e) => {
                    warn!(%owner, index, error = %e, "failed to fetch parcel, skipping");
                    None
                }
            })
            .collect();
        Ok(parcels)
    }
}
