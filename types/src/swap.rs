//! Parcel swap proposals.

use serde::{Deserialize, Serialize};

use crate::{Address, ProposalId, TokenId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapStatus {
    Proposed,
    Accepted,
    Rejected,
    Expired,
}

/// A proposed exchange of two parcels. The ledger is the final arbiter;
/// this is the view reconstructed from `SwapProposed`/`SwapAccepted`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapProposal {
    pub proposal_id: ProposalId,
    pub proposer: Address,
    pub proposer_token_id: TokenId,
    pub receiver: Address,
    pub receiver_token_id: TokenId,
    pub status: SwapStatus,
}

impl SwapProposal {
    pub fn accept(&mut self) -> bool {
        if self.status == SwapStatus::Proposed {
            self.status = SwapStatus::Accepted;
            true
        } else {
            false
        }
    }
}
