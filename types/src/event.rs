//! Domain events decoded from the ledger's log.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Address, ProposalId, RequestId, TokenId, TxHash};

/// Event kinds the pipeline subscribes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    VerificationRequested,
    LandClaimed,
    LandReleased,
    SwapProposed,
    SwapAccepted,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::VerificationRequested,
        EventKind::LandClaimed,
        EventKind::LandReleased,
        EventKind::SwapProposed,
        EventKind::SwapAccepted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::VerificationRequested => "VerificationRequested",
            EventKind::LandClaimed => "LandClaimed",
            EventKind::LandReleased => "LandReleased",
            EventKind::SwapProposed => "SwapProposed",
            EventKind::SwapAccepted => "SwapAccepted",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A settlement-relevant event emitted by one of the three contracts.
///
/// The code carried by events is kept as the raw on-chain string: the ledger
/// accepted it, so the pipeline reports it as-is and only validates it when
/// feeding it back into a write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    VerificationRequested {
        request_id: RequestId,
        user: Address,
        code: String,
    },
    LandClaimed {
        owner: Address,
        token_id: TokenId,
        code: String,
    },
    LandReleased {
        owner: Address,
        token_id: TokenId,
        code: String,
    },
    SwapProposed {
        proposal_id: ProposalId,
        proposer: Address,
        proposer_token_id: TokenId,
        receiver: Address,
        receiver_token_id: TokenId,
    },
    SwapAccepted {
        proposal_id: ProposalId,
    },
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::VerificationRequested { .. } => EventKind::VerificationRequested,
            DomainEvent::LandClaimed { .. } => EventKind::LandClaimed,
            DomainEvent::LandReleased { .. } => EventKind::LandReleased,
            DomainEvent::SwapProposed { .. } => EventKind::SwapProposed,
            DomainEvent::SwapAccepted { .. } => EventKind::SwapAccepted,
        }
    }
}

/// Identity of a log entry: the transaction that emitted it and its index
/// within the block. Two deliveries with the same id are the same event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    pub tx_hash: TxHash,
    pub log_index: u64,
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_hash, self.log_index)
    }
}

/// A decoded event together with where it was observed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEvent {
    pub id: EventId,
    pub block_number: u64,
    pub event: DomainEvent,
}
