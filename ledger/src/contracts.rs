//! Contract addresses, function signatures and event decoding.

use landgrab_crypto::event_topic;
use landgrab_types::{Address, ChainEvent, DomainEvent, EventKind, ProposalId, RequestId, TokenId};
use serde::{Deserialize, Serialize};

use crate::abi;
use crate::error::LedgerError;
use crate::log::{LogFilter, RawLog};

/// Deployed addresses of the three contracts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub land_token: Address,
    pub land_market: Address,
    pub land_swap: Address,
}

impl ContractAddresses {
    pub fn all(&self) -> [Address; 3] {
        [self.land_token, self.land_market, self.land_swap]
    }
}

/// Canonical function signatures.
pub mod functions {
    // LandToken
    pub const IS_LAND_CLAIMED: &str = "isLandClaimed(string)";
    pub const GET_TOKEN_ID: &str = "getTokenId(string)";
    pub const OWNER_OF: &str = "ownerOf(uint256)";
    pub const TOKEN_URI: &str = "tokenURI(uint256)";
    pub const BALANCE_OF: &str = "balanceOf(address)";
    pub const TOKEN_OF_OWNER_BY_INDEX: &str = "tokenOfOwnerByIndex(address,uint256)";
    pub const GET_WHAT3WORDS: &str = "getWhat3Words(uint256)";

    // LandMarket
    pub const VERIFICATION_REQUESTS: &str = "verificationRequests(bytes32)";
    pub const CLAIM_AFTER_VERIFICATION: &str =
        "claimLandAfterVerification(bytes32,string,string,string,address)";
    pub const RELEASE_LAND: &str = "releaseLand(string)";

    // LandSwap
    pub const PROPOSE_SWAP: &str = "proposeSwap(string,address,string)";
}

pub fn event_signature(kind: EventKind) -> &'static str {
    match kind {
        EventKind::VerificationRequested => "VerificationRequested(bytes32,address,string)",
        EventKind::LandClaimed => "LandClaimed(address,uint256,string)",
        EventKind::LandReleased => "LandReleased(address,uint256,string)",
        EventKind::SwapProposed => "SwapProposed(bytes32,address,uint256,address,uint256)",
        EventKind::SwapAccepted => "SwapAccepted(bytes32)",
    }
}

pub fn topic_for(kind: EventKind) -> [u8; 32] {
    event_topic(event_signature(kind))
}

pub fn kind_for_topic(topic: &[u8; 32]) -> Option<EventKind> {
    EventKind::ALL.into_iter().find(|k| topic_for(*k) == *topic)
}

/// Filter matching every contract and the given event kinds.
pub fn log_filter(contracts: &ContractAddresses, kinds: &[EventKind]) -> LogFilter {
    LogFilter {
        addresses: contracts.all().to_vec(),
        topic0: kinds.iter().map(|k| topic_for(*k)).collect(),
    }
}

fn topic(log: &RawLog, index: usize) -> Result<&[u8; 32], LedgerError> {
    log.topics
        .get(index)
        .ok_or_else(|| LedgerError::Decode(format!("log is missing topic {index}")))
}

/// Decode a raw log. Logs with an unknown topic 0 yield `Ok(None)`.
pub fn decode_log(log: &RawLog) -> Result<Option<ChainEvent>, LedgerError> {
    let Some(kind) = log.topics.first().and_then(kind_for_topic) else {
        return Ok(None);
    };

    let event = match kind {
        EventKind::VerificationRequested => DomainEvent::VerificationRequested {
            request_id: RequestId::new(*topic(log, 1)?),
            user: Address::from_word(topic(log, 2)?),
            code: abi::decode_string(&log.data, 0)?,
        },
        EventKind::LandClaimed => DomainEvent::LandClaimed {
            owner: Address::from_word(topic(log, 1)?),
            token_id: TokenId::from_word(topic(log, 2)?)?,
            code: abi::decode_string(&log.data, 0)?,
        },
        EventKind::LandReleased => DomainEvent::LandReleased {
            owner: Address::from_word(topic(log, 1)?),
            token_id: TokenId::from_word(topic(log, 2)?)?,
            code: abi::decode_string(&log.data, 0)?,
        },
        EventKind::SwapProposed => DomainEvent::SwapProposed {
            proposal_id: ProposalId::new(*topic(log, 1)?),
            proposer: Address::from_word(topic(log, 2)?),
            proposer_token_id: abi::decode_token_id(&log.data, 0)?,
            receiver: Address::from_word(topic(log, 3)?),
            receiver_token_id: abi::decode_token_id(&log.data, 1)?,
        },
        EventKind::SwapAccepted => DomainEvent::SwapAccepted {
            proposal_id: ProposalId::new(*topic(log, 1)?),
        },
    };

    Ok(Some(ChainEvent {
        id: log.id(),
        block_number: log.block_number.unwrap_or_default(),
        event,
    }))
}

/// Build the raw log a contract would emit for `event`. The inverse of
/// [`decode_log`]; used by in-memory ledgers and tests.
pub fn encode_log(emitter: Address, event: &ChainEvent) -> RawLog {
    use abi::Token;

    let (topics, data) = match &event.event {
        DomainEvent::VerificationRequested { request_id, user, code } => (
            vec![*request_id.as_bytes(), user.to_word()],
            abi::encode_args(&[Token::String(code.clone())]),
        ),
        DomainEvent::LandClaimed { owner, token_id, code }
        | DomainEvent::LandReleased { owner, token_id, code } => (
            vec![owner.to_word(), token_id.to_word()],
            abi::encode_args(&[Token::String(code.clone())]),
        ),
        DomainEvent::SwapProposed {
            proposal_id,
            proposer,
            proposer_token_id,
            receiver,
            receiver_token_id,
        } => (
            vec![*proposal_id.as_bytes(), proposer.to_word(), receiver.to_word()],
            abi::encode_args(&[
                Token::Uint(proposer_token_id.value()),
                Token::Uint(receiver_token_id.value()),
            ]),
        ),
        DomainEvent::SwapAccepted { proposal_id } => (vec![*proposal_id.as_bytes()], Vec::new()),
    };

    let mut all_topics = vec![topic_for(event.event.kind())];
    all_topics.extend(topics);
    RawLog {
        address: emitter,
        topics: all_topics,
        data,
        block_number: Some(event.block_number),
        transaction_hash: event.id.tx_hash,
        log_index: event.id.log_index,
        removed: false,
    }
}
