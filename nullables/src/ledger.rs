//! Nullable contract ledger: the three contracts simulated in memory.
//!
//! Writes behave like a simulated-then-mined transaction. A write the
//! contracts would reject returns [`LedgerError::Revert`] and changes
//! nothing; an accepted one applies immediately, records a receipt and
//! emits its event, optionally into a [`NullEventTransport`].

use async_trait::async_trait;
use landgrab_ledger::{
    encode_log, ClaimSettlement, ContractAddresses, LedgerError, ParcelLedger, PendingRequest, PendingTx,
    SwapOrder, TransactionReceipt,
};
use landgrab_types::{
    Address, ChainEvent, DomainEvent, EventId, GeoCode, ParcelAttribute, ParcelMetadata, ProposalId, RequestId,
    TokenId, TxHash,
};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::events::NullEventTransport;
use crate::lock;

/// A write that was accepted and "mined".
#[derive(Clone, Debug, PartialEq)]
pub enum Submission {
    Claim(ClaimSettlement),
    Release(GeoCode),
    Swap(SwapOrder),
}

struct Token {
    code: String,
    owner: Address,
    uri: String,
}

struct LedgerState {
    tokens: BTreeMap<TokenId, Token>,
    by_code: HashMap<String, TokenId>,
    requests: HashMap<RequestId, PendingRequest>,
    receipts: HashMap<TxHash, TransactionReceipt>,
    submissions: Vec<Submission>,
    emitted: Vec<ChainEvent>,
    next_token_id: u128,
    next_tx: u64,
    next_proposal: u64,
    block: u64,
    revert_next: Option<String>,
    lose_next: bool,
    lost: Vec<TxHash>,
    failing_reads: u32,
    reads: u64,
    signer: bool,
}

pub struct NullLedger {
    contracts: ContractAddresses,
    state: Mutex<LedgerState>,
    events: Option<Arc<NullEventTransport>>,
}

impl Default for NullLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl NullLedger {
    pub fn new() -> Self {
        Self {
            contracts: ContractAddresses {
                land_token: Address::new([0x10; 20]),
                land_market: Address::new([0x20; 20]),
                land_swap: Address::new([0x30; 20]),
            },
            state: Mutex::new(LedgerState {
                tokens: BTreeMap::new(),
                by_code: HashMap::new(),
                requests: HashMap::new(),
                receipts: HashMap::new(),
                submissions: Vec::new(),
                emitted: Vec::new(),
                next_token_id: 1,
                next_tx: 1,
                next_proposal: 1,
                block: 1,
                revert_next: None,
                lose_next: false,
                lost: Vec::new(),
                failing_reads: 0,
                reads: 0,
                signer: true,
            }),
            events: None,
        }
    }

    /// Publish every emitted event to `transport` as a raw log.
    pub fn with_event_stream(mut self, transport: Arc<NullEventTransport>) -> Self {
        self.events = Some(transport);
        self
    }

    pub fn contracts(&self) -> ContractAddresses {
        self.contracts.clone()
    }

    pub fn set_next_token_id(&self, id: u128) {
        lock(&self.state).next_token_id = id;
    }

    /// Behave as if no verifier key were configured.
    pub fn without_signer(self) -> Self {
        lock(&self.state).signer = false;
        self
    }

    /// The next write reverts with `reason`.
    pub fn revert_next_write(&self, reason: &str) {
        lock(&self.state).revert_next = Some(reason.to_string());
    }

    /// The next write is broadcast but its receipt never appears.
    pub fn lose_next_receipt(&self) {
        lock(&self.state).lose_next = true;
    }

    /// The next `n` reads fail at the transport.
    pub fn fail_next_reads(&self, n: u32) {
        lock(&self.state).failing_reads = n;
    }

    /// A user calls `requestVerification`: the market records the request
    /// and emits `VerificationRequested`.
    pub fn request_verification(&self, request_id: RequestId, user: Address, code: &str) -> ChainEvent {
        let event = DomainEvent::VerificationRequested {
            request_id,
            user,
            code: code.to_string(),
        };
        let mut state = lock(&self.state);
        state.requests.insert(
            request_id,
            PendingRequest {
                user,
                code: code.to_string(),
            },
        );
        let (_, chain_event) = self.emit(&mut state, self.contracts.land_market, event);
        chain_event
    }

    /// Settle `request_id` as another process would have.
    pub fn forget_request(&self, request_id: RequestId) {
        lock(&self.state).requests.remove(&request_id);
    }

    /// Mint a parcel directly, bypassing the market.
    pub fn mint(&self, code: &str, owner: Address) -> TokenId {
        let mut state = lock(&self.state);
        Self::mint_locked(&mut state, code, owner, None)
    }

    pub fn submissions(&self) -> Vec<Submission> {
        lock(&self.state).submissions.clone()
    }

    pub fn settlements(&self) -> usize {
        lock(&self.state)
            .submissions
            .iter()
            .filter(|s| matches!(s, Submission::Claim(_)))
            .count()
    }

    pub fn emitted(&self) -> Vec<ChainEvent> {
        lock(&self.state).emitted.clone()
    }

    pub fn reads(&self) -> u64 {
        lock(&self.state).reads
    }

    fn mint_locked(state: &mut LedgerState, code: &str, owner: Address, at: Option<(f64, f64)>) -> TokenId {
        let token_id = TokenId::new(state.next_token_id);
        state.next_token_id += 1;
        let mut attributes = vec![ParcelAttribute {
            trait_type: "what3words".into(),
            value: json!(code),
        }];
        if let Some((lat, lng)) = at {
            attributes.push(ParcelAttribute {
                trait_type: "latitude".into(),
                value: json!(lat.to_string()),
            });
            attributes.push(ParcelAttribute {
                trait_type: "longitude".into(),
                value: json!(lng.to_string()),
            });
        }
        let metadata = ParcelMetadata {
            name: format!("Land #{token_id}"),
            description: format!("LandGrab parcel at {code}"),
            attributes,
        };
        state.tokens.insert(
            token_id,
            Token {
                code: code.to_string(),
                owner,
                uri: metadata.to_token_uri(),
            },
        );
        state.by_code.insert(code.to_string(), token_id);
        token_id
    }

    fn emit(&self, state: &mut LedgerState, emitter: Address, event: DomainEvent) -> (TxHash, ChainEvent) {
        let tx_hash = Self::next_hash(state);
        let chain_event = ChainEvent {
            id: EventId { tx_hash, log_index: 0 },
            block_number: state.block,
            event,
        };
        state.block += 1;
        state.emitted.push(chain_event.clone());
        if let Some(events) = &self.events {
            events.push_event(emitter, &chain_event);
        }
        (tx_hash, chain_event)
    }

    fn next_hash(state: &mut LedgerState) -> TxHash {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&state.next_tx.to_be_bytes());
        state.next_tx += 1;
        TxHash::new(bytes)
    }

    fn read(&self) -> Result<std::sync::MutexGuard<'_, LedgerState>, LedgerError> {
        let mut state = lock(&self.state);
        state.reads += 1;
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(LedgerError::Transport("connection reset".into()));
        }
        Ok(state)
    }

    /// Signer and scripted-revert checks shared by every write.
    fn begin_write(state: &mut LedgerState) -> Result<(), LedgerError> {
        if !state.signer {
            return Err(LedgerError::MissingSigner);
        }
        if let Some(reason) = state.revert_next.take() {
            return Err(LedgerError::Revert { reason });
        }
        Ok(())
    }

    fn finish_write(
        &self,
        state: &mut LedgerState,
        submission: Submission,
        emitter: Address,
        event: DomainEvent,
    ) -> PendingTx {
        state.submissions.push(submission);
        let (tx_hash, chain_event) = self.emit(state, emitter, event);
        let receipt = TransactionReceipt {
            transaction_hash: tx_hash,
            block_number: Some(chain_event.block_number),
            status: 1,
            gas_used: 21_000,
            logs: vec![encode_log(emitter, &chain_event)],
        };
        if std::mem::take(&mut state.lose_next) {
            state.lost.push(tx_hash);
        } else {
            state.receipts.insert(tx_hash, receipt);
        }
        PendingTx { tx_hash }
    }

    fn revert(reason: &str) -> LedgerError {
        LedgerError::Revert {
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl ParcelLedger for NullLedger {
    async fn is_claimed(&self, code: &GeoCode) -> Result<bool, LedgerError> {
        Ok(self.read()?.by_code.contains_key(code.as_str()))
    }

    async fn token_id_for(&self, code: &GeoCode) -> Result<TokenId, LedgerError> {
        Ok(self
            .read()?
            .by_code
            .get(code.as_str())
            .copied()
            .unwrap_or(TokenId::new(0)))
    }

    async fn owner_of(&self, token_id: TokenId) -> Result<Address, LedgerError> {
        self.read()?
            .tokens
            .get(&token_id)
            .map(|t| t.owner)
            .ok_or_else(|| Self::revert("ERC721: invalid token ID"))
    }

    async fn get_code(&self, token_id: TokenId) -> Result<String, LedgerError> {
        self.read()?
            .tokens
            .get(&token_id)
            .map(|t| t.code.clone())
            .ok_or_else(|| Self::revert("ERC721: invalid token ID"))
    }

    async fn token_uri(&self, token_id: TokenId) -> Result<String, LedgerError> {
        self.read()?
            .tokens
            .get(&token_id)
            .map(|t| t.uri.clone())
            .ok_or_else(|| Self::revert("ERC721: invalid token ID"))
    }

    async fn balance_of(&self, owner: Address) -> Result<u64, LedgerError> {
        Ok(self.read()?.tokens.values().filter(|t| t.owner == owner).count() as u64)
    }

    async fn token_of_owner_by_index(&self, owner: Address, index: u64) -> Result<TokenId, LedgerError> {
        let state = self.read()?;
        let index = usize::try_from(index).map_err(|_| Self::revert("owner index out of bounds"))?;
        state
            .tokens
            .iter()
            .filter(|(_, t)| t.owner == owner)
            .map(|(id, _)| *id)
            .nth(index)
            .ok_or_else(|| Self::revert("owner index out of bounds"))
    }

    async fn pending_request(&self, request_id: RequestId) -> Result<Option<PendingRequest>, LedgerError> {
        Ok(self.read()?.requests.get(&request_id).cloned())
    }

    async fn submit_claim_settlement(&self, claim: &ClaimSettlement) -> Result<PendingTx, LedgerError> {
        let mut state = lock(&self.state);
        Self::begin_write(&mut state)?;
        let request = state
            .requests
            .get(&claim.request_id)
            .cloned()
            .ok_or_else(|| Self::revert("Request does not exist"))?;
        if request.user != claim.user || request.code != claim.code.as_str() {
            return Err(Self::revert("Request does not match"));
        }
        if state.by_code.contains_key(claim.code.as_str()) {
            return Err(Self::revert("Land already claimed"));
        }
        state.requests.remove(&claim.request_id);
        let at = (claim.coordinates.lat, claim.coordinates.lng);
        let token_id = Self::mint_locked(&mut state, claim.code.as_str(), claim.user, Some(at));
        let event = DomainEvent::LandClaimed {
            owner: claim.user,
            token_id,
            code: claim.code.to_string(),
        };
        Ok(self.finish_write(&mut state, Submission::Claim(claim.clone()), self.contracts.land_market, event))
    }

    async fn submit_release(&self, code: &GeoCode) -> Result<PendingTx, LedgerError> {
        let mut state = lock(&self.state);
        Self::begin_write(&mut state)?;
        let token_id = state
            .by_code
            .remove(code.as_str())
            .ok_or_else(|| Self::revert("Land not claimed"))?;
        let owner = state.tokens.remove(&token_id).map(|t| t.owner).unwrap_or(Address::ZERO);
        let event = DomainEvent::LandReleased {
            owner,
            token_id,
            code: code.to_string(),
        };
        Ok(self.finish_write(&mut state, Submission::Release(code.clone()), self.contracts.land_market, event))
    }

    async fn submit_swap_proposal(&self, order: &SwapOrder) -> Result<PendingTx, LedgerError> {
        let mut state = lock(&self.state);
        Self::begin_write(&mut state)?;
        let proposer_token_id = *state
            .by_code
            .get(order.proposer_code.as_str())
            .ok_or_else(|| Self::revert("Proposer land not claimed"))?;
        let receiver_token_id = *state
            .by_code
            .get(order.receiver_code.as_str())
            .ok_or_else(|| Self::revert("Receiver land not claimed"))?;
        let receiver_owner = state.tokens.get(&receiver_token_id).map(|t| t.owner);
        if receiver_owner != Some(order.receiver) {
            return Err(Self::revert("Receiver does not own land"));
        }
        let proposer = state
            .tokens
            .get(&proposer_token_id)
            .map(|t| t.owner)
            .unwrap_or(Address::ZERO);
        let mut id = [0u8; 32];
        id[24..].copy_from_slice(&state.next_proposal.to_be_bytes());
        state.next_proposal += 1;
        let event = DomainEvent::SwapProposed {
            proposal_id: ProposalId::new(id),
            proposer,
            proposer_token_id,
            receiver: order.receiver,
            receiver_token_id,
        };
        Ok(self.finish_write(&mut state, Submission::Swap(order.clone()), self.contracts.land_swap, event))
    }

    async fn wait_for_receipt(&self, tx: &PendingTx) -> Result<TransactionReceipt, LedgerError> {
        let state = lock(&self.state);
        if state.lost.contains(&tx.tx_hash) {
            return Err(LedgerError::ReceiptTimeout {
                tx_hash: tx.tx_hash,
                polls: 1,
            });
        }
        state
            .receipts
            .get(&tx.tx_hash)
            .cloned()
            .ok_or_else(|| LedgerError::Rpc {
                code: -32000,
                message: format!("unknown transaction {}", tx.tx_hash),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landgrab_types::{Coordinates, EventKind};

    fn user() -> Address {
        Address::new([0xaa; 20])
    }

    fn settlement(request_id: RequestId) -> ClaimSettlement {
        ClaimSettlement {
            request_id,
            code: GeoCode::parse("filled.count.soap").unwrap(),
            coordinates: Coordinates::new(51.5, -0.12),
            user: user(),
        }
    }

    #[tokio::test]
    async fn settlement_mints_and_consumes_request() {
        let ledger = NullLedger::new();
        ledger.set_next_token_id(7);
        let id = RequestId::parse("0xabc").unwrap();
        ledger.request_verification(id, user(), "filled.count.soap");

        let tx = ledger.submit_claim_settlement(&settlement(id)).await.unwrap();
        let receipt = ledger.wait_for_receipt(&tx).await.unwrap();
        assert_eq!(receipt.events()[0].event.kind(), EventKind::LandClaimed);

        let code = GeoCode::parse("filled.count.soap").unwrap();
        assert!(ledger.is_claimed(&code).await.unwrap());
        assert_eq!(ledger.token_id_for(&code).await.unwrap(), TokenId::new(7));
        assert_eq!(ledger.owner_of(TokenId::new(7)).await.unwrap(), user());
        assert!(ledger.pending_request(id).await.unwrap().is_none());

        let uri = ledger.token_uri(TokenId::new(7)).await.unwrap();
        let metadata = ParcelMetadata::from_token_uri(&uri).unwrap();
        assert_eq!(metadata.latitude(), Some(51.5));
    }

    #[tokio::test]
    async fn second_settlement_reverts() {
        let ledger = NullLedger::new();
        let id = RequestId::parse("0x1").unwrap();
        ledger.request_verification(id, user(), "filled.count.soap");
        ledger.submit_claim_settlement(&settlement(id)).await.unwrap();
        let err = ledger.submit_claim_settlement(&settlement(id)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Revert { .. }));
        assert_eq!(ledger.settlements(), 1);
    }

    #[tokio::test]
    async fn scripted_failures_apply_once() {
        let ledger = NullLedger::new();
        ledger.fail_next_reads(1);
        let code = GeoCode::parse("filled.count.soap").unwrap();
        assert!(ledger.is_claimed(&code).await.unwrap_err().is_transport());
        assert!(!ledger.is_claimed(&code).await.unwrap());

        let id = RequestId::parse("0x2").unwrap();
        ledger.request_verification(id, user(), "filled.count.soap");
        ledger.revert_next_write("paused");
        assert!(ledger.submit_claim_settlement(&settlement(id)).await.is_err());
        assert!(ledger.submit_claim_settlement(&settlement(id)).await.is_ok());
    }

    #[tokio::test]
    async fn enumerates_by_owner() {
        let ledger = NullLedger::new();
        ledger.mint("one.two.three", user());
        ledger.mint("four.five.six", Address::new([0xbb; 20]));
        ledger.mint("seven.eight.nine", user());
        let parcels = ledger.enumerate_parcels(user()).await.unwrap();
        let codes: Vec<_> = parcels.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["one.two.three", "seven.eight.nine"]);
    }
}
