//! Post-processing hooks for settlement events.
//!
//! Events arrive at least once, so every hook must tolerate seeing the same
//! event again.

use landgrab_types::{ChainEvent, DomainEvent, EventId, EventKind, RollingSet};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &ChainEvent);
}

/// Structured log line per event.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingHook;

impl EventHandler for LoggingHook {
    fn handle(&self, event: &ChainEvent) {
        let id = event.id;
        match &event.event {
            DomainEvent::VerificationRequested { request_id, user, code } => {
                info!(%id, %request_id, %user, %code, "verification requested");
            }
            DomainEvent::LandClaimed { owner, token_id, code } => {
                info!(%id, %owner, %token_id, %code, "land claimed");
            }
            DomainEvent::LandReleased { owner, token_id, code } => {
                info!(%id, %owner, %token_id, %code, "land released");
            }
            DomainEvent::SwapProposed {
                proposal_id,
                proposer,
                proposer_token_id,
                receiver,
                receiver_token_id,
            } => {
                info!(%id, %proposal_id, %proposer, %proposer_token_id, %receiver, %receiver_token_id, "swap proposed");
            }
            DomainEvent::SwapAccepted { proposal_id } => {
                info!(%id, %proposal_id, "swap accepted");
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub id: EventId,
    pub block_number: u64,
    pub kind: EventKind,
}

/// Entries kept by [`AuditTrail::new`].
pub const AUDIT_LIMIT: usize = 4096;

/// Ordered record of the most recent distinct events, one entry per log
/// identity. The oldest entry is evicted once `capacity` is reached.
#[derive(Debug)]
pub struct AuditTrail {
    inner: Mutex<AuditState>,
}

#[derive(Debug)]
struct AuditState {
    seen: RollingSet<EventId>,
    entries: VecDeque<AuditEntry>,
    capacity: usize,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::with_capacity(AUDIT_LIMIT)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(AuditState {
                seen: RollingSet::new(capacity),
                entries: VecDeque::with_capacity(capacity.min(AUDIT_LIMIT)),
                capacity,
            }),
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .cloned()
            .collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler for AuditTrail {
    fn handle(&self, event: &ChainEvent) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if state.seen.insert(event.id) {
            if state.entries.len() == state.capacity {
                state.entries.pop_front();
            }
            state.entries.push_back(AuditEntry {
                id: event.id,
                block_number: event.block_number,
                kind: event.event.kind(),
            });
        }
    }
}

/// Fans each event out to every registered hook, in registration order.
#[derive(Clone, Default)]
pub struct HandlerSet {
    hooks: Vec<Arc<dyn EventHandler>>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hook: Arc<dyn EventHandler>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn dispatch(&self, event: &ChainEvent) {
        for hook in &self.hooks {
            hook.handle(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use landgrab_types::{Address, ProposalId, TokenId, TxHash};

    fn claimed(index: u64) -> ChainEvent {
        ChainEvent {
            id: EventId {
                tx_hash: TxHash::new([1; 32]),
                log_index: index,
            },
            block_number: 10,
            event: DomainEvent::LandClaimed {
                owner: Address::new([2; 20]),
                token_id: TokenId::new(7),
                code: "filled.count.soap".into(),
            },
        }
    }

    #[test]
    fn audit_trail_is_idempotent() {
        let trail = AuditTrail::new();
        trail.handle(&claimed(0));
        trail.handle(&claimed(0));
        trail.handle(&claimed(1));
        assert_eq!(trail.entries().len(), 2);
        assert_eq!(trail.count(EventKind::LandClaimed), 2);
    }

    #[test]
    fn audit_trail_keeps_only_the_newest_entries() {
        let trail = AuditTrail::with_capacity(3);
        for index in 0..5 {
            trail.handle(&claimed(index));
        }
        let kept: Vec<u64> = trail.entries().iter().map(|e| e.id.log_index).collect();
        assert_eq!(kept, vec![2, 3, 4]);

        // A redelivery inside the window is still ignored.
        trail.handle(&claimed(4));
        assert_eq!(trail.entries().len(), 3);
        assert_eq!(trail.count(EventKind::LandClaimed), 3);
    }

    #[test]
    fn handler_set_reaches_every_hook() {
        let first = Arc::new(AuditTrail::new());
        let second = Arc::new(AuditTrail::new());
        let set = HandlerSet::new()
            .with(Arc::new(LoggingHook))
            .with(first.clone())
            .with(second.clone());
        assert_eq!(set.len(), 3);

        let accepted = ChainEvent {
            id: EventId {
                tx_hash: TxHash::new([9; 32]),
                log_index: 0,
            },
            block_number: 11,
            event: DomainEvent::SwapAccepted {
                proposal_id: ProposalId::ZERO,
            },
        };
        set.dispatch(&accepted);
        assert_eq!(first.count(EventKind::SwapAccepted), 1);
        assert_eq!(second.count(EventKind::SwapAccepted), 1);
    }
}
