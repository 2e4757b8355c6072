//! Bounded memory of recently seen keys.
//!
//! Ledger events are delivered at least once, so consumers remember what
//! they have already handled. Only the most recent `capacity` keys are kept;
//! older ones are forgotten in insertion order.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Default capacity: the last 65 536 keys.
pub const DEFAULT_DEDUP_CAPACITY: usize = 65_536;

#[derive(Debug)]
pub struct RollingSet<T> {
    capacity: usize,
    members: HashSet<T>,
    order: VecDeque<T>,
}

impl<T: Eq + Hash + Clone> RollingSet<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            members: HashSet::with_capacity(capacity.min(4096)),
            order: VecDeque::with_capacity(capacity.min(4096)),
        }
    }

    /// Record `key`. Returns `false` when it was already present.
    pub fn insert(&mut self, key: T) -> bool {
        if self.members.contains(&key) {
            return false;
        }
        if self.members.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        self.members.insert(key.clone());
        self.order.push_back(key);
        true
    }

    pub fn contains(&self, key: &T) -> bool {
        self.members.contains(key)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<T: Eq + Hash + Clone> Default for RollingSet<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_CAPACITY)
    }
}
