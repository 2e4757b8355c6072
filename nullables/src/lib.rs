//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the pipeline sits behind a trait. This
//! crate provides in-process implementations that:
//! - keep all state in memory and never touch the network
//! - can be scripted to fail in specific ways
//! - record what they were asked to do, for assertions
//!
//! Usage: hand these to the components under test in place of the real
//! gateway, JSON-RPC transport and websocket transport.

pub mod events;
pub mod ledger;
pub mod rpc;

pub use events::NullEventTransport;
pub use ledger::{NullLedger, Submission};
pub use rpc::NullRpc;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock ignoring poisoning: a panicking test thread must not cascade.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
