//! Verification Workflow for LandGrab.
//!
//! A claim starts when the market contract emits `VerificationRequested`.
//! The [`VerificationWorkflow`] tracks each request through
//! `Requested → LocationVerified | LocationRejected → Claimed | Expired`,
//! proving presence either automatically (mock mode) or from the user's
//! asserted position (real mode). The [`ClaimExecutor`] settles verified
//! requests on the ledger after re-checking that they are still pending.
//!
//! Settlement events fan out to [`EventHandler`] hooks, and the
//! [`ParcelService`] answers read-only parcel queries and validates swap
//! proposals outside the workflow.

pub mod error;
pub mod executor;
pub mod handler;
pub mod parcels;
pub mod workflow;

pub use error::VerificationError;
pub use executor::{ClaimExecutor, ClaimOutcome};
pub use handler::{AuditEntry, AuditTrail, EventHandler, HandlerSet, LoggingHook, AUDIT_LIMIT};
pub use parcels::{ClaimedLand, LandInfo, ParcelService, SwapSubmitted};
pub use workflow::{
    VerificationMode, VerificationWorkflow, WorkflowConfig, DEFAULT_COORDINATES, DEFAULT_MAX_ACTIVE_REQUESTS,
};
