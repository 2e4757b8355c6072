//! Fundamental types for LandGrab.
//!
//! This crate defines the data model shared across every other crate in the
//! workspace: three-word geocodes and their cells, ledger addresses and
//! identifiers, verification requests, parcels, swap proposals and the
//! domain events decoded from the ledger's log.

pub mod address;
pub mod dedup;
pub mod error;
pub mod event;
pub mod geo;
pub mod ids;
pub mod parcel;
pub mod request;
pub mod swap;
pub mod time;

pub use address::Address;
pub use dedup::{RollingSet, DEFAULT_DEDUP_CAPACITY};
pub use error::{ErrorKind, LandgrabError};
pub use event::{ChainEvent, DomainEvent, EventId, EventKind};
pub use geo::{Coordinates, GeoCell, GeoCode, Square};
pub use ids::{ProposalId, RequestId, TokenId, TxHash};
pub use parcel::{Parcel, ParcelAttribute, ParcelMetadata, TOKEN_URI_PREFIX};
pub use request::{RequestStatus, VerificationRequest};
pub use swap::{SwapProposal, SwapStatus};
pub use time::Timestamp;
