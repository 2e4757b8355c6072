//! REST boundary for LandGrab.
//!
//! Provides endpoints for:
//! - parcel claim state and a user's parcels
//! - presence confirmation for real-mode verification requests
//! - swap proposals and releases
//! - geocoding helpers backed by the configured oracle
//! - health, mode and Prometheus metrics
//!
//! Failures are reported as one of a fixed set of categories; internal
//! error text is logged, not returned.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::{ApiError, ErrorCategory};
pub use server::{router, serve, ApiState};
