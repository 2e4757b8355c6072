//! Geofence oracle for LandGrab.
//!
//! Converts between three-word geocodes and the coordinate rectangles they
//! name, tests whether a point lies inside a cell and enumerates a cell's
//! neighbours. Two interchangeable implementations exist: [`MockOracle`],
//! a deterministic offline generator, and [`What3WordsOracle`], backed by
//! the remote geocoding API with bounded retry on rate limiting.

pub mod error;
pub mod mock;
pub mod oracle;
pub mod what3words;

pub use error::GeofenceError;
pub use mock::MockOracle;
pub use oracle::{contains, neighbour_points, GeofenceOracle, ADJACENT_OFFSET};
pub use what3words::{What3WordsConfig, What3WordsOracle, DEFAULT_API_URL};
