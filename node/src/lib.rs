//! LandGrab node: wires the ledger gateway, the geofence oracle, the event
//! subscriber and the verification workflow into one running service.
//!
//! The node is the coordinator that:
//! - Loads and validates configuration (fail-closed)
//! - Builds the explicit [`NodeContext`] every component is handed
//! - Runs the [`Pipeline`]: subscriber → handler hooks → workflow
//! - Serves the REST boundary next to the pipeline
//! - Coordinates graceful shutdown

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod pipeline;
pub mod shutdown;

pub use config::{ContractsConfig, NodeConfig, OracleConfig, Secret};
pub use context::NodeContext;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::LandgrabNode;
pub use pipeline::Pipeline;
pub use shutdown::ShutdownController;
