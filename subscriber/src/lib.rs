//! Event Subscriber for LandGrab.
//!
//! Holds one long-lived log subscription on the ledger's streaming endpoint,
//! separate from the query transport. When the stream drops the subscriber
//! waits a fixed delay and registers again. Decoded events are published on
//! a bounded channel; repeated log identities are dropped before delivery.

pub mod error;
pub mod subscriber;
pub mod transport;
pub mod ws;

pub use error::SubscriberError;
pub use subscriber::{EventSubscriber, SubscriberConfig, SubscriberStats};
pub use transport::{EventTransport, LogStream};
pub use ws::WsTransport;
