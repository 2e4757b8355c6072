use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriberError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("stream transport error: {0}")]
    Transport(String),

    /// A single message could not be understood. The stream stays usable.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("stream closed by peer")]
    Closed,
}

impl SubscriberError {
    /// Whether the current subscription has to be re-established.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SubscriberError::Protocol(_))
    }
}
