use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger error: {0}")]
    Ledger(#[from] landgrab_ledger::LedgerError),

    #[error("subscriber error: {0}")]
    Subscriber(#[from] landgrab_subscriber::SubscriberError),

    #[error("REST server error: {0}")]
    Server(String),
}
