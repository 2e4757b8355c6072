use async_trait::async_trait;
use futures_util::stream::BoxStream;
use landgrab_ledger::{LogFilter, RawLog};

use crate::error::SubscriberError;

/// Logs in ledger commit order. The stream ends, or yields a fatal error,
/// when the underlying connection is lost.
pub type LogStream = BoxStream<'static, Result<RawLog, SubscriberError>>;

/// A streaming connection able to register a log filter.
#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn open(&self, filter: &LogFilter) -> Result<LogStream, SubscriberError>;
}
