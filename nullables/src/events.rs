//! Nullable event stream: every `open` starts a session fed by [`push`].
//!
//! [`push`]: NullEventTransport::push

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use landgrab_ledger::{encode_log, LogFilter, RawLog};
use landgrab_subscriber::{EventTransport, LogStream, SubscriberError};
use landgrab_types::{Address, ChainEvent};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::lock;

type Session = mpsc::UnboundedSender<Result<RawLog, SubscriberError>>;

#[derive(Default)]
struct StreamState {
    sessions: Vec<Session>,
    refusals: u32,
    opens: u64,
    filters: Vec<LogFilter>,
    pushed: Vec<RawLog>,
}

#[derive(Default)]
pub struct NullEventTransport {
    state: Mutex<StreamState>,
}

impl NullEventTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` calls to `open` with a connect error.
    pub fn refuse_next(&self, n: u32) {
        lock(&self.state).refusals = n;
    }

    /// Deliver `log` to every open session. Returns how many received it;
    /// a log pushed while nothing is subscribed is lost.
    pub fn push(&self, log: RawLog) -> usize {
        let mut state = lock(&self.state);
        state.pushed.push(log.clone());
        state.sessions.retain(|s| !s.is_closed());
        state
            .sessions
            .iter()
            .filter(|s| s.send(Ok(log.clone())).is_ok())
            .count()
    }

    pub fn push_event(&self, emitter: Address, event: &ChainEvent) -> usize {
        self.push(encode_log(emitter, event))
    }

    /// Send a message the subscriber cannot parse.
    pub fn push_garbage(&self) {
        let state = lock(&self.state);
        for session in &state.sessions {
            let _ = session.send(Err(SubscriberError::Protocol("unparseable message".into())));
        }
    }

    /// Break every open session with a transport error.
    pub fn drop_connections(&self) {
        let mut state = lock(&self.state);
        for session in state.sessions.drain(..) {
            let _ = session.send(Err(SubscriberError::Transport("connection reset".into())));
        }
    }

    /// End every open session without an error.
    pub fn close_connections(&self) {
        lock(&self.state).sessions.clear();
    }

    pub fn opens(&self) -> u64 {
        lock(&self.state).opens
    }

    pub fn active_sessions(&self) -> usize {
        lock(&self.state).sessions.iter().filter(|s| !s.is_closed()).count()
    }

    pub fn last_filter(&self) -> Option<LogFilter> {
        lock(&self.state).filters.last().cloned()
    }

    pub fn pushed(&self) -> Vec<RawLog> {
        lock(&self.state).pushed.clone()
    }

    /// Wait until `n` sessions have been opened in total. Returns `false` on timeout.
    pub async fn wait_for_opens(&self, n: u64, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.opens() < n || self.active_sessions() == 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        true
    }
}

#[async_trait]
impl EventTransport for NullEventTransport {
    async fn open(&self, filter: &LogFilter) -> Result<LogStream, SubscriberError> {
        let mut state = lock(&self.state);
        if state.refusals > 0 {
            state.refusals -= 1;
            return Err(SubscriberError::Connect("connection refused".into()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.sessions.push(tx);
        state.opens += 1;
        state.filters.push(filter.clone());
        drop(state);

        let logs = stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) });
        Ok(logs.boxed())
    }
}
