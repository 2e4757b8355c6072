//! The reconnecting subscription loop.

use futures_util::StreamExt;
use landgrab_ledger::{decode_log, log_filter, ContractAddresses, LogFilter, RawLog};
use landgrab_types::{ChainEvent, EventId, EventKind, RollingSet, DEFAULT_DEDUP_CAPACITY};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::transport::EventTransport;

#[derive(Clone, Debug)]
pub struct SubscriberConfig {
    /// Flat delay before re-registering after a drop.
    pub reconnect_delay: Duration,
    /// How many log identities are remembered for duplicate suppression.
    pub dedup_capacity: usize,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(5),
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
        }
    }
}

/// Counters for the subscription's lifetime.
#[derive(Debug, Default)]
pub struct SubscriberStats {
    registrations: AtomicU64,
    reconnects: AtomicU64,
    delivered: AtomicU64,
    duplicates: AtomicU64,
}

impl SubscriberStats {
    /// Successful filter registrations, the first one included.
    pub fn registrations(&self) -> u64 {
        self.registrations.load(Ordering::Relaxed)
    }

    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }
}

pub struct EventSubscriber {
    transport: Arc<dyn EventTransport>,
    filter: LogFilter,
    kinds: Vec<EventKind>,
    config: SubscriberConfig,
    stats: Arc<SubscriberStats>,
}

impl EventSubscriber {
    /// Subscribe to `kinds` emitted by any of the three contracts.
    pub fn new(
        transport: Arc<dyn EventTransport>,
        contracts: &ContractAddresses,
        kinds: &[EventKind],
        config: SubscriberConfig,
    ) -> Self {
        Self {
            transport,
            filter: log_filter(contracts, kinds),
            kinds: kinds.to_vec(),
            config,
            stats: Arc::new(SubscriberStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<SubscriberStats> {
        Arc::clone(&self.stats)
    }

    pub fn filter(&self) -> &LogFilter {
        &self.filter
    }

    /// Run on a background task, publishing into a channel of `buffer`
    /// events. The task ends once the receiver is dropped.
    pub fn spawn(self, buffer: usize) -> (mpsc::Receiver<ChainEvent>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let handle = tokio::spawn(async move { self.run(tx).await });
        (rx, handle)
    }

    /// Subscribe, deliver and resubscribe until `tx` has no receiver.
    pub async fn run(&self, tx: mpsc::Sender<ChainEvent>) {
        let mut seen: RollingSet<EventId> = RollingSet::new(self.config.dedup_capacity);
        let delay = self.config.reconnect_delay;

        loop {
            match self.transport.open(&self.filter).await {
                Ok(mut logs) => {
                    let n = self.stats.registrations.fetch_add(1, Ordering::Relaxed) + 1;
                    info!(registration = n, kinds = self.kinds.len(), "event subscription active");
                    loop {
                        tokio::select! {
                            _ = tx.closed() => {
                                debug!("event consumer gone, stopping subscription");
                                return;
                            }
                            item = logs.next() => match item {
                                Some(Ok(log)) => {
                                    if !self.deliver(log, &mut seen, &tx).await {
                                        return;
                                    }
                                }
                                Some(Err(e)) if !e.is_fatal() => {
                                    warn!(error = %e, "ignoring undecodable stream message");
                                }
                                Some(Err(e)) => {
                                    warn!(error = %e, delay_secs = delay.as_secs_f64(), "event stream dropped, resubscribing");
                                    break;
                                }
                                None => {
                                    warn!(delay_secs = delay.as_secs_f64(), "event stream ended, resubscribing");
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, delay_secs = delay.as_secs_f64(), "event subscription failed, retrying");
                }
            }

            self.stats.reconnects.fetch_add(1, Ordering::Relaxed);
            tokio::select! {
                _ = tx.closed() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Returns `false` once the receiver is gone.
    async fn deliver(&self, log: RawLog, seen: &mut RollingSet<EventId>, tx: &mpsc::Sender<ChainEvent>) -> bool {
        if log.removed {
            debug!(id = %log.id(), "skipping log removed by reorg");
            return true;
        }
        if !seen.insert(log.id()) {
            self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
            debug!(id = %log.id(), "duplicate log delivery dropped");
            return true;
        }
        let event = match decode_log(&log) {
            Ok(Some(event)) if self.kinds.contains(&event.event.kind()) => event,
            Ok(_) => return true,
            Err(e) => {
                warn!(id = %log.id(), error = %e, "undecodable contract log");
                return true;
            }
        };
        debug!(id = %event.id, kind = %event.event.kind(), block = event.block_number, "event delivered");
        if tx.send(event).await.is_err() {
            return false;
        }
        self.stats.delivered.fetch_add(1, Ordering::Relaxed);
        true
    }
}
