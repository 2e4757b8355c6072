//! Prometheus metrics for the node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`] that the REST `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use landgrab_subscriber::SubscriberStats;
use landgrab_types::ChainEvent;
use landgrab_verification::EventHandler;
use prometheus::{
    register_int_counter_vec_with_registry, register_int_gauge_with_registry, IntCounterVec, IntGauge, Opts,
    Registry,
};

use crate::NodeError;

pub struct NodeMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Distinct events delivered to the pipeline, by kind.
    pub events_total: IntCounterVec,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Successful filter registrations since start, the first included.
    pub subscription_registrations: IntGauge,
    pub subscription_reconnects: IntGauge,
    /// Log identities dropped as already delivered.
    pub duplicate_logs: IntGauge,
    /// Verification requests not yet `Claimed` or `Expired`.
    pub requests_in_flight: IntGauge,
}

fn registration_error(e: prometheus::Error) -> NodeError {
    NodeError::Config(format!("metric registration failed: {e}"))
}

impl NodeMetrics {
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();

        let events_total = register_int_counter_vec_with_registry!(
            Opts::new("landgrab_events_total", "Ledger events delivered to the pipeline"),
            &["kind"],
            registry
        )
        .map_err(registration_error)?;

        let subscription_registrations = register_int_gauge_with_registry!(
            Opts::new("landgrab_subscription_registrations", "Event filter registrations since start"),
            registry
        )
        .map_err(registration_error)?;

        let subscription_reconnects = register_int_gauge_with_registry!(
            Opts::new("landgrab_subscription_reconnects", "Event stream reconnects since start"),
            registry
        )
        .map_err(registration_error)?;

        let duplicate_logs = register_int_gauge_with_registry!(
            Opts::new("landgrab_duplicate_logs", "Repeated log identities suppressed"),
            registry
        )
        .map_err(registration_error)?;

        let requests_in_flight = register_int_gauge_with_registry!(
            Opts::new("landgrab_requests_in_flight", "Verification requests not yet finished"),
            registry
        )
        .map_err(registration_error)?;

        Ok(Self {
            registry,
            events_total,
            subscription_registrations,
            subscription_reconnects,
            duplicate_logs,
            requests_in_flight,
        })
    }

    /// Copy the subscriber's counters and the workflow's load into the gauges.
    pub fn observe(&self, stats: &SubscriberStats, in_flight: usize) {
        self.subscription_registrations.set(saturating_i64(stats.registrations()));
        self.subscription_reconnects.set(saturating_i64(stats.reconnects()));
        self.duplicate_logs.set(saturating_i64(stats.duplicates()));
        self.requests_in_flight.set(saturating_i64(in_flight as u64));
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl EventHandler for NodeMetrics {
    fn handle(&self, event: &ChainEvent) {
        self.events_total.with_label_values(&[event.event.kind().as_str()]).inc();
    }
}
