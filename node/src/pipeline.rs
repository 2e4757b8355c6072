//! Subscriber → handler hooks → workflow.

use landgrab_subscriber::{EventSubscriber, SubscriberError, SubscriberStats};
use landgrab_types::EventKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::context::NodeContext;
use crate::NodeError;

/// Channel capacity between the subscriber task and the pipeline.
const EVENT_BUFFER: usize = 256;
/// How long the subscriber task gets to notice the pipeline is gone.
const SUBSCRIBER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Pipeline {
    ctx: Arc<NodeContext>,
    stats: Arc<SubscriberStats>,
    subscriber: EventSubscriber,
}

impl Pipeline {
    pub fn new(ctx: Arc<NodeContext>) -> Self {
        let subscriber = EventSubscriber::new(
            Arc::clone(&ctx.events),
            &ctx.contracts,
            &EventKind::ALL,
            ctx.config.subscriber_config(),
        );
        Self {
            stats: subscriber.stats(),
            ctx,
            subscriber,
        }
    }

    pub fn stats(&self) -> Arc<SubscriberStats> {
        Arc::clone(&self.stats)
    }

    /// Consume events until `shutdown` fires, then let in-flight
    /// settlements finish. Events are handled one at a time in delivery
    /// order; settlements run on the workflow's own tasks.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<(), NodeError> {
        let Pipeline { ctx, stats, subscriber } = self;
        let (mut events, mut handle) = subscriber.spawn(EVENT_BUFFER);
        info!(mode = %ctx.workflow.mode(), "pipeline started");

        let result = loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("shutdown requested, stopping pipeline");
                    break Ok(());
                }
                event = events.recv() => match event {
                    Some(event) => {
                        ctx.handlers.dispatch(&event);
                        ctx.workflow.handle(&event).await;
                        ctx.metrics.observe(&stats, ctx.workflow.in_flight().await);
                    }
                    None => {
                        warn!("event subscription ended unexpectedly");
                        break Err(NodeError::Subscriber(SubscriberError::Closed));
                    }
                }
            }
        };

        drop(events);
        if tokio::time::timeout(SUBSCRIBER_STOP_TIMEOUT, &mut handle).await.is_err() {
            warn!("subscriber did not stop in time, aborting");
            handle.abort();
        }
        ctx.workflow.drain().await;
        ctx.metrics.observe(&stats, ctx.workflow.in_flight().await);
        info!(delivered = stats.delivered(), registrations = stats.registrations(), "pipeline stopped");
        result
    }
}
