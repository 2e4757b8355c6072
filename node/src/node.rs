//! The running service: pipeline plus REST boundary under one shutdown.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::NodeConfig;
use crate::context::NodeContext;
use crate::pipeline::Pipeline;
use crate::shutdown::ShutdownController;
use crate::NodeError;

/// Timeout for background tasks during shutdown. Pending settlements may
/// poll receipts for a while, so this is generous.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

pub struct LandgrabNode {
    pub ctx: Arc<NodeContext>,
    pub shutdown: Arc<ShutdownController>,
    tasks: Vec<(&'static str, JoinHandle<Result<(), NodeError>>)>,
}

impl LandgrabNode {
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        Ok(Self::with_context(NodeContext::from_config(config)?))
    }

    pub fn with_context(ctx: NodeContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            shutdown: Arc::new(ShutdownController::new()),
            tasks: Vec::new(),
        }
    }

    /// Spawn the REST server and, when enabled, the event pipeline.
    pub fn start(&mut self) {
        if self.ctx.config.enable_listener {
            let pipeline = Pipeline::new(Arc::clone(&self.ctx));
            let rx = self.shutdown.subscribe();
            let shutdown = Arc::clone(&self.shutdown);
            self.tasks.push((
                "pipeline",
                tokio::spawn(async move {
                    let result = pipeline.run(rx).await;
                    if let Err(e) = &result {
                        error!(error = %e, "pipeline failed, shutting down");
                        shutdown.shutdown();
                    }
                    result
                }),
            ));
        } else {
            info!("event listener disabled, serving queries only");
        }

        let state = self.ctx.api_state();
        let port = self.ctx.config.api_port;
        let signalled = self.shutdown.signalled();
        let shutdown = Arc::clone(&self.shutdown);
        self.tasks.push((
            "rest",
            tokio::spawn(async move {
                let result = landgrab_rpc::serve(state, port, signalled)
                    .await
                    .map_err(|e| NodeError::Server(e.to_string()));
                if let Err(e) = &result {
                    error!(error = %e, "REST server failed, shutting down");
                    shutdown.shutdown();
                }
                result
            }),
        ));
        info!(port, tasks = self.tasks.len(), "LandGrab node started");
    }

    /// Signal every task and wait for them. Returns the first task error.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        info!("LandGrab node stopping");
        self.shutdown.shutdown();

        let mut first_error = None;
        for (name, handle) in self.tasks.drain(..) {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => {
                    first_error.get_or_insert(e);
                }
                Ok(Err(e)) => warn!(task = name, error = %e, "task panicked"),
                Err(_) => warn!(task = name, timeout = ?SHUTDOWN_TIMEOUT, "task did not stop in time"),
            }
        }
        info!("LandGrab node stopped");
        first_error.map_or(Ok(()), Err)
    }
}
