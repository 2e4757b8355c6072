//! The explicit context object handed to every running component.

use landgrab_geofence::{GeofenceOracle, MockOracle, What3WordsOracle};
use landgrab_ledger::{ContractAddresses, HttpTransport, LedgerGateway, ParcelLedger, RpcTransport};
use landgrab_rpc::ApiState;
use landgrab_subscriber::{EventTransport, WsTransport};
use landgrab_verification::{AuditTrail, HandlerSet, LoggingHook, ParcelService, VerificationMode, VerificationWorkflow};
use std::sync::Arc;
use tracing::info;

use crate::config::NodeConfig;
use crate::metrics::NodeMetrics;
use crate::NodeError;

pub struct NodeContext {
    pub config: NodeConfig,
    pub contracts: ContractAddresses,
    pub ledger: Arc<dyn ParcelLedger>,
    pub oracle: Arc<dyn GeofenceOracle>,
    pub events: Arc<dyn EventTransport>,
    pub workflow: Arc<VerificationWorkflow>,
    pub parcels: Arc<ParcelService>,
    pub handlers: HandlerSet,
    pub metrics: Arc<NodeMetrics>,
    pub audit: Arc<AuditTrail>,
}

impl NodeContext {
    /// Build the production context: JSON-RPC gateway, websocket
    /// subscription and the oracle selected by `mode`.
    pub fn from_config(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let contracts = config.contract_addresses()?;
        let signer = config.verifier_key()?;
        info!(verifier = %signer.address(), mode = %config.mode, rpc = %config.rpc_url, "building node context");

        let transport: Arc<dyn RpcTransport> = Arc::new(HttpTransport::new(config.rpc_url.clone()));
        let ledger = Arc::new(LedgerGateway::new(transport, contracts, Some(signer), config.gateway_config()));
        let oracle: Arc<dyn GeofenceOracle> = match config.mode {
            VerificationMode::Mock => Arc::new(MockOracle::new()),
            VerificationMode::Real => Arc::new(What3WordsOracle::new(config.what3words_config()?)),
        };
        let events = Arc::new(WsTransport::new(config.ws_url.clone()));
        Self::with_parts(config, contracts, ledger, oracle, events)
    }

    /// Assemble a context from already-built collaborators.
    pub fn with_parts(
        config: NodeConfig,
        contracts: ContractAddresses,
        ledger: Arc<dyn ParcelLedger>,
        oracle: Arc<dyn GeofenceOracle>,
        events: Arc<dyn EventTransport>,
    ) -> Result<Self, NodeError> {
        let workflow = Arc::new(VerificationWorkflow::new(
            Arc::clone(&oracle),
            Arc::clone(&ledger),
            config.workflow_config(),
        ));
        let parcels = Arc::new(ParcelService::new(Arc::clone(&ledger), Arc::clone(&oracle)));
        let metrics = Arc::new(NodeMetrics::new()?);
        let audit = Arc::new(AuditTrail::new());
        let handlers = HandlerSet::new()
            .with(Arc::new(LoggingHook))
            .with(audit.clone())
            .with(metrics.clone());

        Ok(Self {
            config,
            contracts,
            ledger,
            oracle,
            events,
            workflow,
            parcels,
            handlers,
            metrics,
            audit,
        })
    }

    pub fn api_state(&self) -> ApiState {
        ApiState {
            workflow: Arc::clone(&self.workflow),
            parcels: Arc::clone(&self.parcels),
            oracle: Arc::clone(&self.oracle),
            listener_enabled: self.config.enable_listener,
            registry: self.metrics.registry.clone(),
        }
    }
}
