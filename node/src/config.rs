//! Node configuration with TOML file support.

use landgrab_crypto::VerifierKey;
use landgrab_geofence::{What3WordsConfig, DEFAULT_API_URL};
use landgrab_ledger::{ContractAddresses, GatewayConfig};
use landgrab_subscriber::SubscriberConfig;
use landgrab_types::{Address, DEFAULT_DEDUP_CAPACITY};
use landgrab_verification::{VerificationMode, WorkflowConfig, DEFAULT_MAX_ACTIVE_REQUESTS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::logging::LogFormat;
use crate::NodeError;

/// A credential that never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Addresses of the three deployed contracts. All are required.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContractsConfig {
    #[serde(default)]
    pub land_token: Option<Address>,
    #[serde(default)]
    pub land_market: Option<Address>,
    #[serde(default)]
    pub land_swap: Option<Address>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Required in real mode.
    #[serde(default)]
    pub api_key: Option<Secret>,

    /// Extra attempts after the geocoding API rate-limits a request.
    #[serde(default = "default_oracle_retries")]
    pub max_retries: u32,

    #[serde(default = "default_oracle_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            max_retries: default_oracle_retries(),
            retry_delay_ms: default_oracle_retry_delay_ms(),
        }
    }
}

/// Configuration for a LandGrab node.
///
/// Loaded from a TOML file via [`NodeConfig::from_toml_file`] or built
/// programmatically. Nothing here has a usable default for the signer or
/// the contracts; [`NodeConfig::validate`] refuses to start without them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// JSON-RPC endpoint for queries and writes.
    #[serde(default)]
    pub rpc_url: String,

    /// Websocket endpoint for the log subscription.
    #[serde(default)]
    pub ws_url: String,

    /// Hex secp256k1 private key that signs settlements.
    #[serde(default)]
    pub verifier_key: Option<Secret>,

    #[serde(default)]
    pub mode: VerificationMode,

    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    #[serde(default = "default_mock_verification_delay_secs")]
    pub mock_verification_delay_secs: u64,

    #[serde(default = "default_max_presence_attempts")]
    pub max_presence_attempts: u32,

    #[serde(default = "default_max_active_requests")]
    pub max_active_requests: usize,

    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,

    #[serde(default = "default_receipt_max_polls")]
    pub receipt_max_polls: u32,

    #[serde(default = "default_read_retries")]
    pub read_retries: u32,

    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,

    /// Port of the REST boundary.
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Whether to run the event pipeline. The REST boundary runs either way.
    #[serde(default = "default_true")]
    pub enable_listener: bool,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter, e.g. "info" or "debug,landgrab_ledger=trace".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub contracts: ContractsConfig,

    #[serde(default)]
    pub oracle: OracleConfig,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_oracle_retries() -> u32 {
    3
}

fn default_oracle_retry_delay_ms() -> u64 {
    1000
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_mock_verification_delay_secs() -> u64 {
    5
}

fn default_max_presence_attempts() -> u32 {
    5
}

fn default_max_active_requests() -> usize {
    DEFAULT_MAX_ACTIVE_REQUESTS
}

fn default_receipt_poll_interval_ms() -> u64 {
    4000
}

fn default_receipt_max_polls() -> u32 {
    30
}

fn default_read_retries() -> u32 {
    3
}

fn default_gas_limit() -> u64 {
    500_000
}

fn default_api_port() -> u16 {
    3001
}

fn default_true() -> bool {
    true
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Refuse to start on anything missing or malformed.
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.rpc_url.trim().is_empty() {
            return Err(NodeError::Config("rpc_url is required".into()));
        }
        if self.enable_listener && self.ws_url.trim().is_empty() {
            return Err(NodeError::Config("ws_url is required when the listener is enabled".into()));
        }
        self.verifier_key()?;
        self.contract_addresses()?;
        if !self.mode.is_mock() {
            self.what3words_config()?;
        }
        self.log_format()?;
        if self.max_presence_attempts == 0 {
            return Err(NodeError::Config("max_presence_attempts must be at least 1".into()));
        }
        if self.max_active_requests == 0 {
            return Err(NodeError::Config("max_active_requests must be at least 1".into()));
        }
        Ok(())
    }

    pub fn verifier_key(&self) -> Result<VerifierKey, NodeError> {
        let secret = self
            .verifier_key
            .as_ref()
            .ok_or_else(|| NodeError::Config("verifier_key is required".into()))?;
        VerifierKey::from_hex(secret.expose()).map_err(|e| NodeError::Config(format!("invalid verifier_key: {e}")))
    }

    pub fn contract_addresses(&self) -> Result<ContractAddresses, NodeError> {
        fn required(value: Option<Address>, name: &str) -> Result<Address, NodeError> {
            match value {
                Some(address) if !address.is_zero() => Ok(address),
                _ => Err(NodeError::Config(format!("contracts.{name} is required"))),
            }
        }
        Ok(ContractAddresses {
            land_token: required(self.contracts.land_token, "land_token")?,
            land_market: required(self.contracts.land_market, "land_market")?,
            land_swap: required(self.contracts.land_swap, "land_swap")?,
        })
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    pub fn what3words_config(&self) -> Result<What3WordsConfig, NodeError> {
        let key = self
            .oracle
            .api_key
            .as_ref()
            .filter(|k| !k.expose().is_empty())
            .ok_or_else(|| NodeError::Config("oracle.api_key is required in real mode".into()))?;
        Ok(What3WordsConfig {
            api_url: self.oracle.api_url.clone(),
            api_key: key.expose().to_string(),
            max_retries: self.oracle.max_retries,
            retry_delay: Duration::from_millis(self.oracle.retry_delay_ms),
        })
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            read_retries: self.read_retries,
            gas_limit: self.gas_limit,
            receipt_poll_interval: Duration::from_millis(self.receipt_poll_interval_ms),
            receipt_max_polls: self.receipt_max_polls,
            ..GatewayConfig::default()
        }
    }

    pub fn subscriber_config(&self) -> SubscriberConfig {
        SubscriberConfig {
            reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
        }
    }

    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            mode: self.mode,
            mock_verification_delay: Duration::from_secs(self.mock_verification_delay_secs),
            max_presence_attempts: self.max_presence_attempts,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
            max_active_requests: self.max_active_requests,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            ws_url: String::new(),
            verifier_key: None,
            mode: VerificationMode::default(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            mock_verification_delay_secs: default_mock_verification_delay_secs(),
            max_presence_attempts: default_max_presence_attempts(),
            max_active_requests: default_max_active_requests(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
            receipt_max_polls: default_receipt_max_polls(),
            read_retries: default_read_retries(),
            gas_limit: default_gas_limit(),
            api_port: default_api_port(),
            enable_listener: default_true(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            contracts: ContractsConfig::default(),
            oracle: OracleConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn complete() -> &'static str {
        r#"
            rpc_url = "http://127.0.0.1:8545"
            ws_url = "ws://127.0.0.1:8545"
            verifier_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

            [contracts]
            land_token = "0x1000000000000000000000000000000000000001"
            land_market = "0x2000000000000000000000000000000000000002"
            land_swap = "0x3000000000000000000000000000000000000003"
        "#
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.api_port, 3001);
        assert_eq!(config.reconnect_delay_secs, 5);
        assert_eq!(config.receipt_max_polls, 30);
        assert_eq!(config.gas_limit, 500_000);
        assert_eq!(config.mode, VerificationMode::Mock);
        assert!(config.enable_listener);
        assert_eq!(config.oracle.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn complete_config_validates() {
        let config = NodeConfig::from_toml_str(complete()).unwrap();
        config.validate().unwrap();
        let contracts = config.contract_addresses().unwrap();
        assert_eq!(contracts.land_swap, Address::parse("0x3000000000000000000000000000000000000003").unwrap());
    }

    #[test]
    fn missing_verifier_key_fails_closed() {
        let mut config = NodeConfig::from_toml_str(complete()).unwrap();
        config.verifier_key = None;
        assert!(matches!(config.validate(), Err(NodeError::Config(m)) if m.contains("verifier_key")));

        config.verifier_key = Some(Secret::new("0x1234"));
        assert!(matches!(config.validate(), Err(NodeError::Config(m)) if m.contains("invalid verifier_key")));
    }

    #[test]
    fn every_contract_address_is_required() {
        let mut config = NodeConfig::from_toml_str(complete()).unwrap();
        config.contracts.land_swap = None;
        assert!(matches!(config.validate(), Err(NodeError::Config(m)) if m.contains("land_swap")));
    }

    #[test]
    fn real_mode_needs_an_oracle_key() {
        let mut config = NodeConfig::from_toml_str(complete()).unwrap();
        config.mode = VerificationMode::Real;
        assert!(config.validate().is_err());
        config.oracle.api_key = Some(Secret::new("key"));
        config.validate().unwrap();
        assert_eq!(config.what3words_config().unwrap().api_key, "key");
    }

    #[test]
    fn ws_url_is_optional_without_the_listener() {
        let mut config = NodeConfig::from_toml_str(complete()).unwrap();
        config.ws_url.clear();
        assert!(config.validate().is_err());
        config.enable_listener = false;
        config.validate().unwrap();
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let config = NodeConfig::from_toml_str(complete()).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains(&KEY[2..]));
        assert!(debug.contains("Secret(***)"));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = NodeConfig::from_toml_str(complete()).unwrap();
        let parsed = NodeConfig::from_toml_str(&config.to_toml_string().unwrap()).unwrap();
        assert_eq!(parsed.rpc_url, config.rpc_url);
        assert_eq!(parsed.contracts.land_market, config.contracts.land_market);
        assert_eq!(parsed.verifier_key, config.verifier_key);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(complete().as_bytes()).unwrap();
        let config = NodeConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.ws_url, "ws://127.0.0.1:8545");

        let missing = NodeConfig::from_toml_file("/nonexistent/landgrab.toml");
        assert!(matches!(missing, Err(NodeError::Config(_))));
    }

    #[test]
    fn derived_component_configs_follow_the_file() {
        let config = NodeConfig::from_toml_str(
            r#"
                mode = "real"
                receipt_poll_interval_ms = 250
                mock_verification_delay_secs = 2
                max_active_requests = 64
            "#,
        )
        .unwrap();
        assert_eq!(config.gateway_config().receipt_poll_interval, Duration::from_millis(250));
        assert_eq!(config.workflow_config().mode, VerificationMode::Real);
        assert_eq!(config.workflow_config().mock_verification_delay, Duration::from_secs(2));
        assert_eq!(config.subscriber_config().reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.workflow_config().max_active_requests, 64);
    }

    #[test]
    fn pending_request_cap_must_be_positive() {
        let mut config = NodeConfig::from_toml_str(complete()).unwrap();
        assert_eq!(config.max_active_requests, DEFAULT_MAX_ACTIVE_REQUESTS);
        config.max_active_requests = 0;
        assert!(matches!(config.validate(), Err(NodeError::Config(_))));
    }
}
