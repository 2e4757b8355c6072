//! LandGrab daemon: entry point for running the claim pipeline.

use anyhow::Context;
use clap::Parser;
use landgrab_node::{init_logging, LandgrabNode, NodeConfig, Secret};
use landgrab_verification::VerificationMode;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "landgrab-daemon", about = "LandGrab parcel claim pipeline", version)]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "LANDGRAB_CONFIG")]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint for queries and writes.
    #[arg(long, env = "LANDGRAB_RPC_URL")]
    rpc_url: Option<String>,

    /// Websocket endpoint for the event subscription.
    #[arg(long, env = "LANDGRAB_WS_URL")]
    ws_url: Option<String>,

    /// Hex private key that signs settlements. Prefer the env var.
    #[arg(long, env = "LANDGRAB_VERIFIER_KEY", hide_env_values = true)]
    verifier_key: Option<String>,

    /// Verification mode: "mock" or "real".
    #[arg(long, env = "LANDGRAB_MODE", value_parser = parse_mode)]
    mode: Option<VerificationMode>,

    /// Geocoding API key, required in real mode.
    #[arg(long, env = "LANDGRAB_ORACLE_API_KEY", hide_env_values = true)]
    oracle_api_key: Option<String>,

    /// REST server port.
    #[arg(long, env = "LANDGRAB_API_PORT")]
    api_port: Option<u16>,

    /// Serve queries only, without the event pipeline.
    #[arg(long, env = "LANDGRAB_DISABLE_LISTENER")]
    disable_listener: bool,

    /// Log format: "human" or "json".
    #[arg(long, env = "LANDGRAB_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level filter, e.g. "info" or "debug,landgrab_ledger=trace".
    #[arg(long, env = "LANDGRAB_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run the pipeline and the REST server until interrupted.
    Run,
    /// Validate the configuration and print it with secrets redacted.
    CheckConfig,
}

fn parse_mode(raw: &str) -> Result<VerificationMode, String> {
    match raw.to_ascii_lowercase().as_str() {
        "mock" => Ok(VerificationMode::Mock),
        "real" => Ok(VerificationMode::Real),
        other => Err(format!("unknown mode {other:?}, expected mock or real")),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let base = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NodeConfig::default(),
    };
    Ok(apply_overrides(cli, base))
}

fn apply_overrides(cli: &Cli, mut config: NodeConfig) -> NodeConfig {
    if let Some(url) = &cli.rpc_url {
        config.rpc_url = url.clone();
    }
    if let Some(url) = &cli.ws_url {
        config.ws_url = url.clone();
    }
    if let Some(key) = &cli.verifier_key {
        config.verifier_key = Some(Secret::new(key.clone()));
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(key) = &cli.oracle_api_key {
        config.oracle.api_key = Some(Secret::new(key.clone()));
    }
    if let Some(port) = cli.api_port {
        config.api_port = port;
    }
    if cli.disable_listener {
        config.enable_listener = false;
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    config.validate().context("invalid configuration")?;
    init_logging(config.log_format()?, &config.log_level)?;

    match cli.command {
        Command::CheckConfig => {
            tracing::info!(?config, "configuration is valid");
            Ok(())
        }
        Command::Run => {
            tracing::info!(
                mode = %config.mode,
                api_port = config.api_port,
                listener = config.enable_listener,
                "starting LandGrab node"
            );
            let mut node = LandgrabNode::new(config)?;
            node.start();

            let mut failed = node.shutdown.subscribe();
            tokio::select! {
                _ = node.shutdown.wait_for_signal() => {}
                _ = failed.recv() => {}
            }

            node.stop().await?;
            tracing::info!("LandGrab daemon exited cleanly");
            Ok(())
        }
    }
}
