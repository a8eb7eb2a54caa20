//! Bridge orchestrator HTTP service

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use bridge::api::{router, AppState};
use bridge::auth::ApiKeyAuthenticator;
use bridge::config::Config;
use bridge::orchestrator::BridgeServices;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Override the listen address from the config file
    #[arg(long, env = "BRIDGE_BIND_ADDR")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, from_defaults) = load_config(&args.config)?;
    init_logging(args.verbose, config.monitoring.json_logs)?;
    if from_defaults {
        warn!("Config file {} not found, using defaults", args.config);
    }
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    config.validate().context("invalid configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        solana_rpc = %config.solana.rpc_url,
        sui_rpc = %config.sui.rpc_url,
        enclave = %config.enclave.url,
        solver = %config.solver.url,
        "Starting bridge orchestrator"
    );

    let services = BridgeServices::from_config(&config).context("wiring bridge services")?;
    let auth = ApiKeyAuthenticator::new(&config.auth.api_keys);
    if config.auth.api_keys.is_empty() {
        warn!("No API keys configured; every bridge request will be rejected");
    }

    let app = router(AppState {
        services: Arc::new(services),
        auth: Arc::new(auth),
        enable_metrics: config.monitoring.enable_metrics,
    });

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal, draining connections"),
        Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
    }
}

fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "bridge=debug,info"
    } else {
        "bridge=info,warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_target(true)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_target(true)))
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(())
}

/// Load configuration from file with fallback to defaults. The flag reports
/// whether the defaults were used.
fn load_config(path: &str) -> Result<(Config, bool)> {
    if std::path::Path::new(path).exists() {
        let config = Config::from_file_with_env(path)
            .with_context(|| format!("loading config from {path}"))?;
        Ok((config, false))
    } else {
        dotenvy::dotenv().ok();
        let mut config = Config::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok((config, true))
    }
}
