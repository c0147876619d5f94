mod config;
mod dispatch;
mod host;
mod poller;
mod remote;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::Parser;
use config::{BridgeConfig, ConfigError};
use dispatch::{BridgeStats, DispatchEngine, Ledger, MainContext};
use host::{GameHost, RconConfig, RconHost};
use poller::Poller;
use remote::{CommandStore, RemoteStore};
use shopbridge_shared::defaults;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Deliver shop orders from the remote store to players on a game server
#[derive(Parser, Debug)]
#[command(name = "shop-bridge", version, about)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "config.yml")]
    config: PathBuf,

    /// Remote store base URL
    #[arg(long)]
    store_url: Option<String>,

    /// Remote store API key
    #[arg(long)]
    api_key: Option<String>,

    /// Seconds between poll cycles
    #[arg(long)]
    poll_interval_seconds: Option<u64>,

    /// Game server RCON address
    #[arg(long)]
    rcon_address: Option<String>,

    /// Game server RCON password
    #[arg(long)]
    rcon_password: Option<String>,
}

impl Cli {
    /// Overlay command-line values on the loaded configuration
    fn apply(self, config: &mut BridgeConfig) {
        if let Some(url) = self.store_url {
            config.store.url = url;
        }
        if let Some(key) = self.api_key {
            config.store.api_key = key;
        }
        if let Some(secs) = self.poll_interval_seconds {
            config.poll.interval_seconds = secs;
        }
        if let Some(address) = self.rcon_address {
            config.host.rcon_address = address;
        }
        if let Some(password) = self.rcon_password {
            config.host.rcon_password = password;
        }
    }
}

fn load_config(cli: Cli) -> Result<BridgeConfig> {
    let mut config = match BridgeConfig::load_from(&cli.config) {
        Ok(config) => config,
        Err(ConfigError::Read { path, source }) if source.kind() == std::io::ErrorKind::NotFound => {
            warn!("{} not found, using defaults", path.display());
            BridgeConfig::default()
        }
        Err(e) => return Err(e.into()),
    };
    cli.apply(&mut config);
    config.validate()?;

    if !config.interval_in_recommended_range() {
        warn!(
            "Poll interval of {}s is outside the recommended {}-{}s range",
            config.poll.interval_seconds,
            defaults::POLL_INTERVAL_MIN_RECOMMENDED_SECS,
            defaults::POLL_INTERVAL_MAX_RECOMMENDED_SECS
        );
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = load_config(Cli::parse())?;

    info!("Shop bridge starting");
    info!("  Store: {}", config.store_base_url());
    info!("  Game host: {}", config.host.rcon_address);

    let store: Arc<dyn CommandStore> =
        Arc::new(RemoteStore::from_config(&config).context("failed to build HTTP client")?);
    let host: Box<dyn GameHost> = Box::new(RconHost::new(RconConfig::from_config(&config)));
    let ledger = Arc::new(Ledger::new());
    let stats = Arc::new(BridgeStats::new());

    let engine = DispatchEngine::new(ledger.clone(), store.clone(), stats.clone());
    let main_context = MainContext::spawn(host, engine, defaults::MAIN_QUEUE_CAPACITY);

    let poller = Poller::new(
        store,
        ledger.clone(),
        stats.clone(),
        main_context.sender(),
        config.poll_interval(),
        config.initial_delay(),
    )
    .start();

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutdown requested");

    poller.stop().await;
    main_context.shutdown().await;

    info!("Final stats: {}", stats.snapshot());
    info!("Dispatched ids this run: {}", ledger.len().await);
    Ok(())
}
