//! Relay broker entry point
//!
//! Binds the publisher-facing and subscriber-facing listeners and relays
//! frames between them until SIGINT or SIGTERM.

use chatfabric::broker::RelayBroker;
use chatfabric::config::FabricConfig;
use chatfabric::observability::init_default_logging;
use clap::Parser;
use std::path::PathBuf;
use std::process;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

/// Topic relay broker for the chat fabric
#[derive(Parser)]
#[command(name = "chat-broker")]
#[command(about = "Topic relay broker for the chat fabric")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    info!("Starting relay broker v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_broker(config).await {
        error!("Broker failed: {}", e);
        process::exit(1);
    }

    info!("Broker shutdown complete");
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<FabricConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(FabricConfig::load_from_file(path)?)
        }
        None => {
            let default_paths = ["fabric.toml", "config/fabric.toml"];

            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(FabricConfig::load_from_file(&path)?);
                }
            }

            info!("No configuration file found, using defaults");
            Ok(FabricConfig::default())
        }
    }
}

async fn run_broker(config: FabricConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let broker = RelayBroker::bind(&config.endpoints, shutdown_rx).await?;
    info!(
        upstream = %config.endpoints.upstream,
        downstream = %config.endpoints.downstream,
        "Relay broker listening"
    );

    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!("Signal handling failed: {}", e);
        }
        let _ = shutdown_tx.send(true);
    });

    broker.run().await?;
    Ok(())
}

async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
    Ok(())
}
