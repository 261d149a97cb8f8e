//! Chat agent entry point
//!
//! Connects the bot to the reply service and the relay broker, then runs
//! the publish loop until SIGINT or SIGTERM.

use chatfabric::agent::{generate_username, AgentRunner};
use chatfabric::client::ChatClient;
use chatfabric::config::FabricConfig;
use chatfabric::observability::init_default_logging;
use chatfabric::transport::tcp::{TcpRequestTransport, TcpSubscriber};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

/// Automated chat agent for the relay fabric
#[derive(Parser)]
#[command(name = "chat-agent")]
#[command(about = "Automated chat agent for the relay fabric")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Display name to log in with (random when omitted)
    #[arg(short, long)]
    username: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent
    Run,
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    info!("Starting chat agent v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_agent(config, cli.username).await,
        Commands::Config { show } => handle_config_command(config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
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
            // Try default locations before falling back to built-in defaults
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

async fn run_agent(
    config: FabricConfig,
    username: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let username = username.unwrap_or_else(generate_username);
    info!(user = %username, "Connecting to fabric");

    let timeout = config
        .endpoints
        .request_timeout_secs
        .map(Duration::from_secs);
    let requests = TcpRequestTransport::connect(&config.endpoints.reply, timeout).await?;
    info!(addr = %config.endpoints.reply, "Connected to reply service");

    let subscriber = TcpSubscriber::connect(&config.endpoints.downstream).await?;
    info!(addr = %config.endpoints.downstream, "Connected to relay broker");

    let client = ChatClient::new(requests, subscriber, username);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!("Signal handling failed: {}", e);
        }
        let _ = shutdown_tx.send(true);
    });

    let mut runner = AgentRunner::new(client, config.bot, shutdown_rx);
    runner.start().await?;

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

fn handle_config_command(
    config: FabricConfig,
    show: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(&config)?);
    }

    info!("Configuration validation complete");
    Ok(())
}
