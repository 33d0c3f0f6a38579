//! OpenCDN server.
//!
//! Loads (or creates) the configuration file, sets up logging and serves the
//! HTTP interface until interrupted.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

mod config;
mod logging;
mod state;

use config::{ServerConfig, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "opencdn")]
#[command(about = "OpenCDN - Capability-addressed encrypted file hosting")]
#[command(version)]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Rewrite the configuration with defaults, keeping keys.
    #[arg(long)]
    reset_configuration: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Delete old log files before starting.
    #[arg(long)]
    clear_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = if cli.reset_configuration {
        ServerConfig::reset(&cli.config)
    } else {
        ServerConfig::load_or_init(&cli.config)
    }
    .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;

    if cli.clear_logs {
        logging::clear_logs(&config.logging.directory)?;
    }
    let _guards = logging::init_logging(&config.logging, cli.verbose)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "Starting OpenCDN"
    );

    let addr = config.socket_addr()?;
    let state = state::build_state(&config).context("Failed to initialize storage")?;

    opencdn_http::serve(addr, state, shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("OpenCDN stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
