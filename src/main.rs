//! gridwarriors-server entry point.
//!
//! Parses the command line, loads configuration, installs the tracing
//! subscriber and serves HTTP and WebSocket traffic.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gridwarriors_server::config::{Cli, LogFormat, ServerConfig};
use gridwarriors_server::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Invalid configuration is fatal before any server state exists.
    let config = ServerConfig::load(&cli).context("invalid configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }

    tracing::info!(addr = %config.listen_addr, "starting gridwarriors-server");

    server::serve(&config)
        .await
        .with_context(|| format!("server on {} failed", config.listen_addr))?;

    Ok(())
}
