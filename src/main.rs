//! DB Gate MCP - Main entry point.
//!
//! This server provides safety-gated MCP tools for AI assistants to inspect
//! and query a single SQLite or PostgreSQL database.

use clap::Parser;
use db_gate_mcp::config::Config;
use db_gate_mcp::db::ConnectionManager;
use db_gate_mcp::transport::{StdioTransport, Transport};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; stdout carries the MCP protocol.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    init_tracing(&config);

    info!("Starting DB Gate MCP v{}", env!("CARGO_PKG_VERSION"));

    let engine_config = config.engine_config()?;
    let connection_manager = Arc::new(ConnectionManager::new(engine_config));

    if let Err(e) = connection_manager.connect().await {
        error!(error = %e, suggestion = ?e.suggestion(), "Failed to connect");
        return Err(e.into());
    }

    let transport = StdioTransport::new(connection_manager);
    info!(transport = transport.name(), "Serving");

    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
