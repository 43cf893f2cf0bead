//! MSSQL MCP Gateway - Main entry point.
//!
//! This server provides MCP (Model Context Protocol) tools for AI assistants
//! to run SQL against Microsoft SQL Server.

use clap::Parser;
use mssql_mcp_gateway::config::{Config, TransportMode};
use mssql_mcp_gateway::tools::OperationCatalog;
use mssql_mcp_gateway::transport::{HttpTransport, StdioTransport, Transport};
use tracing::{error, info, info_span};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
///
/// Output goes to stderr: stdout carries the MCP protocol in stdio mode.
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
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_tracing(&config);

    info!(
        transport = %config.transport,
        catalog = %config.catalog,
        server = config.catalog.server_name(),
        query_timeout_secs = ?config.query_timeout_duration().map(|t| t.as_secs()),
        "Starting MSSQL MCP Gateway v{}",
        env!("CARGO_PKG_VERSION")
    );

    let span = info_span!("gateway", catalog = %config.catalog);
    let catalog = OperationCatalog::connect_to_mssql(
        config.catalog,
        config.query_timeout_duration(),
        span,
    );

    let result = match config.transport {
        TransportMode::Stdio => {
            info!("Using stdio transport");
            StdioTransport::new(catalog).run().await
        }
        TransportMode::Http => {
            info!(
                host = %config.http_host,
                port = config.http_port,
                endpoint = %config.mcp_endpoint,
                "Using HTTP transport"
            );
            let transport = HttpTransport::new(
                catalog,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            );
            transport.run().await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
