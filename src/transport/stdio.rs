//! Stdio transport for the MCP server.
//!
//! This transport uses standard input/output for communication,
//! which is the standard mode for CLI-based MCP integrations. Logs go to
//! stderr so they never interleave with protocol frames on stdout.

use crate::error::{GatewayError, GatewayResult};
use crate::mcp::GatewayService;
use crate::tools::OperationCatalog;
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

/// Stdio transport implementation.
///
/// This transport reads JSON-RPC messages from stdin and writes
/// responses to stdout.
pub struct StdioTransport {
    catalog: Arc<OperationCatalog>,
}

impl StdioTransport {
    pub fn new(catalog: Arc<OperationCatalog>) -> Self {
        Self { catalog }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> GatewayResult<()> {
        info!(catalog = %self.catalog.profile(), "Starting MCP server with stdio transport");

        let service = GatewayService::new(self.catalog.clone());
        let running_service = service.serve(stdio()).await.map_err(|e| {
            GatewayError::internal(format!("Failed to start stdio transport: {}", e))
        })?;

        tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => {
                        info!("Stdio transport completed normally");
                        Ok(())
                    }
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        Err(GatewayError::internal(format!("Stdio transport error: {}", e)))
                    }
                }
            }
            _ = wait_for_signal() => {
                // A blocking stdin read cannot be interrupted, so leave directly
                info!("Shutdown signal received, exiting");
                std::process::exit(0);
            }
        }
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ConfigResolver, MssqlConnector, QueryExecutor};
    use crate::tools::CatalogProfile;
    use std::collections::HashMap;
    use tracing::Span;

    #[test]
    fn test_stdio_transport_creation() {
        let env: HashMap<String, String> = HashMap::new();
        let resolver = ConfigResolver::new(Arc::new(env), Span::none());
        let connector = Arc::new(MssqlConnector::new(Span::none()));
        let executor = QueryExecutor::new(connector, Span::none());
        let catalog =
            OperationCatalog::new(CatalogProfile::Reporting, resolver, executor, Span::none());
        let transport = StdioTransport::new(Arc::new(catalog));
        assert_eq!(transport.name(), "stdio");
    }
}
