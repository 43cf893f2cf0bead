//! Process configuration for the MSSQL MCP gateway.
//!
//! Process settings come from CLI arguments with environment fallbacks. The
//! SQL Server connection itself is configured separately through the
//! `MSSQL_*` variables, which are re-read on every call (see
//! `db::resolver`).

use crate::tools::CatalogProfile;
use clap::{Parser, ValueEnum};
use std::time::Duration;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for networked clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Configuration for the MSSQL MCP gateway.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mssql-mcp-gateway",
    about = "MCP server that runs SQL against Microsoft SQL Server and returns plain-text results",
    version
)]
pub struct Config {
    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Operation set to expose (reporting or explorer)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "reporting",
        env = "MCP_CATALOG"
    )]
    pub catalog: CatalogProfile,

    /// Abandon a call after this many seconds; unbounded when unset
    #[arg(long, value_name = "SECONDS", env = "MSSQL_QUERY_TIMEOUT")]
    pub query_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            catalog: CatalogProfile::Reporting,
            query_timeout: None,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Get the query timeout as a Duration. A zero timeout counts as unset.
    pub fn query_timeout_duration(&self) -> Option<Duration> {
        self.query_timeout
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transport, TransportMode::Stdio);
        assert_eq!(config.http_host, DEFAULT_HTTP_HOST);
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(config.catalog, CatalogProfile::Reporting);
        assert_eq!(config.query_timeout_duration(), None);
    }

    #[test]
    fn test_http_bind_addr() {
        let config = Config {
            http_host: "0.0.0.0".to_string(),
            http_port: 3000,
            ..Config::default()
        };
        assert_eq!(config.http_bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_query_timeout_duration() {
        let config = Config {
            query_timeout: Some(45),
            ..Config::default()
        };
        assert_eq!(config.query_timeout_duration(), Some(Duration::from_secs(45)));

        let zero = Config {
            query_timeout: Some(0),
            ..Config::default()
        };
        assert_eq!(zero.query_timeout_duration(), None);
    }

    #[test]
    fn test_parse_cli_arguments() {
        let config = Config::try_parse_from([
            "mssql-mcp-gateway",
            "--transport",
            "http",
            "--catalog",
            "explorer",
            "--query-timeout",
            "10",
            "--http-port",
            "9000",
        ])
        .unwrap();
        assert_eq!(config.transport, TransportMode::Http);
        assert_eq!(config.catalog, CatalogProfile::Explorer);
        assert_eq!(config.query_timeout, Some(10));
        assert_eq!(config.http_port, 9000);
    }

    #[test]
    fn test_rejects_unknown_catalog() {
        let result = Config::try_parse_from(["mssql-mcp-gateway", "--catalog", "payroll"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_transport_display() {
        assert_eq!(TransportMode::Stdio.to_string(), "stdio");
        assert_eq!(TransportMode::Http.to_string(), "http");
    }
}
