//! MSSQL MCP Gateway Library
//!
//! This library provides MCP (Model Context Protocol) tools that let AI
//! assistants run SQL against Microsoft SQL Server and read the results as
//! plain text.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::{GatewayError, GatewayResult};
pub use mcp::GatewayService;
pub use tools::OperationCatalog;
