//! Data models for the MSSQL MCP gateway.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;

// Re-export commonly used types
pub use connection::{AuthMode, ConnectionConfig, DEFAULT_HOST, DEFAULT_PORT};
pub use query::{ExecutionOutcome, ResultSet, SqlValue, Statement};
