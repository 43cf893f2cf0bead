//! Database access layer.
//!
//! This module provides database access functionality:
//! - Connection configuration resolution from the environment
//! - Table name validation
//! - Batch inspection
//! - Per-call query execution
//! - The SQL Server driver

pub mod classify;
pub mod executor;
pub mod identifier;
pub mod mssql;
pub mod resolver;

pub use classify::{BatchShape, batch_shape};
pub use executor::{Connection, Connector, QueryExecutor};
pub use identifier::QualifiedIdentifier;
pub use mssql::MssqlConnector;
pub use resolver::{ConfigResolver, EnvSource, ProcessEnv};
