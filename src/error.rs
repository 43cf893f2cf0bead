//! Error types for the MSSQL MCP gateway.
//!
//! This module defines all error types using `thiserror`. Operations never let
//! these escape to the transport: the catalog renders them as one-line text
//! so the calling agent always receives a readable result.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Missing or inconsistent environment configuration.
    #[error("{message}")]
    Config { message: String },

    /// Caller-supplied argument rejected before any connection attempt.
    #[error("{message}")]
    Validation { message: String },

    /// Connection failure or engine-reported error, message preserved verbatim.
    #[error("{message}")]
    Execution {
        message: String,
        /// SQL Server error number, e.g. 208 for an invalid object name
        code: Option<u32>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl GatewayError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a validation error for a malformed table name.
    pub fn invalid_identifier(name: &str) -> Self {
        Self::Validation {
            message: format!("Invalid table name: {name}"),
        }
    }

    /// Create a validation error for any other malformed argument.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an execution error without an engine error number.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            code: None,
        }
    }

    /// Create an execution error for a statement that outlived its time budget.
    pub fn timeout(limit: Duration) -> Self {
        Self::execution(format!(
            "Query execution exceeded {}s and was abandoned",
            limit.as_secs()
        ))
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Short name of the error kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Validation { .. } => "validation",
            Self::Execution { .. } => "execution",
            Self::Internal { .. } => "internal",
        }
    }
}

/// Convert tiberius errors to GatewayError.
impl From<tiberius::error::Error> for GatewayError {
    fn from(err: tiberius::error::Error) -> Self {
        match err {
            tiberius::error::Error::Server(token) => Self::Execution {
                message: token.message().to_string(),
                code: Some(token.code()),
            },
            other => Self::execution(other.to_string()),
        }
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::execution(format!("I/O error: {err}"))
    }
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
