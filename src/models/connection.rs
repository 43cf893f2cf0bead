//! Connection-related data models.
//!
//! This module defines the validated SQL Server connection parameters that
//! `ConfigResolver` builds fresh for every operation call.

use std::fmt;
use zeroize::Zeroizing;

/// Default SQL Server TCP port.
pub const DEFAULT_PORT: u16 = 1433;

/// Default host when `MSSQL_SERVER` is not set.
pub const DEFAULT_HOST: &str = "localhost";

/// How the gateway authenticates against SQL Server.
#[derive(Clone)]
pub enum AuthMode {
    /// SQL Server login with explicit credentials.
    Credentialed {
        username: String,
        /// Contains sensitive data - never log
        password: Zeroizing<String>,
    },
    /// Identity of the running process / OS session.
    Integrated,
}

impl AuthMode {
    /// Name of the mode for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Credentialed { .. } => "sql_server",
            Self::Integrated => "integrated",
        }
    }

    /// Username, if the mode carries credentials.
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Credentialed { username, .. } => Some(username),
            Self::Integrated => None,
        }
    }

    /// Password, if the mode carries credentials.
    pub fn password(&self) -> Option<&str> {
        match self {
            Self::Credentialed { password, .. } => Some(password.as_str()),
            Self::Integrated => None,
        }
    }
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credentialed { username, .. } => f
                .debug_struct("Credentialed")
                .field("username", username)
                .field("password", &"****")
                .finish(),
            Self::Integrated => f.write_str("Integrated"),
        }
    }
}

/// Validated connection parameters for a single operation call.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Host name, optionally `host\instance` for a named instance
    pub host: String,
    pub port: u16,
    /// Always non-empty
    pub database: String,
    pub auth: AuthMode,
    /// Require TLS for the whole session instead of login-only encryption
    pub encrypt: bool,
}

impl ConnectionConfig {
    /// Split `host\instance` into its host and named-instance parts.
    pub fn host_and_instance(&self) -> (&str, Option<&str>) {
        match self.host.split_once('\\') {
            Some((host, instance)) if !instance.is_empty() => (host, Some(instance)),
            _ => (self.host.as_str(), None),
        }
    }
}
