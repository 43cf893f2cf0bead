//! Connection configuration resolution.
//!
//! `ConfigResolver` turns the `MSSQL_*` environment variables into a
//! validated [`ConnectionConfig`]. It is called on every operation so that
//! configuration changes are picked up without a restart.

use crate::error::{GatewayError, GatewayResult};
use crate::models::{AuthMode, ConnectionConfig, DEFAULT_HOST, DEFAULT_PORT};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{Span, error, info};
use zeroize::Zeroizing;

pub const ENV_SERVER: &str = "MSSQL_SERVER";
pub const ENV_PORT: &str = "MSSQL_PORT";
pub const ENV_DATABASE: &str = "MSSQL_DATABASE";
pub const ENV_USER: &str = "MSSQL_USER";
pub const ENV_PASSWORD: &str = "MSSQL_PASSWORD";
pub const ENV_WINDOWS_AUTH: &str = "MSSQL_WINDOWS_AUTH";
pub const ENV_ENCRYPT: &str = "MSSQL_ENCRYPT";

const LOCALDB_PREFIX: &str = "(localdb)\\";

/// Source of configuration variables.
pub trait EnvSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads the live process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Builds a [`ConnectionConfig`] from an [`EnvSource`].
#[derive(Clone)]
pub struct ConfigResolver {
    env: Arc<dyn EnvSource>,
    span: Span,
}

impl ConfigResolver {
    /// Create a resolver over the given source, logging under `span`.
    pub fn new(env: Arc<dyn EnvSource>, span: Span) -> Self {
        Self { env, span }
    }

    /// Create a resolver over the process environment.
    pub fn from_process_env(span: Span) -> Self {
        Self::new(Arc::new(ProcessEnv), span)
    }

    /// Resolve the configuration for one operation call.
    pub fn resolve(&self) -> GatewayResult<ConnectionConfig> {
        let raw_server = self.var(ENV_SERVER);
        info!(
            parent: &self.span,
            raw = raw_server.as_deref().unwrap_or("NOT SET"),
            "{} environment variable", ENV_SERVER
        );

        let mut host = raw_server.unwrap_or_else(|| DEFAULT_HOST.to_string());
        if let Some(instance) = host.strip_prefix(LOCALDB_PREFIX) {
            host = format!(".\\{instance}");
            info!(parent: &self.span, host = %host, "Detected LocalDB connection");
        }
        info!(parent: &self.span, host = %host, "Using server");

        let port = self.port()?;
        let database = self.var(ENV_DATABASE);
        let encrypt = self.flag(ENV_ENCRYPT);

        let (auth, database) = if self.flag(ENV_WINDOWS_AUTH) {
            let Some(database) = database else {
                error!(parent: &self.span, "{} is required", ENV_DATABASE);
                return Err(GatewayError::config("missing database"));
            };
            (AuthMode::Integrated, database)
        } else {
            match (self.var(ENV_USER), self.var(ENV_PASSWORD), database) {
                (Some(username), Some(password), Some(database)) => (
                    AuthMode::Credentialed {
                        username,
                        password: Zeroizing::new(password),
                    },
                    database,
                ),
                _ => {
                    error!(
                        parent: &self.span,
                        "{}, {}, and {} are required", ENV_USER, ENV_PASSWORD, ENV_DATABASE
                    );
                    return Err(GatewayError::config("missing credentials"));
                }
            }
        };

        info!(parent: &self.span, auth_mode = auth.name(), port, "Resolved connection settings");

        Ok(ConnectionConfig {
            host,
            port,
            database,
            auth,
            encrypt,
        })
    }

    /// Value of a variable; only the empty string counts as unset.
    fn var(&self, key: &str) -> Option<String> {
        self.env.get(key).filter(|v| !v.is_empty())
    }

    fn flag(&self, key: &str) -> bool {
        self.var(key)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }

    fn port(&self) -> GatewayResult<u16> {
        match self.var(ENV_PORT) {
            None => Ok(DEFAULT_PORT),
            Some(raw) => match raw.trim().parse::<u16>() {
                Ok(port) if port > 0 => Ok(port),
                _ => Err(GatewayError::config(format!(
                    "invalid port '{}' in {}: expected 1-65535",
                    raw, ENV_PORT
                ))),
            },
        }
    }
}
