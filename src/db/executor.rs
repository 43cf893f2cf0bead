//! Query execution engine.
//!
//! `QueryExecutor` owns the per-call connection lifecycle:
//! connect, run one statement, close. The database engine sits behind the
//! [`Connector`] and [`Connection`] traits; `db::mssql` provides the SQL
//! Server implementation.

use crate::error::{GatewayError, GatewayResult};
use crate::models::{ConnectionConfig, ExecutionOutcome, Statement};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{Span, debug, error, warn};

/// Opens connections to the database engine.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a new connection for a single statement.
    async fn connect(&self, config: &ConnectionConfig) -> GatewayResult<Box<dyn Connection>>;
}

/// A live connection owned by exactly one operation call.
#[async_trait]
pub trait Connection: Send {
    /// Execute one statement with its parameters bound positionally.
    async fn run(&mut self, statement: &Statement) -> GatewayResult<ExecutionOutcome>;

    /// Release the connection.
    async fn close(self: Box<Self>) -> GatewayResult<()>;
}

/// Query executor that handles the connect → execute → close lifecycle.
#[derive(Clone)]
pub struct QueryExecutor {
    connector: Arc<dyn Connector>,
    /// None: block until the engine answers
    query_timeout: Option<Duration>,
    span: Span,
}

impl QueryExecutor {
    /// Create an executor without a statement timeout.
    pub fn new(connector: Arc<dyn Connector>, span: Span) -> Self {
        Self {
            connector,
            query_timeout: None,
            span,
        }
    }

    /// Bound every call (connect included) by `limit`.
    pub fn with_timeout(mut self, limit: Option<Duration>) -> Self {
        self.query_timeout = limit;
        self
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout
    }

    /// Execute a statement on a fresh connection.
    pub async fn execute(
        &self,
        config: &ConnectionConfig,
        statement: &Statement,
    ) -> GatewayResult<ExecutionOutcome> {
        let start = Instant::now();
        debug!(
            parent: &self.span,
            sql = %statement.text,
            params = statement.params.len(),
            timeout_secs = ?self.query_timeout.map(|t| t.as_secs()),
            "Executing statement"
        );

        let result = match self.query_timeout {
            Some(limit) => {
                match timeout(limit, self.run_on_new_connection(config, statement)).await {
                    Ok(result) => result,
                    Err(_) => Err(GatewayError::timeout(limit)),
                }
            }
            None => self.run_on_new_connection(config, statement).await,
        };

        let execution_time_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(ExecutionOutcome::Rows(rows)) => debug!(
                parent: &self.span,
                row_count = rows.row_count(),
                execution_time_ms,
                "Statement returned rows"
            ),
            Ok(ExecutionOutcome::Affected(count)) => debug!(
                parent: &self.span,
                rows_affected = count,
                execution_time_ms,
                "Statement modified rows"
            ),
            Err(e) => error!(
                parent: &self.span,
                sql = %statement.text,
                error = %e,
                kind = e.kind(),
                execution_time_ms,
                "Error executing SQL"
            ),
        }
        result
    }

    async fn run_on_new_connection(
        &self,
        config: &ConnectionConfig,
        statement: &Statement,
    ) -> GatewayResult<ExecutionOutcome> {
        let mut connection = self.connector.connect(config).await?;
        let outcome = connection.run(statement).await;
        if let Err(e) = connection.close().await {
            warn!(parent: &self.span, error = %e, "Failed to close connection");
        }
        outcome
    }
}
