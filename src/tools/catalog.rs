//! The operation catalog behind the MCP tools.
//!
//! Each operation resolves configuration, runs one statement on a fresh
//! connection, and renders either the result or the error as text. No
//! operation returns `Err`: failures become a one-line message carrying the
//! operation's error prefix.

use crate::db::executor::QueryExecutor;
use crate::db::identifier;
use crate::db::mssql::MssqlConnector;
use crate::db::resolver::ConfigResolver;
use crate::error::{GatewayError, GatewayResult};
use crate::models::{ConnectionConfig, ExecutionOutcome, ResultSet, SqlValue, Statement};
use crate::tools::format::{
    NO_DATA_IN_TABLE, NO_TABLES_IN_DATABASE, format_outcome, format_rows, format_rows_or,
};
use crate::tools::statements::{CatalogProfile, StatementSet, preview_sql};
use schemars::JsonSchema;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Span, error, info};

/// Reply of the liveness probe.
pub const PONG: &str = "pong";

/// A year given either as a JSON number or as a string holding one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum YearInput {
    Number(i64),
    Text(String),
}

impl YearInput {
    pub fn to_year(&self) -> GatewayResult<i64> {
        match self {
            Self::Number(year) => Ok(*year),
            Self::Text(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| GatewayError::invalid_argument(format!("Invalid year: {raw}"))),
        }
    }
}

impl From<i64> for YearInput {
    fn from(year: i64) -> Self {
        Self::Number(year)
    }
}

impl From<&str> for YearInput {
    fn from(year: &str) -> Self {
        Self::Text(year.to_string())
    }
}

/// Operations over one [`StatementSet`].
pub struct OperationCatalog {
    profile: CatalogProfile,
    statements: StatementSet,
    resolver: ConfigResolver,
    executor: QueryExecutor,
    span: Span,
}

impl fmt::Debug for OperationCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationCatalog")
            .field("profile", &self.profile)
            .field("query_timeout", &self.executor.query_timeout())
            .finish()
    }
}

impl OperationCatalog {
    pub fn new(
        profile: CatalogProfile,
        resolver: ConfigResolver,
        executor: QueryExecutor,
        span: Span,
    ) -> Self {
        Self {
            profile,
            statements: profile.statements(),
            resolver,
            executor,
            span,
        }
    }

    /// Catalog over SQL Server, configured from the process environment.
    pub fn connect_to_mssql(
        profile: CatalogProfile,
        query_timeout: Option<Duration>,
        span: Span,
    ) -> Arc<Self> {
        let resolver = ConfigResolver::from_process_env(span.clone());
        let connector = Arc::new(MssqlConnector::new(span.clone()));
        let executor = QueryExecutor::new(connector, span.clone()).with_timeout(query_timeout);
        Arc::new(Self::new(profile, resolver, executor, span))
    }

    pub fn profile(&self) -> CatalogProfile {
        self.profile
    }

    /// Run arbitrary SQL text.
    pub async fn execute_sql(&self, query: &str) -> String {
        let result: GatewayResult<String> = async {
            let config = self.resolver.resolve()?;
            let outcome = self.executor.execute(&config, &Statement::new(query)).await?;
            Ok(format_outcome(&outcome))
        }
        .await;
        self.render("execute_sql", result, "Error executing query: ")
    }

    /// Trial balance by segment reference between two dates.
    pub async fn report_trial_balance(
        &self,
        start_date: &str,
        end_date: &str,
        account_id: &str,
    ) -> String {
        let result: GatewayResult<String> = async {
            let sql = self.require(
                self.statements.trial_balance,
                "report_trial_balance_by_seg_ref",
            )?;
            let config = self.resolver.resolve()?;
            let statement = Statement::new(sql)
                .with_param(start_date)
                .with_param(end_date)
                .with_param(account_id);
            let rows = self.fetch_rows(&config, &statement).await?;
            Ok(format_rows(&rows))
        }
        .await;
        self.render("report_trial_balance_by_seg_ref", result, "Error: ")
    }

    /// Count a user's security log entries in one year.
    pub async fn count_user_logins(&self, user_id: &str, year: &YearInput) -> String {
        let result: GatewayResult<String> = async {
            let sql = self.require(self.statements.count_user_logins, "count_user_logins")?;
            let config = self.resolver.resolve()?;
            let year = year.to_year()?;
            let statement = Statement::new(sql).with_param(user_id).with_param(year);
            let rows = self.fetch_rows(&config, &statement).await?;
            let count = match rows.scalar() {
                Some(SqlValue::Int(n)) => n.to_string(),
                Some(SqlValue::Decimal(n)) => n.clone(),
                other => {
                    return Err(GatewayError::execution(format!(
                        "Unexpected login count value: {}",
                        other.map_or("no rows", SqlValue::type_name)
                    )));
                }
            };
            Ok(format!("{} appeared {} times in {}", user_id, count, year))
        }
        .await;
        self.render("count_user_logins", result, "Error: ")
    }

    /// List base tables as `Schema,Table` lines.
    pub async fn list_tables(&self) -> String {
        let result: GatewayResult<String> = async {
            let sql = self.require(self.statements.list_tables, "list_sql_tables")?;
            let config = self.resolver.resolve()?;
            let rows = self.fetch_rows(&config, &Statement::new(sql)).await?;
            Ok(format_rows_or(&rows, NO_TABLES_IN_DATABASE))
        }
        .await;
        self.render("list_sql_tables", result, "Error listing tables: ")
    }

    /// First rows of one table.
    pub async fn preview_table(&self, table_name: &str) -> String {
        let result: GatewayResult<String> = async {
            if !self.statements.table_preview {
                return Err(self.unavailable("read_table_preview"));
            }
            let config = self.resolver.resolve()?;
            let table = identifier::validate(table_name)?;
            let statement = Statement::new(preview_sql(&table.to_string()));
            let rows = self.fetch_rows(&config, &statement).await?;
            Ok(format_rows_or(&rows, NO_DATA_IN_TABLE))
        }
        .await;
        let prefix = format!("Error reading table '{}': ", table_name);
        self.render("read_table_preview", result, &prefix)
    }

    /// Liveness probe.
    pub fn ping(&self) -> String {
        PONG.to_string()
    }

    async fn fetch_rows(
        &self,
        config: &ConnectionConfig,
        statement: &Statement,
    ) -> GatewayResult<ResultSet> {
        match self.executor.execute(config, statement).await? {
            ExecutionOutcome::Rows(rows) => Ok(rows),
            ExecutionOutcome::Affected(_) => Err(GatewayError::execution(
                "Statement did not return a result set",
            )),
        }
    }

    fn require(&self, sql: Option<&'static str>, operation: &str) -> GatewayResult<&'static str> {
        sql.ok_or_else(|| self.unavailable(operation))
    }

    fn unavailable(&self, operation: &str) -> GatewayError {
        GatewayError::internal(format!(
            "{} is not part of the {} catalog",
            operation, self.profile
        ))
    }

    fn render(&self, operation: &str, result: GatewayResult<String>, prefix: &str) -> String {
        match result {
            Ok(text) => {
                info!(parent: &self.span, operation, "Operation completed");
                text
            }
            Err(e) => {
                error!(
                    parent: &self.span,
                    operation,
                    error = %e,
                    kind = e.kind(),
                    "Operation failed"
                );
                format!("{}{}", prefix, e)
            }
        }
    }
}
