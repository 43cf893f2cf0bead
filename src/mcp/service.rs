//! MCP service implementation using rmcp.
//!
//! This module defines the GatewayService struct exposing the operation
//! catalog via the MCP protocol using the rmcp framework's macros. Which
//! tools are registered depends on the catalog profile.

use crate::tools::{CatalogProfile, OperationCatalog, YearInput};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    schemars::JsonSchema,
    tool, tool_handler, tool_router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Input for the execute_sql tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExecuteSqlInput {
    /// The SQL query to execute
    pub query: String,
}

/// Input for the report_trial_balance_by_seg_ref tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct TrialBalanceInput {
    /// Start date (YYYY-MM-DD)
    pub start_date: String,
    /// End date (YYYY-MM-DD)
    pub end_date: String,
    /// Account ID pattern, e.g. '7206-0000%'
    pub account_id: String,
}

/// Input for the count_user_logins tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct CountUserLoginsInput {
    /// User ID to search for
    pub user_id: String,
    /// Year to look under, as a number or a numeric string
    pub year: YearInput,
}

/// Input for the read_table_preview tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct TablePreviewInput {
    /// Table name, optionally schema-qualified (e.g. 'dbo.my_table')
    pub table_name: String,
}

fn text(output: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(output)]))
}

#[derive(Clone)]
pub struct GatewayService {
    /// Shared operation catalog
    catalog: Arc<OperationCatalog>,
    /// Tool router for MCP tool dispatch, assembled per profile
    tool_router: ToolRouter<Self>,
}

impl GatewayService {
    /// Create a service exposing the tools of the catalog's profile.
    pub fn new(catalog: Arc<OperationCatalog>) -> Self {
        let tool_router = match catalog.profile() {
            CatalogProfile::Reporting => Self::common_tools() + Self::reporting_tools(),
            CatalogProfile::Explorer => Self::common_tools() + Self::explorer_tools(),
        };
        Self {
            catalog,
            tool_router,
        }
    }

    /// Names of the registered tools, sorted.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        names
    }
}

#[tool_router(router = common_tools)]
impl GatewayService {
    #[tool(
        description = "Execute an SQL query on the MSSQL server.\nReturns results as CSV text, a rows-affected message for modifications, or an error message."
    )]
    async fn execute_sql(
        &self,
        Parameters(input): Parameters<ExecuteSqlInput>,
    ) -> Result<CallToolResult, McpError> {
        text(self.catalog.execute_sql(&input.query).await)
    }

    #[tool(
        description = "Count how many times a user_id appears in am_user_security_log in a given year."
    )]
    async fn count_user_logins(
        &self,
        Parameters(input): Parameters<CountUserLoginsInput>,
    ) -> Result<CallToolResult, McpError> {
        text(
            self.catalog
                .count_user_logins(&input.user_id, &input.year)
                .await,
        )
    }

    #[tool(description = "Returns pong.")]
    async fn ping(&self) -> Result<CallToolResult, McpError> {
        text(self.catalog.ping())
    }
}

#[tool_router(router = reporting_tools)]
impl GatewayService {
    #[tool(
        description = "Run the 'Trial Balance By Segment Reference' report for a date range and account ID pattern.\nReturns results as CSV text or an error message."
    )]
    async fn report_trial_balance_by_seg_ref(
        &self,
        Parameters(input): Parameters<TrialBalanceInput>,
    ) -> Result<CallToolResult, McpError> {
        text(
            self.catalog
                .report_trial_balance(&input.start_date, &input.end_date, &input.account_id)
                .await,
        )
    }
}

#[tool_router(router = explorer_tools)]
impl GatewayService {
    #[tool(
        description = "List all SQL Server user tables in the connected database as Schema,Table lines."
    )]
    async fn list_sql_tables(&self) -> Result<CallToolResult, McpError> {
        text(self.catalog.list_tables().await)
    }

    #[tool(
        description = "Preview up to 100 rows from a table (optionally schema-qualified, e.g. 'dbo.my_table').\nReturns CSV text or an error message."
    )]
    async fn read_table_preview(
        &self,
        Parameters(input): Parameters<TablePreviewInput>,
    ) -> Result<CallToolResult, McpError> {
        text(self.catalog.preview_table(&input.table_name).await)
    }
}

#[tool_handler]
impl ServerHandler for GatewayService {
    fn get_info(&self) -> ServerInfo {
        let profile = self.catalog.profile();
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: profile.server_name().to_owned(),
                title: Some("MSSQL MCP Gateway".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "SQL Server query tools. Every tool returns plain text.\n\
                \n\
                - Result sets are returned as comma-separated lines, header first.\n\
                - Modifications return `Query executed successfully. Rows affected: <n>`.\n\
                - Failures return a one-line message starting with `Error`.\n\
                - Call `ping` to check that the server is alive."
                    .to_string(),
            ),
        }
    }
}
