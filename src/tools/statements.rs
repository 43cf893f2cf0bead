//! Fixed statements and the catalog profiles that expose them.

use clap::ValueEnum;

/// Which operation set a server instance exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CatalogProfile {
    /// Ledger reporting: trial balance and login counts
    #[default]
    Reporting,
    /// Schema browsing: table listing and previews
    Explorer,
}

impl CatalogProfile {
    /// MCP server name advertised to clients.
    pub fn server_name(self) -> &'static str {
        match self {
            Self::Reporting => "mssql-mcp-reporting",
            Self::Explorer => "mssql-mcp-explorer",
        }
    }

    pub fn statements(self) -> StatementSet {
        match self {
            Self::Reporting => StatementSet::reporting(),
            Self::Explorer => StatementSet::explorer(),
        }
    }
}

impl std::fmt::Display for CatalogProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reporting => write!(f, "reporting"),
            Self::Explorer => write!(f, "explorer"),
        }
    }
}

/// Running balance of debits minus credits over a date range.
///
/// `@P1` start date, `@P2` end date, `@P3` account id LIKE pattern.
pub const TRIAL_BALANCE_BY_SEG_REF: &str = "\
WITH TransactionData AS (
    SELECT
        je.transaction_date AS [Date],
        je.journal_entry_id AS [Journal Entry],
        je.source_document_type AS [Doc. Type],
        je.source_document_id AS [Source Doc ID],
        jed.reference_number AS [Reference #],
        jed.source_reference_number AS [Source Ref #],
        jed.description AS [Description],
        je.backdated AS [Backdated],
        CASE WHEN jed.amount > 0 THEN jed.amount ELSE 0 END AS [Debits],
        CASE WHEN jed.amount < 0 THEN ABS(jed.amount) ELSE 0 END AS [Credits]
    FROM [dbo].[gl_journal_entry] je
    INNER JOIN [dbo].[gl_journal_entry_detail] jed
        ON je.journal_entry_id = jed.journal_entry_id
    WHERE je.transaction_date BETWEEN @P1 AND @P2
        AND jed.account_id LIKE @P3
)
SELECT
    [Date],
    [Journal Entry],
    [Doc. Type],
    [Source Doc ID],
    [Reference #],
    [Source Ref #],
    [Description],
    [Backdated],
    [Debits],
    [Credits],
    SUM([Debits] - [Credits]) OVER (ORDER BY [Date], [Journal Entry]) AS [Ending Balance]
FROM TransactionData
ORDER BY [Date], [Journal Entry]";

/// `@P1` user id, `@P2` year.
pub const COUNT_USER_LOGINS: &str = "\
SELECT COUNT(*) AS appearances
FROM am_user_security_log
WHERE user_id = @P1
    AND YEAR(date_time) = @P2";

pub const LIST_BASE_TABLES: &str = "\
SELECT TABLE_SCHEMA AS [Schema], TABLE_NAME AS [Table]
FROM INFORMATION_SCHEMA.TABLES
WHERE TABLE_TYPE = 'BASE TABLE'
ORDER BY TABLE_SCHEMA, TABLE_NAME";

/// Row cap for table previews.
pub const PREVIEW_ROW_LIMIT: u32 = 100;

/// The fixed statements one catalog instance may run.
///
/// `None` means the profile does not expose that operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementSet {
    pub trial_balance: Option<&'static str>,
    pub count_user_logins: Option<&'static str>,
    pub list_tables: Option<&'static str>,
    pub table_preview: bool,
}

impl StatementSet {
    pub fn reporting() -> Self {
        Self {
            trial_balance: Some(TRIAL_BALANCE_BY_SEG_REF),
            count_user_logins: Some(COUNT_USER_LOGINS),
            list_tables: None,
            table_preview: false,
        }
    }

    pub fn explorer() -> Self {
        Self {
            trial_balance: None,
            count_user_logins: Some(COUNT_USER_LOGINS),
            list_tables: Some(LIST_BASE_TABLES),
            table_preview: true,
        }
    }
}

/// Preview query for an already validated and quoted table reference.
pub fn preview_sql(quoted_table: &str) -> String {
    format!("SELECT TOP {} * FROM {}", PREVIEW_ROW_LIMIT, quoted_table)
}
