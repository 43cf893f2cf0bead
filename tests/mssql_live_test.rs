//! Tests against a running SQL Server.
//!
//! Set TEST_MSSQL_SERVER, TEST_MSSQL_USER, TEST_MSSQL_PASSWORD and
//! TEST_MSSQL_DATABASE (optionally TEST_MSSQL_PORT) to run them.
//! Example: TEST_MSSQL_SERVER=localhost TEST_MSSQL_USER=sa TEST_MSSQL_PASSWORD=...
//! TEST_MSSQL_DATABASE=master

use mssql_mcp_gateway::db::{ConfigResolver, MssqlConnector, QueryExecutor};
use mssql_mcp_gateway::tools::{CatalogProfile, OperationCatalog};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::Span;

/// Map TEST_MSSQL_* onto the MSSQL_* names the resolver reads.
fn live_env() -> Option<HashMap<String, String>> {
    let mut env = HashMap::new();
    for key in ["SERVER", "USER", "PASSWORD", "DATABASE"] {
        let value = std::env::var(format!("TEST_MSSQL_{key}")).ok()?;
        env.insert(format!("MSSQL_{key}"), value);
    }
    if let Ok(port) = std::env::var("TEST_MSSQL_PORT") {
        env.insert("MSSQL_PORT".to_string(), port);
    }
    Some(env)
}

fn live_catalog(profile: CatalogProfile, timeout: Option<Duration>) -> Option<OperationCatalog> {
    let Some(env) = live_env() else {
        eprintln!("Skipping test: TEST_MSSQL_* not set");
        return None;
    };
    let resolver = ConfigResolver::new(Arc::new(env), Span::none());
    let executor = QueryExecutor::new(Arc::new(MssqlConnector::new(Span::none())), Span::none())
        .with_timeout(timeout);
    Some(OperationCatalog::new(profile, resolver, executor, Span::none()))
}

#[tokio::test]
async fn test_live_select() {
    let Some(catalog) = live_catalog(CatalogProfile::Explorer, None) else {
        return;
    };
    assert_eq!(
        catalog.execute_sql("SELECT 1 AS a, 'x' AS b, NULL AS c").await,
        "a,b,c\n1,x,NULL"
    );
}

#[tokio::test]
async fn test_live_mutation_is_committed() {
    let Some(catalog) = live_catalog(CatalogProfile::Explorer, None) else {
        return;
    };

    let _ = catalog.execute_sql("DROP TABLE IF EXISTS gateway_live_test").await;
    assert_eq!(
        catalog
            .execute_sql("CREATE TABLE gateway_live_test (id INT PRIMARY KEY, name NVARCHAR(50))")
            .await,
        "Query executed successfully. Rows affected: 0"
    );
    assert_eq!(
        catalog
            .execute_sql("INSERT INTO gateway_live_test VALUES (1, 'a'), (2, 'b')")
            .await,
        "Query executed successfully. Rows affected: 2"
    );

    // A separate connection must see the committed rows
    assert_eq!(
        catalog.preview_table("dbo.gateway_live_test").await,
        "id,name\n1,a\n2,b"
    );

    let _ = catalog.execute_sql("DROP TABLE gateway_live_test").await;
}

#[tokio::test]
async fn test_live_output_clause_returns_rows() {
    let Some(catalog) = live_catalog(CatalogProfile::Explorer, None) else {
        return;
    };
    let output = catalog
        .execute_sql(
            "DECLARE @t TABLE (id INT); \
             INSERT INTO @t (id) OUTPUT inserted.id VALUES (1), (2)",
        )
        .await;
    assert_eq!(output, "id\n1\n2");
}

#[tokio::test]
async fn test_live_conditional_select_returns_rows() {
    let Some(catalog) = live_catalog(CatalogProfile::Explorer, None) else {
        return;
    };
    assert_eq!(catalog.execute_sql("IF 1 = 1 SELECT 1 AS a").await, "a\n1");
    let output = catalog.execute_sql("sp_who").await;
    assert!(output.starts_with("spid,"), "{}", output);
}

#[tokio::test]
async fn test_live_row_batch_is_not_committed() {
    let Some(catalog) = live_catalog(CatalogProfile::Explorer, None) else {
        return;
    };

    let _ = catalog.execute_sql("DROP TABLE IF EXISTS gateway_live_tx").await;
    catalog
        .execute_sql("CREATE TABLE gateway_live_tx (id INT PRIMARY KEY)")
        .await;
    assert_eq!(
        catalog
            .execute_sql("INSERT INTO gateway_live_tx VALUES (1); SELECT 1 AS a")
            .await,
        "a\n1"
    );

    // The insert was rolled back when its connection closed
    assert_eq!(
        catalog.preview_table("dbo.gateway_live_tx").await,
        "No data found in this table."
    );

    let _ = catalog.execute_sql("DROP TABLE gateway_live_tx").await;
}

#[tokio::test]
async fn test_live_datetimeoffset_keeps_offset() {
    let Some(catalog) = live_catalog(CatalogProfile::Explorer, None) else {
        return;
    };
    let output = catalog
        .execute_sql("SELECT CAST('2024-01-02 03:04:05 +02:00' AS DATETIMEOFFSET) AS t")
        .await;
    assert!(output.starts_with("t\n2024-01-02"), "{}", output);
    assert!(output.contains("+02:00"), "{}", output);
}

#[tokio::test]
async fn test_live_engine_error() {
    let Some(catalog) = live_catalog(CatalogProfile::Explorer, None) else {
        return;
    };
    let output = catalog.execute_sql("SELECT * FROM gateway_missing_table").await;
    assert!(output.starts_with("Error executing query: "), "{}", output);
    assert!(output.contains("gateway_missing_table"), "{}", output);
}

#[tokio::test]
async fn test_live_list_tables_header() {
    let Some(catalog) = live_catalog(CatalogProfile::Explorer, None) else {
        return;
    };
    let output = catalog.list_tables().await;
    assert!(
        output.starts_with("Schema,Table") || output == "No tables found in this database.",
        "{}",
        output
    );
}

#[tokio::test]
async fn test_live_timeout() {
    let Some(catalog) = live_catalog(CatalogProfile::Explorer, Some(Duration::from_secs(1))) else {
        return;
    };
    let output = catalog.execute_sql("WAITFOR DELAY '00:00:05'; SELECT 1").await;
    assert!(output.starts_with("Error executing query: Query execution exceeded"), "{}", output);
}
