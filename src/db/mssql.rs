//! SQL Server driver built on tiberius.
//!
//! Every connection runs with `IMPLICIT_TRANSACTIONS ON`, set in a plain
//! batch so the option stays on for the session. A batch is only persisted
//! by the explicit commit issued after it succeeds without a result set.
//! Closing a connection with an open transaction rolls it back on the server.
//!
//! Whether a batch produced rows is decided by the column metadata the
//! server sends. The affected count comes from `@@ROWCOUNT`, selected in
//! the same batch after the caller's statement.

use crate::db::classify::is_composable;
use crate::db::executor::{Connection, Connector};
use crate::error::{GatewayError, GatewayResult};
use crate::models::{AuthMode, ConnectionConfig, ExecutionOutcome, ResultSet, SqlValue, Statement};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use tiberius::{
    AuthMethod, Client, ColumnData, Config, EncryptionLevel, Query, QueryItem, QueryStream,
    SqlBrowser,
};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{Span, debug, info};

type MssqlClient = Client<Compat<TcpStream>>;

const ENABLE_IMPLICIT_TRANSACTIONS: &str = "SET IMPLICIT_TRANSACTIONS ON";
const COMMIT: &str = "IF @@TRANCOUNT > 0 COMMIT TRANSACTION";

/// Column of the trailing row-count result set.
const ROW_COUNT_COLUMN: &str = "gateway_rows_affected";
/// Appended after the caller's text; the newline ends a trailing `--` comment.
const ROW_COUNT_QUERY: &str = "\n;SELECT @@ROWCOUNT AS [gateway_rows_affected]";

/// Opens tiberius connections.
#[derive(Clone)]
pub struct MssqlConnector {
    span: Span,
}

impl MssqlConnector {
    pub fn new(span: Span) -> Self {
        Self { span }
    }
}

/// Build a tiberius Config from a ConnectionConfig.
fn build_config(config: &ConnectionConfig) -> GatewayResult<Config> {
    let mut tib_config = Config::new();
    let (host, instance) = config.host_and_instance();
    // "." is the local machine in SQL Server client syntax
    tib_config.host(if host == "." { "localhost" } else { host });
    match instance {
        // The port is resolved through the SQL Browser service
        Some(instance) => tib_config.instance_name(instance),
        None => tib_config.port(config.port),
    }
    tib_config.database(&config.database);
    tib_config.authentication(auth_method(&config.auth)?);
    tib_config.encryption(if config.encrypt {
        EncryptionLevel::Required
    } else {
        EncryptionLevel::Off
    });
    tib_config.trust_cert();
    tib_config.application_name("mssql-mcp-gateway");
    Ok(tib_config)
}

fn auth_method(auth: &AuthMode) -> GatewayResult<AuthMethod> {
    match auth {
        AuthMode::Credentialed { username, password } => {
            Ok(AuthMethod::sql_server(username, password.as_str()))
        }
        #[cfg(any(windows, feature = "integrated-auth-gssapi"))]
        AuthMode::Integrated => Ok(AuthMethod::Integrated),
        #[cfg(not(any(windows, feature = "integrated-auth-gssapi")))]
        AuthMode::Integrated => Err(GatewayError::execution(
            "Integrated authentication is not available in this build; \
             rebuild with the integrated-auth-gssapi feature or use SQL Server credentials",
        )),
    }
}

async fn open_tcp(config: &Config, named_instance: bool) -> GatewayResult<TcpStream> {
    let tcp = if named_instance {
        TcpStream::connect_named(config).await?
    } else {
        TcpStream::connect(config.get_addr()).await?
    };
    tcp.set_nodelay(true)?;
    Ok(tcp)
}

#[async_trait]
impl Connector for MssqlConnector {
    async fn connect(&self, config: &ConnectionConfig) -> GatewayResult<Box<dyn Connection>> {
        let tib_config = build_config(config)?;
        let named_instance = config.host_and_instance().1.is_some();

        let tcp = open_tcp(&tib_config, named_instance).await?;
        let mut client = match Client::connect(tib_config.clone(), tcp.compat_write()).await {
            Ok(client) => client,
            // Azure SQL gateways redirect the login to another node
            Err(tiberius::error::Error::Routing { host, port }) => {
                info!(parent: &self.span, host = %host, port, "Following server redirect");
                let mut routed = tib_config;
                routed.host(&host);
                routed.port(port);
                let tcp = open_tcp(&routed, false).await?;
                Client::connect(routed, tcp.compat_write()).await?
            }
            Err(e) => return Err(e.into()),
        };

        client
            .simple_query(ENABLE_IMPLICIT_TRANSACTIONS)
            .await?
            .into_results()
            .await?;
        debug!(
            parent: &self.span,
            host = %config.host,
            database = %config.database,
            auth_mode = config.auth.name(),
            "Connected"
        );

        Ok(Box::new(MssqlConnection {
            client,
            span: self.span.clone(),
        }))
    }
}

/// A single tiberius session.
pub struct MssqlConnection {
    client: MssqlClient,
    span: Span,
}

impl MssqlConnection {
    async fn commit(&mut self) -> GatewayResult<()> {
        self.client.simple_query(COMMIT).await?.into_results().await?;
        debug!(parent: &self.span, "Committed");
        Ok(())
    }
}

#[async_trait]
impl Connection for MssqlConnection {
    async fn run(&mut self, statement: &Statement) -> GatewayResult<ExecutionOutcome> {
        let counted = is_composable(&statement.text);
        let text = if counted {
            format!("{}{}", statement.text, ROW_COUNT_QUERY)
        } else {
            statement.text.clone()
        };

        let stream = if statement.params.is_empty() {
            self.client.simple_query(text).await?
        } else {
            bind_query(text, &statement.params).query(&mut self.client).await?
        };
        let sets = collect_results(stream).await?;

        let outcome = shape_outcome(sets, counted)?;
        if let ExecutionOutcome::Affected(_) = outcome {
            self.commit().await?;
        }
        Ok(outcome)
    }

    async fn close(self: Box<Self>) -> GatewayResult<()> {
        let MssqlConnection { client, .. } = *self;
        client.close().await?;
        Ok(())
    }
}

/// Columns and converted rows of one result set, in arrival order.
#[derive(Debug)]
struct RawResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl RawResultSet {
    fn is_row_count(&self) -> bool {
        self.columns.len() == 1 && self.columns[0] == ROW_COUNT_COLUMN
    }

    fn row_count(&self) -> Option<u64> {
        match self.rows.first()?.first()? {
            SqlValue::Int(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }
}

/// Drain a stream into its described result sets.
///
/// Statements without a column description add no set.
async fn collect_results(mut stream: QueryStream<'_>) -> GatewayResult<Vec<RawResultSet>> {
    let mut sets: Vec<RawResultSet> = Vec::new();
    while let Some(item) = stream.try_next().await? {
        match item {
            QueryItem::Metadata(meta) => sets.push(RawResultSet {
                columns: meta.columns().iter().map(|c| c.name().to_string()).collect(),
                rows: Vec::new(),
            }),
            QueryItem::Row(row) => {
                if let Some(set) = sets.last_mut() {
                    set.rows.push(convert_row(&row));
                }
            }
        }
    }
    Ok(sets)
}

/// Rows when the caller's batch described a result set, otherwise the count.
///
/// With `counted`, a trailing row-count set is split off first. It is absent
/// when the batch stopped early (`RETURN`), which reports zero rows affected.
fn shape_outcome(mut sets: Vec<RawResultSet>, counted: bool) -> GatewayResult<ExecutionOutcome> {
    let affected = if counted && sets.last().is_some_and(RawResultSet::is_row_count) {
        sets.pop().and_then(|set| set.row_count())
    } else {
        None
    };
    match sets.into_iter().next() {
        Some(first) => Ok(ExecutionOutcome::Rows(ResultSet::new(first.columns, first.rows)?)),
        None => Ok(ExecutionOutcome::Affected(affected.unwrap_or(0))),
    }
}

/// Bind statement parameters positionally to `@P1..@Pn`.
fn bind_query(text: String, params: &[SqlValue]) -> Query<'static> {
    let mut query = Query::new(text);
    for param in params {
        match param {
            SqlValue::Null => query.bind(Option::<String>::None),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Decimal(s) | SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Bytes(b) => query.bind(b.clone()),
            // Temporal values go over as text; SQL Server converts implicitly
            SqlValue::Timestamp(_)
            | SqlValue::TimestampTz(_)
            | SqlValue::Date(_)
            | SqlValue::Time(_) => query.bind(param.to_string()),
        }
    }
    query
}

/// Exact decimal text of `value / 10^scale`.
fn numeric_text(value: i128, scale: u8) -> String {
    if scale == 0 {
        return value.to_string();
    }
    let sign = if value < 0 { "-" } else { "" };
    let magnitude = value.unsigned_abs();
    let divisor = 10u128.pow(u32::from(scale));
    format!(
        "{}{}.{:0width$}",
        sign,
        magnitude / divisor,
        magnitude % divisor,
        width = usize::from(scale)
    )
}

fn convert_column_data(data: &ColumnData<'_>) -> SqlValue {
    match data {
        ColumnData::Bit(Some(b)) => SqlValue::Bool(*b),
        ColumnData::U8(Some(v)) => SqlValue::Int(i64::from(*v)),
        ColumnData::I16(Some(v)) => SqlValue::Int(i64::from(*v)),
        ColumnData::I32(Some(v)) => SqlValue::Int(i64::from(*v)),
        ColumnData::I64(Some(v)) => SqlValue::Int(*v),
        ColumnData::F32(Some(v)) => SqlValue::Float(f64::from(*v)),
        ColumnData::F64(Some(v)) => SqlValue::Float(*v),
        ColumnData::Numeric(Some(n)) => SqlValue::Decimal(numeric_text(n.value(), n.scale())),
        ColumnData::String(Some(s)) => SqlValue::Text(s.to_string()),
        ColumnData::Guid(Some(g)) => SqlValue::Text(g.to_string()),
        ColumnData::Binary(Some(b)) => SqlValue::Bytes(b.to_vec()),
        ColumnData::Xml(Some(xml)) => SqlValue::Text(xml.to_string()),
        _ => SqlValue::Null,
    }
}

/// Convert a tiberius Row, decoding temporal cells through chrono.
fn convert_row(row: &tiberius::Row) -> Vec<SqlValue> {
    row.cells()
        .enumerate()
        .map(|(i, (_col, data))| match data {
            ColumnData::DateTime(Some(_))
            | ColumnData::SmallDateTime(Some(_))
            | ColumnData::DateTime2(Some(_)) => row
                .try_get::<chrono::NaiveDateTime, _>(i)
                .ok()
                .flatten()
                .map_or(SqlValue::Null, SqlValue::Timestamp),
            ColumnData::DateTimeOffset(Some(_)) => row
                .try_get::<chrono::DateTime<chrono::FixedOffset>, _>(i)
                .ok()
                .flatten()
                .map_or(SqlValue::Null, SqlValue::TimestampTz),
            ColumnData::Date(Some(_)) => row
                .try_get::<chrono::NaiveDate, _>(i)
                .ok()
                .flatten()
                .map_or(SqlValue::Null, SqlValue::Date),
            ColumnData::Time(Some(_)) => row
                .try_get::<chrono::NaiveTime, _>(i)
                .ok()
                .flatten()
                .map_or(SqlValue::Null, SqlValue::Time),
            _ => convert_column_data(data),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use zeroize::Zeroizing;

    fn credentialed(host: &str) -> ConnectionConfig {
        ConnectionConfig {
            host: host.to_string(),
            port: 1433,
            database: "ledger".to_string(),
            auth: AuthMode::Credentialed {
                username: "sa".to_string(),
                password: Zeroizing::new("pw".to_string()),
            },
            encrypt: false,
        }
    }

    #[test]
    fn test_build_config_plain_host() {
        let config = build_config(&credentialed("db.internal")).unwrap();
        assert_eq!(config.get_addr(), "db.internal:1433");
    }

    #[test]
    fn test_build_config_local_named_instance() {
        let config = build_config(&credentialed(r".\MSSQLLocalDB")).unwrap();
        assert_eq!(config.get_addr(), "localhost:1434");
    }

    #[cfg(not(any(windows, feature = "integrated-auth-gssapi")))]
    #[test]
    fn test_integrated_unavailable_without_feature() {
        let mut config = credentialed("localhost");
        config.auth = AuthMode::Integrated;
        let err = build_config(&config).unwrap_err();
        assert!(matches!(err, GatewayError::Execution { .. }));
    }

    #[test]
    fn test_convert_column_data() {
        assert_eq!(convert_column_data(&ColumnData::I32(Some(7))), SqlValue::Int(7));
        assert_eq!(convert_column_data(&ColumnData::I32(None)), SqlValue::Null);
        assert_eq!(convert_column_data(&ColumnData::Bit(Some(true))), SqlValue::Bool(true));
        assert_eq!(
            convert_column_data(&ColumnData::String(Some(Cow::Borrowed("alice")))),
            SqlValue::Text("alice".into())
        );
        let numeric = tiberius::numeric::Numeric::new_with_scale(1250, 2);
        assert_eq!(
            convert_column_data(&ColumnData::Numeric(Some(numeric))),
            SqlValue::Decimal("12.50".into())
        );
    }

    #[test]
    fn test_numeric_text() {
        assert_eq!(numeric_text(1250, 2), "12.50");
        assert_eq!(numeric_text(-1250, 2), "-12.50");
        assert_eq!(numeric_text(-5, 2), "-0.05");
        assert_eq!(numeric_text(42, 0), "42");
        assert_eq!(numeric_text(0, 4), "0.0000");
    }

    #[test]
    fn test_bind_query_accepts_every_value() {
        let statement = Statement::new("SELECT @P1, @P2, @P3, @P4")
            .with_param("alice")
            .with_param(2023)
            .with_param(SqlValue::Null)
            .with_param(SqlValue::Bytes(vec![1, 2]));
        // Binding must not panic for any variant
        let _ = bind_query(statement.text.clone(), &statement.params);
    }

    fn set(columns: &[&str], rows: Vec<Vec<SqlValue>>) -> RawResultSet {
        RawResultSet {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    fn row_count(n: i64) -> RawResultSet {
        set(&[ROW_COUNT_COLUMN], vec![vec![SqlValue::Int(n)]])
    }

    #[test]
    fn test_write_without_result_set_reports_row_count() {
        let outcome = shape_outcome(vec![row_count(2)], true).unwrap();
        assert_eq!(outcome, ExecutionOutcome::Affected(2));
    }

    #[test]
    fn test_output_clause_rows_win_over_row_count() {
        // INSERT ... OUTPUT inserted.a VALUES (1), (2)
        let output = set(&["a"], vec![vec![SqlValue::Int(1)], vec![SqlValue::Int(2)]]);
        let outcome = shape_outcome(vec![output, row_count(2)], true).unwrap();
        let ExecutionOutcome::Rows(rows) = outcome else {
            panic!("expected rows, got {:?}", outcome);
        };
        assert_eq!(rows.columns(), ["a".to_string()]);
        assert_eq!(rows.row_count(), 2);
    }

    #[test]
    fn test_first_described_set_is_returned() {
        // sp_who, IF ... SELECT and mixed batches: the first set wins
        let first = set(&["spid"], vec![vec![SqlValue::Int(51)]]);
        let second = set(&["b"], vec![]);
        let outcome = shape_outcome(vec![first, second, row_count(1)], true).unwrap();
        let ExecutionOutcome::Rows(rows) = outcome else {
            panic!("expected rows, got {:?}", outcome);
        };
        assert_eq!(rows.columns(), ["spid".to_string()]);
    }

    #[test]
    fn test_empty_result_set_is_still_rows() {
        let outcome = shape_outcome(vec![set(&["a"], vec![]), row_count(0)], true).unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Rows(rows) if rows.is_empty()));
    }

    #[test]
    fn test_missing_row_count_reports_zero() {
        assert_eq!(shape_outcome(vec![], true).unwrap(), ExecutionOutcome::Affected(0));
        assert_eq!(shape_outcome(vec![], false).unwrap(), ExecutionOutcome::Affected(0));
    }

    #[test]
    fn test_uncounted_batch_keeps_lookalike_set() {
        let outcome = shape_outcome(vec![row_count(5)], false).unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Rows(_)));
    }
}
