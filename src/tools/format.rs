//! Output formatting for MCP tools.
//!
//! Every tool answers with plain text: result sets become comma-separated
//! lines, mutations become a fixed confirmation message. Cell values are not
//! quoted, so a value containing a comma or newline changes the line shape.

use crate::models::{ExecutionOutcome, ResultSet};

/// Returned by table previews when the table has no rows.
pub const NO_DATA_IN_TABLE: &str = "No data found in this table.";

/// Returned by table listings when the database has no base tables.
pub const NO_TABLES_IN_DATABASE: &str = "No tables found in this database.";

/// Header line followed by one line per row.
///
/// An empty result still produces the header line.
pub fn format_rows(result: &ResultSet) -> String {
    let mut lines = Vec::with_capacity(result.row_count() + 1);
    lines.push(result.columns().join(","));
    for row in result.rows() {
        let line = row
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(",");
        lines.push(line);
    }
    lines.join("\n")
}

pub fn format_affected(rows_affected: u64) -> String {
    format!("Query executed successfully. Rows affected: {}", rows_affected)
}

pub fn format_outcome(outcome: &ExecutionOutcome) -> String {
    match outcome {
        ExecutionOutcome::Rows(result) => format_rows(result),
        ExecutionOutcome::Affected(n) => format_affected(*n),
    }
}

/// Like [`format_rows`], but an empty result yields `sentinel`.
pub fn format_rows_or(result: &ResultSet, sentinel: &str) -> String {
    if result.is_empty() {
        sentinel.to_string()
    } else {
        format_rows(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SqlValue;

    fn result(columns: &[&str], rows: Vec<Vec<SqlValue>>) -> ResultSet {
        ResultSet::new(columns.iter().map(|c| c.to_string()).collect(), rows).unwrap()
    }

    #[test]
    fn test_format_rows() {
        let rs = result(
            &["a", "b"],
            vec![
                vec![SqlValue::Int(1), SqlValue::Int(2)],
                vec![SqlValue::Int(3), SqlValue::Int(4)],
            ],
        );
        assert_eq!(format_rows(&rs), "a,b\n1,2\n3,4");
    }

    #[test]
    fn test_format_rows_header_only() {
        let rs = result(&["Date", "Debits", "Credits"], vec![]);
        assert_eq!(format_rows(&rs), "Date,Debits,Credits");
    }

    #[test]
    fn test_format_rows_null_and_text() {
        let rs = result(
            &["name", "note"],
            vec![vec![SqlValue::Text("alice".into()), SqlValue::Null]],
        );
        assert_eq!(format_rows(&rs), "name,note\nalice,NULL");
    }

    #[test]
    fn test_embedded_comma_is_not_escaped() {
        let rs = result(&["d"], vec![vec![SqlValue::Text("x,y".into())]]);
        assert_eq!(format_rows(&rs), "d\nx,y");
    }

    #[test]
    fn test_format_affected() {
        assert_eq!(
            format_affected(5),
            "Query executed successfully. Rows affected: 5"
        );
        assert_eq!(
            format_outcome(&ExecutionOutcome::Affected(0)),
            "Query executed successfully. Rows affected: 0"
        );
    }

    #[test]
    fn test_format_rows_or_sentinel() {
        let empty = result(&["id"], vec![]);
        assert_eq!(format_rows_or(&empty, NO_DATA_IN_TABLE), NO_DATA_IN_TABLE);
        let one = result(&["id"], vec![vec![SqlValue::Int(9)]]);
        assert_eq!(format_rows_or(&one, NO_DATA_IN_TABLE), "id\n9");
    }
}
