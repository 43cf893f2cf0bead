//! Query-related data models.
//!
//! This module defines statements, scalar values, and the outcome of a
//! single statement execution.

use crate::error::{GatewayError, GatewayResult};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@P([0-9]+)").expect("placeholder pattern is a valid regex")
});

/// A scalar value: a bound parameter or a fetched cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    /// Stored as i64 for maximum range
    Int(i64),
    Float(f64),
    /// Exact numeric kept in its textual form to avoid float rounding
    Decimal(String),
    Text(String),
    /// Rendered as base64
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<FixedOffset>),
    Date(NaiveDate),
    Time(NaiveTime),
}

impl SqlValue {
    /// Check if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this value for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Timestamp(_) => "timestamp",
            Self::TimestampTz(_) => "timestamptz",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Decimal(v) | Self::Text(v) => f.write_str(v),
            Self::Bytes(v) => f.write_str(&STANDARD.encode(v)),
            Self::Timestamp(v) => write!(f, "{v}"),
            Self::TimestampTz(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{v}"),
            Self::Time(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

/// SQL text plus positionally bound parameters (`@P1`, `@P2`, ...).
#[derive(Debug, Clone)]
pub struct Statement {
    pub text: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    /// Create a statement without parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }

    /// Add a parameter to this statement.
    pub fn with_param(mut self, param: impl Into<SqlValue>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Highest `@Pn` index referenced by the text.
    pub fn placeholder_count(&self) -> usize {
        PLACEHOLDER
            .captures_iter(&self.text)
            .filter_map(|c| c[1].parse::<usize>().ok())
            .max()
            .unwrap_or(0)
    }
}

/// Columns plus rows of a row-producing statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl ResultSet {
    /// Build a result set, rejecting rows whose width differs from the header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> GatewayResult<Self> {
        if let Some((index, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(GatewayError::internal(format!(
                "Row {} has {} values but the result has {} columns",
                index,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First cell of the first row, for scalar queries such as `COUNT(*)`.
    pub fn scalar(&self) -> Option<&SqlValue> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// What a statement produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The statement described a result set.
    Rows(ResultSet),
    /// The statement only modified data; engine-reported row count.
    Affected(u64),
}
