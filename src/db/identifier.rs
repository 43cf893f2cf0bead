//! Table name validation and quoting.
//!
//! Identifiers cannot be bound as parameters, so a caller-supplied table name
//! is only ever interpolated after it passes [`validate`].

use crate::error::{GatewayError, GatewayResult};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_]+(\.[A-Za-z0-9_]+)?$").expect("identifier pattern is a valid regex")
});

/// A validated, bracket-quoted `object` or `schema.object` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedIdentifier {
    schema: Option<String>,
    object: String,
}

impl QualifiedIdentifier {
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn object(&self) -> &str {
        &self.object
    }
}

impl fmt::Display for QualifiedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "[{}].[{}]", schema, self.object),
            None => write!(f, "[{}]", self.object),
        }
    }
}

/// Validate a table name and quote each segment.
///
/// # Examples
///
/// ```
/// use mssql_mcp_gateway::db::identifier::validate;
///
/// assert_eq!(validate("dbo.accounts").unwrap().to_string(), "[dbo].[accounts]");
/// assert!(validate("accounts; DROP TABLE x").is_err());
/// ```
pub fn validate(name: &str) -> GatewayResult<QualifiedIdentifier> {
    if !IDENTIFIER.is_match(name) {
        return Err(GatewayError::invalid_identifier(name));
    }
    let identifier = match name.split_once('.') {
        Some((schema, object)) => QualifiedIdentifier {
            schema: Some(schema.to_string()),
            object: object.to_string(),
        },
        None => QualifiedIdentifier {
            schema: None,
            object: name.to_string(),
        },
    };
    Ok(identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_segment() {
        let id = validate("accounts").unwrap();
        assert_eq!(id.to_string(), "[accounts]");
        assert_eq!(id.schema(), None);
        assert_eq!(id.object(), "accounts");
    }

    #[test]
    fn test_two_segments() {
        let id = validate("dbo.accounts").unwrap();
        assert_eq!(id.to_string(), "[dbo].[accounts]");
        assert_eq!(id.schema(), Some("dbo"));
    }

    #[test]
    fn test_leading_digit_allowed() {
        assert_eq!(validate("2024_sales").unwrap().to_string(), "[2024_sales]");
    }

    #[test]
    fn test_rejects_injection() {
        let err = validate("accounts; DROP TABLE x").unwrap_err();
        assert!(err.to_string().contains("accounts; DROP TABLE x"));
    }

    #[test]
    fn test_rejects_malformed_names() {
        for name in [
            "",
            "a.b.c",
            "a.",
            ".a",
            "1bad name",
            "tab\tle",
            "accounts]",
            "[accounts]",
            "acc'ounts",
            "acc-ounts",
            "schéma.table",
            "accounts\n",
        ] {
            assert!(validate(name).is_err(), "{:?} should be rejected", name);
        }
    }
}
