//! Batch inspection ahead of execution.
//!
//! Whether a statement produced rows is decided by the engine's column
//! description, never here. This module only decides whether the row-count
//! query may be appended to a batch: definitions of views, procedures,
//! functions and triggers have to be alone in their batch. Words are read
//! with the [sqlparser](https://docs.rs/sqlparser/) tokenizer in the MSSQL
//! dialect, so comments and quoted text are skipped.

use sqlparser::dialect::MsSqlDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

/// How a batch may be sent to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchShape {
    /// Further statements may follow it in the same batch
    Composable,
    /// `CREATE`/`ALTER` of an object that must be the only statement
    Standalone,
}

/// Objects whose definition must be the first and only statement of a batch.
const STANDALONE_OBJECTS: &[&str] = &[
    "VIEW",
    "PROCEDURE",
    "PROC",
    "FUNCTION",
    "TRIGGER",
    "SCHEMA",
    "DEFAULT",
    "RULE",
];

/// Inspect SQL text.
pub fn batch_shape(sql: &str) -> BatchShape {
    let words = leading_words(sql, 4);
    let mut words = words.iter().map(String::as_str);
    let object = match words.next() {
        Some("ALTER") => words.next(),
        Some("CREATE") => match words.next() {
            Some("OR") => words.nth(1),
            other => other,
        },
        _ => None,
    };
    match object {
        Some(object) if STANDALONE_OBJECTS.contains(&object) => BatchShape::Standalone,
        _ => BatchShape::Composable,
    }
}

/// Shorthand for `batch_shape(sql) == BatchShape::Composable`.
pub fn is_composable(sql: &str) -> bool {
    batch_shape(sql) == BatchShape::Composable
}

/// Up to `limit` leading words, uppercased, after comments and `;`/`(`.
///
/// Text the tokenizer rejects yields no words; the server reports the error.
fn leading_words(sql: &str, limit: usize) -> Vec<String> {
    let Ok(tokens) = Tokenizer::new(&MsSqlDialect {}, sql).tokenize() else {
        return Vec::new();
    };
    tokens
        .into_iter()
        .filter(|t| !matches!(t, Token::Whitespace(_)))
        .skip_while(|t| matches!(t, Token::SemiColon | Token::LParen))
        .map_while(|t| match t {
            Token::Word(word) => Some(word.value.to_ascii_uppercase()),
            _ => None,
        })
        .take(limit)
        .collect()
}
