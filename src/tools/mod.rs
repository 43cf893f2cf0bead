//! MCP tool implementations.
//!
//! - `catalog`: the operations behind every tool
//! - `statements`: fixed SQL and the catalog profiles
//! - `format`: text rendering of results

pub mod catalog;
pub mod format;
pub mod statements;

pub use catalog::{OperationCatalog, PONG, YearInput};
pub use statements::{CatalogProfile, StatementSet};
