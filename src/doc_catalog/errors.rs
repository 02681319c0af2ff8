//! # Connector Error Types
//!
//! Error handling for schema discovery, predicate pushdown and scans over
//! document engine indices.
//!
//! ## Error Categories
//!
//! - **Schema Errors**: conflicting or unsupported field types across indices
//! - **Lookup Errors**: table names that resolve to no index
//! - **Pushdown Errors**: predicates the native query language cannot express
//! - **Source Errors**: failures reported by the document engine client
//!
//! `UnsupportedPredicate` is recoverable: the scan planner keeps the predicate
//! for row-level filtering instead of surfacing it. `MalformedQueryString`
//! displays the engine's parser message as-is.
//!
//! ```ignore
//! // Operational context for a mapping that could not be read
//! ConnectorError::invalid_mapping_with_context(
//!     "orders",
//!     "properties must be an object",
//! )
//! ```

use thiserror::Error;

use crate::source::SourceError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConnectorError {
    #[error("Conflicting types for field `{path}`: {left} vs {right}")]
    SchemaConflict {
        path: String,
        left: String,
        right: String,
    },
    #[error("Table not found: {table}")]
    TableNotFound { table: String },
    #[error("Column `{column}` not found in table {table}")]
    ColumnNotFound { table: String, column: String },
    #[error("Predicate on column `{column}` cannot be pushed down: {reason}")]
    UnsupportedPredicate { column: String, reason: String },
    /// Message comes verbatim from the document engine's query parser.
    #[error("{0}")]
    MalformedQueryString(String),
    #[error("Unsupported type `{native_type}` for field `{path}`")]
    UnsupportedType { path: String, native_type: String },
    #[error("Invalid mapping for index `{index}`: {message}")]
    InvalidMapping { index: String, message: String },
    #[error(transparent)]
    Source(SourceError),
}

pub type Result<T> = std::result::Result<T, ConnectorError>;

impl From<SourceError> for ConnectorError {
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::QueryParse(message) => ConnectorError::MalformedQueryString(message),
            other => ConnectorError::Source(other),
        }
    }
}

/// Helper methods for creating errors with context information
impl ConnectorError {
    /// Create an UnsupportedPredicate error for a column
    ///
    /// # Example
    /// ```ignore
    /// ConnectorError::unsupported_predicate("text_column", "range on analyzed text")
    /// ```
    pub fn unsupported_predicate(column: impl Into<String>, reason: impl Into<String>) -> Self {
        ConnectorError::UnsupportedPredicate {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidMapping error with context information
    pub fn invalid_mapping_with_context(
        index: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        let index = index.into();
        let ctx = context.into();
        ConnectorError::InvalidMapping {
            message: format!("failed to read mapping\n  Context: {}", ctx),
            index,
        }
    }

    /// True for errors the scan planner recovers from locally
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ConnectorError::UnsupportedPredicate { .. })
    }
}
