//! Filter pushdown
//!
//! Splits a scan's predicates into a native query the document engine runs
//! and a remainder evaluated on decoded rows by [`residual::matches`].

pub mod predicate;
pub mod residual;
pub mod translator;

use log::debug;
use serde_json::{json, Value};

use crate::doc_catalog::column_descriptor::{find_column, ColumnDescriptor};
use crate::doc_catalog::errors::{ConnectorError, Result};
pub use predicate::{ComparisonOp, Literal, Predicate};
pub use translator::{query_string_query, translate, Translation};

#[derive(Debug, Clone, PartialEq)]
pub struct ScanPlan {
    /// Native query sent to every index of the table
    pub query: Value,
    /// Predicates to apply after decoding
    pub remaining: Vec<Predicate>,
}

impl ScanPlan {
    pub fn is_fully_pushed_down(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Plan the native query for `predicates` over `columns` of `table`
///
/// Predicates the translator rejects, or translates inexactly, end up in
/// [`ScanPlan::remaining`]. Only a reference to an unknown column fails.
pub fn plan_filters(
    table: &str,
    columns: &[ColumnDescriptor],
    predicates: &[Predicate],
    query: Option<&str>,
) -> Result<ScanPlan> {
    let mut filters = Vec::new();
    let mut remaining = Vec::new();

    for predicate in predicates {
        let column = find_column(columns, &predicate.column).ok_or_else(|| ConnectorError::ColumnNotFound {
            table: table.to_string(),
            column: predicate.column.clone(),
        })?;

        match translate(predicate, &column) {
            Ok(translation) => {
                filters.push(translation.filter);
                if !translation.exact {
                    remaining.push(predicate.clone());
                }
            }
            Err(e) if e.is_recoverable() => {
                debug!("Filtering `{}` after decoding: {}", predicate, e);
                remaining.push(predicate.clone());
            }
            Err(e) => return Err(e),
        }
    }

    let query = match (filters.is_empty(), query) {
        (true, None) => json!({ "match_all": {} }),
        (_, query) => {
            let mut bool_query = serde_json::Map::new();
            if !filters.is_empty() {
                bool_query.insert("filter".to_string(), Value::Array(filters));
            }
            if let Some(text) = query {
                bool_query.insert("must".to_string(), json!([query_string_query(text)]));
            }
            json!({ "bool": bool_query })
        }
    };

    Ok(ScanPlan { query, remaining })
}
