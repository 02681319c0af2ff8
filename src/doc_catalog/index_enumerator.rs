//! Table name to concrete index resolution
//!
//! A table is a direct index, an alias or a wildcard pattern. Every index it
//! resolves to is merged into one schema and scanned.

use std::collections::BTreeSet;

use log::debug;

use super::errors::{ConnectorError, Result};
use crate::source::{DocumentSource, SourceError};

/// Concrete indices behind `table`; none at all is `TableNotFound`
pub async fn resolve_indices(source: &dyn DocumentSource, table: &str) -> Result<BTreeSet<String>> {
    let not_found = || ConnectorError::TableNotFound {
        table: table.to_string(),
    };

    let indices = match source.list_indices(table).await {
        Ok(indices) => indices,
        Err(SourceError::IndexNotFound(_)) => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };
    if indices.is_empty() {
        return Err(not_found());
    }

    debug!("Table {} resolves to indices {:?}", table, indices);
    Ok(indices)
}
