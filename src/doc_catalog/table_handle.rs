//! Table names with an optional free-text query suffix
//!
//! `"orders: +packages -slyly"` names the table `orders` restricted to the
//! documents matching the query string `" +packages -slyly"`. The query
//! text is kept verbatim; the engine's parser decides what it means.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableHandle {
    /// Index, alias or pattern name
    pub table: String,
    pub query: Option<String>,
}

impl TableHandle {
    /// Split at the first `:`; a blank query means no query
    pub fn parse(name: &str) -> Self {
        match name.split_once(':') {
            Some((table, query)) => TableHandle {
                table: table.trim().to_string(),
                query: (!query.trim().is_empty()).then(|| query.to_string()),
            },
            None => TableHandle {
                table: name.trim().to_string(),
                query: None,
            },
        }
    }
}

impl fmt::Display for TableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.query {
            Some(query) => write!(f, "{}:{}", self.table, query),
            None => write!(f, "{}", self.table),
        }
    }
}
