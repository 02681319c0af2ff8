//! doctable - Relational tables over a document search engine
//!
//! This crate lets a relational query engine read document indices as typed tables through:
//! - Schema inference from index mappings and out-of-band array hints
//! - Document decoding with dotted-path, array and mixed-case handling
//! - Predicate pushdown into the engine's native query language
//! - Free-text search via `"table: query"` table names

pub mod config;
pub mod connector;
pub mod decoder;
pub mod doc_catalog;
pub mod pushdown;
pub mod source;

pub use config::ConnectorConfig;
pub use connector::Connector;
pub use decoder::{DecodedRow, DecodedValue};
pub use doc_catalog::{ColumnDescriptor, ConnectorError, RelationalType};
pub use pushdown::{ComparisonOp, Literal, Predicate, ScanPlan};
pub use source::{memory::InMemorySource, DocumentSource, SearchHit, SourceError};
