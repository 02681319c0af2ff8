//! Document engine client capability
//!
//! The connector never talks to the document engine directly. Index
//! enumeration, mapping fetches and searches go through a [`DocumentSource`]
//! supplied by the caller, so the core can run against a live cluster client
//! or against [`memory::InMemorySource`] in tests.
//!
//! Errors are reported as [`SourceError`] and propagated unchanged; the core
//! never retries a request.

use std::collections::BTreeSet;

use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod memory;
mod query_string;

/// Page size used when counting by draining a search
const COUNT_PAGE_SIZE: usize = 1000;

/// Errors raised by a document engine client
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    /// The engine rejected a free-text query; carries the engine's parser message
    #[error("{0}")]
    QueryParse(String),
    #[error("no such index [{0}]")]
    IndexNotFound(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Request timed out")]
    Timeout,
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Mapping of one concrete index as returned by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMapping {
    pub index: String,
    /// The `properties` object of the mapping
    pub properties: Value,
    /// The `_meta` object of the mapping, which carries array hints
    #[serde(default)]
    pub meta: Option<Value>,
    /// Bumped by the engine whenever the mapping changes
    #[serde(default)]
    pub version: u64,
}

impl IndexMapping {
    /// Split a raw `{"_meta": {..}, "properties": {..}}` mapping document
    pub fn from_mapping_json(index: impl Into<String>, mapping: &Value, version: u64) -> Self {
        IndexMapping {
            index: index.into(),
            properties: mapping
                .get("properties")
                .cloned()
                .unwrap_or_else(|| Value::Object(Default::default())),
            meta: mapping.get("_meta").cloned(),
            version,
        }
    }

    /// Array hint overlay stored under `_meta.<namespace>`
    pub fn array_hints(&self, namespace: &str) -> Option<&Value> {
        self.meta.as_ref().and_then(|meta| meta.get(namespace))
    }
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub index: String,
    pub id: String,
    pub score: Option<f32>,
    pub source: Value,
}

/// Client capability the connector is driven through
///
/// `fetch_documents` returns a lazy stream of hits; a stream can't be
/// rewound, so a restart means a fresh call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Resolve an index name, alias, or wildcard pattern to concrete indices
    async fn list_indices(&self, name: &str) -> SourceResult<BTreeSet<String>>;

    async fn fetch_mapping(&self, index: &str) -> SourceResult<IndexMapping>;

    /// Current mapping version of an index
    async fn mapping_version(&self, index: &str) -> SourceResult<u64> {
        Ok(self.fetch_mapping(index).await?.version)
    }

    fn fetch_documents(
        &self,
        index: &str,
        query: &Value,
        page_size: usize,
    ) -> BoxStream<'static, SourceResult<SearchHit>>;

    /// Number of documents in `index` matching `query`
    async fn count(&self, index: &str, query: &Value) -> SourceResult<u64> {
        let mut hits = self.fetch_documents(index, query, COUNT_PAGE_SIZE);
        let mut total = 0;
        while let Some(hit) = hits.next().await {
            hit?;
            total += 1;
        }
        Ok(total)
    }
}
