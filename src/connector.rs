//! Connector facade
//!
//! Entry point for a query engine: table schemas, scan planning, document
//! decoding, and scans that drive a [`DocumentSource`] across every index
//! behind a table.
//!
//! # Example
//!
//! ```ignore
//! let source = Arc::new(InMemorySource::new());
//! let connector = Connector::new(source, ConnectorConfig::default());
//!
//! let columns = connector.get_table_schema("orders").await?;
//! let rows = connector
//!     .scan("orders: +packages -slyly", &["orderkey"], &[Predicate::equal("orderstatus", Literal::Varchar("F".into()))])
//!     .await?;
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::StreamExt;
use log::debug;

use crate::config::ConnectorConfig;
use crate::decoder::{self, DecodedRow};
use crate::doc_catalog::column_descriptor::{find_column, ColumnDescriptor};
use crate::doc_catalog::errors::{ConnectorError, Result};
use crate::doc_catalog::index_enumerator::resolve_indices;
use crate::doc_catalog::schema_cache::{CacheMetrics, IndexVersions, SchemaCache, SchemaCacheConfig};
use crate::doc_catalog::schema_resolver::SchemaResolver;
use crate::doc_catalog::table_handle::TableHandle;
use crate::pushdown::{plan_filters, residual, Predicate, ScanPlan};
use crate::source::{DocumentSource, SearchHit};

pub struct Connector {
    source: Arc<dyn DocumentSource>,
    config: ConnectorConfig,
    resolver: SchemaResolver,
    cache: SchemaCache,
}

/// Indices and columns of one table at one point in time
struct ResolvedTable {
    handle: TableHandle,
    indices: BTreeSet<String>,
    columns: Arc<[ColumnDescriptor]>,
}

impl Connector {
    pub fn new(source: Arc<dyn DocumentSource>, config: ConnectorConfig) -> Self {
        Connector {
            resolver: SchemaResolver::from_config(&config),
            cache: SchemaCache::new(SchemaCacheConfig::from(&config)),
            source,
            config,
        }
    }

    pub fn with_defaults(source: Arc<dyn DocumentSource>) -> Self {
        Self::new(source, ConnectorConfig::default())
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    async fn resolve_table(&self, table: &str) -> Result<ResolvedTable> {
        let handle = TableHandle::parse(table);
        let indices = resolve_indices(self.source.as_ref(), &handle.table).await?;

        let mut versions = IndexVersions::new();
        for index in &indices {
            versions.insert(index.clone(), self.source.mapping_version(index).await?);
        }
        if let Some(columns) = self.cache.get(&handle.table, &versions) {
            return Ok(ResolvedTable {
                handle,
                indices,
                columns,
            });
        }

        let mut mappings = Vec::with_capacity(indices.len());
        for index in &indices {
            mappings.push(self.source.fetch_mapping(index).await?);
        }
        let columns: Arc<[ColumnDescriptor]> = self.resolver.resolve_schema(&mappings)?.into();

        let resolved_versions = mappings
            .iter()
            .map(|m| (m.index.clone(), m.version))
            .collect();
        self.cache
            .insert(&handle.table, resolved_versions, Arc::clone(&columns));

        Ok(ResolvedTable {
            handle,
            indices,
            columns,
        })
    }

    /// Columns of `table`, sorted by name
    ///
    /// A free-text query suffix (`"orders: +packages"`) is ignored here.
    pub async fn get_table_schema(&self, table: &str) -> Result<Arc<[ColumnDescriptor]>> {
        Ok(self.resolve_table(table).await?.columns)
    }

    /// Look up one column, including the hidden `_id`, `_score` and `_source`
    pub async fn column(&self, table: &str, name: &str) -> Result<ColumnDescriptor> {
        let columns = self.get_table_schema(table).await?;
        find_column(&columns, name).ok_or_else(|| ConnectorError::ColumnNotFound {
            table: table.to_string(),
            column: name.to_string(),
        })
    }

    /// Native query plus the predicates left for row-level filtering
    pub async fn plan_scan(&self, table: &str, predicates: &[Predicate]) -> Result<ScanPlan> {
        let resolved = self.resolve_table(table).await?;
        plan_for(&resolved, predicates)
    }

    pub fn decode_batch(&self, hits: &[SearchHit], columns: &[ColumnDescriptor]) -> Vec<DecodedRow> {
        decoder::decode_batch(hits, columns)
    }

    /// Rows of `table` matching every predicate, projected to `column_names`
    pub async fn scan(
        &self,
        table: &str,
        column_names: &[&str],
        predicates: &[Predicate],
    ) -> Result<Vec<DecodedRow>> {
        let resolved = self.resolve_table(table).await?;
        let plan = plan_for(&resolved, predicates)?;

        // Projected columns first, then any extra column a residual predicate needs
        let mut decoded_columns = Vec::with_capacity(column_names.len());
        for name in column_names {
            decoded_columns.push(self.lookup(&resolved, name)?);
        }
        let projection: Vec<usize> = (0..decoded_columns.len()).collect();

        let mut residuals = Vec::with_capacity(plan.remaining.len());
        for predicate in &plan.remaining {
            let column = self.lookup(&resolved, &predicate.column)?;
            let position = match decoded_columns.iter().position(|c| c.name == column.name) {
                Some(position) => position,
                None => {
                    decoded_columns.push(column);
                    decoded_columns.len() - 1
                }
            };
            residuals.push((position, predicate));
        }

        debug!(
            "Scanning {} over {} index(es): query {}, {} residual predicate(s)",
            resolved.handle, resolved.indices.len(), plan.query, residuals.len()
        );

        let mut rows = Vec::new();
        for index in &resolved.indices {
            let mut hits = self
                .source
                .fetch_documents(index, &plan.query, self.config.scroll_size);
            while let Some(hit) = hits.next().await {
                let row = decoder::decode_hit(&hit?, &decoded_columns);
                if residuals
                    .iter()
                    .all(|(position, predicate)| residual::matches(predicate, row.get(*position)))
                {
                    rows.push(row.project(&projection));
                }
            }
        }
        Ok(rows)
    }

    /// Number of rows of `table` matching every predicate, summed across indices
    pub async fn count(&self, table: &str, predicates: &[Predicate]) -> Result<u64> {
        let resolved = self.resolve_table(table).await?;
        let plan = plan_for(&resolved, predicates)?;
        if !plan.is_fully_pushed_down() {
            return Ok(self.scan(table, &[], predicates).await?.len() as u64);
        }

        let mut total = 0;
        for index in &resolved.indices {
            total += self.source.count(index, &plan.query).await?;
        }
        Ok(total)
    }

    /// Forget the cached schema of `table`
    pub fn invalidate(&self, table: &str) -> bool {
        self.cache.invalidate(&TableHandle::parse(table).table)
    }

    pub fn cache_metrics(&self) -> CacheMetrics {
        self.cache.metrics()
    }

    fn lookup(&self, resolved: &ResolvedTable, name: &str) -> Result<ColumnDescriptor> {
        find_column(&resolved.columns, name).ok_or_else(|| ConnectorError::ColumnNotFound {
            table: resolved.handle.table.clone(),
            column: name.to_string(),
        })
    }
}

fn plan_for(resolved: &ResolvedTable, predicates: &[Predicate]) -> Result<ScanPlan> {
    plan_filters(
        &resolved.handle.table,
        &resolved.columns,
        predicates,
        resolved.handle.query.as_deref(),
    )
}
