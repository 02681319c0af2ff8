//! Schema cache for resolved table schemas
//!
//! Resolving a table means listing its indices, fetching every mapping and
//! flattening them, so resolved column lists are cached per table.
//!
//! # Architecture
//!
//! Cache Key: table name (without any free-text query suffix)
//! Cache Value: mapping version of every backing index + shared column list
//!
//! An entry is valid only while each backing index still reports the
//! version it was resolved at. A stale entry is replaced, never mutated:
//! scans holding the old `Arc<[ColumnDescriptor]>` keep a consistent
//! snapshot.
//!
//! # Configuration
//!
//! - `DOCTABLE_SCHEMA_CACHE` (default: true)
//! - `DOCTABLE_SCHEMA_CACHE_MAX_ENTRIES` (default: 1000)

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use log::info;

use super::column_descriptor::ColumnDescriptor;
use crate::config::ConnectorConfig;

/// Mapping version per backing index
pub type IndexVersions = BTreeMap<String, u64>;

#[derive(Debug)]
struct CacheEntry {
    versions: IndexVersions,
    columns: Arc<[ColumnDescriptor]>,
    /// Logical clock value of the last access (for LRU)
    last_accessed: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct SchemaCacheConfig {
    pub enabled: bool,
    /// Maximum number of tables (LRU eviction)
    pub max_entries: usize,
}

impl Default for SchemaCacheConfig {
    fn default() -> Self {
        SchemaCacheConfig {
            enabled: true,
            max_entries: 1000,
        }
    }
}

impl From<&ConnectorConfig> for SchemaCacheConfig {
    fn from(config: &ConnectorConfig) -> Self {
        SchemaCacheConfig {
            enabled: config.schema_cache_enabled,
            max_entries: config.schema_cache_max_entries,
        }
    }
}

#[derive(Debug)]
pub struct SchemaCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    config: SchemaCacheConfig,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl SchemaCache {
    pub fn new(config: SchemaCacheConfig) -> Self {
        SchemaCache {
            entries: RwLock::new(HashMap::new()),
            config,
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(SchemaCacheConfig::default())
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Cached columns for `table`, if resolved at exactly `versions`
    pub fn get(&self, table: &str, versions: &IndexVersions) -> Option<Arc<[ColumnDescriptor]>> {
        if !self.config.enabled {
            return None;
        }

        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        match entries.get(table) {
            Some(entry) if &entry.versions == versions => {
                entry.last_accessed.store(self.tick(), Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(&entry.columns))
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Publish a freshly resolved column list, replacing any older entry
    ///
    /// May trigger LRU eviction if the cache is full
    pub fn insert(&self, table: &str, versions: IndexVersions, columns: Arc<[ColumnDescriptor]>) {
        if !self.config.enabled {
            return;
        }

        let entry = CacheEntry {
            versions,
            columns,
            last_accessed: AtomicU64::new(self.tick()),
        };

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if !entries.contains_key(table) && entries.len() >= self.config.max_entries {
            self.evict_lru(&mut entries);
        }
        entries.insert(table.to_string(), entry);
    }

    fn evict_lru(&self, entries: &mut HashMap<String, CacheEntry>) {
        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_accessed.load(Ordering::Relaxed))
            .map(|(table, _)| table.clone());
        if let Some(table) = oldest {
            entries.remove(&table);
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drop the entry for `table`; returns true if one was cached
    pub fn invalidate(&self, table: &str) -> bool {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(table)
            .is_some();
        if removed {
            info!("Schema cache entry for table {} invalidated", table);
        }
        removed
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn metrics(&self) -> CacheMetrics {
        let size = self.entries.read().unwrap_or_else(|e| e.into_inner()).len();
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size,
            max_entries: self.config.max_entries,
        }
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, PartialEq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub max_entries: usize,
}

impl CacheMetrics {
    /// Calculate cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
