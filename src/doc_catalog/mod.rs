pub mod column_descriptor;
pub mod errors;
pub mod index_enumerator;
pub mod mapping;
pub mod schema_cache;
pub mod schema_resolver;
pub mod table_handle;
pub mod type_mapper;

// Re-export commonly used types
pub use column_descriptor::{find_column, ColumnDescriptor, HiddenColumn};
pub use errors::{ConnectorError, Result};
pub use schema_cache::{CacheMetrics, SchemaCache, SchemaCacheConfig};
pub use schema_resolver::SchemaResolver;
pub use table_handle::TableHandle;
pub use type_mapper::{map_type, RelationalType, RowField, UnsupportedTypePolicy};
