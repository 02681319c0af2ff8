use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

use crate::doc_catalog::type_mapper::UnsupportedTypePolicy;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Connector configuration with validation
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Documents fetched per search page
    #[validate(range(
        min = 1,
        max = 10000,
        message = "Scroll size must be between 1 and 10000"
    ))]
    pub scroll_size: usize,

    /// Key under the mapping's `_meta` holding array hints
    #[validate(length(min = 1, message = "Array hint namespace cannot be empty"))]
    pub array_hint_namespace: String,

    /// What to do with fields of unsupported native types
    pub unsupported_types: UnsupportedTypePolicy,

    /// Whether resolved table schemas are cached
    pub schema_cache_enabled: bool,

    /// Maximum number of cached table schemas
    #[validate(range(min = 1, message = "Schema cache must hold at least one table"))]
    pub schema_cache_max_entries: usize,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            scroll_size: 1000,
            array_hint_namespace: "doctable".to_string(),
            unsupported_types: UnsupportedTypePolicy::Omit,
            schema_cache_enabled: true,
            schema_cache_max_entries: 1000,
        }
    }
}

impl ConnectorConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            scroll_size: parse_env_var("DOCTABLE_SCROLL_SIZE", "1000")?,
            array_hint_namespace: env::var("DOCTABLE_ARRAY_HINT_NAMESPACE")
                .unwrap_or_else(|_| "doctable".to_string()),
            unsupported_types: parse_env_var("DOCTABLE_UNSUPPORTED_TYPES", "omit")?,
            schema_cache_enabled: parse_env_var("DOCTABLE_SCHEMA_CACHE", "true")?,
            schema_cache_max_entries: parse_env_var("DOCTABLE_SCHEMA_CACHE_MAX_ENTRIES", "1000")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
