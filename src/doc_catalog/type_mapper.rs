//! Relational type system for document engine fields
//!
//! Maps the native field types declared in an index mapping to the relational
//! column types exposed to the query engine.
//!
//! # Supported Types
//!
//! | native            | relational  |
//! |-------------------|-------------|
//! | `boolean`         | `boolean`   |
//! | `byte`            | `tinyint`   |
//! | `short`           | `smallint`  |
//! | `integer`         | `integer`   |
//! | `long`            | `bigint`    |
//! | `float`           | `real`      |
//! | `double`          | `double`    |
//! | `keyword`, `text` | `varchar`   |
//! | `binary`          | `varbinary` |
//! | `date`            | `timestamp` |
//! | `object`          | `row(...)`  |
//!
//! Dates are stored as epoch milliseconds and surface as naive timestamps;
//! no timezone conversion is applied. Any other native type maps to
//! [`RelationalType::Unsupported`], which the schema resolver either drops or
//! rejects depending on [`UnsupportedTypePolicy`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A named field of a ROW type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowField {
    pub name: String,
    pub field_type: RelationalType,
}

impl RowField {
    pub fn new(name: impl Into<String>, field_type: RelationalType) -> Self {
        RowField {
            name: name.into(),
            field_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationalType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Varchar,
    Varbinary,
    Timestamp,
    Row(Vec<RowField>),
    Array(Box<RelationalType>),
    /// Native type with no relational counterpart. Never reaches a published schema.
    Unsupported(String),
}

impl RelationalType {
    /// TINYINT through DOUBLE
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            RelationalType::TinyInt
                | RelationalType::SmallInt
                | RelationalType::Integer
                | RelationalType::BigInt
                | RelationalType::Real
                | RelationalType::Double
        )
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            RelationalType::Row(_) | RelationalType::Array(_) | RelationalType::Unsupported(_)
        )
    }

    pub fn is_supported(&self) -> bool {
        match self {
            RelationalType::Unsupported(_) => false,
            RelationalType::Array(element) => element.is_supported(),
            RelationalType::Row(fields) => fields.iter().all(|f| f.field_type.is_supported()),
            _ => true,
        }
    }

    /// Wrap into an ARRAY type when `is_array` is set
    pub fn array_if(self, is_array: bool) -> Self {
        if is_array {
            RelationalType::Array(Box::new(self))
        } else {
            self
        }
    }

    /// Find a ROW field by name, case-insensitively
    pub fn row_field(&self, name: &str) -> Option<&RowField> {
        match self {
            RelationalType::Row(fields) => fields
                .iter()
                .find(|f| f.name == name)
                .or_else(|| fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))),
            _ => None,
        }
    }
}

impl fmt::Display for RelationalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationalType::Boolean => write!(f, "boolean"),
            RelationalType::TinyInt => write!(f, "tinyint"),
            RelationalType::SmallInt => write!(f, "smallint"),
            RelationalType::Integer => write!(f, "integer"),
            RelationalType::BigInt => write!(f, "bigint"),
            RelationalType::Real => write!(f, "real"),
            RelationalType::Double => write!(f, "double"),
            RelationalType::Varchar => write!(f, "varchar"),
            RelationalType::Varbinary => write!(f, "varbinary"),
            RelationalType::Timestamp => write!(f, "timestamp"),
            RelationalType::Row(fields) => {
                write!(f, "row(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", field.name, field.field_type)?;
                }
                write!(f, ")")
            }
            RelationalType::Array(element) => write!(f, "array({})", element),
            RelationalType::Unsupported(name) => write!(f, "unsupported({})", name),
        }
    }
}

/// What to do with a field whose native type has no relational mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedTypePolicy {
    /// Drop the column from the table schema
    #[default]
    Omit,
    /// Fail schema resolution
    Reject,
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("Unknown unsupported-type policy: '{0}'. Supported: omit, reject")]
pub struct UnknownPolicyError(String);

impl std::str::FromStr for UnsupportedTypePolicy {
    type Err = UnknownPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim() {
            "omit" => Ok(UnsupportedTypePolicy::Omit),
            "reject" => Ok(UnsupportedTypePolicy::Reject),
            _ => Err(UnknownPolicyError(s.to_string())),
        }
    }
}

/// Map a native field type name to a relational type
///
/// Object types map to an empty ROW here; the schema resolver fills in the
/// fields from the mapped children.
///
/// # Example
///
/// ```ignore
/// assert_eq!(map_type("long"), RelationalType::BigInt);
/// assert_eq!(map_type("keyword"), RelationalType::Varchar);
/// assert_eq!(map_type("geo_point"), RelationalType::Unsupported("geo_point".into()));
/// ```
pub fn map_type(native_type: &str) -> RelationalType {
    match native_type {
        "boolean" => RelationalType::Boolean,
        "byte" => RelationalType::TinyInt,
        "short" => RelationalType::SmallInt,
        "integer" => RelationalType::Integer,
        "long" => RelationalType::BigInt,
        "float" => RelationalType::Real,
        "double" => RelationalType::Double,
        "keyword" | "text" => RelationalType::Varchar,
        "binary" => RelationalType::Varbinary,
        "date" => RelationalType::Timestamp,
        "object" | "nested" => RelationalType::Row(Vec::new()),
        other => RelationalType::Unsupported(other.to_string()),
    }
}

/// True for native string types that go through an analyzer
pub fn is_analyzed(native_type: &str) -> bool {
    native_type == "text"
}
