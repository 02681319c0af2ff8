//! Column metadata for document-backed tables
//!
//! A [`ColumnDescriptor`] ties a relational column name to the dotted source
//! path of a field in the document engine. Descriptors are built once per
//! table by the schema resolver and shared read-only between scans.

use serde::{Deserialize, Serialize};

use super::type_mapper::{is_analyzed, RelationalType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Relational-facing name, lower-cased
    pub name: String,
    /// Source path with original casing, e.g. `fields.fieldA`
    pub dotted_path: String,
    /// Element type when `is_array` is set
    pub column_type: RelationalType,
    pub is_array: bool,
    /// Native field type from the mapping (`keyword`, `text`, `long`, ...)
    #[serde(default)]
    pub native_type: Option<String>,
    /// Metadata pseudo-column such as `_score`
    #[serde(default)]
    pub hidden: bool,
}

impl ColumnDescriptor {
    pub fn new(dotted_path: impl Into<String>, column_type: RelationalType, is_array: bool) -> Self {
        let dotted_path = dotted_path.into();
        ColumnDescriptor {
            name: dotted_path.to_lowercase(),
            dotted_path,
            column_type,
            is_array,
            native_type: None,
            hidden: false,
        }
    }

    pub fn with_native_type(mut self, native_type: impl Into<String>) -> Self {
        self.native_type = Some(native_type.into());
        self
    }

    /// Full relational type, wrapped in ARRAY for array columns
    pub fn relational_type(&self) -> RelationalType {
        self.column_type.clone().array_if(self.is_array)
    }

    /// True for analyzed (`text`) string fields
    pub fn is_analyzed(&self) -> bool {
        self.native_type.as_deref().is_some_and(is_analyzed)
    }
}

/// Metadata pseudo-columns available on every table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiddenColumn {
    /// Document id
    Id,
    /// Relevance score of the hit
    Score,
    /// Raw document JSON
    Source,
}

impl HiddenColumn {
    pub const ALL: [HiddenColumn; 3] = [HiddenColumn::Id, HiddenColumn::Score, HiddenColumn::Source];

    pub fn name(&self) -> &'static str {
        match self {
            HiddenColumn::Id => "_id",
            HiddenColumn::Score => "_score",
            HiddenColumn::Source => "_source",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|h| h.name().eq_ignore_ascii_case(name))
    }

    pub fn descriptor(&self) -> ColumnDescriptor {
        let (column_type, native_type) = match self {
            HiddenColumn::Id => (RelationalType::Varchar, "keyword"),
            HiddenColumn::Score => (RelationalType::Real, "float"),
            HiddenColumn::Source => (RelationalType::Varchar, "keyword"),
        };
        ColumnDescriptor {
            hidden: true,
            ..ColumnDescriptor::new(self.name(), column_type, false).with_native_type(native_type)
        }
    }
}

/// Look up a column by name: exact match first, then case-insensitive,
/// then the hidden pseudo-columns
pub fn find_column(columns: &[ColumnDescriptor], name: &str) -> Option<ColumnDescriptor> {
    columns
        .iter()
        .find(|c| c.name == name)
        .or_else(|| columns.iter().find(|c| c.name.eq_ignore_ascii_case(name)))
        .cloned()
        .or_else(|| HiddenColumn::from_name(name).map(|h| h.descriptor()))
}
