//! Schema resolution for document-backed tables
//!
//! Turns index mappings into the column list of one logical table:
//!
//! 1. parse each mapping into a [`MappingTree`] with array hints applied
//! 2. flatten depth-first into one [`ColumnDescriptor`] per leaf
//! 3. merge the columns of every index behind the table
//!
//! A leaf is a scalar field, an object without properties (an empty ROW), or
//! an array-hinted object, which stays whole as `ARRAY(ROW(..))` so that
//! element-wise access like `c.f[1].g[2]` keeps working.
//!
//! # Name collisions
//!
//! Column names are lower-cased dotted paths. When two leaves of an index
//! differ only by case, the first one in mapping order wins and the later
//! one is dropped with a warning. Across indices, columns with the same name
//! merge: types must agree (ROW types merge field by field), array hints
//! combine permissively.
//!
//! Literally dotted field names (`"a.b": {"c": ..}`) in documents are
//! handled by the decoder, not here: the schema always carries one canonical
//! dotted path per column.

use std::collections::{BTreeMap, HashSet};

use log::{debug, warn};

use super::column_descriptor::ColumnDescriptor;
use super::errors::{ConnectorError, Result};
use super::mapping::{MappingNode, MappingNodeKind, MappingTree};
use super::type_mapper::{map_type, RelationalType, RowField, UnsupportedTypePolicy};
use crate::config::ConnectorConfig;
use crate::source::IndexMapping;

#[derive(Debug, Clone)]
pub struct SchemaResolver {
    policy: UnsupportedTypePolicy,
    array_hint_namespace: String,
}

impl SchemaResolver {
    pub fn new(policy: UnsupportedTypePolicy, array_hint_namespace: impl Into<String>) -> Self {
        SchemaResolver {
            policy,
            array_hint_namespace: array_hint_namespace.into(),
        }
    }

    pub fn from_config(config: &ConnectorConfig) -> Self {
        Self::new(config.unsupported_types, config.array_hint_namespace.clone())
    }

    /// Resolve the columns of a table backed by `mappings`, sorted by name
    pub fn resolve_schema(&self, mappings: &[IndexMapping]) -> Result<Vec<ColumnDescriptor>> {
        let mut merged: BTreeMap<String, ColumnDescriptor> = BTreeMap::new();

        for mapping in mappings {
            for column in self.resolve_index(mapping)? {
                match merged.get_mut(&column.name) {
                    None => {
                        merged.insert(column.name.clone(), column);
                    }
                    Some(existing) => merge_column(existing, column)?,
                }
            }
        }

        debug!(
            "Resolved {} columns from {} index mapping(s)",
            merged.len(),
            mappings.len()
        );
        Ok(merged.into_values().collect())
    }

    /// Columns of a single index, in mapping order
    pub fn resolve_index(&self, mapping: &IndexMapping) -> Result<Vec<ColumnDescriptor>> {
        let tree = MappingTree::parse(mapping, &self.array_hint_namespace)?;

        let mut columns = Vec::new();
        for (name, node) in &tree.roots {
            self.flatten("", name, node, &mut columns)?;
        }

        let mut seen = HashSet::new();
        columns.retain(|column| {
            let first = seen.insert(column.name.clone());
            if !first {
                warn!(
                    "Index {}: field `{}` differs only by case from an earlier field; keeping the first",
                    tree.index, column.dotted_path
                );
            }
            first
        });
        Ok(columns)
    }

    fn flatten(
        &self,
        prefix: &str,
        name: &str,
        node: &MappingNode,
        out: &mut Vec<ColumnDescriptor>,
    ) -> Result<()> {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix, name)
        };

        match &node.kind {
            MappingNodeKind::Field { native_type } => {
                if let Some(column_type) = self.scalar_type(&path, native_type)? {
                    out.push(
                        ColumnDescriptor::new(path, column_type, node.is_array)
                            .with_native_type(native_type.as_str()),
                    );
                }
            }
            MappingNodeKind::Object { children } if node.is_array || children.is_empty() => {
                let row = self.row_type(&path, children)?;
                if children.is_empty() || row != RelationalType::Row(Vec::new()) {
                    out.push(ColumnDescriptor::new(path, row, node.is_array).with_native_type("object"));
                }
            }
            MappingNodeKind::Object { children } => {
                for (child_name, child) in children {
                    self.flatten(&path, child_name, child, out)?;
                }
            }
        }
        Ok(())
    }

    /// ROW type of an object's children; unsupported fields follow the policy
    fn row_type(&self, path: &str, children: &[(String, MappingNode)]) -> Result<RelationalType> {
        let mut fields: Vec<RowField> = Vec::new();
        for (name, child) in children {
            let child_path = format!("{}.{}", path, name);
            let field_type = match &child.kind {
                MappingNodeKind::Field { native_type } => {
                    match self.scalar_type(&child_path, native_type)? {
                        Some(t) => t,
                        None => continue,
                    }
                }
                MappingNodeKind::Object { children } => self.row_type(&child_path, children)?,
            };

            if fields.iter().any(|f| f.name.eq_ignore_ascii_case(name)) {
                warn!(
                    "Field `{}` differs only by case from an earlier field; keeping the first",
                    child_path
                );
                continue;
            }
            fields.push(RowField::new(name.clone(), field_type.array_if(child.is_array)));
        }
        Ok(RelationalType::Row(fields))
    }

    fn scalar_type(&self, path: &str, native_type: &str) -> Result<Option<RelationalType>> {
        match map_type(native_type) {
            RelationalType::Unsupported(native_type) => match self.policy {
                UnsupportedTypePolicy::Omit => {
                    warn!(
                        "Skipping field `{}`: unsupported type `{}`",
                        path, native_type
                    );
                    Ok(None)
                }
                UnsupportedTypePolicy::Reject => Err(ConnectorError::UnsupportedType {
                    path: path.to_string(),
                    native_type,
                }),
            },
            supported => Ok(Some(supported)),
        }
    }
}

fn merge_column(existing: &mut ColumnDescriptor, other: ColumnDescriptor) -> Result<()> {
    existing.column_type = merge_types(&existing.dotted_path, &existing.column_type, &other.column_type)?;
    existing.is_array |= other.is_array;
    if existing.native_type != other.native_type && other.is_analyzed() {
        // Analyzed wins: equality on it is re-checked after decoding
        existing.native_type = other.native_type;
    }
    Ok(())
}

fn merge_types(path: &str, left: &RelationalType, right: &RelationalType) -> Result<RelationalType> {
    match (left, right) {
        _ if left == right => Ok(left.clone()),
        (RelationalType::Row(left_fields), RelationalType::Row(right_fields)) => {
            let mut fields = left_fields.clone();
            for field in right_fields {
                match fields
                    .iter_mut()
                    .find(|f| f.name.eq_ignore_ascii_case(&field.name))
                {
                    Some(existing) => {
                        let field_path = format!("{}.{}", path, existing.name);
                        existing.field_type =
                            merge_types(&field_path, &existing.field_type, &field.field_type)?;
                    }
                    None => fields.push(field.clone()),
                }
            }
            Ok(RelationalType::Row(fields))
        }
        (RelationalType::Array(l), RelationalType::Array(r)) => {
            Ok(RelationalType::Array(Box::new(merge_types(path, l, r)?)))
        }
        // One index hints an array, the other doesn't: keep the array
        (RelationalType::Array(l), other) | (other, RelationalType::Array(l)) => {
            Ok(RelationalType::Array(Box::new(merge_types(path, l, other)?)))
        }
        _ => Err(ConnectorError::SchemaConflict {
            path: path.to_string(),
            left: left.to_string(),
            right: right.to_string(),
        }),
    }
}
