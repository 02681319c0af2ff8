//! Document to row decoding
//!
//! Decodes raw documents into [`DecodedRow`]s aligned with a table's column
//! descriptors. Decoding never fails: an absent or wrong-shaped value is NULL.
//!
//! # Example
//!
//! ```ignore
//! let columns = connector.get_table_schema("test_arrays").await?;
//! let row = decode(&document, &columns);
//! let f = &row.values[index_of("c.f")];
//! assert_eq!(f.element(1).field("g").element(2), &DecodedValue::Integer(20));
//! ```

pub mod coerce;
pub mod path_lookup;

use chrono::NaiveDateTime;
use serde_json::Value;

use crate::doc_catalog::column_descriptor::{ColumnDescriptor, HiddenColumn};
use crate::source::SearchHit;
use coerce::{coerce_single, collect_elements};
use path_lookup::PathLookup;

static NULL: DecodedValue = DecodedValue::Null;

#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Null,
    Boolean(bool),
    TinyInt(i8),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    Varchar(String),
    Varbinary(Vec<u8>),
    Timestamp(NaiveDateTime),
    /// Named fields in ROW type order
    Row(Vec<(String, DecodedValue)>),
    Array(Vec<DecodedValue>),
}

impl DecodedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DecodedValue::Null)
    }

    /// 1-based subscript; NULL when out of range or not an array
    pub fn element(&self, index: usize) -> &DecodedValue {
        match self {
            DecodedValue::Array(items) if index >= 1 => items.get(index - 1).unwrap_or(&NULL),
            _ => &NULL,
        }
    }

    /// ROW field by name, case-insensitively; NULL when missing
    pub fn field(&self, name: &str) -> &DecodedValue {
        match self {
            DecodedValue::Row(fields) => fields
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
                .unwrap_or(&NULL),
            _ => &NULL,
        }
    }
}

/// Values aligned 1:1 with the column list they were decoded against
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedRow {
    pub values: Vec<DecodedValue>,
}

impl DecodedRow {
    pub fn get(&self, index: usize) -> &DecodedValue {
        self.values.get(index).unwrap_or(&NULL)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keep only the values at `indices`, in that order
    pub fn project(&self, indices: &[usize]) -> DecodedRow {
        DecodedRow {
            values: indices.iter().map(|&i| self.get(i).clone()).collect(),
        }
    }
}

/// Decode one column out of a document
pub fn decode_column(document: &Value, column: &ColumnDescriptor) -> DecodedValue {
    let found = PathLookup::new(&column.dotted_path).find_all(document);
    if found.is_empty() {
        return DecodedValue::Null;
    }
    if column.is_array {
        DecodedValue::Array(collect_elements(&found, &column.column_type))
    } else {
        coerce_single(&found, &column.column_type)
    }
}

/// Decode a document; hidden columns decode to NULL without hit metadata
pub fn decode(document: &Value, columns: &[ColumnDescriptor]) -> DecodedRow {
    DecodedRow {
        values: columns
            .iter()
            .map(|column| {
                if column.hidden {
                    DecodedValue::Null
                } else {
                    decode_column(document, column)
                }
            })
            .collect(),
    }
}

/// Decode a search hit, filling hidden columns from its metadata
pub fn decode_hit(hit: &SearchHit, columns: &[ColumnDescriptor]) -> DecodedRow {
    DecodedRow {
        values: columns
            .iter()
            .map(|column| match hidden_kind(column) {
                Some(HiddenColumn::Id) => DecodedValue::Varchar(hit.id.clone()),
                Some(HiddenColumn::Score) => hit
                    .score
                    .map(DecodedValue::Real)
                    .unwrap_or(DecodedValue::Null),
                Some(HiddenColumn::Source) => DecodedValue::Varchar(hit.source.to_string()),
                None => decode_column(&hit.source, column),
            })
            .collect(),
    }
}

pub fn decode_batch(hits: &[SearchHit], columns: &[ColumnDescriptor]) -> Vec<DecodedRow> {
    hits.iter().map(|hit| decode_hit(hit, columns)).collect()
}

fn hidden_kind(column: &ColumnDescriptor) -> Option<HiddenColumn> {
    if column.hidden {
        HiddenColumn::from_name(&column.name)
    } else {
        None
    }
}
