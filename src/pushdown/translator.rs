//! Predicate to native filter translation
//!
//! | column type            | =            | <>                  | < <= > >= | IS [NOT] NULL |
//! |------------------------|--------------|---------------------|-----------|---------------|
//! | tinyint .. double      | term         | exists + not term   | range     | exists        |
//! | timestamp              | term (ms)    | exists + not term   | range     | exists        |
//! | varchar (keyword)      | term         | exists + not term   | -         | exists        |
//! | varchar (text)         | match_phrase | -                   | -         | exists        |
//! | varbinary              | term (b64)   | exists + not term   | -         | exists        |
//! | boolean                | term         | exists + not term   | -         | exists        |
//! | row, array, `_score`   | -            | -                   | -         | exists        |
//!
//! A `-` is an [`ConnectorError::UnsupportedPredicate`]; the scan planner
//! then evaluates the predicate on decoded rows.
//!
//! The engine matches a multi-valued field if any of its values matches,
//! while a column without an array hint decodes such a field to NULL. Every
//! filter on those columns is therefore a superset of the SQL result and is
//! marked inexact, so the rows are re-checked after decoding. `IS NULL` on
//! them cannot be expressed as a superset and is never pushed down. Only the
//! null checks on array columns are exact.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};

use super::predicate::{ComparisonOp, Literal, Predicate};
use crate::doc_catalog::column_descriptor::ColumnDescriptor;
use crate::doc_catalog::errors::{ConnectorError, Result};
use crate::doc_catalog::type_mapper::RelationalType;

#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub filter: Value,
    /// False when matching documents still need a row-level check
    pub exact: bool,
}

impl Translation {
    fn exact(filter: Value) -> Self {
        Translation { filter, exact: true }
    }

    fn inexact(filter: Value) -> Self {
        Translation { filter, exact: false }
    }
}

/// Translate `predicate` against the column it references
pub fn translate(predicate: &Predicate, column: &ColumnDescriptor) -> Result<Translation> {
    let field = column.dotted_path.as_str();
    let unsupported = |reason: &str| ConnectorError::unsupported_predicate(&predicate.column, reason);

    if column.hidden {
        return Err(unsupported("metadata columns are not indexed"));
    }

    match predicate.op {
        ComparisonOp::IsNull if column.is_array => return Ok(Translation::exact(must_not(exists(field)))),
        ComparisonOp::IsNull => return Err(unsupported("multi-valued fields decode to NULL")),
        ComparisonOp::IsNotNull if column.is_array => return Ok(Translation::exact(exists(field))),
        ComparisonOp::IsNotNull => return Ok(Translation::inexact(exists(field))),
        _ => {}
    }

    if column.is_array || !column.column_type.is_scalar() {
        return Err(unsupported(&format!(
            "comparison on {} column",
            column.relational_type()
        )));
    }
    if predicate.value == Literal::Null {
        return Err(unsupported("comparison with NULL"));
    }

    let value = native_value(&column.column_type, &predicate.value)
        .ok_or_else(|| unsupported(&format!("literal {} does not fit {}", predicate.value, column.column_type)))?;

    let orderable = column.column_type.is_numeric() || column.column_type == RelationalType::Timestamp;

    if column.column_type == RelationalType::Varchar && column.is_analyzed() {
        return match predicate.op {
            ComparisonOp::Equal => Ok(Translation::inexact(json!({
                "match_phrase": { field: { "query": value } }
            }))),
            _ => Err(unsupported("only equality is supported on analyzed text")),
        };
    }

    match predicate.op {
        ComparisonOp::Equal => Ok(Translation::inexact(term(field, value))),
        ComparisonOp::NotEqual => Ok(Translation::inexact(json!({
            "bool": {
                "filter": [exists(field)],
                "must_not": [term(field, value)]
            }
        }))),
        op => match op.range_key() {
            Some(key) if orderable => {
                let mut bounds = json!({ key: value });
                if column.column_type == RelationalType::Timestamp {
                    bounds["format"] = json!("epoch_millis");
                }
                Ok(Translation::inexact(json!({ "range": { field: bounds } })))
            }
            _ => Err(unsupported(&format!("{} is not supported on {}", op, column.column_type))),
        },
    }
}

/// Native free-text search for a table's query suffix
pub fn query_string_query(query: &str) -> Value {
    json!({ "query_string": { "query": query } })
}

fn exists(field: &str) -> Value {
    json!({ "exists": { "field": field } })
}

fn must_not(filter: Value) -> Value {
    json!({ "bool": { "must_not": [filter] } })
}

fn term(field: &str, value: Value) -> Value {
    json!({ "term": { field: value } })
}

/// The literal as the engine stores it, if it fits the column type
fn native_value(column_type: &RelationalType, literal: &Literal) -> Option<Value> {
    let integral = matches!(
        column_type,
        RelationalType::TinyInt | RelationalType::SmallInt | RelationalType::Integer | RelationalType::BigInt
    );

    match (column_type, literal) {
        (t, Literal::Integer(n)) if t.is_numeric() => Some(json!(n)),
        (t, Literal::Double(d)) if t.is_numeric() => {
            if !d.is_finite() {
                return None;
            }
            if !integral {
                return Some(json!(d));
            }
            // 2^63 itself is out of range; `as` would saturate
            if d.fract() != 0.0 || *d < i64::MIN as f64 || *d >= i64::MAX as f64 {
                return None;
            }
            Some(json!(*d as i64))
        }
        (RelationalType::Timestamp, Literal::Timestamp(ts)) => Some(json!(ts.and_utc().timestamp_millis())),
        (RelationalType::Timestamp, Literal::Integer(millis)) => Some(json!(millis)),
        (RelationalType::Varchar, Literal::Varchar(s)) => Some(json!(s)),
        (RelationalType::Varbinary, Literal::Varbinary(bytes)) => Some(json!(STANDARD.encode(bytes))),
        (RelationalType::Boolean, Literal::Boolean(b)) => Some(json!(b)),
        _ => None,
    }
}
