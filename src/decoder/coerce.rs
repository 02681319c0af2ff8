//! Value coercion from JSON to relational values
//!
//! Documents are schemaless, so coercion is lenient: numbers may arrive as
//! strings, booleans as `"true"`/`"false"`, dates as epoch millis or ISO-8601
//! text. Anything that doesn't fit the column type becomes NULL.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use super::path_lookup::PathLookup;
use super::DecodedValue;
use crate::doc_catalog::type_mapper::RelationalType;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a date string into epoch milliseconds
///
/// Accepts RFC 3339, zone-less date-times (read as UTC) and plain dates.
pub(crate) fn parse_timestamp_millis(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

pub(crate) fn timestamp_from_millis(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

/// Coerce a JSON value into `column_type`
pub fn coerce(value: &Value, column_type: &RelationalType) -> DecodedValue {
    match (column_type, value) {
        (_, Value::Null) => DecodedValue::Null,
        (RelationalType::Array(element), Value::Array(items)) => {
            DecodedValue::Array(items.iter().map(|item| coerce(item, element)).collect())
        }
        (RelationalType::Array(element), single) => DecodedValue::Array(vec![coerce(single, element)]),
        // Multi-valued field without an array hint
        (_, Value::Array(_)) => DecodedValue::Null,
        (RelationalType::Row(fields), Value::Object(map)) => {
            if map.is_empty() {
                return DecodedValue::Null;
            }
            DecodedValue::Row(
                fields
                    .iter()
                    .map(|field| {
                        let found = PathLookup::nested(&field.name).find_all(value);
                        let decoded = match &field.field_type {
                            RelationalType::Array(element) if !found.is_empty() => {
                                DecodedValue::Array(collect_elements(&found, element))
                            }
                            field_type => coerce_single(&found, field_type),
                        };
                        (field.name.clone(), decoded)
                    })
                    .collect(),
            )
        }
        (RelationalType::Row(_), _) => DecodedValue::Null,
        (scalar, value) => coerce_scalar(value, scalar),
    }
}

/// Coerce the only match of a path; several matches decode to NULL
pub(crate) fn coerce_single(found: &[&Value], column_type: &RelationalType) -> DecodedValue {
    match found {
        [value] => coerce(value, column_type),
        _ => DecodedValue::Null,
    }
}

/// Flatten every match into one list of coerced elements
pub(crate) fn collect_elements(found: &[&Value], element: &RelationalType) -> Vec<DecodedValue> {
    let mut out = Vec::new();
    for value in found {
        match value {
            Value::Array(items) => out.extend(items.iter().map(|item| coerce(item, element))),
            single => out.push(coerce(single, element)),
        }
    }
    out
}

fn coerce_scalar(value: &Value, column_type: &RelationalType) -> DecodedValue {
    let decoded = match column_type {
        RelationalType::Boolean => as_bool(value).map(DecodedValue::Boolean),
        RelationalType::TinyInt => as_i64(value)
            .and_then(|n| i8::try_from(n).ok())
            .map(DecodedValue::TinyInt),
        RelationalType::SmallInt => as_i64(value)
            .and_then(|n| i16::try_from(n).ok())
            .map(DecodedValue::SmallInt),
        RelationalType::Integer => as_i64(value)
            .and_then(|n| i32::try_from(n).ok())
            .map(DecodedValue::Integer),
        RelationalType::BigInt => as_i64(value).map(DecodedValue::BigInt),
        RelationalType::Real => as_f64(value).map(|f| DecodedValue::Real(f as f32)),
        RelationalType::Double => as_f64(value).map(DecodedValue::Double),
        RelationalType::Varchar => match value {
            Value::String(s) => Some(DecodedValue::Varchar(s.clone())),
            Value::Number(n) => Some(DecodedValue::Varchar(n.to_string())),
            Value::Bool(b) => Some(DecodedValue::Varchar(b.to_string())),
            _ => None,
        },
        RelationalType::Varbinary => value
            .as_str()
            .and_then(|s| STANDARD.decode(s).ok())
            .map(DecodedValue::Varbinary),
        RelationalType::Timestamp => as_millis(value)
            .and_then(timestamp_from_millis)
            .map(DecodedValue::Timestamp),
        RelationalType::Row(_) | RelationalType::Array(_) | RelationalType::Unsupported(_) => None,
    };
    decoded.unwrap_or(DecodedValue::Null)
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
        .then_some(f as i64)
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| parse_timestamp_millis(s)),
        _ => None,
    }
}
