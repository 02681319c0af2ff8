//! Row-level evaluation of predicates that were not pushed down
//!
//! SQL three-valued logic collapses to false here: any comparison involving
//! NULL filters the row out.

use std::cmp::Ordering;

use super::predicate::{ComparisonOp, Literal, Predicate};
use crate::decoder::DecodedValue;

/// True when `value` satisfies `predicate`
pub fn matches(predicate: &Predicate, value: &DecodedValue) -> bool {
    match predicate.op {
        ComparisonOp::IsNull => return value.is_null(),
        ComparisonOp::IsNotNull => return !value.is_null(),
        _ => {}
    }

    let Some(ordering) = compare(value, &predicate.value) else {
        return false;
    };
    match predicate.op {
        ComparisonOp::Equal => ordering == Ordering::Equal,
        ComparisonOp::NotEqual => ordering != Ordering::Equal,
        ComparisonOp::Greater => ordering == Ordering::Greater,
        ComparisonOp::GreaterEqual => ordering != Ordering::Less,
        ComparisonOp::Less => ordering == Ordering::Less,
        ComparisonOp::LessEqual => ordering != Ordering::Greater,
        ComparisonOp::IsNull | ComparisonOp::IsNotNull => false,
    }
}

fn integral(value: &DecodedValue) -> Option<i64> {
    match value {
        DecodedValue::TinyInt(n) => Some(i64::from(*n)),
        DecodedValue::SmallInt(n) => Some(i64::from(*n)),
        DecodedValue::Integer(n) => Some(i64::from(*n)),
        DecodedValue::BigInt(n) => Some(*n),
        _ => None,
    }
}

fn floating(value: &DecodedValue) -> Option<f64> {
    match value {
        DecodedValue::Real(f) => Some(f64::from(*f)),
        DecodedValue::Double(f) => Some(*f),
        other => integral(other).map(|n| n as f64),
    }
}

/// Order a decoded value against a literal; None when incomparable
fn compare(value: &DecodedValue, literal: &Literal) -> Option<Ordering> {
    match (value, literal) {
        (DecodedValue::Null, _) | (_, Literal::Null) => None,
        (DecodedValue::Timestamp(t), Literal::Integer(millis)) => Some(t.and_utc().timestamp_millis().cmp(millis)),
        // The literal is narrowed to the column's precision
        (DecodedValue::Real(f), Literal::Double(d)) => f.partial_cmp(&(*d as f32)),
        (v, Literal::Integer(n)) if integral(v).is_some() => integral(v).map(|i| i.cmp(n)),
        (v, Literal::Integer(n)) => floating(v)?.partial_cmp(&(*n as f64)),
        (v, Literal::Double(d)) => floating(v)?.partial_cmp(d),
        (DecodedValue::Varchar(s), Literal::Varchar(l)) => Some(s.as_str().cmp(l.as_str())),
        (DecodedValue::Boolean(b), Literal::Boolean(l)) => Some(b.cmp(l)),
        (DecodedValue::Varbinary(b), Literal::Varbinary(l)) => Some(b.as_slice().cmp(l.as_slice())),
        (DecodedValue::Timestamp(t), Literal::Timestamp(l)) => Some(t.cmp(l)),
        _ => None,
    }
}
