//! Relational predicates handed to the connector by the query engine

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    IsNull,
    IsNotNull,
}

impl ComparisonOp {
    /// Range keyword of the native query language, for ordering operators
    pub fn range_key(&self) -> Option<&'static str> {
        match self {
            ComparisonOp::Greater => Some("gt"),
            ComparisonOp::GreaterEqual => Some("gte"),
            ComparisonOp::Less => Some("lt"),
            ComparisonOp::LessEqual => Some("lte"),
            _ => None,
        }
    }

    pub fn is_unary(&self) -> bool {
        matches!(self, ComparisonOp::IsNull | ComparisonOp::IsNotNull)
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "<>",
            ComparisonOp::Greater => ">",
            ComparisonOp::GreaterEqual => ">=",
            ComparisonOp::Less => "<",
            ComparisonOp::LessEqual => "<=",
            ComparisonOp::IsNull => "IS NULL",
            ComparisonOp::IsNotNull => "IS NOT NULL",
        };
        write!(f, "{}", op)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Varchar(String),
    Varbinary(Vec<u8>),
    Timestamp(NaiveDateTime),
}

impl Literal {
    /// Binary literal from hex text, as in `x'CAFE'`
    pub fn varbinary_from_hex(text: &str) -> Result<Literal, hex::FromHexError> {
        let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        hex::decode(digits).map(Literal::Varbinary)
    }

    /// Timestamp literal in `YYYY-MM-DD HH:MM:SS` form
    pub fn timestamp(text: &str) -> Option<Literal> {
        NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(Literal::Timestamp)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Double(d) => write!(f, "{:?}", d),
            Literal::Varchar(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Varbinary(bytes) => write!(f, "x'{}'", hex::encode_upper(bytes)),
            Literal::Timestamp(ts) => write!(f, "TIMESTAMP '{}'", ts.format("%Y-%m-%d %H:%M:%S%.3f")),
        }
    }
}

/// `column op value`; `value` is ignored for IS [NOT] NULL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub column: String,
    pub op: ComparisonOp,
    pub value: Literal,
}

impl Predicate {
    pub fn new(column: impl Into<String>, op: ComparisonOp, value: Literal) -> Self {
        Predicate {
            column: column.into(),
            op,
            value,
        }
    }

    pub fn equal(column: impl Into<String>, value: Literal) -> Self {
        Self::new(column, ComparisonOp::Equal, value)
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::new(column, ComparisonOp::IsNull, Literal::Null)
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::new(column, ComparisonOp::IsNotNull, Literal::Null)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.op.is_unary() {
            write!(f, "{} {}", self.column, self.op)
        } else {
            write!(f, "{} {} {}", self.column, self.op, self.value)
        }
    }
}
