//! Literal values flowing through trees, stores and evaluation.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use strum::{EnumIs, EnumTryAs};

use crate::types::ValueType;

/// A literal value. Nulls carry the type of the slot they stand for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs)]
pub enum Value {
    Null(ValueType),
    Int(i32),
    Bool(bool),
    String(Arc<str>),
    DateTime(DateTime<Utc>),
}

impl Value {
    /// Semantic type of this value, including for nulls.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null(ty) => *ty,
            Value::Int(_) => ValueType::Int,
            Value::Bool(_) => ValueType::Bool,
            Value::String(_) => ValueType::String,
            Value::DateTime(_) => ValueType::DateTime,
        }
    }

    /// Build a string value.
    pub fn string<S: AsRef<str>>(s: S) -> Self {
        Value::String(Arc::from(s.as_ref()))
    }

    /// Build a date-time value from a unix timestamp in seconds.
    ///
    /// Returns `None` when the timestamp is out of range.
    pub fn timestamp(secs: i64) -> Option<Self> {
        DateTime::from_timestamp(secs, 0).map(Value::DateTime)
    }

    /// Borrow the string content, if this is a non-null string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null(_) => write!(f, "null"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::DateTime(d) => write!(f, "#{}#", d.format("%Y-%m-%dT%H:%M:%SZ")),
        }
    }
}
