//! Typed columnar storage and the accessors reading and writing it.
//!
//! Each [`ValueType`] has one static [`ColumnAccessors`] entry holding plain function pointers.
//! A [`RowAccessor`] resolves that entry once per column, so reading a field is a bounds check
//! and an indirect call, with no per-value type dispatch.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use strum::EnumIs;

use crate::{
    error::{EvalError, EvalResult},
    types::ValueType,
    value::Value,
};

/// Values of one column, nulls as `None`.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs)]
pub enum Column {
    Int(Vec<Option<i32>>),
    Bool(Vec<Option<bool>>),
    String(Vec<Option<Arc<str>>>),
    DateTime(Vec<Option<DateTime<Utc>>>),
}

impl Column {
    /// Empty column of type `ty`.
    pub fn new(ty: ValueType) -> Self {
        (accessors(ty).empty)()
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Column::Int(_) => ValueType::Int,
            Column::Bool(_) => ValueType::Bool,
            Column::String(_) => ValueType::String,
            Column::DateTime(_) => ValueType::DateTime,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Int(v) => v.len(),
            Column::Bool(v) => v.len(),
            Column::String(v) => v.len(),
            Column::DateTime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a value through the writer of this column's type.
    pub fn push(&mut self, value: Value) -> EvalResult<()> {
        (accessors(self.value_type()).write)(self, value)
    }
}

pub type ColumnReader = fn(&Column, usize) -> EvalResult<Value>;
pub type ColumnWriter = fn(&mut Column, Value) -> EvalResult<()>;

/// Per-type accessor entry.
#[derive(Debug, Clone, Copy)]
pub struct ColumnAccessors {
    pub empty: fn() -> Column,
    pub read: ColumnReader,
    pub write: ColumnWriter,
}

fn read_mismatch(expected: ValueType, column: &Column) -> EvalError {
    EvalError::TypeMismatch {
        context: "column read",
        expected,
        found: column.value_type(),
    }
}

fn write_mismatch(column: &Column, value: &Value) -> EvalError {
    EvalError::TypeMismatch {
        context: "column write",
        expected: column.value_type(),
        found: value.value_type(),
    }
}

macro_rules! typed_accessors {
    ($name:ident, $variant:ident, $ty:expr, |$read:ident| $to_value:expr, $from_value:pat => $stored:expr) => {
        static $name: ColumnAccessors = ColumnAccessors {
            empty: || Column::$variant(Vec::new()),
            read: |column, row| match column {
                Column::$variant(values) => Ok(match &values[row] {
                    Some($read) => $to_value,
                    None => Value::Null($ty),
                }),
                other => Err(read_mismatch($ty, other)),
            },
            write: |column, value| match (column, value) {
                (Column::$variant(values), $from_value) => {
                    values.push(Some($stored));
                    Ok(())
                }
                (Column::$variant(values), Value::Null(ty)) if ty == $ty => {
                    values.push(None);
                    Ok(())
                }
                (column, value) => Err(write_mismatch(column, &value)),
            },
        };
    };
}

typed_accessors!(INT, Int, ValueType::Int, |v| Value::Int(*v), Value::Int(v) => v);
typed_accessors!(BOOL, Bool, ValueType::Bool, |v| Value::Bool(*v), Value::Bool(v) => v);
typed_accessors!(STRING, String, ValueType::String, |v| Value::String(v.clone()), Value::String(v) => v);
typed_accessors!(DATE_TIME, DateTime, ValueType::DateTime, |v| Value::DateTime(*v), Value::DateTime(v) => v);

/// Static accessor table entry for `ty`.
pub fn accessors(ty: ValueType) -> &'static ColumnAccessors {
    match ty {
        ValueType::Int => &INT,
        ValueType::Bool => &BOOL,
        ValueType::String => &STRING,
        ValueType::DateTime => &DATE_TIME,
    }
}

/// Reader bound to one column.
#[derive(Debug, Clone, Copy)]
pub struct RowAccessor {
    column: u16,
    ty: ValueType,
    read: ColumnReader,
}

impl RowAccessor {
    pub fn new(column: u16, ty: ValueType) -> Self {
        Self {
            column,
            ty,
            read: accessors(ty).read,
        }
    }

    #[inline]
    pub fn column(&self) -> u16 {
        self.column
    }

    #[inline]
    pub fn value_type(&self) -> ValueType {
        self.ty
    }

    /// Value of this column in `row`.
    pub fn read(&self, columns: &[Column], row: usize) -> EvalResult<Value> {
        let column = columns
            .get(self.column as usize)
            .ok_or(EvalError::ColumnOutOfRange {
                column: self.column,
                width: columns.len(),
            })?;
        (self.read)(column, row)
    }
}
