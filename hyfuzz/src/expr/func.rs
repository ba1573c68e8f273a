//! Free-function builders returning shared nodes.
//!
//! These are plain `fn`s so they can be stored as operator build functions in the catalog.
use std::sync::Arc;

use smallvec::smallvec;

use crate::{
    expr::{BinaryOp, Expr, ExprRef, FieldRef, Function, RootRef, UnaryOp},
    types::ValueType,
    value::Value,
};

// ========================= Leaves =========================

pub fn constant(value: Value) -> ExprRef {
    Arc::new(Expr::Constant(value))
}

/// Constant from anything convertible into a [`Value`].
pub fn lit<V: Into<Value>>(value: V) -> ExprRef {
    constant(value.into())
}

/// Typed null constant.
pub fn null(ty: ValueType) -> ExprRef {
    constant(Value::Null(ty))
}

pub fn root(index: u16, ty: ValueType) -> ExprRef {
    Arc::new(Expr::Root(RootRef { index, ty }))
}

pub fn field(column: u16, ty: ValueType) -> ExprRef {
    Arc::new(Expr::Field(FieldRef { column, ty }))
}

// ========================= Generic nodes =========================

pub fn binary(op: BinaryOp, lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    Arc::new(Expr::Binary { op, lhs, rhs })
}

pub fn unary(op: UnaryOp, inner: ExprRef) -> ExprRef {
    Arc::new(Expr::Unary { op, inner })
}

pub fn call2(function: Function, a: ExprRef, b: ExprRef) -> ExprRef {
    Arc::new(Expr::Call {
        function,
        args: smallvec![a, b],
    })
}

// ========================= Arithmetic =========================

pub fn add(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(BinaryOp::Add, lhs, rhs)
}

pub fn subtract(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(BinaryOp::Subtract, lhs, rhs)
}

pub fn multiply(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(BinaryOp::Multiply, lhs, rhs)
}

pub fn divide(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(BinaryOp::Divide, lhs, rhs)
}

pub fn modulo(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(BinaryOp::Modulo, lhs, rhs)
}

pub fn left_shift(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(BinaryOp::LeftShift, lhs, rhs)
}

pub fn right_shift(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(BinaryOp::RightShift, lhs, rhs)
}

pub fn negate(inner: ExprRef) -> ExprRef {
    unary(UnaryOp::Negate, inner)
}

// ========================= Logic =========================

/// Non-short-circuit conjunction (`&`).
pub fn and(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(BinaryOp::And, lhs, rhs)
}

/// Non-short-circuit disjunction (`|`).
pub fn or(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(BinaryOp::Or, lhs, rhs)
}

pub fn and_also(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(BinaryOp::AndAlso, lhs, rhs)
}

pub fn or_else(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(BinaryOp::OrElse, lhs, rhs)
}

pub fn not(inner: ExprRef) -> ExprRef {
    unary(UnaryOp::Not, inner)
}

// ========================= Comparison =========================

pub fn equal(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(BinaryOp::Equal, lhs, rhs)
}

pub fn not_equal(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(BinaryOp::NotEqual, lhs, rhs)
}

pub fn less_than(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(BinaryOp::LessThan, lhs, rhs)
}

pub fn less_than_or_equal(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(BinaryOp::LessThanOrEqual, lhs, rhs)
}

pub fn greater_than(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(BinaryOp::GreaterThan, lhs, rhs)
}

pub fn greater_than_or_equal(lhs: ExprRef, rhs: ExprRef) -> ExprRef {
    binary(BinaryOp::GreaterThanOrEqual, lhs, rhs)
}

pub fn is_null(inner: ExprRef) -> ExprRef {
    unary(UnaryOp::IsNull, inner)
}

pub fn is_not_null(inner: ExprRef) -> ExprRef {
    unary(UnaryOp::IsNotNull, inner)
}

pub fn convert(inner: ExprRef, to: ValueType) -> ExprRef {
    unary(UnaryOp::Convert(to), inner)
}

// ========================= Functions =========================

pub fn like(input: ExprRef, pattern: ExprRef) -> ExprRef {
    call2(Function::Like, input, pattern)
}

pub fn starts_with(input: ExprRef, prefix: ExprRef) -> ExprRef {
    call2(Function::StartsWith, input, prefix)
}

pub fn ends_with(input: ExprRef, suffix: ExprRef) -> ExprRef {
    call2(Function::EndsWith, input, suffix)
}

pub fn at_time_zone(input: ExprRef, zone: ExprRef) -> ExprRef {
    call2(Function::AtTimeZone, input, zone)
}

/// `AtTimeZone(input, "UTC")`.
pub fn at_utc(input: ExprRef) -> ExprRef {
    at_time_zone(input, lit("UTC"))
}
