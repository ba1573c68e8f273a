//! Operator semantics shared by every evaluation path.
//!
//! The rules follow lifted (nullable) operator semantics:
//! - arithmetic, shifts, negation and complement propagate nulls; null propagation wins over the
//!   divide-by-zero fault;
//! - `&`, `|`, `&&`, `||` use three-valued logic (`false & null == false`, `true & null == null`);
//! - `==` / `!=` are null-aware (`null == null` holds), relational comparisons with a null operand
//!   are `false`;
//! - string predicates (`Like`, `StartsWith`, `EndsWith`) are `false` when an argument is null,
//!   which keeps `Like(x, "AB")` and `x == "AB"` equivalent on null inputs.
//!
//! Integer arithmetic wraps; shift counts are masked to their low 5 bits.
use chrono::FixedOffset;

use crate::{
    error::{EvalError, EvalResult},
    expr::{BinaryOp, Function, UnaryOp},
    types::ValueType,
    value::Value,
};

fn mismatch(context: &'static str, expected: ValueType, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        context,
        expected,
        found: found.value_type(),
    }
}

fn int_operand(v: &Value, context: &'static str) -> EvalResult<Option<i32>> {
    match v {
        Value::Int(i) => Ok(Some(*i)),
        Value::Null(ValueType::Int) => Ok(None),
        other => Err(mismatch(context, ValueType::Int, other)),
    }
}

fn bool_operand(v: &Value, context: &'static str) -> EvalResult<Option<bool>> {
    match v {
        Value::Bool(b) => Ok(Some(*b)),
        Value::Null(ValueType::Bool) => Ok(None),
        other => Err(mismatch(context, ValueType::Bool, other)),
    }
}

fn string_operand<'v>(v: &'v Value, context: &'static str) -> EvalResult<Option<&'v str>> {
    match v {
        Value::String(s) => Ok(Some(s)),
        Value::Null(ValueType::String) => Ok(None),
        other => Err(mismatch(context, ValueType::String, other)),
    }
}

fn from_bool(b: Option<bool>) -> Value {
    b.map_or(Value::Null(ValueType::Bool), Value::Bool)
}

fn and3(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn or3(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

/// For short-circuit operators: `true` when the left operand alone decides the result.
///
/// `false && _` is `false` and `true || _` is `true`; a null left operand never decides.
pub fn short_circuits(op: BinaryOp, lhs: &Value) -> bool {
    match op {
        BinaryOp::AndAlso => matches!(lhs, Value::Bool(false)),
        BinaryOp::OrElse => matches!(lhs, Value::Bool(true)),
        _ => false,
    }
}

fn int_arith(op: BinaryOp, a: i32, b: i32) -> EvalResult<i32> {
    Ok(match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Subtract => a.wrapping_sub(b),
        BinaryOp::Multiply => a.wrapping_mul(b),
        BinaryOp::Divide if b == 0 => return Err(EvalError::DivideByZero),
        BinaryOp::Divide => a.wrapping_div(b),
        BinaryOp::Modulo if b == 0 => return Err(EvalError::DivideByZero),
        BinaryOp::Modulo => a.wrapping_rem(b),
        BinaryOp::LeftShift => a.wrapping_shl(b as u32),
        BinaryOp::RightShift => a.wrapping_shr(b as u32),
        _ => unreachable!("{op} is not an integer operator"),
    })
}

/// Apply a binary operator to two evaluated operands.
pub fn apply_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> EvalResult<Value> {
    use BinaryOp::*;

    match op {
        Add | Subtract | Multiply | Divide | Modulo | LeftShift | RightShift => {
            let a = int_operand(lhs, "integer arithmetic")?;
            let b = int_operand(rhs, "integer arithmetic")?;
            match (a, b) {
                (Some(a), Some(b)) => int_arith(op, a, b).map(Value::Int),
                _ => Ok(Value::Null(ValueType::Int)),
            }
        }
        And | AndAlso => {
            let a = bool_operand(lhs, "conjunction")?;
            let b = bool_operand(rhs, "conjunction")?;
            Ok(from_bool(and3(a, b)))
        }
        Or | OrElse => {
            let a = bool_operand(lhs, "disjunction")?;
            let b = bool_operand(rhs, "disjunction")?;
            Ok(from_bool(or3(a, b)))
        }
        Equal | NotEqual => {
            if lhs.value_type() != rhs.value_type() {
                return Err(mismatch("equality", lhs.value_type(), rhs));
            }
            let eq = match (lhs, rhs) {
                (Value::Null(_), Value::Null(_)) => true,
                (Value::Null(_), _) | (_, Value::Null(_)) => false,
                (a, b) => a == b,
            };
            Ok(Value::Bool(if op == Equal { eq } else { !eq }))
        }
        LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual => {
            let ordering = match (lhs, rhs) {
                (Value::Null(_), _) | (_, Value::Null(_)) => None,
                (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
                (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
                (Value::Int(_), other) => return Err(mismatch("comparison", ValueType::Int, other)),
                (Value::DateTime(_), other) => {
                    return Err(mismatch("comparison", ValueType::DateTime, other));
                }
                (other, _) => return Err(mismatch("comparison", ValueType::Int, other)),
            };
            Ok(Value::Bool(ordering.is_some_and(|o| match op {
                LessThan => o.is_lt(),
                LessThanOrEqual => o.is_le(),
                GreaterThan => o.is_gt(),
                _ => o.is_ge(),
            })))
        }
    }
}

/// Apply a unary operator to an evaluated operand.
pub fn apply_unary(op: UnaryOp, operand: &Value) -> EvalResult<Value> {
    match op {
        UnaryOp::Not => match operand {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            Value::Int(i) => Ok(Value::Int(!i)),
            Value::Null(ty @ (ValueType::Bool | ValueType::Int)) => Ok(Value::Null(*ty)),
            other => Err(mismatch("negation", ValueType::Bool, other)),
        },
        UnaryOp::Negate => Ok(int_operand(operand, "arithmetic negation")?
            .map_or(Value::Null(ValueType::Int), |i| Value::Int(i.wrapping_neg()))),
        UnaryOp::IsNull => Ok(Value::Bool(operand.is_null())),
        UnaryOp::IsNotNull => Ok(Value::Bool(!operand.is_null())),
        UnaryOp::Convert(to) => match (to, operand) {
            (to, Value::Null(_)) => Ok(Value::Null(to)),
            (ValueType::Int, Value::Bool(b)) => Ok(Value::Int(i32::from(*b))),
            (ValueType::String, Value::Int(i)) => Ok(Value::string(i.to_string())),
            (to, v) if v.value_type() == to => Ok(v.clone()),
            (to, v) => Err(mismatch("conversion", to, v)),
        },
    }
}

/// Resolve a zone name to a fixed offset.
fn resolve_zone(zone: &str) -> EvalResult<FixedOffset> {
    if zone.eq_ignore_ascii_case("UTC") {
        return FixedOffset::east_opt(0).ok_or_else(|| EvalError::UnknownTimeZone(zone.into()));
    }
    zone.parse::<FixedOffset>()
        .map_err(|_| EvalError::UnknownTimeZone(zone.into()))
}

/// Apply a function to its evaluated arguments.
pub fn apply_function(function: Function, args: &[Value]) -> EvalResult<Value> {
    let [a, b] = args else {
        return Err(EvalError::StackUnderflow(args.len()));
    };

    match function {
        Function::Like | Function::StartsWith | Function::EndsWith => {
            let input = string_operand(a, "string predicate")?;
            let pattern = string_operand(b, "string predicate")?;
            let (Some(input), Some(pattern)) = (input, pattern) else {
                return Ok(Value::Bool(false));
            };
            Ok(Value::Bool(match function {
                Function::Like => like_match(input, pattern),
                Function::StartsWith => input.starts_with(pattern),
                _ => input.ends_with(pattern),
            }))
        }
        Function::AtTimeZone => {
            let instant = match a {
                Value::DateTime(d) => Some(*d),
                Value::Null(ValueType::DateTime) => None,
                other => return Err(mismatch("AtTimeZone", ValueType::DateTime, other)),
            };
            let zone = string_operand(b, "AtTimeZone")?;
            match (instant, zone) {
                (Some(instant), Some(zone)) => {
                    resolve_zone(zone)?;
                    Ok(Value::DateTime(instant))
                }
                _ => Ok(Value::Null(ValueType::DateTime)),
            }
        }
    }
}

/// Wildcard match: `%` matches any run of characters, `_` exactly one.
pub fn like_match(input: &str, pattern: &str) -> bool {
    let input: Vec<char> = input.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut i, mut p) = (0usize, 0usize);
    // Position of the last `%` and the input index it was tried against
    let mut backtrack: Option<(usize, usize)> = None;

    while i < input.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, i));
                p += 1;
            }
            Some('_') => {
                i += 1;
                p += 1;
            }
            Some(c) if *c == input[i] => {
                i += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    i = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '%')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards() {
        assert!(like_match("ABC", "A%"));
        assert!(like_match("ABC", "%C"));
        assert!(like_match("ABC", "%B%"));
        assert!(like_match("ABC", "A_C"));
        assert!(like_match("", "%"));
        assert!(!like_match("", "_"));
        assert!(!like_match("ABC", "A_"));
        assert!(like_match("AB", "AB"));
        assert!(!like_match("AB", "ab"));
        assert!(like_match("AXXB", "A%%B"));
    }

    #[test]
    fn division_by_zero_faults_unless_null() {
        assert_eq!(
            apply_binary(BinaryOp::Divide, &Value::Int(4), &Value::Int(0)),
            Err(EvalError::DivideByZero)
        );
        assert_eq!(
            apply_binary(BinaryOp::Modulo, &Value::Int(4), &Value::Int(0)),
            Err(EvalError::DivideByZero)
        );
        assert_eq!(
            apply_binary(BinaryOp::Divide, &Value::Null(ValueType::Int), &Value::Int(0)),
            Ok(Value::Null(ValueType::Int))
        );
        assert_eq!(
            apply_binary(BinaryOp::Divide, &Value::Int(i32::MIN), &Value::Int(-1)),
            Ok(Value::Int(i32::MIN))
        );
    }

    #[test]
    fn shifts_mask_their_count() {
        assert_eq!(
            apply_binary(BinaryOp::LeftShift, &Value::Int(1), &Value::Int(33)),
            Ok(Value::Int(2))
        );
        assert_eq!(
            apply_binary(BinaryOp::RightShift, &Value::Int(-8), &Value::Int(1)),
            Ok(Value::Int(-4))
        );
    }

    #[test]
    fn three_valued_logic() {
        let null = Value::Null(ValueType::Bool);
        let f = Value::Bool(false);
        let t = Value::Bool(true);
        assert_eq!(apply_binary(BinaryOp::And, &f, &null), Ok(f.clone()));
        assert_eq!(apply_binary(BinaryOp::And, &t, &null), Ok(null.clone()));
        assert_eq!(apply_binary(BinaryOp::Or, &null, &t), Ok(t.clone()));
        assert_eq!(apply_binary(BinaryOp::OrElse, &null, &f), Ok(null.clone()));
        assert!(short_circuits(BinaryOp::AndAlso, &f));
        assert!(!short_circuits(BinaryOp::AndAlso, &null));
    }

    #[test]
    fn null_aware_equality_and_comparisons() {
        let null = Value::Null(ValueType::Int);
        assert_eq!(
            apply_binary(BinaryOp::Equal, &null, &null),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            apply_binary(BinaryOp::NotEqual, &null, &Value::Int(1)),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            apply_binary(BinaryOp::LessThan, &null, &Value::Int(1)),
            Ok(Value::Bool(false))
        );
        assert!(
            apply_binary(BinaryOp::Equal, &Value::Int(1), &Value::string("1"))
                .unwrap_err()
                .is_type_mismatch()
        );
    }

    #[test]
    fn time_zones() {
        let instant = Value::timestamp(0).unwrap();
        assert_eq!(
            apply_function(Function::AtTimeZone, &[instant.clone(), Value::string("UTC")]),
            Ok(instant.clone())
        );
        assert_eq!(
            apply_function(
                Function::AtTimeZone,
                &[instant.clone(), Value::string("+02:00")]
            ),
            Ok(instant.clone())
        );
        assert_eq!(
            apply_function(Function::AtTimeZone, &[instant, Value::string("Mars/Olympus")]),
            Err(EvalError::UnknownTimeZone("Mars/Olympus".into()))
        );
    }
}
