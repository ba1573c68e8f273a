//! Type inference.
//!
//! There is no implicit widening: every operator application must match one of the operator's
//! signatures exactly, and [`UnaryOp::Convert`] is the only node changing a value's type.
use smallvec::SmallVec;

use crate::{
    error::TypeError,
    expr::{BinaryOp, Expr, Function, UnaryOp},
    types::ValueType,
};

impl BinaryOp {
    /// Result type for the given operand types, `None` if the operator has no such signature.
    pub fn result_type(self, lhs: ValueType, rhs: ValueType) -> Option<ValueType> {
        use BinaryOp::*;
        use ValueType::*;

        match (self, lhs, rhs) {
            (Add | Subtract | Multiply | Divide | Modulo | LeftShift | RightShift, Int, Int) => {
                Some(Int)
            }
            (And | Or | AndAlso | OrElse, Bool, Bool) => Some(Bool),
            (Equal | NotEqual, l, r) if l == r => Some(Bool),
            (LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual, Int, Int)
            | (
                LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual,
                DateTime,
                DateTime,
            ) => Some(Bool),
            _ => None,
        }
    }
}

impl UnaryOp {
    /// Result type for the given operand type, `None` if the operator has no such signature.
    pub fn result_type(self, operand: ValueType) -> Option<ValueType> {
        use ValueType::*;

        match (self, operand) {
            (UnaryOp::Not, Bool) => Some(Bool),
            (UnaryOp::Not, Int) | (UnaryOp::Negate, Int) => Some(Int),
            (UnaryOp::IsNull | UnaryOp::IsNotNull, _) => Some(Bool),
            (UnaryOp::Convert(Int), Bool) => Some(Int),
            (UnaryOp::Convert(String), Int) => Some(String),
            (UnaryOp::Convert(to), from) if to == from => Some(to),
            _ => None,
        }
    }
}

impl Function {
    /// Result type for the given argument types, `None` if the function has no such signature.
    pub fn result_type(self, args: &[ValueType]) -> Option<ValueType> {
        use ValueType::*;

        match (self, args) {
            (Function::Like | Function::StartsWith | Function::EndsWith, [String, String]) => {
                Some(Bool)
            }
            (Function::AtTimeZone, [DateTime, String]) => Some(DateTime),
            _ => None,
        }
    }
}

/// Infer the type of a tree, checking every operator application on the way.
pub fn infer(expr: &Expr) -> Result<ValueType, TypeError> {
    match expr {
        Expr::Constant(v) => Ok(v.value_type()),
        Expr::Root(r) => Ok(r.ty),
        Expr::Field(f) => Ok(f.ty),
        Expr::Binary { op, lhs, rhs } => {
            let l = infer(lhs)?;
            let r = infer(rhs)?;
            op.result_type(l, r).ok_or_else(|| TypeError::NoSignature {
                operator: op.to_string(),
                operands: vec![l, r],
            })
        }
        Expr::Unary { op, inner } => {
            let t = infer(inner)?;
            op.result_type(t).ok_or_else(|| TypeError::NoSignature {
                operator: op.to_string(),
                operands: vec![t],
            })
        }
        Expr::Call { function, args } => {
            if args.len() != function.arity() {
                return Err(TypeError::ArgumentCount {
                    function: function.name(),
                    expected: function.arity(),
                    found: args.len(),
                });
            }
            let types = args
                .iter()
                .map(|a| infer(a))
                .collect::<Result<SmallVec<[ValueType; 2]>, _>>()?;
            function
                .result_type(&types)
                .ok_or_else(|| TypeError::NoSignature {
                    operator: function.to_string(),
                    operands: types.to_vec(),
                })
        }
    }
}

impl Function {
    /// Name as printed in call position.
    pub const fn name(self) -> &'static str {
        match self {
            Function::Like => "Like",
            Function::StartsWith => "StartsWith",
            Function::EndsWith => "EndsWith",
            Function::AtTimeZone => "AtTimeZone",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::func::*;

    #[test]
    fn arithmetic_requires_ints() {
        assert_eq!(infer(&add(lit(1), lit(2))), Ok(ValueType::Int));
        assert!(infer(&add(lit(1), lit(true))).unwrap_err().is_no_signature());
    }

    #[test]
    fn equality_requires_identical_operand_types() {
        assert_eq!(infer(&equal(lit("A"), lit("B"))), Ok(ValueType::Bool));
        assert_eq!(
            infer(&equal(null(ValueType::DateTime), null(ValueType::DateTime))),
            Ok(ValueType::Bool)
        );
        assert!(infer(&equal(lit(1), lit("1"))).is_err());
    }

    #[test]
    fn convert_is_the_only_widening() {
        assert_eq!(
            infer(&convert(lit(true), ValueType::Int)),
            Ok(ValueType::Int)
        );
        assert_eq!(
            infer(&convert(lit(3), ValueType::String)),
            Ok(ValueType::String)
        );
        assert!(infer(&convert(lit("3"), ValueType::Int)).is_err());
    }

    #[test]
    fn call_arity_is_checked() {
        let bad = std::sync::Arc::new(Expr::Call {
            function: Function::Like,
            args: smallvec::smallvec![lit("A")],
        });
        assert_eq!(
            infer(&bad),
            Err(TypeError::ArgumentCount {
                function: "Like",
                expected: 2,
                found: 1
            })
        );
    }
}
