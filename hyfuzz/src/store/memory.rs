//! Reference mirror: rows kept as plain values, trees interpreted directly.
use smallvec::SmallVec;

use crate::{
    error::{EvalError, EvalResult},
    expr::Expr,
    semantics,
    store::{Query, QueryShape, QuerySource, ResultRow, filter_keeps, seed::Dataset},
    value::Value,
};

/// Evaluate `expr` against one row.
///
/// Short-circuit operators skip their right operand when the left one decides the result.
pub fn evaluate(expr: &Expr, row: &[Value]) -> EvalResult<Value> {
    match expr {
        Expr::Constant(value) => Ok(value.clone()),
        Expr::Root(root) => Err(EvalError::UnboundRoot(root.index)),
        Expr::Field(field) => row
            .get(field.column as usize)
            .cloned()
            .ok_or(EvalError::ColumnOutOfRange {
                column: field.column,
                width: row.len(),
            }),
        Expr::Binary { op, lhs, rhs } => {
            let lhs = evaluate(lhs, row)?;
            if semantics::short_circuits(*op, &lhs) {
                return Ok(lhs);
            }
            let rhs = evaluate(rhs, row)?;
            semantics::apply_binary(*op, &lhs, &rhs)
        }
        Expr::Unary { op, inner } => semantics::apply_unary(*op, &evaluate(inner, row)?),
        Expr::Call { function, args } => {
            let args = args
                .iter()
                .map(|a| evaluate(a, row))
                .collect::<EvalResult<SmallVec<[Value; 2]>>>()?;
            semantics::apply_function(*function, &args)
        }
    }
}

/// In-memory copy of a dataset.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    data: Dataset,
}

impl InMemorySource {
    pub fn new(data: Dataset) -> Self {
        Self { data }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.data
    }
}

impl QuerySource for InMemorySource {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn query(&self, query: &Query) -> EvalResult<Vec<ResultRow>> {
        let mut out = Vec::with_capacity(self.data.len());
        for row in self.data.rows() {
            let value = evaluate(&query.tree, &row.values)?;
            if query.shape == QueryShape::Filter && !filter_keeps(&value)? {
                continue;
            }
            out.push(ResultRow {
                key: row.key.clone(),
                value,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::func::*;
    use crate::types::ValueType;

    #[test]
    fn short_circuit_skips_faulting_operand() {
        let faulting = equal(divide(lit(1), lit(0)), lit(0));
        assert_eq!(
            evaluate(&and_also(lit(false), faulting.clone()), &[]),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            evaluate(&and(lit(false), faulting), &[]),
            Err(EvalError::DivideByZero)
        );
    }

    #[test]
    fn roots_must_be_substituted() {
        assert_eq!(
            evaluate(&root(2, ValueType::Int), &[]),
            Err(EvalError::UnboundRoot(2))
        );
    }
}
