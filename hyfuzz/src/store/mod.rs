//! Data sources a query is evaluated against.
//!
//! Two independent implementations of [`QuerySource`] serve the same [`seed::Dataset`]:
//! - [`memory::InMemorySource`], the reference mirror: plain rows, trees interpreted directly;
//! - [`materialized::MaterializedStore`], the translated path: typed columnar storage behind a
//!   session lock, trees compiled by [`compile`] into a postfix program and run on a small
//!   stack machine.
//!
//! Both return results ordered by [`RowKey`].
pub mod accessor;
pub mod compile;
pub mod materialized;
pub mod memory;
pub mod seed;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::{Display, EnumIs};

use crate::{
    error::{EvalError, EvalResult},
    expr::ExprRef,
    types::ValueType,
    value::Value,
};

/// Stable identity of a row: the ids of the entities it was joined from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RowKey(pub SmallVec<[u32; 6]>);

impl RowKey {
    pub fn new<I: IntoIterator<Item = u32>>(ids: I) -> Self {
        Self(ids.into_iter().collect())
    }
}

impl std::fmt::Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{id}")?;
        }
        write!(f, ")")
    }
}

/// How the tree of a query is used.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIs, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum QueryShape {
    /// One result per row: the value of the tree.
    Project,
    /// Rows for which the boolean tree is `true`; the result is the row's predicate value.
    #[default]
    Filter,
}

/// A tree over field accesses and the way its result is collected.
#[derive(Debug, Clone)]
pub struct Query {
    pub tree: ExprRef,
    pub shape: QueryShape,
}

impl Query {
    pub fn new(tree: ExprRef, shape: QueryShape) -> Self {
        Self { tree, shape }
    }

    pub fn project(tree: ExprRef) -> Self {
        Self::new(tree, QueryShape::Project)
    }

    pub fn filter(tree: ExprRef) -> Self {
        Self::new(tree, QueryShape::Filter)
    }
}

/// One row of a query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub key: RowKey,
    pub value: Value,
}

/// Something a query can be evaluated against.
pub trait QuerySource {
    /// Short name used in logs and failure reports.
    fn name(&self) -> &'static str;

    /// Evaluate `query` over every row. Results are ordered by row key.
    ///
    /// The first fault aborts the query.
    fn query(&self, query: &Query) -> EvalResult<Vec<ResultRow>>;
}

/// Keep or drop a row according to a filter predicate value.
pub(crate) fn filter_keeps(value: &Value) -> EvalResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null(ValueType::Bool) => Ok(false),
        other => Err(EvalError::TypeMismatch {
            context: "filter",
            expected: ValueType::Bool,
            found: other.value_type(),
        }),
    }
}
