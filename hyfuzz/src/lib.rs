//! Hyfuzz: randomized expression-tree generation, rewriting and differential evaluation.
//!
//! The crate generates well-typed trees over a small operator algebra (integers, booleans,
//! strings and date-times, all nullable), rewrites them the way a query translator would, and
//! checks that the rewritten tree evaluated by a compiled, columnar store agrees row for row
//! with the original tree interpreted over an in-memory mirror of the same data.
//!
//! Pipeline
//!  - [`catalog::OperatorCatalog`] and [`constants::ConstantPool`] describe what may appear in a
//!    tree; both are validated once and then only read.
//!  - [`generator::TreeGenerator`] builds a tree of a requested type, closing branches with root
//!    placeholders drawn from [`generator::RootSlots`] or with literals.
//!  - [`rewrite::Rewriter`] lowers recognized call shapes; [`rewrite::substitute_roots`] binds
//!    placeholders to columns.
//!  - [`oracle::EquivalenceOracle`] runs both evaluation paths and classifies faults.
//!  - [`fuzz::Fuzzer`] drives seeded iterations from a [`fuzz::FuzzConfig`], and sweeps every
//!    catalog entry once with [`fuzz::Fuzzer::sweep_binaries`] and
//!    [`fuzz::Fuzzer::sweep_binary_then_unary`].
//!
//! Determinism
//!  - Every iteration is generated from its own `u64` seed through `ChaCha8Rng`; a failure report
//!    carries that seed, and [`fuzz::Fuzzer::run_seed`] replays it.
//!
//! Example
//! ```
//! use hyfuzz::prelude::*;
//!
//! let data = Dataset::from_rows(
//!     &[ValueType::String, ValueType::Bool],
//!     [vec![Value::from("ABC"), Value::from(true)]],
//! )
//! .unwrap();
//! let oracle = EquivalenceOracle::for_dataset(&data, Rewriter::standard()).unwrap();
//!
//! // Like($0, "A%") && $1, rewritten to StartsWith($0, "A") && $1 on the translated path
//! let tree = and_also(
//!     like(root(0, ValueType::String), lit("A%")),
//!     root(1, ValueType::Bool),
//! );
//! let case = Case::new(tree, ValueType::Bool, data.schema(), QueryShape::Filter).unwrap();
//! assert_eq!(oracle.check(&case).unwrap(), Verdict::Equivalent { rows: 1 });
//! ```

/// Operator catalog with validated signatures.
pub mod catalog;
/// Typed literal banks.
pub mod constants;
/// Error taxonomy.
pub mod error;
/// Expression trees: node types, builders, typing and pretty-printing.
pub mod expr;
/// Run configuration and the seeded fuzz loop.
pub mod fuzz;
/// Random well-typed tree generation.
pub mod generator;
/// Differential evaluation and failure reports.
pub mod oracle;
/// Rewrite rules and root substitution.
pub mod rewrite;
/// Operator semantics shared by both evaluation paths.
pub mod semantics;
/// Datasets and the sources queries run against.
pub mod store;
pub mod types;
pub mod value;
/// Tree walker for traversing expressions.
pub mod walker;

pub mod prelude {
    //! Convenient re-exports for end users.
    //!
    //! - Tree types and free-function builders from `func::*`
    //! - Pretty-printing via `PrettyExpr`
    //! - Catalog, constants, generator, rewriter, oracle and fuzz loop entry points
    pub use crate::expr::{
        BinaryOp, Expr, ExprKind, ExprRef, Function, UnaryOp, func::*, pretty::PrettyExpr,
        transform,
    };
    pub use crate::types::ValueType;
    pub use crate::value::Value;

    pub use crate::catalog::{OperatorCatalog, OperatorDescriptor};
    pub use crate::constants::ConstantPool;
    pub use crate::generator::{RootSlots, TreeGenerator};
    pub use crate::rewrite::{Rewriter, RewriteRule, Substitution, substitute_roots};

    // Stores
    pub use crate::store::{
        Query, QueryShape, QuerySource, ResultRow, RowKey,
        materialized::MaterializedStore,
        memory::InMemorySource,
        seed::{Dataset, SeedData},
    };

    // Checking
    pub use crate::error::{ConfigError, EvalError, FuzzError};
    pub use crate::fuzz::{FuzzConfig, FuzzReport, Fuzzer, SweepReport};
    pub use crate::oracle::{Case, EquivalenceOracle, FailureKind, FailureReport, Verdict};

    // Walker ergonomics
    pub use crate::walker::{WalkerHandle, WalkerNodeHandle, walk, walk_no_input};
}
