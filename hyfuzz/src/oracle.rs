//! Differential evaluation of one tree through two independent paths.
//!
//! - translated: the tree is rewritten, its roots bound to columns, and the result compiled
//!   and run by the [`MaterializedStore`];
//! - reference: the same roots are bound in the original tree, which the [`InMemorySource`]
//!   interprets directly.
//!
//! Results must agree row for row, in row-key order. Faults are classified: a divide-by-zero
//! raised by both paths skips the case, a fault raised by one path only is a divergence, and any
//! other fault is unexpected.
//!
//! Both paths apply operators through [`crate::semantics`]. A disagreement can therefore only
//! come from rewriting, root substitution, compilation or storage; a wrong operator semantic is
//! wrong identically on both sides and is not detected here. The unit tests of `semantics` pin
//! those rules down instead.
use std::fmt;

use log::debug;
use strum::EnumIs;

use crate::{
    error::{ConfigResult, EvalError, FuzzError, FuzzResult},
    expr::ExprRef,
    rewrite::{Rewriter, Substitution, substitute_roots},
    store::{
        Query, QueryShape, QuerySource, ResultRow, materialized::MaterializedStore,
        memory::InMemorySource, seed::Dataset,
    },
    types::ValueType,
};

/// A generated tree with everything needed to evaluate and reproduce it.
#[derive(Debug, Clone)]
pub struct Case {
    pub seed: u64,
    pub iteration: u64,
    pub target: ValueType,
    pub max_depth: usize,
    pub root_types: Vec<ValueType>,
    pub tree: ExprRef,
    pub substitution: Substitution,
    pub shape: QueryShape,
}

impl Case {
    /// A case binding root `i` to column `i`, with no recorded origin.
    pub fn new(
        tree: ExprRef,
        target: ValueType,
        root_types: &[ValueType],
        shape: QueryShape,
    ) -> ConfigResult<Self> {
        Ok(Self {
            seed: 0,
            iteration: 0,
            target,
            max_depth: tree.depth(),
            root_types: root_types.to_vec(),
            substitution: Substitution::columns(root_types)?,
            tree,
            shape,
        })
    }

    /// Record where the case comes from.
    pub fn with_origin(mut self, seed: u64, iteration: u64, max_depth: usize) -> Self {
        self.seed = seed;
        self.iteration = iteration;
        self.max_depth = max_depth;
        self
    }
}

/// Outcome of a successful check.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs)]
pub enum Verdict {
    /// Both paths returned the same rows.
    Equivalent { rows: usize },
    /// Both paths raised a tolerated fault.
    Skipped { fault: EvalError },
}

/// What went wrong in a failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    RowCountMismatch {
        translated: usize,
        reference: usize,
    },
    RowMismatch {
        translated: ResultRow,
        reference: ResultRow,
    },
    /// One path faulted and the other did not, or they faulted differently.
    FaultMismatch {
        translated: Option<EvalError>,
        reference: Option<EvalError>,
    },
    UnexpectedFault {
        path: &'static str,
        error: EvalError,
    },
}

fn fault_or_ok(f: &mut fmt::Formatter<'_>, fault: &Option<EvalError>) -> fmt::Result {
    match fault {
        Some(e) => write!(f, "{e}"),
        None => write!(f, "no fault"),
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::RowCountMismatch {
                translated,
                reference,
            } => write!(
                f,
                "translated path returned {translated} row(s), reference path {reference}"
            ),
            FailureKind::RowMismatch {
                translated,
                reference,
            } => write!(
                f,
                "first differing row: translated {} = {}, reference {} = {}",
                translated.key, translated.value, reference.key, reference.value
            ),
            FailureKind::FaultMismatch {
                translated,
                reference,
            } => {
                write!(f, "fault mismatch: translated path raised ")?;
                fault_or_ok(f, translated)?;
                write!(f, ", reference path raised ")?;
                fault_or_ok(f, reference)
            }
            FailureKind::UnexpectedFault { path, error } => {
                write!(f, "{path} path raised: {error}")
            }
        }
    }
}

/// Everything needed to reproduce a failed case.
#[derive(Debug, Clone)]
pub struct FailureReport {
    pub seed: u64,
    pub iteration: u64,
    pub target: ValueType,
    pub max_depth: usize,
    pub root_types: Vec<ValueType>,
    pub shape: QueryShape,
    pub tree: String,
    pub rewritten: String,
    pub kind: FailureKind,
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "seed {} (iteration {}), target `{}`, max depth {}, roots {:?}, shape {}",
            self.seed, self.iteration, self.target, self.max_depth, self.root_types, self.shape
        )?;
        writeln!(f, "  tree:      {}", self.tree)?;
        writeln!(f, "  rewritten: {}", self.rewritten)?;
        writeln!(f, "  {}", self.kind)?;
        write!(
            f,
            "  reproduce with `Fuzzer::run_seed({}, {})`",
            self.seed, self.iteration
        )
    }
}

/// Checks a translated source against a reference source.
#[derive(Debug)]
pub struct EquivalenceOracle<T, R> {
    translated: T,
    reference: R,
    rewriter: Rewriter,
}

impl EquivalenceOracle<MaterializedStore, InMemorySource> {
    /// Load `data` into both a materialized store and an in-memory mirror.
    pub fn for_dataset(data: &Dataset, rewriter: Rewriter) -> ConfigResult<Self> {
        Ok(Self::new(
            MaterializedStore::load(data)?,
            InMemorySource::new(data.clone()),
            rewriter,
        ))
    }
}

impl<T: QuerySource, R: QuerySource> EquivalenceOracle<T, R> {
    pub fn new(translated: T, reference: R, rewriter: Rewriter) -> Self {
        Self {
            translated,
            reference,
            rewriter,
        }
    }

    /// Replace the rewriter applied on the translated path.
    pub fn with_rewriter(mut self, rewriter: Rewriter) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn translated(&self) -> &T {
        &self.translated
    }

    pub fn reference(&self) -> &R {
        &self.reference
    }

    pub fn rewriter(&self) -> &Rewriter {
        &self.rewriter
    }

    /// Evaluate `case` through both paths and compare.
    pub fn check(&self, case: &Case) -> FuzzResult<Verdict> {
        let rewritten = self.rewriter.rewrite(&case.tree);
        let translated_tree = substitute_roots(&rewritten, &case.substitution)?;
        let reference_tree = substitute_roots(&case.tree, &case.substitution)?;

        let translated = self
            .translated
            .query(&Query::new(translated_tree, case.shape));
        let reference = self.reference.query(&Query::new(reference_tree, case.shape));

        let fail = |kind: FailureKind| FailureReport {
            seed: case.seed,
            iteration: case.iteration,
            target: case.target,
            max_depth: case.max_depth,
            root_types: case.root_types.clone(),
            shape: case.shape,
            tree: case.tree.to_string(),
            rewritten: rewritten.to_string(),
            kind,
        };

        let (translated, reference) = match (translated, reference) {
            (Ok(t), Ok(r)) => (t, r),
            (Err(t), Err(r)) if t.is_tolerated() && r.is_tolerated() => {
                debug!("Iteration {} skipped: {t}", case.iteration);
                return Ok(Verdict::Skipped { fault: t });
            }
            (t, r) => {
                for (path, result) in [
                    (self.translated.name(), &t),
                    (self.reference.name(), &r),
                ] {
                    match result {
                        Err(error) if !error.is_tolerated() => {
                            return Err(FuzzError::Unexpected(Box::new(fail(
                                FailureKind::UnexpectedFault {
                                    path,
                                    error: error.clone(),
                                },
                            ))));
                        }
                        _ => {}
                    }
                }
                return Err(FuzzError::Divergence(Box::new(fail(
                    FailureKind::FaultMismatch {
                        translated: t.err(),
                        reference: r.err(),
                    },
                ))));
            }
        };

        if translated.len() != reference.len() {
            return Err(FuzzError::Divergence(Box::new(fail(
                FailureKind::RowCountMismatch {
                    translated: translated.len(),
                    reference: reference.len(),
                },
            ))));
        }
        if let Some((t, r)) = translated.iter().zip(&reference).find(|(t, r)| t != r) {
            return Err(FuzzError::Divergence(Box::new(fail(
                FailureKind::RowMismatch {
                    translated: t.clone(),
                    reference: r.clone(),
                },
            ))));
        }

        debug!(
            "Iteration {} equivalent over {} row(s)",
            case.iteration,
            reference.len()
        );
        Ok(Verdict::Equivalent {
            rows: reference.len(),
        })
    }
}
