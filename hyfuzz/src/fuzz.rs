//! Run configuration and the fuzz loop.
//!
//! A run draws one seed per iteration from a master generator seeded with [`FuzzConfig::seed`].
//! Each iteration seed alone determines the generated tree, so any failure can be replayed with
//! [`Fuzzer::run_seed`] without re-running the iterations before it.
//!
//! Besides random trees, [`Fuzzer::sweep_binaries`] and [`Fuzzer::sweep_binary_then_unary`]
//! check every catalog entry once, over the cross join of two seed tables.
use std::{
    collections::{HashMap, HashSet, hash_map::Entry},
    fmt,
    path::Path,
};

use log::{debug, error, info, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::{
    catalog::OperatorCatalog,
    constants::ConstantPool,
    error::{ConfigError, ConfigResult, FuzzResult},
    expr::{
        ExprRef,
        func::{and_also, is_not_null, root},
    },
    generator::{MAX_ROOT_SLOTS, RootSlots, TreeGenerator},
    oracle::{Case, EquivalenceOracle, Verdict},
    rewrite::Rewriter,
    store::{
        QueryShape, materialized::MaterializedStore, memory::InMemorySource, seed::Dataset,
        seed::SeedData,
    },
    types::ValueType,
};

/// Settings of a fuzz run, usually read from TOML.
///
/// ```toml
/// seed = 12345
/// iterations = 100
/// max_depth = 3
/// target = "bool"
/// root_types = ["string", "string", "int", "int", "bool", "bool"]
/// shape = "filter"
/// constant_operand_odds = 3
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FuzzConfig {
    /// Seed of the master generator drawing per-iteration seeds.
    pub seed: u64,
    pub iterations: u64,
    pub max_depth: usize,
    /// Type of every generated tree.
    pub target: ValueType,
    /// Types of the root slots; slot `i` is bound to column `i`.
    pub root_types: Vec<ValueType>,
    pub shape: QueryShape,
    /// A binary's second operand is a literal with probability `1 / constant_operand_odds`.
    pub constant_operand_odds: u32,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        use ValueType::*;

        Self {
            seed: 12345,
            iterations: 100,
            max_depth: 3,
            target: Bool,
            root_types: vec![String, String, Int, Int, Bool, Bool],
            shape: QueryShape::Filter,
            constant_operand_odds: 3,
        }
    }
}

impl FuzzConfig {
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            file: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&s)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// Reject settings no run can use.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.constant_operand_odds == 0 {
            return Err(ConfigError::InvalidSetting {
                setting: "constant_operand_odds",
                reason: "must be at least 1".into(),
            });
        }
        if self.root_types.is_empty() {
            return Err(ConfigError::InvalidSetting {
                setting: "root_types",
                reason: "at least one root slot is required".into(),
            });
        }
        if self.root_types.len() > MAX_ROOT_SLOTS {
            return Err(ConfigError::InvalidSetting {
                setting: "root_types",
                reason: format!("at most {MAX_ROOT_SLOTS} root slots are supported"),
            });
        }
        if self.shape.is_filter() && self.target != ValueType::Bool {
            return Err(ConfigError::InvalidSetting {
                setting: "target",
                reason: format!(
                    "filter queries need a `bool` predicate, not `{}`",
                    self.target
                ),
            });
        }
        Ok(())
    }
}

/// Totals of a completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FuzzReport {
    pub iterations: u64,
    pub equivalent: u64,
    pub skipped: u64,
    pub rows_compared: u64,
}

impl fmt::Display for FuzzReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} iteration(s): {} equivalent, {} skipped, {} row(s) compared",
            self.iterations, self.equivalent, self.skipped, self.rows_compared
        )
    }
}

/// Totals of an exhaustive operator sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Label of every checked case, in visiting order, e.g. `Add(int, int) then Negate(int)`.
    pub cases: Vec<String>,
    pub equivalent: u64,
    pub skipped: u64,
    pub rows_compared: u64,
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} case(s): {} equivalent, {} skipped, {} row(s) compared",
            self.cases.len(),
            self.equivalent,
            self.skipped,
            self.rows_compared
        )
    }
}

/// Generates trees and checks them, one seeded iteration at a time.
#[derive(Debug)]
pub struct Fuzzer {
    config: FuzzConfig,
    catalog: OperatorCatalog,
    constants: ConstantPool,
    seed_data: SeedData,
    slots: RootSlots,
    oracle: EquivalenceOracle<MaterializedStore, InMemorySource>,
}

impl Fuzzer {
    /// Validate everything up front; rows are the cross join of `seed_data` over the root types.
    pub fn new(
        config: FuzzConfig,
        catalog: OperatorCatalog,
        constants: ConstantPool,
        seed_data: &SeedData,
    ) -> ConfigResult<Self> {
        config.validate()?;
        constants.validate_for(&catalog)?;
        let slots = RootSlots::new(&config.root_types)?;
        let data = Dataset::cross_join(seed_data, &config.root_types)?;
        let oracle = EquivalenceOracle::for_dataset(&data, Rewriter::standard())?;

        Ok(Self {
            config,
            catalog,
            constants,
            seed_data: seed_data.clone(),
            slots,
            oracle,
        })
    }

    /// Built-in catalog, constants and seed data.
    pub fn standard(config: FuzzConfig) -> ConfigResult<Self> {
        Self::new(
            config,
            OperatorCatalog::standard()?,
            ConstantPool::standard()?,
            &SeedData::standard(),
        )
    }

    /// Use another rewriter on the translated path.
    pub fn with_rewriter(mut self, rewriter: Rewriter) -> Self {
        self.oracle = self.oracle.with_rewriter(rewriter);
        self
    }

    pub fn config(&self) -> &FuzzConfig {
        &self.config
    }

    pub fn oracle(&self) -> &EquivalenceOracle<MaterializedStore, InMemorySource> {
        &self.oracle
    }

    pub fn catalog(&self) -> &OperatorCatalog {
        &self.catalog
    }

    /// Generate the case of one iteration seed.
    pub fn generate_case(&self, seed: u64, iteration: u64) -> ConfigResult<Case> {
        let config = &self.config;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut slots = self.slots.clone();
        let tree = TreeGenerator::new(&self.catalog, &self.constants, config.max_depth)
            .with_constant_operand_odds(config.constant_operand_odds)
            .generate(config.target, &mut slots, &mut rng);

        Ok(
            Case::new(tree, config.target, &config.root_types, config.shape)?.with_origin(
                seed,
                iteration,
                config.max_depth,
            ),
        )
    }

    /// Generate and check the case of one iteration seed.
    pub fn run_seed(&self, seed: u64, iteration: u64) -> FuzzResult<Verdict> {
        self.oracle.check(&self.generate_case(seed, iteration)?)
    }

    /// Check every `bool` binary of the catalog as a filter `op($0, $1)`.
    ///
    /// Rows are the cross join of the seed tables of the two input types. With `filter_nulls`,
    /// the predicate becomes `$0 != null && $1 != null && op($0, $1)`. The first failure ends
    /// the sweep.
    pub fn sweep_binaries(&self, filter_nulls: bool) -> FuzzResult<SweepReport> {
        let mut sweep = Sweep::new(self, filter_nulls);
        for op in self.catalog.binaries_of(ValueType::Bool) {
            let (lhs, rhs) = op.inputs;
            sweep.check(
                format!("{}({lhs}, {rhs})", op.name),
                [lhs, rhs],
                op.build(root(0, lhs), root(1, rhs)),
                op.result,
            )?;
        }

        info!("Binary sweep complete: {}", sweep.report);
        Ok(sweep.report)
    }

    /// Check every binary of the catalog followed by every unary accepting its result type.
    ///
    /// `bool` compositions are checked as filters, guarded like in
    /// [`sweep_binaries`](Self::sweep_binaries); other compositions are projected unguarded.
    pub fn sweep_binary_then_unary(&self, filter_nulls: bool) -> FuzzResult<SweepReport> {
        let mut sweep = Sweep::new(self, filter_nulls);
        for result in ValueType::iter() {
            for binary in self.catalog.binaries_of(result) {
                let (lhs, rhs) = binary.inputs;
                for unary in self.catalog.unaries_accepting(result) {
                    sweep.check(
                        format!(
                            "{}({lhs}, {rhs}) then {}({})",
                            binary.name, unary.name, unary.input
                        ),
                        [lhs, rhs],
                        unary.build(binary.build(root(0, lhs), root(1, rhs))),
                        unary.result,
                    )?;
                }
            }
        }

        info!("Binary-then-unary sweep complete: {}", sweep.report);
        Ok(sweep.report)
    }

    /// Run every configured iteration; the first failure ends the run.
    pub fn run(&self) -> FuzzResult<FuzzReport> {
        self.run_until(|| false)
    }

    /// Like [`run`](Self::run), but `stop` is polled before each iteration.
    pub fn run_until<F: FnMut() -> bool>(&self, mut stop: F) -> FuzzResult<FuzzReport> {
        let mut master = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut seen = HashSet::new();
        let mut report = FuzzReport::default();

        info!(
            "Fuzzing {} iteration(s) from master seed {} (target `{}`, max depth {}, {} row(s))",
            self.config.iterations,
            self.config.seed,
            self.config.target,
            self.config.max_depth,
            self.oracle.reference().dataset().len(),
        );

        for iteration in 0..self.config.iterations {
            if stop() {
                warn!("Run interrupted before iteration {iteration}");
                break;
            }

            let mut seed: u64 = master.random();
            while !seen.insert(seed) {
                warn!("Seed {seed} was already used in this run; drawing another");
                seed = master.random();
            }
            debug!("Iteration {iteration}: seed {seed}");

            match self.run_seed(seed, iteration) {
                Ok(Verdict::Equivalent { rows }) => {
                    report.equivalent += 1;
                    report.rows_compared += rows as u64;
                }
                Ok(Verdict::Skipped { .. }) => report.skipped += 1,
                Err(e) => {
                    error!("Iteration {iteration} failed: {e}");
                    return Err(e);
                }
            }
            report.iterations += 1;
        }

        info!("Run complete: {report}");
        Ok(report)
    }
}

/// State of one exhaustive sweep: oracles per pair of input types and running totals.
struct Sweep<'f> {
    fuzzer: &'f Fuzzer,
    filter_nulls: bool,
    oracles: HashMap<[ValueType; 2], EquivalenceOracle<MaterializedStore, InMemorySource>>,
    report: SweepReport,
}

impl<'f> Sweep<'f> {
    fn new(fuzzer: &'f Fuzzer, filter_nulls: bool) -> Self {
        Self {
            fuzzer,
            filter_nulls,
            oracles: HashMap::new(),
            report: SweepReport::default(),
        }
    }

    fn check(
        &mut self,
        label: String,
        inputs: [ValueType; 2],
        tree: ExprRef,
        result: ValueType,
    ) -> FuzzResult<()> {
        let (tree, shape) = match result {
            ValueType::Bool if self.filter_nulls => (
                and_also(
                    and_also(
                        is_not_null(root(0, inputs[0])),
                        is_not_null(root(1, inputs[1])),
                    ),
                    tree,
                ),
                QueryShape::Filter,
            ),
            ValueType::Bool => (tree, QueryShape::Filter),
            _ => (tree, QueryShape::Project),
        };

        let oracle = match self.oracles.entry(inputs) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let data = Dataset::cross_join(&self.fuzzer.seed_data, &inputs)?;
                entry.insert(EquivalenceOracle::for_dataset(
                    &data,
                    self.fuzzer.oracle.rewriter().clone(),
                )?)
            }
        };

        let mut case = Case::new(tree, result, &inputs, shape)?;
        case.iteration = self.report.cases.len() as u64;

        match oracle.check(&case) {
            Ok(Verdict::Equivalent { rows }) => {
                debug!("Sweep case `{label}` equivalent over {rows} row(s)");
                self.report.equivalent += 1;
                self.report.rows_compared += rows as u64;
            }
            Ok(Verdict::Skipped { fault }) => {
                debug!("Sweep case `{label}` skipped: {fault}");
                self.report.skipped += 1;
            }
            Err(e) => {
                error!("Sweep case `{label}` failed: {e}");
                return Err(e);
            }
        }
        self.report.cases.push(label);
        Ok(())
    }
}
