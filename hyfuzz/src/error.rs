use strum::EnumIs;
use thiserror::Error;

use crate::{oracle::FailureReport, types::ValueType};

/// Errors raised while assembling catalogs, constant pools, datasets or run settings.
///
/// These are fatal: they are reported once at startup and never retried.
#[derive(Debug, EnumIs, Error)]
pub enum ConfigError {
    /// A type reachable through the catalog has no literal to fall back on.
    #[error(
        "No constants are registered for type `{0}`, but the operator catalog uses it as an input or result type."
    )]
    MissingConstants(ValueType),

    /// A literal was appended to the bank of another type.
    #[error("Cannot register a `{found}` constant in the `{expected}` constant bank.")]
    ConstantTypeMismatch {
        expected: ValueType,
        found: ValueType,
    },

    /// Declared inputs do not match the arity of the build function.
    #[error(
        "Operator `{operator}` declares {declared} input type(s), but its build function takes {builder} operand(s)."
    )]
    ArityMismatch {
        operator: &'static str,
        declared: usize,
        builder: usize,
    },

    /// The build function produced a node that does not type-check.
    #[error("Operator `{operator}` builds an ill-typed node from its declared inputs: {source}")]
    IllTypedOperator {
        operator: &'static str,
        source: TypeError,
    },

    /// The build function produced a node of another type than declared.
    #[error("Operator `{operator}` declares result type `{declared}`, but builds a `{inferred}` node.")]
    ResultTypeMismatch {
        operator: &'static str,
        declared: ValueType,
        inferred: ValueType,
    },

    /// A dataset row does not match the declared column types.
    #[error("Column {column} of the dataset is declared `{expected}`, but row {row} holds a `{found}`.")]
    DatasetTypeMismatch {
        row: usize,
        column: usize,
        expected: ValueType,
        found: ValueType,
    },

    /// A dataset row does not have one value per column.
    #[error("Row {row} of the dataset holds {found} value(s) for {expected} column(s).")]
    DatasetWidthMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// The seed data has no entity of a type one of the sources needs.
    #[error("The seed data has no `{0}` entity, so no row can be cross-joined for that source.")]
    EmptySeedTable(ValueType),

    /// A run setting is out of range.
    #[error("Invalid setting `{setting}`: {reason}")]
    InvalidSetting {
        setting: &'static str,
        reason: String,
    },

    /// The TOML run configuration could not be parsed.
    #[error("Failed to parse run configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The run configuration could not be serialized back to TOML.
    #[error("Failed to serialize run configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The run configuration file could not be read.
    #[error("Failed to read run configuration '{file}': {source}")]
    Io {
        file: String,
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Type inference failures on an expression tree.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs, Error)]
pub enum TypeError {
    /// An operator was applied to operands it has no signature for.
    #[error("Operator `{operator}` is not defined for operand type(s) {operands:?}.")]
    NoSignature {
        operator: String,
        operands: Vec<ValueType>,
    },

    /// A function call received the wrong number of arguments.
    #[error("Function `{function}` takes {expected} argument(s), but was given {found}.")]
    ArgumentCount {
        function: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Failures while substituting root placeholders with field accesses.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs, Error)]
pub enum SubstitutionError {
    /// A root placeholder has no replacement.
    #[error("Root placeholder `${0}` has no binding in the substitution map.")]
    UnboundRoot(u16),

    /// The replacement has another type than the placeholder.
    #[error("Root placeholder `${root}` is typed `{expected}`, but its binding is a `{found}` expression.")]
    TypeMismatch {
        root: u16,
        expected: ValueType,
        found: ValueType,
    },

    /// The replacement itself is ill-typed.
    #[error("Binding of root placeholder `${root}` is ill-typed: {source}")]
    IllTypedBinding { root: u16, source: TypeError },
}

/// Faults raised while evaluating a tree, through either evaluation path.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs, Error)]
pub enum EvalError {
    /// Integer division or modulo by zero.
    #[error("Attempted to divide by zero.")]
    DivideByZero,

    /// A root placeholder reached evaluation without being substituted.
    #[error("Root placeholder `${0}` reached evaluation without being bound to a column.")]
    UnboundRoot(u16),

    /// A field access refers to a column the row does not have.
    #[error("Column {column} is out of range for rows of {width} column(s).")]
    ColumnOutOfRange { column: u16, width: usize },

    /// A value of an unexpected type reached an operator or a column.
    #[error("Type mismatch in {context}: expected `{expected}`, found `{found}`.")]
    TypeMismatch {
        context: &'static str,
        expected: ValueType,
        found: ValueType,
    },

    /// `AtTimeZone` received a zone it cannot resolve.
    #[error("Unknown time zone `{0}`; expected `UTC` or a fixed offset such as `+02:00`.")]
    UnknownTimeZone(String),

    /// The compiled program popped more values than it pushed.
    #[error("Evaluation stack underflow at instruction {0}.")]
    StackUnderflow(usize),
}

impl EvalError {
    /// Whether this fault is an arithmetic fault that both paths may raise
    /// symmetrically without the iteration being counted as a failure.
    pub fn is_tolerated(&self) -> bool {
        self.is_divide_by_zero()
    }
}

pub type EvalResult<T> = Result<T, EvalError>;

/// Errors surfaced by the fuzz loop and the oracle.
#[derive(Debug, EnumIs, Error)]
pub enum FuzzError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Substitution(#[from] SubstitutionError),

    /// Both paths evaluated but disagree, or disagree on whether a fault occurred.
    #[error("Translated and reference evaluations diverge.\n{0}")]
    Divergence(Box<FailureReport>),

    /// A fault outside the tolerated class was raised.
    #[error("Unexpected evaluation fault.\n{0}")]
    Unexpected(Box<FailureReport>),
}

impl FuzzError {
    /// The failure report, for divergences and unexpected faults.
    pub fn report(&self) -> Option<&FailureReport> {
        match self {
            FuzzError::Divergence(report) | FuzzError::Unexpected(report) => Some(report),
            _ => None,
        }
    }
}

pub type FuzzResult<T> = Result<T, FuzzError>;
