//! Operator catalog: the typed operators the generator may apply.
//!
//! Each entry pairs a signature (input types and result type) with a build function producing
//! the corresponding node. Signatures are checked against the build function when the catalog
//! is assembled, so a generated tree is well-typed by construction.
//!
//! Operators are partitioned by result type; within a partition, insertion order is kept so a
//! seeded run always sees the same sequence of candidates.
use either::Either;
use enum_map::EnumMap;
use log::debug;
use smallvec::{SmallVec, smallvec};

use crate::{
    error::{ConfigError, ConfigResult},
    expr::{ExprRef, func},
    types::ValueType,
};

/// Build function of an operator entry.
#[derive(Debug, Clone, Copy)]
pub enum OperatorBuilder {
    Unary(fn(ExprRef) -> ExprRef),
    Binary(fn(ExprRef, ExprRef) -> ExprRef),
}

impl OperatorBuilder {
    /// Number of operands the build function takes.
    pub const fn arity(&self) -> usize {
        match self {
            OperatorBuilder::Unary(_) => 1,
            OperatorBuilder::Binary(_) => 2,
        }
    }
}

/// Unvalidated catalog entry, as declared by the caller.
#[derive(Debug, Clone)]
pub struct OperatorDescriptor {
    pub name: &'static str,
    pub inputs: SmallVec<[ValueType; 2]>,
    pub result: ValueType,
    pub builder: OperatorBuilder,
}

impl OperatorDescriptor {
    pub fn binary(
        name: &'static str,
        inputs: (ValueType, ValueType),
        result: ValueType,
        build: fn(ExprRef, ExprRef) -> ExprRef,
    ) -> Self {
        Self {
            name,
            inputs: smallvec![inputs.0, inputs.1],
            result,
            builder: OperatorBuilder::Binary(build),
        }
    }

    pub fn unary(
        name: &'static str,
        input: ValueType,
        result: ValueType,
        build: fn(ExprRef) -> ExprRef,
    ) -> Self {
        Self {
            name,
            inputs: smallvec![input],
            result,
            builder: OperatorBuilder::Unary(build),
        }
    }

    /// Check the declaration against what the build function actually produces.
    fn validate(&self) -> ConfigResult<()> {
        if self.inputs.len() != self.builder.arity() {
            return Err(ConfigError::ArityMismatch {
                operator: self.name,
                declared: self.inputs.len(),
                builder: self.builder.arity(),
            });
        }

        let sample = match self.builder {
            OperatorBuilder::Unary(build) => build(func::root(0, self.inputs[0])),
            OperatorBuilder::Binary(build) => build(
                func::root(0, self.inputs[0]),
                func::root(1, self.inputs[1]),
            ),
        };

        let inferred = sample
            .value_type()
            .map_err(|source| ConfigError::IllTypedOperator {
                operator: self.name,
                source,
            })?;
        if inferred != self.result {
            return Err(ConfigError::ResultTypeMismatch {
                operator: self.name,
                declared: self.result,
                inferred,
            });
        }
        Ok(())
    }
}

/// Validated two-operand catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct BinaryOperator {
    pub name: &'static str,
    pub inputs: (ValueType, ValueType),
    pub result: ValueType,
    build: fn(ExprRef, ExprRef) -> ExprRef,
}

impl BinaryOperator {
    #[inline]
    pub fn build(&self, lhs: ExprRef, rhs: ExprRef) -> ExprRef {
        (self.build)(lhs, rhs)
    }
}

/// Validated one-operand catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct UnaryOperator {
    pub name: &'static str,
    pub input: ValueType,
    pub result: ValueType,
    build: fn(ExprRef) -> ExprRef,
}

impl UnaryOperator {
    #[inline]
    pub fn build(&self, operand: ExprRef) -> ExprRef {
        (self.build)(operand)
    }
}

/// Validated operators, partitioned by result type.
#[derive(Debug, Clone, Default)]
pub struct OperatorCatalog {
    binaries: EnumMap<ValueType, Vec<BinaryOperator>>,
    unaries: EnumMap<ValueType, Vec<UnaryOperator>>,
}

impl OperatorCatalog {
    /// Validate every descriptor and partition them by result type.
    ///
    /// The first invalid descriptor aborts the construction.
    pub fn new<I: IntoIterator<Item = OperatorDescriptor>>(descriptors: I) -> ConfigResult<Self> {
        let mut catalog = Self::default();
        for descriptor in descriptors {
            descriptor.validate()?;
            match descriptor.builder {
                OperatorBuilder::Unary(build) => {
                    catalog.unaries[descriptor.result].push(UnaryOperator {
                        name: descriptor.name,
                        input: descriptor.inputs[0],
                        result: descriptor.result,
                        build,
                    })
                }
                OperatorBuilder::Binary(build) => {
                    catalog.binaries[descriptor.result].push(BinaryOperator {
                        name: descriptor.name,
                        inputs: (descriptor.inputs[0], descriptor.inputs[1]),
                        result: descriptor.result,
                        build,
                    })
                }
            }
        }

        debug!(
            "Operator catalog ready: {} binary and {} unary operator(s)",
            catalog.binaries.values().map(Vec::len).sum::<usize>(),
            catalog.unaries.values().map(Vec::len).sum::<usize>(),
        );
        Ok(catalog)
    }

    /// Two-operand operators producing `result`, in registration order.
    #[inline]
    pub fn binaries_of(&self, result: ValueType) -> &[BinaryOperator] {
        &self.binaries[result]
    }

    /// One-operand operators producing `result`, in registration order.
    #[inline]
    pub fn unaries_of(&self, result: ValueType) -> &[UnaryOperator] {
        &self.unaries[result]
    }

    /// One-operand operators taking `input`, whatever their result type.
    pub fn unaries_accepting(&self, input: ValueType) -> impl Iterator<Item = &UnaryOperator> {
        self.unaries
            .values()
            .flatten()
            .filter(move |op| op.input == input)
    }

    /// All operators producing `result`, split into binaries and unaries.
    #[inline]
    pub fn operators_of(&self, result: ValueType) -> (&[BinaryOperator], &[UnaryOperator]) {
        (&self.binaries[result], &self.unaries[result])
    }

    /// The `index`-th operator producing `result`, counting binaries first, then unaries.
    pub fn nth_of(
        &self,
        result: ValueType,
        index: usize,
    ) -> Option<Either<&BinaryOperator, &UnaryOperator>> {
        let (binaries, unaries) = self.operators_of(result);
        match binaries.get(index) {
            Some(op) => Some(Either::Left(op)),
            None => unaries.get(index - binaries.len()).map(Either::Right),
        }
    }

    /// Number of operators producing `result`.
    pub fn count_of(&self, result: ValueType) -> usize {
        self.binaries[result].len() + self.unaries[result].len()
    }

    /// Every type appearing as an input or result of some operator, sorted and deduplicated.
    pub fn value_types(&self) -> Vec<ValueType> {
        let mut types: Vec<ValueType> = Vec::new();
        for (result, ops) in self.binaries.iter() {
            for op in ops {
                types.extend([result, op.inputs.0, op.inputs.1]);
            }
        }
        for (result, ops) in self.unaries.iter() {
            for op in ops {
                types.extend([result, op.input]);
            }
        }
        types.sort();
        types.dedup();
        types
    }

    /// The built-in operator set.
    ///
    /// Integer arithmetic and shifts, the four logical connectives, null-aware equality on every
    /// type, ordering on integers and date-times, string pattern matching, time-zone
    /// normalization, null tests on every type and the boolean-to-integer conversion.
    pub fn standard() -> ConfigResult<Self> {
        Self::new(standard_descriptors())
    }
}

fn standard_descriptors() -> Vec<OperatorDescriptor> {
    use ValueType::*;
    type D = OperatorDescriptor;

    let mut out = vec![
        D::binary("Add", (Int, Int), Int, func::add),
        D::binary("Subtract", (Int, Int), Int, func::subtract),
        D::binary("Multiply", (Int, Int), Int, func::multiply),
        D::binary("Divide", (Int, Int), Int, func::divide),
        D::binary("Modulo", (Int, Int), Int, func::modulo),
        D::binary("LeftShift", (Int, Int), Int, func::left_shift),
        D::binary("RightShift", (Int, Int), Int, func::right_shift),
        D::binary("And", (Bool, Bool), Bool, func::and),
        D::binary("Or", (Bool, Bool), Bool, func::or),
        D::binary("AndAlso", (Bool, Bool), Bool, func::and_also),
        D::binary("OrElse", (Bool, Bool), Bool, func::or_else),
        D::binary("LessThan", (Int, Int), Bool, func::less_than),
        D::binary("LessThanOrEqual", (Int, Int), Bool, func::less_than_or_equal),
        D::binary("GreaterThan", (Int, Int), Bool, func::greater_than),
        D::binary("GreaterThanOrEqual", (Int, Int), Bool, func::greater_than_or_equal),
        D::binary("LessThan", (DateTime, DateTime), Bool, func::less_than),
        D::binary("GreaterThan", (DateTime, DateTime), Bool, func::greater_than),
        D::binary("Like", (String, String), Bool, func::like),
        D::unary("Not", Bool, Bool, func::not),
        D::unary("Not", Int, Int, func::not),
        D::unary("Negate", Int, Int, func::negate),
        D::unary("AtTimeZone", DateTime, DateTime, func::at_utc),
        D::unary("Convert", Bool, Int, |inner| func::convert(inner, Int)),
    ];

    for ty in [Int, Bool, String, DateTime] {
        out.push(D::binary("Equal", (ty, ty), Bool, func::equal));
        out.push(D::binary("NotEqual", (ty, ty), Bool, func::not_equal));
        out.push(D::unary("IsNull", ty, Bool, func::is_null));
        out.push(D::unary("IsNotNull", ty, Bool, func::is_not_null));
    }

    out
}
