//! Random, well-typed tree generation.
//!
//! Generation is a recursive descent over `(type, depth)`: at each step the generator either
//! applies a random operator producing the requested type, or closes the branch with a root
//! placeholder or a literal. Continuation becomes less likely as depth grows and is impossible at
//! the maximum depth, so every generated tree satisfies `tree.depth() <= max_depth`.
//!
//! Root placeholders come from [`RootSlots`], a per-pass pool of typed slots that hands out
//! unused slots first so that a tree touches as many distinct columns as it can.
use either::Either;
use log::trace;
use rand::{Rng, seq::IndexedRandom};

use crate::{
    catalog::OperatorCatalog,
    constants::ConstantPool,
    error::{ConfigError, ConfigResult},
    expr::{ExprRef, func},
    types::ValueType,
};

/// Root placeholders are indexed by `u16`, so at most this many slots can be addressed.
pub const MAX_ROOT_SLOTS: usize = u16::MAX as usize + 1;

/// Typed root slots for one generation pass.
#[derive(Debug, Clone)]
pub struct RootSlots {
    types: Vec<ValueType>,
    used: Vec<bool>,
    history: Vec<u16>,
}

impl RootSlots {
    /// A fresh pool; slot `i` has type `types[i]` and starts unused.
    ///
    /// Fails when there are more types than [`MAX_ROOT_SLOTS`].
    pub fn new(types: &[ValueType]) -> ConfigResult<Self> {
        if types.len() > MAX_ROOT_SLOTS {
            return Err(ConfigError::InvalidSetting {
                setting: "root_types",
                reason: format!(
                    "{} root slots requested, at most {MAX_ROOT_SLOTS} are supported",
                    types.len()
                ),
            });
        }
        Ok(Self {
            types: types.to_vec(),
            used: vec![false; types.len()],
            history: Vec::new(),
        })
    }

    /// Pick a slot of type `ty` and mark it used.
    ///
    /// Unused slots are preferred (uniformly); once every slot of that type is used, a used one
    /// is picked uniformly. Returns `None` when no slot has type `ty`.
    pub fn take<R: Rng + ?Sized>(&mut self, ty: ValueType, rng: &mut R) -> Option<u16> {
        let (unused, used): (Vec<usize>, Vec<usize>) = self
            .types
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == ty)
            .map(|(i, _)| i)
            .partition(|i| !self.used[*i]);

        let candidates = if unused.is_empty() { used } else { unused };
        let slot = *candidates.choose(rng)?;
        let index = u16::try_from(slot).ok()?;
        self.used[slot] = true;
        self.history.push(index);
        Some(index)
    }

    /// Slot indices in the order they were handed out, with repetitions.
    #[inline]
    pub fn usage_order(&self) -> &[u16] {
        &self.history
    }

    #[inline]
    pub fn is_used(&self, index: u16) -> bool {
        self.used.get(index as usize).copied().unwrap_or(false)
    }

    #[inline]
    pub fn types(&self) -> &[ValueType] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Generates random trees from a catalog and a constant pool.
#[derive(Debug, Clone, Copy)]
pub struct TreeGenerator<'a> {
    catalog: &'a OperatorCatalog,
    constants: &'a ConstantPool,
    max_depth: usize,
    constant_operand_odds: u32,
}

impl<'a> TreeGenerator<'a> {
    /// The pool is assumed to have been checked with
    /// [`ConstantPool::validate_for`] against the catalog.
    pub fn new(catalog: &'a OperatorCatalog, constants: &'a ConstantPool, max_depth: usize) -> Self {
        Self {
            catalog,
            constants,
            max_depth,
            constant_operand_odds: 3,
        }
    }

    /// Replace the default 1-in-3 chance of a binary's second operand being a literal.
    ///
    /// `odds` of 0 disables the shortcut.
    pub fn with_constant_operand_odds(mut self, odds: u32) -> Self {
        self.constant_operand_odds = odds;
        self
    }

    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Generate a tree of type `target`, drawing placeholders from `slots`.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        target: ValueType,
        slots: &mut RootSlots,
        rng: &mut R,
    ) -> ExprRef {
        let tree = self.generate_at(target, 0, slots, rng);
        trace!("Generated `{target}` tree: {tree}");
        tree
    }

    fn should_continue<R: Rng + ?Sized>(&self, depth: usize, rng: &mut R) -> bool {
        depth < self.max_depth && rng.random_range(0..self.max_depth) >= depth
    }

    fn generate_at<R: Rng + ?Sized>(
        &self,
        ty: ValueType,
        depth: usize,
        slots: &mut RootSlots,
        rng: &mut R,
    ) -> ExprRef {
        let count = self.catalog.count_of(ty);
        if count == 0 || !self.should_continue(depth, rng) {
            return self.terminal(ty, slots, rng);
        }

        match self.catalog.nth_of(ty, rng.random_range(0..count)) {
            Some(Either::Left(op)) => {
                let lhs = self.generate_at(op.inputs.0, depth + 1, slots, rng);
                let rhs = if self.constant_operand_odds > 0
                    && rng.random_ratio(1, self.constant_operand_odds)
                {
                    self.constant(op.inputs.1, rng)
                } else {
                    self.generate_at(op.inputs.1, depth + 1, slots, rng)
                };
                op.build(lhs, rhs)
            }
            Some(Either::Right(op)) => {
                let operand = self.generate_at(op.input, depth + 1, slots, rng);
                op.build(operand)
            }
            None => self.terminal(ty, slots, rng),
        }
    }

    fn terminal<R: Rng + ?Sized>(
        &self,
        ty: ValueType,
        slots: &mut RootSlots,
        rng: &mut R,
    ) -> ExprRef {
        match slots.take(ty, rng) {
            Some(index) => func::root(index, ty),
            None => self.constant(ty, rng),
        }
    }

    fn constant<R: Rng + ?Sized>(&self, ty: ValueType, rng: &mut R) -> ExprRef {
        match self.constants.constants_of(ty).choose(rng) {
            Some(value) => func::constant(value.clone()),
            // Only reachable with an unvalidated pool
            None => func::null(ty),
        }
    }
}
