//! Rule-driven tree rewriting and root substitution.
//!
//! [`Rewriter`] lowers call shapes the translated path understands better into equivalent
//! nodes: prefix and suffix `Like` patterns become `StartsWith` / `EndsWith`, literal patterns
//! become equality, and `AtTimeZone(x, "UTC")` collapses to `x`. [`substitute_roots`] binds root
//! placeholders to concrete per-row expressions.
//!
//! Both are pure: they return new trees and share every untouched subtree with their input.
use std::sync::Arc;

use log::{trace, warn};

use crate::{
    error::{ConfigError, ConfigResult, SubstitutionError},
    expr::{Expr, ExprRef, Function, func, transform, try_transform},
    generator::MAX_ROOT_SLOTS,
    types::ValueType,
    value::Value,
};

/// A local rewrite, offered every node bottom-up.
pub trait RewriteRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Replacement for `node`, or `None` when the rule does not apply.
    fn rewrite(&self, node: &Expr) -> Option<ExprRef>;
}

/// Match `function(arg0, constant)` and return the arguments.
fn call_with_constant(node: &Expr, function: Function) -> Option<(&ExprRef, &Value)> {
    match node {
        Expr::Call { function: f, args } if *f == function => match args.as_slice() {
            [input, arg] => match &**arg {
                Expr::Constant(value) => Some((input, value)),
                _ => None,
            },
            _ => None,
        },
        _ => None,
    }
}

/// `Like(x, "A%")` to `StartsWith(x, "A")`, `Like(x, "%B")` to `EndsWith(x, "B")` and
/// `Like(x, "AB")` to `x == "AB"`.
///
/// Patterns with `_`, with `%` anywhere else, or null patterns are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LikePatternRule;

impl RewriteRule for LikePatternRule {
    fn name(&self) -> &'static str {
        "like-pattern"
    }

    fn rewrite(&self, node: &Expr) -> Option<ExprRef> {
        let (input, pattern) = call_with_constant(node, Function::Like)?;
        let pattern = pattern.as_str()?;
        if pattern.contains('_') {
            return None;
        }

        let wildcards = pattern.matches('%').count();
        match wildcards {
            0 => Some(func::equal(input.clone(), func::lit(pattern))),
            1 if pattern.len() > 1 && pattern.ends_with('%') => Some(func::starts_with(
                input.clone(),
                func::lit(&pattern[..pattern.len() - 1]),
            )),
            1 if pattern.len() > 1 && pattern.starts_with('%') => {
                Some(func::ends_with(input.clone(), func::lit(&pattern[1..])))
            }
            _ => None,
        }
    }
}

/// `AtTimeZone(x, "UTC")` to `x`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtcTimeZoneRule;

impl RewriteRule for UtcTimeZoneRule {
    fn name(&self) -> &'static str {
        "utc-time-zone"
    }

    fn rewrite(&self, node: &Expr) -> Option<ExprRef> {
        let (input, zone) = call_with_constant(node, Function::AtTimeZone)?;
        (zone.as_str()? == "UTC").then(|| input.clone())
    }
}

/// Applies an ordered list of rules bottom-up.
///
/// At each node the first applicable rule wins, and its output is offered to the rules again
/// until none applies, for at most [`Rewriter::MAX_STEPS_PER_RULE`] steps per rule.
#[derive(Clone)]
pub struct Rewriter {
    rules: Vec<Arc<dyn RewriteRule>>,
}

impl std::fmt::Debug for Rewriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.rules.iter().map(|r| r.name()))
            .finish()
    }
}

impl Default for Rewriter {
    fn default() -> Self {
        Self::standard()
    }
}

impl Rewriter {
    /// Rewrites of a single node stop after this many steps per registered rule.
    pub const MAX_STEPS_PER_RULE: usize = 8;

    pub fn new(rules: Vec<Arc<dyn RewriteRule>>) -> Self {
        Self { rules }
    }

    /// A rewriter with no rule; every tree is returned as is.
    pub fn identity() -> Self {
        Self::new(Vec::new())
    }

    /// [`LikePatternRule`] followed by [`UtcTimeZoneRule`].
    pub fn standard() -> Self {
        Self::new(vec![Arc::new(LikePatternRule), Arc::new(UtcTimeZoneRule)])
    }

    pub fn with_rule<R: RewriteRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn RewriteRule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    fn rewrite_node(&self, node: &ExprRef) -> Option<ExprRef> {
        let max_steps = self.rules.len() * Self::MAX_STEPS_PER_RULE;
        let mut current: Option<ExprRef> = None;
        for _ in 0..max_steps {
            let target = current.as_ref().unwrap_or(node);
            let Some((rule, next)) = self
                .rules
                .iter()
                .find_map(|rule| rule.rewrite(target).map(|next| (rule.name(), next)))
            else {
                return current;
            };
            trace!("Rule `{rule}` rewrote `{target}` into `{next}`");
            current = Some(next);
        }

        match &current {
            Some(last) if self.rules.iter().any(|rule| rule.rewrite(last).is_some()) => {
                warn!(
                    "Rewriting `{node}` did not settle after {max_steps} step(s); keeping `{last}`"
                );
            }
            _ => {}
        }
        current
    }

    /// Rewrite `tree`. A tree no rule applies to is returned pointer-identical.
    pub fn rewrite(&self, tree: &ExprRef) -> ExprRef {
        transform(tree, &mut |node| self.rewrite_node(node))
    }
}

/// Bindings of root placeholders, indexed by slot.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    bindings: Vec<Option<ExprRef>>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind slot `i` to a field access on column `i` of the same type.
    ///
    /// Fails when there are more types than column indices.
    pub fn columns(types: &[ValueType]) -> ConfigResult<Self> {
        if types.len() > MAX_ROOT_SLOTS {
            return Err(ConfigError::InvalidSetting {
                setting: "root_types",
                reason: format!(
                    "{} columns requested, at most {MAX_ROOT_SLOTS} can be bound",
                    types.len()
                ),
            });
        }
        Ok(Self {
            bindings: (0..=u16::MAX)
                .zip(types)
                .map(|(column, ty)| Some(func::field(column, *ty)))
                .collect(),
        })
    }

    pub fn bind(&mut self, root: u16, replacement: ExprRef) {
        let index = root as usize;
        if self.bindings.len() <= index {
            self.bindings.resize(index + 1, None);
        }
        self.bindings[index] = Some(replacement);
    }

    pub fn get(&self, root: u16) -> Option<&ExprRef> {
        self.bindings.get(root as usize).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.bindings.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Replace every root placeholder of `tree` with its binding.
pub fn substitute_roots(
    tree: &ExprRef,
    substitution: &Substitution,
) -> Result<ExprRef, SubstitutionError> {
    try_transform(tree, &mut |node| {
        let Expr::Root(root) = &**node else {
            return Ok(None);
        };
        let replacement = substitution
            .get(root.index)
            .ok_or(SubstitutionError::UnboundRoot(root.index))?;
        let found = replacement
            .value_type()
            .map_err(|source| SubstitutionError::IllTypedBinding {
                root: root.index,
                source,
            })?;
        if found != root.ty {
            return Err(SubstitutionError::TypeMismatch {
                root: root.index,
                expected: root.ty,
                found,
            });
        }
        Ok(Some(replacement.clone()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcard_placements() {
        let rule = LikePatternRule;
        let x = func::field(0, ValueType::String);
        let rewrite = |p: &str| rule.rewrite(&func::like(x.clone(), func::lit(p)));

        assert_eq!(
            rewrite("A%"),
            Some(func::starts_with(x.clone(), func::lit("A")))
        );
        assert_eq!(rewrite("%B"), Some(func::ends_with(x.clone(), func::lit("B"))));
        assert_eq!(rewrite("AB"), Some(func::equal(x.clone(), func::lit("AB"))));
        assert_eq!(rewrite(""), Some(func::equal(x.clone(), func::lit(""))));
        assert_eq!(rewrite("%"), None);
        assert_eq!(rewrite("%A%"), None);
        assert_eq!(rewrite("A%B"), None);
        assert_eq!(rewrite("A_"), None);
        assert_eq!(
            rule.rewrite(&func::like(x, func::null(ValueType::String))),
            None
        );
    }

    /// Wraps every node in another negation, so it always matches its own output.
    struct DoubleNegation;

    impl RewriteRule for DoubleNegation {
        fn name(&self) -> &'static str {
            "double-negation"
        }

        fn rewrite(&self, node: &Expr) -> Option<ExprRef> {
            Some(func::not(func::not(std::sync::Arc::new(node.clone()))))
        }
    }

    #[test]
    fn non_settling_rules_are_capped() {
        let rewriter = Rewriter::identity().with_rule(DoubleNegation);
        let leaf = func::lit(true);
        let rewritten = rewriter.rewrite(&leaf);
        // Each step adds two levels on top of the leaf
        assert_eq!(rewritten.depth(), 2 * Rewriter::MAX_STEPS_PER_RULE);
    }

    #[test]
    fn columns_are_bounded_by_the_index_width() {
        let types = vec![ValueType::Int; MAX_ROOT_SLOTS];
        let substitution = Substitution::columns(&types).unwrap();
        assert_eq!(
            substitution.get(u16::MAX),
            Some(&func::field(u16::MAX, ValueType::Int))
        );

        let too_many = vec![ValueType::Int; MAX_ROOT_SLOTS + 1];
        assert!(Substitution::columns(&too_many).unwrap_err().is_invalid_setting());
    }
}
