//! Immutable expression trees over the typed operator algebra.
//!
//! Role
//! - [`Expr`] is a tagged union: constants, root placeholders, field accesses, operator
//!   applications, and function calls. Children are shared through [`ExprRef`] (`Arc<Expr>`).
//! - Builders live in [`func`], type inference in [`typing`], rendering in [`pretty`].
//! - [`transform`] is the generic bottom-up rewriting fold used by the rewriter.
//!
//! Sharing
//! - Trees are never mutated after construction. A transform that leaves a subtree untouched
//!   returns the very same `Arc`, so unchanged parts are shared between input and output.
//!
//! Example
//! ```
//! use hyfuzz::expr::func::*;
//! use hyfuzz::types::ValueType;
//!
//! // $0 == "A" && ($4 || $5)
//! let tree = and_also(
//!     equal(root(0, ValueType::String), lit("A")),
//!     or(root(4, ValueType::Bool), root(5, ValueType::Bool)),
//! );
//! assert_eq!(tree.value_type(), Ok(ValueType::Bool));
//! assert_eq!(tree.depth(), 2);
//! ```
pub mod func;
pub mod pretty;
pub mod typing;

use std::sync::Arc;

use smallvec::SmallVec;
use strum::{Display, EnumDiscriminants, EnumIs, EnumIter};

use crate::{error::TypeError, types::ValueType, value::Value, walker::walk};

/// Shared handle on an immutable expression node.
pub type ExprRef = Arc<Expr>;

/// Placeholder leaf standing for a per-row value, bound later by substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RootRef {
    pub index: u16,
    pub ty: ValueType,
}

/// Concrete access to one column of the current row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldRef {
    pub column: u16,
    pub ty: ValueType,
}

/// Binary operators of the algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs, EnumIter, Display)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    LeftShift,
    RightShift,
    And,
    Or,
    AndAlso,
    OrElse,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl BinaryOp {
    /// Infix symbol used when printing.
    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::AndAlso => "&&",
            BinaryOp::OrElse => "||",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
        }
    }

    /// `true` for operators that skip their right operand once the left one decides the result.
    pub const fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::AndAlso | BinaryOp::OrElse)
    }
}

/// Unary operators of the algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs, Display)]
pub enum UnaryOp {
    /// Logical negation on `Bool`, bitwise complement on `Int`.
    Not,
    Negate,
    IsNull,
    IsNotNull,
    /// Explicit conversion; the only way a value changes type.
    Convert(ValueType),
}

/// Functions applied through call nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs, EnumIter, Display)]
pub enum Function {
    /// Pattern match with `%` (any run) and `_` (any single character) wildcards.
    Like,
    StartsWith,
    EndsWith,
    /// Re-express a date-time in the given zone; the instant is unchanged.
    AtTimeZone,
}

impl Function {
    /// Number of arguments the function takes.
    pub const fn arity(self) -> usize {
        match self {
            Function::Like | Function::StartsWith | Function::EndsWith | Function::AtTimeZone => 2,
        }
    }
}

/// Expression node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumDiscriminants)]
#[strum_discriminants(derive(PartialOrd, Ord, Hash, Display))]
#[strum_discriminants(name(ExprKind))]
#[strum_discriminants(vis(pub))]
pub enum Expr {
    Constant(Value),
    Root(RootRef),
    Field(FieldRef),
    Binary {
        op: BinaryOp,
        lhs: ExprRef,
        rhs: ExprRef,
    },
    Unary {
        op: UnaryOp,
        inner: ExprRef,
    },
    Call {
        function: Function,
        args: SmallVec<[ExprRef; 2]>,
    },
}

impl Expr {
    /// Discriminant of the outer constructor.
    #[inline]
    pub fn kind(&self) -> ExprKind {
        ExprKind::from(self)
    }

    /// Direct children, left to right.
    pub fn children(&self) -> SmallVec<[&ExprRef; 2]> {
        match self {
            Expr::Constant(_) | Expr::Root(_) | Expr::Field(_) => SmallVec::new(),
            Expr::Binary { lhs, rhs, .. } => SmallVec::from_buf([lhs, rhs]),
            Expr::Unary { inner, .. } => {
                let mut out = SmallVec::new();
                out.push(inner);
                out
            }
            Expr::Call { args, .. } => args.iter().collect(),
        }
    }

    /// Rebuild this node with new children, in the order returned by [`Expr::children`].
    ///
    /// Leaves are returned unchanged; missing children keep their previous value.
    pub fn with_children<I: IntoIterator<Item = ExprRef>>(&self, children: I) -> Expr {
        let mut children = children.into_iter();
        match self {
            Expr::Constant(_) | Expr::Root(_) | Expr::Field(_) => self.clone(),
            Expr::Binary { op, lhs, rhs } => Expr::Binary {
                op: *op,
                lhs: children.next().unwrap_or_else(|| lhs.clone()),
                rhs: children.next().unwrap_or_else(|| rhs.clone()),
            },
            Expr::Unary { op, inner } => Expr::Unary {
                op: *op,
                inner: children.next().unwrap_or_else(|| inner.clone()),
            },
            Expr::Call { function, args } => Expr::Call {
                function: *function,
                args: args
                    .iter()
                    .map(|a| children.next().unwrap_or_else(|| a.clone()))
                    .collect(),
            },
        }
    }

    /// Infer the type of this tree; see [`typing::infer`].
    #[inline]
    pub fn value_type(&self) -> Result<ValueType, TypeError> {
        typing::infer(self)
    }

    /// Longest root-to-leaf path, counted in edges (a leaf has depth 0).
    pub fn depth(&self) -> usize {
        let mut max = 0usize;
        walk(self, 0usize, |depth, node| {
            max = max.max(depth);
            node.for_each_child(|child| child.schedule_visit(depth + 1));
        });
        max
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        let mut count = 0usize;
        walk(self, (), |(), node| {
            count += 1;
            node.for_each_child(|child| child.schedule_visit(()));
        });
        count
    }

    /// Root placeholders referenced by this tree, in pre-order, with repetitions.
    pub fn roots(&self) -> Vec<RootRef> {
        let mut roots = Vec::new();
        walk(self, (), |(), node| {
            if let Expr::Root(r) = node.expr() {
                roots.push(*r);
            }
            node.for_each_child(|child| child.schedule_visit(()));
        });
        roots
    }

    /// `true` if any node satisfies `pred`.
    pub fn any<F: FnMut(&Expr) -> bool>(&self, mut pred: F) -> bool {
        let mut found = false;
        walk(self, (), |(), node| {
            if pred(node.expr()) {
                found = true;
                node.stop();
                return;
            }
            node.for_each_child(|child| child.schedule_visit(()));
        });
        found
    }
}

/// Bottom-up structural transform.
///
/// Children are transformed first; `f` is then offered the (possibly rebuilt) node and may
/// return a replacement. Nodes whose children are all unchanged are not reallocated, and a
/// node `f` declines is returned as is, so untouched subtrees are shared with the input.
pub fn transform<F>(tree: &ExprRef, f: &mut F) -> ExprRef
where
    F: FnMut(&ExprRef) -> Option<ExprRef>,
{
    let children = tree.children();
    let node = if children.is_empty() {
        tree.clone()
    } else {
        let rebuilt: SmallVec<[ExprRef; 2]> = children.iter().map(|c| transform(c, f)).collect();
        let unchanged = rebuilt
            .iter()
            .zip(children.iter())
            .all(|(new, old)| Arc::ptr_eq(new, old));
        if unchanged {
            tree.clone()
        } else {
            Arc::new(tree.with_children(rebuilt))
        }
    };

    f(&node).unwrap_or(node)
}

/// Fallible variant of [`transform`]; the first error aborts the traversal.
pub fn try_transform<F, E>(tree: &ExprRef, f: &mut F) -> Result<ExprRef, E>
where
    F: FnMut(&ExprRef) -> Result<Option<ExprRef>, E>,
{
    let children = tree.children();
    let node = if children.is_empty() {
        tree.clone()
    } else {
        let rebuilt = children
            .iter()
            .map(|c| try_transform(c, f))
            .collect::<Result<SmallVec<[ExprRef; 2]>, E>>()?;
        let unchanged = rebuilt
            .iter()
            .zip(children.iter())
            .all(|(new, old)| Arc::ptr_eq(new, old));
        if unchanged {
            tree.clone()
        } else {
            Arc::new(tree.with_children(rebuilt))
        }
    };

    Ok(f(&node)?.unwrap_or(node))
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut w = ::pretty::FmtWrite::new(f);
        let doc = pretty::PrettyExpr::pretty_doc(self);
        doc.render_raw(80, &mut w)
    }
}
