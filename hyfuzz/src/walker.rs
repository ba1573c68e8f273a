//! Iterative, user-scheduled walker over expression trees.
//!
//! The visitor receives the current input/state and a [`WalkerHandle`] on the node. Only
//! children for which [`WalkerNodeHandle::schedule_visit`] is called are traversed, which makes
//! partial traversals, pruning, and state threading (e.g. the current depth) straightforward.
//!
//! Traversal strategy
//! - Explicit deque, no recursion. `schedule_immediate` pushes to the front (DFS),
//!   `schedule_deferred` to the back (BFS).
//! - Children scheduled immediately from the same node are visited right-to-left; use
//!   [`WalkerHandle::for_each_child`], which schedules in reverse, to get a left-to-right
//!   pre-order.
//!
//! Example: count nodes
//! ```
//! use hyfuzz::expr::func::*;
//! use hyfuzz::walker::walk;
//!
//! let tree = add(lit(1), negate(lit(2)));
//! let mut count = 0usize;
//! walk(&*tree, (), |(), node| {
//!     count += 1;
//!     node.for_each_child(|c| c.schedule_visit(()));
//! });
//! assert_eq!(count, 4);
//! ```
use std::{cell::RefCell, collections::VecDeque, ops::Deref};

use crate::expr::Expr;

type WalkerStack<'e, I> = VecDeque<(&'e Expr, Option<&'e Expr>, I)>;

/// Handle on a child of the node being visited.
pub struct WalkerNodeHandle<'a, 'e, I> {
    stack: &'a RefCell<WalkerStack<'e, I>>,
    child: &'e Expr,
    parent: &'e Expr,
}

impl<'a, 'e, I> WalkerNodeHandle<'a, 'e, I> {
    /// Schedule this child to be visited next (LIFO), i.e., depth-first.
    #[inline]
    pub fn schedule_immediate(&self, input: I) {
        self.stack
            .borrow_mut()
            .push_front((self.child, Some(self.parent), input));
    }

    /// Schedule this child to be visited after everything already queued (FIFO).
    #[inline]
    pub fn schedule_deferred(&self, input: I) {
        self.stack
            .borrow_mut()
            .push_back((self.child, Some(self.parent), input));
    }

    /// Shorthand for [`schedule_immediate`](Self::schedule_immediate).
    #[inline]
    pub fn schedule_visit(&self, input: I) {
        self.schedule_immediate(input)
    }

    /// The child expression.
    #[inline]
    pub fn expr(&self) -> &'e Expr {
        self.child
    }
}

impl<'a, 'e, I> Deref for WalkerNodeHandle<'a, 'e, I> {
    type Target = Expr;

    fn deref(&self) -> &Self::Target {
        self.child
    }
}

/// Handle on the node being visited.
pub struct WalkerHandle<'a, 'e, I> {
    stack: &'a RefCell<WalkerStack<'e, I>>,
    node: &'e Expr,
    parent: Option<&'e Expr>,
}

impl<'a, 'e, I> WalkerHandle<'a, 'e, I> {
    /// The expression under visit.
    #[inline]
    pub fn expr(&self) -> &'e Expr {
        self.node
    }

    /// Parent of the node under visit, `None` at the root.
    #[inline]
    pub fn parent(&self) -> Option<&'e Expr> {
        self.parent
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Call `f` with a handle on every child, arranged so that children scheduled with
    /// `schedule_visit` are visited left to right.
    pub fn for_each_child<F>(&self, mut f: F)
    where
        F: FnMut(WalkerNodeHandle<'a, 'e, I>),
    {
        for child in self.node.children().into_iter().rev() {
            f(WalkerNodeHandle {
                stack: self.stack,
                child: &**child,
                parent: self.node,
            });
        }
    }

    /// Drop every pending visit. Nodes scheduled after this call are still visited.
    #[inline]
    pub fn stop(&self) {
        self.stack.borrow_mut().clear();
    }
}

impl<'a, 'e, I> Deref for WalkerHandle<'a, 'e, I> {
    type Target = Expr;

    fn deref(&self) -> &Self::Target {
        self.node
    }
}

/// Walk a tree, threading a user input through scheduled visits.
pub fn walk<'e, F, I>(expr: &'e Expr, input: I, mut visitor: F)
where
    F: FnMut(I, WalkerHandle<'_, 'e, I>),
{
    let stack: RefCell<WalkerStack<'e, I>> = RefCell::new(VecDeque::new());
    stack.borrow_mut().push_front((expr, None, input));

    loop {
        let next = {
            let mut s = stack.borrow_mut();
            s.pop_front()
        };
        let Some((node, parent, input)) = next else {
            break;
        };

        visitor(
            input,
            WalkerHandle {
                stack: &stack,
                node,
                parent,
            },
        );
    }
}

/// Convenience when no input/state needs to be threaded.
#[inline]
pub fn walk_no_input<'e, F>(expr: &'e Expr, mut visitor: F)
where
    F: FnMut(WalkerHandle<'_, 'e, ()>),
{
    walk(expr, (), |(), node| visitor(node));
}
