// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Candidate nomination for partial evaluation
//!
//! Bottom-up: a node is a candidate when every child is a candidate and the
//! predicate accepts the node itself. One rejected descendant therefore
//! poisons every ancestor up to the root.

use std::collections::HashSet;

use relq_ir::{Expr, ExprRef, UnaryOp, node_id};

use crate::error::RewriteResult;
use crate::guard::RecursionGuard;

/// Whether the interpreter can execute `node` without outside context
///
/// Rejects parameters (they are bound by an enclosing lambda at run time),
/// lambdas and quotes (not values), and every relational or command node.
pub fn can_evaluate_locally(node: &ExprRef) -> bool {
    let kind = node.kind();
    if kind.is_relational() || kind.is_command() {
        return false;
    }
    !matches!(
        node.as_ref(),
        Expr::Parameter(_)
            | Expr::Lambda(_)
            | Expr::Unary(relq_ir::UnaryExpr {
                op: UnaryOp::Quote,
                ..
            })
    )
}

/// Identities of the candidate nodes under `root`
pub struct Nominator<P> {
    guard: RecursionGuard,
    can_evaluate: P,
    candidates: HashSet<usize>,
}

impl<P: FnMut(&ExprRef) -> bool> Nominator<P> {
    pub fn new(can_evaluate: P) -> Self {
        Self {
            guard: RecursionGuard::new(),
            can_evaluate,
            candidates: HashSet::new(),
        }
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.guard = RecursionGuard::with_limit(limit);
        self
    }

    /// Nominate every candidate under `root`
    pub fn nominate(mut self, root: &ExprRef) -> RewriteResult<HashSet<usize>> {
        self.visit(root)?;
        Ok(self.candidates)
    }

    fn visit(&mut self, node: &ExprRef) -> RewriteResult<bool> {
        self.guard.enter()?;
        let result = self.visit_children(node);
        self.guard.exit();
        let candidate = result? && (self.can_evaluate)(node);
        if candidate {
            self.candidates.insert(node_id(node));
        }
        Ok(candidate)
    }

    fn visit_children(&mut self, node: &ExprRef) -> RewriteResult<bool> {
        let mut all = true;
        // Every child is visited so candidates below a poisoned sibling are
        // still recorded
        for child in node.children() {
            all &= self.visit(child)?;
        }
        Ok(all)
    }
}

/// Nominate with the default predicate
pub fn nominate(root: &ExprRef) -> RewriteResult<HashSet<usize>> {
    Nominator::new(can_evaluate_locally).nominate(root)
}

#[cfg(test)]
mod tests {
    use relq_ir::{AliasAllocator, Type};

    use super::*;

    #[test]
    fn test_parameter_poisons_ancestors() {
        let ids = AliasAllocator::new();
        let folded = Expr::add(Expr::constant(2), Expr::constant(3));
        let tree = Expr::add(ids.parameter("x", Type::Int32), folded.clone());

        let candidates = nominate(&tree).unwrap();
        assert!(candidates.contains(&node_id(&folded)));
        assert!(!candidates.contains(&node_id(&tree)));
    }

    #[test]
    fn test_custom_predicate() {
        let tree = Expr::add(Expr::constant(2), Expr::constant(3));
        let candidates = Nominator::new(|n: &ExprRef| n.as_constant().is_some())
            .nominate(&tree)
            .unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(!candidates.contains(&node_id(&tree)));
    }
}
