// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Identity-based subtree replacement
//!
//! A node the replacement function maps to a different reference is taken
//! as-is; its subtree is not descended into.

use std::collections::HashMap;

use relq_ir::{ExprRef, node_id, same};

use crate::error::RewriteResult;
use crate::guard::RecursionGuard;
use crate::visitor::{Rewriter, rebuild};

struct Replacer<F> {
    guard: RecursionGuard,
    replace: F,
}

impl<F: FnMut(&ExprRef) -> ExprRef> Rewriter for Replacer<F> {
    fn guard(&self) -> &RecursionGuard {
        &self.guard
    }

    fn rewrite(&mut self, node: &ExprRef) -> RewriteResult<ExprRef> {
        let replaced = (self.replace)(node);
        if !same(&replaced, node) {
            return Ok(replaced);
        }
        self.guard.enter()?;
        let result = rebuild(self, node);
        self.guard.exit();
        result
    }
}

/// Rewrite `root` by applying `replace` top-down to every node
pub fn replace_with<F>(root: &ExprRef, replace: F) -> RewriteResult<ExprRef>
where
    F: FnMut(&ExprRef) -> ExprRef,
{
    Replacer {
        guard: RecursionGuard::new(),
        replace,
    }
    .rewrite(root)
}

/// Replace every occurrence of the node `search` (by identity)
pub fn replace(root: &ExprRef, search: &ExprRef, replacement: &ExprRef) -> RewriteResult<ExprRef> {
    replace_with(root, |node| {
        if same(node, search) {
            replacement.clone()
        } else {
            node.clone()
        }
    })
}

/// Replace each `pairs[i].0` (by identity) with `pairs[i].1`
pub fn replace_all(root: &ExprRef, pairs: &[(ExprRef, ExprRef)]) -> RewriteResult<ExprRef> {
    let map: HashMap<usize, &ExprRef> = pairs
        .iter()
        .map(|(search, replacement)| (node_id(search), replacement))
        .collect();
    replace_with(root, |node| match map.get(&node_id(node)) {
        Some(replacement) => (*replacement).clone(),
        None => node.clone(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use relq_ir::{Expr, Value};

    use super::*;

    #[test]
    fn test_replace_by_identity() {
        let target = Expr::constant(2);
        let lookalike = Expr::constant(2);
        let tree = Expr::add(target.clone(), lookalike.clone());

        let out = replace(&tree, &target, &Expr::constant(9)).unwrap();
        let Expr::Binary(b) = out.as_ref() else {
            panic!("expected binary");
        };
        assert_eq!(b.left.as_constant(), Some(&Value::Int32(9)));
        assert!(Arc::ptr_eq(&b.right, &lookalike));
    }

    #[test]
    fn test_replace_all_pairs() {
        let a = Expr::constant(1);
        let b = Expr::constant(2);
        let tree = Expr::add(a.clone(), b.clone());
        let out = replace_all(&tree, &[(a, Expr::constant(10)), (b, Expr::constant(20))]).unwrap();
        let Expr::Binary(sum) = out.as_ref() else {
            panic!("expected binary");
        };
        assert_eq!(sum.left.as_constant(), Some(&Value::Int32(10)));
        assert_eq!(sum.right.as_constant(), Some(&Value::Int32(20)));
    }

    #[test]
    fn test_replacement_is_not_descended() {
        let inner = Expr::constant(1);
        let wrapped = Expr::add(inner.clone(), Expr::constant(2));
        let tree = Expr::add(wrapped.clone(), Expr::constant(3));

        // The replacement contains `inner`, which must not be replaced again
        let replacement = Expr::add(inner.clone(), inner.clone());
        let mut calls = 0;
        let out = replace_with(&tree, |node| {
            calls += 1;
            if Arc::ptr_eq(node, &wrapped) {
                replacement.clone()
            } else if Arc::ptr_eq(node, &inner) {
                Expr::constant(100)
            } else {
                node.clone()
            }
        })
        .unwrap();

        let Expr::Binary(top) = out.as_ref() else {
            panic!("expected binary");
        };
        assert!(Arc::ptr_eq(&top.left, &replacement));
        // root, wrapped, constant 3
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_no_match_returns_same_reference() {
        let tree = Expr::add(Expr::constant(1), Expr::constant(2));
        let out = replace(&tree, &Expr::constant(1), &Expr::constant(5)).unwrap();
        assert!(Arc::ptr_eq(&out, &tree));
    }
}
