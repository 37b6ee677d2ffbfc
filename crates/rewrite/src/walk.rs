// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Tree walking
//!
//! [`walk_with`] drives a depth-first traversal with an explicit stack, so
//! arbitrarily deep trees never touch the native stack. A [`WalkCallbacks`]
//! implementation sees every node twice (`before` on the way down, `after`
//! on the way up) and decides per node whether to descend into its children.
//! [`WalkCallbacks::is_done`] stops the whole walk early.
//!
//! The search helpers ([`find_first`], [`find_all`], [`contains`]) are thin
//! callback sets over the same walk.

use relq_ir::ExprRef;

/// Callbacks driven by [`walk_with`]
pub trait WalkCallbacks {
    fn before(&mut self, node: &ExprRef) {
        let _ = node;
    }

    fn after(&mut self, node: &ExprRef) {
        let _ = node;
    }

    /// Whether to visit the children of `node`; consulted after `before`
    fn should_descend(&mut self, node: &ExprRef) -> bool {
        let _ = node;
        true
    }

    /// Stop the walk; checked before every step
    fn is_done(&self) -> bool {
        false
    }
}

enum Step<'a> {
    Enter(&'a ExprRef),
    Leave(&'a ExprRef),
}

/// Depth-first walk of `root`
pub fn walk_with<C: WalkCallbacks + ?Sized>(root: &ExprRef, callbacks: &mut C) {
    let mut stack = vec![Step::Enter(root)];
    while let Some(step) = stack.pop() {
        if callbacks.is_done() {
            return;
        }
        match step {
            Step::Enter(node) => {
                callbacks.before(node);
                stack.push(Step::Leave(node));
                if callbacks.should_descend(node) {
                    // Reverse so children come off the stack in order
                    stack.extend(node.children().into_iter().rev().map(Step::Enter));
                }
            }
            Step::Leave(node) => callbacks.after(node),
        }
    }
}

struct FnWalk<B, A, D> {
    before: B,
    after: A,
    should_descend: D,
}

impl<B, A, D> WalkCallbacks for FnWalk<B, A, D>
where
    B: FnMut(&ExprRef),
    A: FnMut(&ExprRef),
    D: FnMut(&ExprRef) -> bool,
{
    fn before(&mut self, node: &ExprRef) {
        (self.before)(node)
    }

    fn after(&mut self, node: &ExprRef) {
        (self.after)(node)
    }

    fn should_descend(&mut self, node: &ExprRef) -> bool {
        (self.should_descend)(node)
    }
}

/// Walk `root` with closure callbacks
pub fn walk<B, A, D>(root: &ExprRef, before: B, after: A, should_descend: D)
where
    B: FnMut(&ExprRef),
    A: FnMut(&ExprRef),
    D: FnMut(&ExprRef) -> bool,
{
    walk_with(
        root,
        &mut FnWalk {
            before,
            after,
            should_descend,
        },
    );
}

struct FindFirst<P, D> {
    predicate: P,
    should_descend: D,
    found: Option<ExprRef>,
}

impl<P, D> WalkCallbacks for FindFirst<P, D>
where
    P: FnMut(&ExprRef) -> bool,
    D: FnMut(&ExprRef) -> bool,
{
    fn before(&mut self, node: &ExprRef) {
        if (self.predicate)(node) {
            self.found = Some(node.clone());
        }
    }

    fn should_descend(&mut self, node: &ExprRef) -> bool {
        self.found.is_none() && (self.should_descend)(node)
    }

    fn is_done(&self) -> bool {
        self.found.is_some()
    }
}

/// First node in pre-order matching `predicate`, not entering nodes
/// rejected by `should_descend`
pub fn find_first_pruned<P, D>(root: &ExprRef, predicate: P, should_descend: D) -> Option<ExprRef>
where
    P: FnMut(&ExprRef) -> bool,
    D: FnMut(&ExprRef) -> bool,
{
    let mut finder = FindFirst {
        predicate,
        should_descend,
        found: None,
    };
    walk_with(root, &mut finder);
    finder.found
}

/// First node in pre-order matching `predicate`
pub fn find_first<P>(root: &ExprRef, predicate: P) -> Option<ExprRef>
where
    P: FnMut(&ExprRef) -> bool,
{
    find_first_pruned(root, predicate, |_| true)
}

/// Every node in pre-order matching `predicate`
pub fn find_all<P>(root: &ExprRef, mut predicate: P) -> Vec<ExprRef>
where
    P: FnMut(&ExprRef) -> bool,
{
    let mut found = Vec::new();
    walk(
        root,
        |node| {
            if predicate(node) {
                found.push(node.clone());
            }
        },
        |_| {},
        |_| true,
    );
    found
}

pub fn contains<P>(root: &ExprRef, predicate: P) -> bool
where
    P: FnMut(&ExprRef) -> bool,
{
    find_first(root, predicate).is_some()
}

pub fn contains_pruned<P, D>(root: &ExprRef, predicate: P, should_descend: D) -> bool
where
    P: FnMut(&ExprRef) -> bool,
    D: FnMut(&ExprRef) -> bool,
{
    find_first_pruned(root, predicate, should_descend).is_some()
}
