// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Recursion depth tracking for recursive passes
//!
//! The limit is only enforced in builds with `debug_assertions`. Release
//! builds keep counting but rely on the native stack as the backstop.

use std::cell::Cell;

use crate::error::{RewriteError, RewriteResult};

/// Default maximum tree depth accepted by a pass
pub const DEFAULT_RECURSION_LIMIT: usize = 1000;

/// Depth counter shared by the recursive entry points of one pass
///
/// Interior mutability lets `&self` accessors hand the guard out while the
/// pass itself is mutably borrowed.
#[derive(Debug)]
pub struct RecursionGuard {
    depth: Cell<usize>,
    limit: usize,
}

impl RecursionGuard {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_RECURSION_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            depth: Cell::new(0),
            limit,
        }
    }

    /// Increment recursion depth and check for overflow
    pub fn enter(&self) -> RewriteResult<()> {
        let depth = self.depth.get() + 1;
        if cfg!(debug_assertions) && depth > self.limit {
            return Err(RewriteError::RecursionLimitExceeded {
                depth,
                limit: self.limit,
            });
        }
        self.depth.set(depth);
        Ok(())
    }

    /// Decrement recursion depth when leaving a node
    pub fn exit(&self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }

    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for RecursionGuard {
    fn default() -> Self {
        Self::new()
    }
}
