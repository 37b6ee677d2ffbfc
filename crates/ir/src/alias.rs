// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Identity tokens
//!
//! [`TableAlias`] names one row source (a table or a select) so that column
//! references can say unambiguously where they come from. [`ParameterId`]
//! plays the same role for lambda parameters.
//!
//! Both are opaque counters minted by an [`AliasAllocator`]. An allocator is
//! normally scoped to one translation run and shared by reference between the
//! passes of that run; [`AliasAllocator::global`] exists for callers that need
//! identities that are unique across concurrent runs.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::expr::{ExprRef, IntoExpr, ParameterExpr};
use crate::types::Type;

/// Opaque identity of a row source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableAlias(u64);

impl TableAlias {
    /// Reconstruct an alias from its raw id (deserialization, tests)
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TableAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}", self.0)
    }
}

/// Opaque identity of a lambda parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterId(u64);

impl ParameterId {
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Mints [`TableAlias`] and [`ParameterId`] values
///
/// Minting only needs `&self`, so one allocator can be handed to every pass of
/// a run without threading `&mut` through the rewriters.
#[derive(Debug, Default)]
pub struct AliasAllocator {
    next_alias: AtomicU64,
    next_parameter: AtomicU64,
}

static GLOBAL: AliasAllocator = AliasAllocator::starting_at(0);

impl AliasAllocator {
    /// Create an allocator for a single translation run
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator whose first alias and parameter ids are `start`
    pub const fn starting_at(start: u64) -> Self {
        Self {
            next_alias: AtomicU64::new(start),
            next_parameter: AtomicU64::new(start),
        }
    }

    /// Process-wide allocator
    pub fn global() -> &'static AliasAllocator {
        &GLOBAL
    }

    /// Mint a fresh table alias
    pub fn next_alias(&self) -> TableAlias {
        TableAlias(self.next_alias.fetch_add(1, Ordering::Relaxed))
    }

    /// Mint a fresh parameter id
    pub fn next_parameter_id(&self) -> ParameterId {
        ParameterId(self.next_parameter.fetch_add(1, Ordering::Relaxed))
    }

    /// Mint a parameter declaration with a fresh id
    pub fn parameter_decl(&self, name: impl Into<String>, ty: Type) -> ParameterExpr {
        ParameterExpr {
            id: self.next_parameter_id(),
            name: name.into(),
            ty,
        }
    }

    /// Mint a parameter node with a fresh id
    pub fn parameter(&self, name: impl Into<String>, ty: Type) -> ExprRef {
        self.parameter_decl(name, ty).into_expr()
    }

    /// Number of aliases minted so far
    pub fn aliases_minted(&self) -> u64 {
        self.next_alias.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_are_unique_and_monotonic() {
        let alloc = AliasAllocator::new();
        let a = alloc.next_alias();
        let b = alloc.next_alias();
        assert_ne!(a, b);
        assert!(a < b);
        assert_eq!(alloc.aliases_minted(), 2);
    }

    #[test]
    fn test_alias_display() {
        assert_eq!(TableAlias::from_raw(7).to_string(), "A7");
    }

    #[test]
    fn test_allocators_are_independent() {
        let first = AliasAllocator::new();
        let second = AliasAllocator::new();
        assert_eq!(first.next_alias(), second.next_alias());
    }

    #[test]
    fn test_global_allocator_is_shared() {
        let a = AliasAllocator::global().next_alias();
        let b = AliasAllocator::global().next_alias();
        assert!(b > a);
    }
}
