// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # relq - Traversal and rewriting
//!
//! Everything that walks or transforms a tree of [`relq_ir::Expr`] nodes:
//!
//! - [`Visitor`] and [`Rewriter`], with [`rebuild`] as the identity-preserving
//!   default
//! - [`walk`](walk::walk), find and replace utilities
//! - [`ExpressionComparer`] for equivalence up to alias and parameter renaming
//! - alias and column gatherers, the aggregate checker
//! - redundant subquery removal and merging
//! - query duplication and alias de-duplication
//! - the partial evaluator and its interpreter
//!
//! ## Pass order
//!
//! ```text
//! evaluate → deduplicate_aliases → remove_redundant_subqueries
//! ```
//!
//! Each pass returns the input reference unchanged when it has nothing to do.

pub mod aggregate;
pub mod comparer;
pub mod duplicate;
pub mod error;
pub mod eval;
pub mod gather;
pub mod guard;
pub mod replace;
pub mod subquery;
pub mod visitor;
pub mod walk;

pub use aggregate::has_aggregates;
pub use comparer::{ExpressionComparer, equivalent};
pub use duplicate::{deduplicate_aliases, duplicate};
pub use error::{EvalError, EvalResult, RewriteError, RewriteResult};
pub use eval::{FunctionRegistry, HostFunction, Interpreter, PartialEvaluator, evaluate};
pub use gather::{declared_aliases, referenced_aliases, referenced_columns};
pub use guard::{DEFAULT_RECURSION_LIMIT, RecursionGuard};
pub use replace::{replace, replace_all, replace_with};
pub use subquery::{merge_subqueries, remove_redundant_from, remove_redundant_subqueries};
pub use visitor::{IdentityRewriter, Rewriter, Visitor, rebuild};
pub use walk::{WalkCallbacks, contains, find_all, find_first, walk, walk_with};
