// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Error types for traversal, rewriting and partial evaluation

use relq_ir::{ErrorSeverity, ExprKind, TableAlias};
use serde::Serialize;

/// Result type alias for rewrite operations
pub type RewriteResult<T> = Result<T, RewriteError>;

/// Result type alias for expression interpretation
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors raised while traversing or rewriting a tree
#[derive(Debug, thiserror::Error, Clone, PartialEq, Serialize)]
pub enum RewriteError {
    /// A visitor reached a node kind it has no handler for
    #[error("Unhandled expression kind '{kind}' in {context}")]
    UnhandledKind { kind: ExprKind, context: String },

    /// Tree depth exceeded the configured guard (debug builds only)
    #[error("Recursion limit exceeded (depth: {depth}, limit: {limit})")]
    RecursionLimitExceeded { depth: usize, limit: usize },

    /// A column references a removed select that does not declare it
    #[error("Reference to undefined column '{name}' of {alias}")]
    UndefinedColumn { alias: TableAlias, name: String },

    /// A folded subtree failed when executed
    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl RewriteError {
    pub fn unhandled(kind: ExprKind, context: impl Into<String>) -> Self {
        RewriteError::UnhandledKind {
            kind,
            context: context.into(),
        }
    }

    /// Get the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RewriteError::UnhandledKind { .. } => ErrorSeverity::Error,
            RewriteError::RecursionLimitExceeded { .. } => ErrorSeverity::Error,
            RewriteError::UndefinedColumn { .. } => ErrorSeverity::Error,
            // The caller decides whether a failed fold is a user error
            RewriteError::Eval(_) => ErrorSeverity::Warning,
        }
    }
}

/// Errors raised by the expression interpreter
#[derive(Debug, thiserror::Error, Clone, PartialEq, Serialize)]
pub enum EvalError {
    #[error("Division by zero")]
    DivideByZero,

    #[error("Arithmetic overflow in '{op}'")]
    Overflow { op: String },

    #[error("Parameter '{name}' is not bound")]
    UnboundParameter { name: String },

    #[error("Value of type '{type_name}' has no member '{member}'")]
    UnknownMember { type_name: String, member: String },

    #[error("Unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Expression of kind '{kind}' cannot be evaluated locally")]
    NotEvaluable { kind: ExprKind },

    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    /// Failure reported by a registered host function
    #[error("Host function '{name}' failed: {message}")]
    Host { name: String, message: String },
}

impl EvalError {
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        EvalError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}
