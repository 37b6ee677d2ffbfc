// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Error types for node construction helpers

use serde::Serialize;

use crate::alias::TableAlias;

/// Result type alias for construction helpers
pub type IrResult<T> = Result<T, IrError>;

/// Errors raised by helpers that validate the nodes they build
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq, Serialize)]
pub enum IrError {
    /// A select already declares a column with this name
    #[error("Duplicate column name '{name}' in select {alias}")]
    DuplicateColumnName { alias: TableAlias, name: String },

    /// No column with this name is declared by the select
    #[error("Column '{name}' not found in select {alias}")]
    ColumnNotFound { alias: TableAlias, name: String },

    /// Two parallel lists that must line up do not
    #[error("Arity mismatch in {context}: expected {expected}, found {found}")]
    InvalidArity {
        context: String,
        expected: usize,
        found: usize,
    },
}

impl IrError {
    /// Get the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            IrError::DuplicateColumnName { .. } => ErrorSeverity::Error,
            IrError::ColumnNotFound { .. } => ErrorSeverity::Warning,
            IrError::InvalidArity { .. } => ErrorSeverity::Error,
        }
    }
}

/// Severity level shared by the error types of the workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ErrorSeverity {
    /// Informational note
    Info,
    /// Warning (the caller may recover)
    Warning,
    /// Error (a pipeline bug or corrupt tree)
    Error,
}
