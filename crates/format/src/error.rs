// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Formatting errors

use relq_ir::{ErrorSeverity, ExprKind};
use relq_rewrite::RewriteError;

/// Result type for formatting
pub type FormatResult<T> = Result<T, FormatError>;

/// Errors raised while rendering a tree as text
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum FormatError {
    /// The SQL formatter met a node that has no place in a finished command
    #[error("Expression kind '{kind}' cannot be rendered as SQL")]
    Unsupported { kind: ExprKind },

    /// A select column is not a scalar expression
    #[error("Column '{name}' of a select is not a scalar expression ({kind})")]
    NonScalarProjection { name: String, kind: ExprKind },

    /// A constant with no literal form in SQL (sequence, record)
    #[error("Value of type '{type_name}' has no SQL literal form")]
    UnrepresentableLiteral { type_name: String },

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error("Formatting failed: {0}")]
    Fmt(#[from] std::fmt::Error),
}

impl FormatError {
    /// Get the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            FormatError::Unsupported { .. } => ErrorSeverity::Error,
            FormatError::NonScalarProjection { .. } => ErrorSeverity::Error,
            FormatError::UnrepresentableLiteral { .. } => ErrorSeverity::Error,
            FormatError::Rewrite(err) => err.severity(),
            FormatError::Fmt(_) => ErrorSeverity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FormatError::Unsupported {
            kind: ExprKind::Projection,
        };
        assert_eq!(err.to_string(), "Expression kind 'Projection' cannot be rendered as SQL");
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_rewrite_error_keeps_severity() {
        let err: FormatError = RewriteError::RecursionLimitExceeded { depth: 11, limit: 10 }.into();
        assert_eq!(err.severity(), ErrorSeverity::Error);
        assert!(err.to_string().contains("limit: 10"));
    }
}
