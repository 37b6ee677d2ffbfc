// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Result types
//!
//! [`Type`] is the client-side value type a node produces when evaluated.
//! It is distinct from [`QueryType`](crate::QueryType), which describes how a
//! value is stored in the database.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Client-side value type of an expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// No value (relational sources, declarations)
    Void,
    Bool,
    Int32,
    Int64,
    Float64,
    String,
    Bytes,
    /// Any value
    Object,
    /// The row reader a projector is evaluated against
    Reader,
    /// A value that may be null
    Nullable(Box<Type>),
    /// A sequence of values
    Sequence(Box<Type>),
    /// A named record or entity type
    Named(String),
    /// A function (lambda) type
    Function { params: Vec<Type>, ret: Box<Type> },
}

impl Type {
    pub fn named(name: impl Into<String>) -> Self {
        Type::Named(name.into())
    }

    pub fn nullable(inner: Type) -> Self {
        match inner {
            Type::Nullable(_) => inner,
            other => Type::Nullable(Box::new(other)),
        }
    }

    pub fn sequence(element: Type) -> Self {
        Type::Sequence(Box::new(element))
    }

    /// Strip one level of `Nullable`
    pub fn non_nullable(&self) -> &Type {
        match self {
            Type::Nullable(inner) => inner,
            other => other,
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, Type::Nullable(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.non_nullable(),
            Type::Int32 | Type::Int64 | Type::Float64
        )
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.non_nullable(), Type::Bool)
    }

    /// Element type of a sequence type
    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Sequence(element) => Some(element),
            _ => None,
        }
    }

    /// Return type of a function type
    pub fn return_type(&self) -> Option<&Type> {
        match self {
            Type::Function { ret, .. } => Some(ret),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Bool => write!(f, "bool"),
            Type::Int32 => write!(f, "int"),
            Type::Int64 => write!(f, "long"),
            Type::Float64 => write!(f, "double"),
            Type::String => write!(f, "string"),
            Type::Bytes => write!(f, "byte[]"),
            Type::Object => write!(f, "object"),
            Type::Reader => write!(f, "FieldReader"),
            Type::Nullable(inner) => write!(f, "{}?", inner),
            Type::Sequence(element) => write!(f, "IEnumerable<{}>", element),
            Type::Named(name) => write!(f, "{}", name),
            Type::Function { params, ret } => {
                write!(f, "Func<")?;
                for param in params {
                    write!(f, "{}, ", param)?;
                }
                write!(f, "{}>", ret)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nullable_does_not_nest() {
        let ty = Type::nullable(Type::nullable(Type::Int32));
        assert_eq!(ty, Type::Nullable(Box::new(Type::Int32)));
        assert_eq!(ty.non_nullable(), &Type::Int32);
        assert!(ty.is_numeric());
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::sequence(Type::named("Customer")).to_string(), "IEnumerable<Customer>");
        let func = Type::Function {
            params: vec![Type::Reader],
            ret: Box::new(Type::String),
        };
        assert_eq!(func.to_string(), "Func<FieldReader, string>");
    }
}
