// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Mapping metadata consumed by the node model
//!
//! The mapping layer decides how client types map onto tables and columns.
//! This module only defines the narrow surface the node model needs from it:
//!
//! - [`DataType`] / [`QueryType`]: the database-side type of a column or
//!   parameter
//! - [`MappingEntity`]: an opaque handle attached to table and entity nodes
//! - [`TypeSystem`]: the "query type for client type" lookup used when a
//!   rewrite synthesizes new columns

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Type;

/// SQL data types (dialect neutral)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DataType {
    // Numeric types
    Integer,
    BigInt,
    SmallInt,
    TinyInt,
    Decimal { precision: u8, scale: u8 },
    Float,
    Double,

    // String types
    Varchar(Option<usize>),
    Char(Option<usize>),
    Text,

    // Binary types
    Binary,
    VarBinary(Option<usize>),

    // Date/Time types
    Date,
    Time,
    DateTime,
    Timestamp,

    // Boolean
    Boolean,

    // Special types
    Uuid,

    // Unknown/Other (with original type name)
    Other(String),
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "INT"),
            DataType::BigInt => write!(f, "BIGINT"),
            DataType::SmallInt => write!(f, "SMALLINT"),
            DataType::TinyInt => write!(f, "TINYINT"),
            DataType::Decimal { precision, scale } => {
                write!(f, "DECIMAL({}, {})", precision, scale)
            }
            DataType::Float => write!(f, "REAL"),
            DataType::Double => write!(f, "DOUBLE PRECISION"),
            DataType::Varchar(Some(len)) => write!(f, "VARCHAR({})", len),
            DataType::Varchar(None) => write!(f, "VARCHAR"),
            DataType::Char(Some(len)) => write!(f, "CHAR({})", len),
            DataType::Char(None) => write!(f, "CHAR"),
            DataType::Text => write!(f, "TEXT"),
            DataType::Binary => write!(f, "BINARY"),
            DataType::VarBinary(Some(len)) => write!(f, "VARBINARY({})", len),
            DataType::VarBinary(None) => write!(f, "VARBINARY"),
            DataType::Date => write!(f, "DATE"),
            DataType::Time => write!(f, "TIME"),
            DataType::DateTime => write!(f, "DATETIME"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Uuid => write!(f, "UUID"),
            DataType::Other(name) => write!(f, "{}", name),
        }
    }
}

/// Database-side type of a column, parameter, or variable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryType {
    pub data_type: DataType,
    pub nullable: bool,
}

impl QueryType {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            nullable: false,
        }
    }

    /// Builder method: mark the type as nullable
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{} NULL", self.data_type)
        } else {
            write!(f, "{} NOT NULL", self.data_type)
        }
    }
}

/// Opaque handle to a mapping entity
///
/// The node model never interprets it; it is carried on table and entity
/// nodes so later stages can find their way back to the mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MappingEntity {
    pub entity_id: String,
    pub element_type: Type,
}

impl MappingEntity {
    pub fn new(entity_id: impl Into<String>, element_type: Type) -> Self {
        Self {
            entity_id: entity_id.into(),
            element_type,
        }
    }
}

/// Lookup from client types to database types
pub trait TypeSystem {
    /// The database type used to store values of `ty`
    fn column_type(&self, ty: &Type) -> QueryType;
}

/// A dialect-neutral [`TypeSystem`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTypeSystem;

impl TypeSystem for DefaultTypeSystem {
    fn column_type(&self, ty: &Type) -> QueryType {
        let data_type = match ty.non_nullable() {
            Type::Bool => DataType::Boolean,
            Type::Int32 => DataType::Integer,
            Type::Int64 => DataType::BigInt,
            Type::Float64 => DataType::Double,
            Type::String => DataType::Varchar(None),
            Type::Bytes => DataType::VarBinary(None),
            other => DataType::Other(other.to_string()),
        };
        QueryType::new(data_type).with_nullable(ty.is_nullable() || matches!(ty, Type::String))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_type_system() {
        let ts = DefaultTypeSystem;
        assert_eq!(ts.column_type(&Type::Int32), QueryType::new(DataType::Integer));
        let nullable = ts.column_type(&Type::nullable(Type::Int64));
        assert_eq!(nullable.data_type, DataType::BigInt);
        assert!(nullable.nullable);
    }

    #[test]
    fn test_query_type_display() {
        let qt = QueryType::new(DataType::Varchar(Some(40))).with_nullable(true);
        assert_eq!(qt.to_string(), "VARCHAR(40) NULL");
        assert_eq!(DataType::Decimal { precision: 10, scale: 2 }.to_string(), "DECIMAL(10, 2)");
    }
}
