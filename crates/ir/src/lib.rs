// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # relq - Expression node model
//!
//! This crate provides the node model shared by every query-translation pass.
//! The model is designed to:
//! - Cover client computation and relational algebra in one closed sum type
//! - Stay immutable, with identity-preserving copy-on-write updates
//! - Correlate columns with their row sources through opaque aliases
//! - Serialize losslessly with serde

pub mod alias;
pub mod command;
pub mod error;
pub mod expr;
pub mod metadata;
pub mod query;
pub mod reader;
pub mod select;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use alias::{AliasAllocator, ParameterId, TableAlias};
pub use command::{
    BatchExpr, BlockCommand, ColumnAssignment, DeclarationCommand, DeleteCommand, IfCommand,
    InsertCommand, UpdateCommand, VariableDeclaration, VariableExpr,
};
pub use error::{ErrorSeverity, IrError, IrResult};
pub use expr::{
    BinaryExpr, BinaryOp, CallExpr, ConditionalExpr, ConstantExpr, Expr, ExprKind, ExprRef,
    IndexExpr, IntoExpr, InvokeExpr, LambdaExpr, MemberExpr, MethodRef, NewArrayExpr, NewExpr,
    ParameterExpr, UnaryExpr, UnaryOp, node_id, same, same_list, same_opt,
};
pub use metadata::{DataType, DefaultTypeSystem, MappingEntity, QueryType, TypeSystem};
pub use query::{
    AggregateExpr, AggregateSubqueryExpr, BetweenExpr, ClientJoinExpr, ColumnDeclaration,
    ColumnExpr, EntityExpr, ExistsExpr, FunctionExpr, InSubqueryExpr, InValuesExpr, IsNullExpr,
    JoinExpr, JoinType, NamedValueExpr, OrderExpression, OrderType, OuterJoinedExpr,
    ProjectionExpr, RowNumberExpr, ScalarSubqueryExpr, SelectExpr, TableExpr,
};
pub use reader::FieldReader;
pub use types::Type;
pub use value::{Record, Value};
