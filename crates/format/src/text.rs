// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Debug text for nodes and node payloads

use relq_ir::{
    AggregateExpr, AggregateSubqueryExpr, BatchExpr, BetweenExpr, BlockCommand, ClientJoinExpr,
    ColumnExpr, DeclarationCommand, DeleteCommand, EntityExpr, ExistsExpr, ExprRef, FunctionExpr,
    IfCommand, InSubqueryExpr, InValuesExpr, InsertCommand, IntoExpr, IsNullExpr, JoinExpr,
    NamedValueExpr, OuterJoinedExpr, ProjectionExpr, RowNumberExpr, ScalarSubqueryExpr,
    SelectExpr, TableExpr, UpdateCommand, VariableExpr,
};

use crate::debug::DebugFormatter;
use crate::options::FormatOptions;

/// Render a node (or a payload that wraps into one) with the debug formatter
pub trait DebugText {
    fn to_debug_text_with(&self, options: &FormatOptions) -> String;

    fn to_debug_text(&self) -> String {
        self.to_debug_text_with(&FormatOptions::default())
    }
}

impl DebugText for ExprRef {
    fn to_debug_text_with(&self, options: &FormatOptions) -> String {
        DebugFormatter::with_options(options.clone()).format(self)
    }
}

macro_rules! impl_debug_text {
    ($($payload:ty),* $(,)?) => {
        $(
            impl DebugText for $payload {
                fn to_debug_text_with(&self, options: &FormatOptions) -> String {
                    self.clone().into_expr().to_debug_text_with(options)
                }
            }
        )*
    };
}

impl_debug_text!(
    TableExpr,
    ColumnExpr,
    SelectExpr,
    JoinExpr,
    ProjectionExpr,
    ClientJoinExpr,
    EntityExpr,
    AggregateExpr,
    AggregateSubqueryExpr,
    ScalarSubqueryExpr,
    ExistsExpr,
    InSubqueryExpr,
    InValuesExpr,
    IsNullExpr,
    BetweenExpr,
    RowNumberExpr,
    NamedValueExpr,
    OuterJoinedExpr,
    FunctionExpr,
    InsertCommand,
    UpdateCommand,
    DeleteCommand,
    BatchExpr,
    BlockCommand,
    IfCommand,
    DeclarationCommand,
    VariableExpr,
);

#[cfg(test)]
mod tests {
    use relq_ir::{DataType, MappingEntity, QueryType, TableAlias, Type};

    use super::*;

    #[test]
    fn test_payload_text_matches_node_text() {
        let table = TableExpr::new(
            TableAlias::from_raw(3),
            MappingEntity::new("Customer", Type::named("Customer")),
            "customers",
        );
        assert_eq!(table.to_debug_text(), "customers AS t0");
        let options = FormatOptions::default().with_alias_ids(true);
        assert_eq!(table.to_debug_text_with(&options), "customers AS A3");
    }

    #[test]
    fn test_free_column_is_marked() {
        let column = ColumnExpr::new(
            TableAlias::from_raw(9),
            "Name",
            QueryType::new(DataType::Text),
            Type::String,
        );
        assert_eq!(column.to_debug_text(), "??A9??.Name");
    }
}
