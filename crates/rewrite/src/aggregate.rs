// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Aggregate detection for a single select

use relq_ir::{Expr, ExprRef, SelectExpr};

use crate::walk::contains_pruned;

fn is_subquery(node: &ExprRef) -> bool {
    matches!(
        node.as_ref(),
        Expr::Select(_)
            | Expr::ScalarSubquery(_)
            | Expr::Exists(_)
            | Expr::InSubquery(_)
            | Expr::AggregateSubquery(_)
    )
}

fn has_aggregate(node: &ExprRef) -> bool {
    contains_pruned(node, |n| matches!(n.as_ref(), Expr::Aggregate(_)), |n| !is_subquery(n))
}

/// Whether `select` aggregates in its columns, `WHERE` or `ORDER BY`
///
/// Subqueries and the source are not inspected; they aggregate on their own.
pub fn has_aggregates(select: &SelectExpr) -> bool {
    select.where_clause.as_ref().is_some_and(has_aggregate)
        || select.order_by.iter().any(|o| has_aggregate(&o.expr))
        || select.columns.iter().any(|c| has_aggregate(&c.expr))
}

#[cfg(test)]
mod tests {
    use relq_ir::{
        AggregateExpr, AliasAllocator, ColumnDeclaration, DataType, IntoExpr, QueryType,
        ScalarSubqueryExpr, Type,
    };

    use super::*;

    fn count() -> ExprRef {
        AggregateExpr {
            name: "COUNT".to_string(),
            argument: None,
            distinct: false,
            ty: Type::Int32,
        }
        .into_expr()
    }

    #[test]
    fn test_aggregate_in_columns() {
        let ids = AliasAllocator::new();
        let select = SelectExpr::new(
            ids.next_alias(),
            vec![ColumnDeclaration::new("n", count(), QueryType::new(DataType::Integer))],
            None,
        );
        assert!(has_aggregates(&select));
    }

    #[test]
    fn test_aggregate_inside_subquery_is_ignored() {
        let ids = AliasAllocator::new();
        let inner = SelectExpr::new(
            ids.next_alias(),
            vec![ColumnDeclaration::new("n", count(), QueryType::new(DataType::Integer))],
            None,
        )
        .into_expr();
        let scalar = ScalarSubqueryExpr {
            select: inner,
            ty: Type::Int32,
        }
        .into_expr();
        let select = SelectExpr::new(
            ids.next_alias(),
            vec![ColumnDeclaration::new("n", scalar, QueryType::new(DataType::Integer))],
            None,
        );
        assert!(!has_aggregates(&select));
    }
}
