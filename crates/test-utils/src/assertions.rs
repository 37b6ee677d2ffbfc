// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Node-level test helpers and custom assertions

use std::sync::Arc;

use relq_ir::{Expr, ExprKind, ExprRef, SelectExpr, TableAlias, Value};

/// Custom assertion helpers for tree tests
pub struct TreeAssertions;

impl TreeAssertions {
    /// Assert that two handles point at the same node
    pub fn assert_same(actual: &ExprRef, expected: &ExprRef) {
        assert!(
            Arc::ptr_eq(actual, expected),
            "Expected the original node back, found a rebuilt one:\n{:?}",
            actual
        );
    }

    /// Assert that a pass produced a new node
    pub fn assert_rebuilt(actual: &ExprRef, original: &ExprRef) {
        assert!(
            !Arc::ptr_eq(actual, original),
            "Expected a rebuilt node, found the original:\n{:?}",
            actual
        );
    }

    pub fn assert_kind(expr: &ExprRef, kind: ExprKind) {
        assert_eq!(expr.kind(), kind, "Expected {} node, found {:?}", kind, expr);
    }

    /// Assert that an expression is a column reference `alias.name`
    pub fn assert_column_ref(expr: &ExprRef, alias: TableAlias, name: &str) {
        match expr.as_ref() {
            Expr::Column(column) => {
                assert_eq!(column.alias, alias, "Column '{}' bound to the wrong alias", name);
                assert_eq!(
                    column.name, name,
                    "Expected column '{}', found '{}'",
                    name, column.name
                );
            }
            _ => panic!("Expected Column expression, found {:?}", expr),
        }
    }

    /// Assert that an expression is a constant holding `value`
    pub fn assert_constant(expr: &ExprRef, value: impl Into<Value>) {
        let value = value.into();
        match expr.as_constant() {
            Some(found) => assert_eq!(found, &value, "Constant value mismatch"),
            None => panic!("Expected Constant expression, found {:?}", expr),
        }
    }

    /// Unwrap a select node
    pub fn expect_select(expr: &ExprRef) -> &SelectExpr {
        match expr.as_select() {
            Some(select) => select,
            None => panic!("Expected Select expression, found {:?}", expr),
        }
    }

    /// Unwrap the select under a projection node
    pub fn expect_projected_select(expr: &ExprRef) -> &SelectExpr {
        match expr.as_projection() {
            Some(projection) => Self::expect_select(&projection.select),
            None => panic!("Expected Projection expression, found {:?}", expr),
        }
    }

    /// Assert that a tree survives a JSON round trip unchanged
    pub fn assert_json_round_trip(expr: &ExprRef) {
        let json = serde_json::to_string(expr).expect("Failed to serialize tree");
        let back: ExprRef = serde_json::from_str(&json).expect("Failed to deserialize tree");
        assert_eq!(&back, expr, "Tree changed across a JSON round trip");
    }
}
