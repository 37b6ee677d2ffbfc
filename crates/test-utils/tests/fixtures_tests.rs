// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Integration tests for the fixture builder

use relq_ir::{AliasAllocator, Expr, ExprKind, JoinType};
use relq_test_utils::{QueryBuilder, TreeAssertions};

#[test]
fn test_customer_orders_join() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let source = builder.customer_orders();
    let select = TreeAssertions::expect_select(&source.expr);

    let from = select.from.as_ref().unwrap();
    match from.as_ref() {
        Expr::Join(join) => {
            assert_eq!(join.join_type, JoinType::InnerJoin);
            assert!(join.condition.is_some());
        }
        other => panic!("Expected Join, found {:?}", other),
    }
    assert_eq!(source.column_names(), vec!["Name", "Total"]);
}

#[test]
fn test_pass_through_columns() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let customers = builder.customers();
    let select = builder.pass_through(&customers);
    let decl = &TreeAssertions::expect_select(&select.expr).columns[2];
    assert_eq!(decl.name, "City");
    TreeAssertions::assert_column_ref(&decl.expr, customers.alias, "City");
}

#[test]
fn test_nested_customers_depth() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let tree = builder.nested_customers();
    let outer = TreeAssertions::expect_projected_select(&tree);
    let middle = outer.from.as_ref().unwrap();
    TreeAssertions::assert_kind(middle, ExprKind::Select);
    let inner = TreeAssertions::expect_select(middle).from.as_ref().unwrap();
    TreeAssertions::assert_kind(inner, ExprKind::Select);
}

#[test]
fn test_fixture_json_round_trip() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    TreeAssertions::assert_json_round_trip(&builder.customers_in("Berlin"));
}
