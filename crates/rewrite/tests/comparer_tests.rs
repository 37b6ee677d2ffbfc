// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Integration tests for structural comparison of query trees

use relq_ir::{
    AliasAllocator, Expr, ExprRef, JoinType, OrderExpression, OrderType, SelectExpr, Type,
};
use relq_rewrite::{ExpressionComparer, duplicate, equivalent};
use relq_test_utils::{QueryBuilder, Source};

/// A correlated join: every customer with the orders placed by them
fn correlated(ids: &AliasAllocator, join_type: JoinType) -> ExprRef {
    let builder = QueryBuilder::new(ids);
    let customers = builder.customers();
    let orders = builder.orders();
    let per_customer: Source = builder.finish(
        builder
            .select_columns(&orders, &["OrderID", "Total"])
            .with_where(Expr::equal(
                builder.column(&orders, "CustomerID"),
                builder.column(&customers, "CustomerID"),
            )),
    );
    builder.join(join_type, &customers, &per_customer, None)
}

/// The same filtered select, built under a fresh allocator each time
fn filtered(ids: &AliasAllocator, city: &str, take: Option<i32>) -> ExprRef {
    let builder = QueryBuilder::new(ids);
    let customers = builder.customers();
    let mut select = builder
        .select_columns(&customers, &["Name", "City"])
        .with_where(Expr::equal(
            builder.column(&customers, "City"),
            Expr::constant(city),
        ))
        .with_order_by(vec![OrderExpression::new(
            OrderType::Ascending,
            builder.column(&customers, "Name"),
        )]);
    if let Some(take) = take {
        select = select.with_take(Expr::constant(take));
    }
    builder.finish(select).expr
}

#[test]
fn test_equivalent_up_to_alias_renaming() {
    let a = QueryBuilder::new(&AliasAllocator::new()).customers_in("Oslo");
    let b = QueryBuilder::new(&AliasAllocator::starting_at(100)).customers_in("Oslo");
    assert!(equivalent(&a, &b));
    assert!(equivalent(&b, &a));
}

#[test]
fn test_not_equivalent_per_field() {
    let base = filtered(&AliasAllocator::new(), "Oslo", None);
    let other_city = filtered(&AliasAllocator::new(), "Bergen", None);
    let paged = filtered(&AliasAllocator::new(), "Oslo", Some(10));

    assert!(equivalent(&base, &filtered(&AliasAllocator::starting_at(7), "Oslo", None)));
    assert!(!equivalent(&base, &other_city));
    assert!(!equivalent(&base, &paged));
    assert!(!equivalent(&paged, &base));
}

/// `SELECT <column> AS Value FROM customers ORDER BY Name <order> [OFFSET skip]`
fn ordered(ids: &AliasAllocator, column: &str, order: OrderType, skip: Option<i32>) -> ExprRef {
    let builder = QueryBuilder::new(ids);
    let customers = builder.customers();
    let value = builder.declaration("Value", builder.column(&customers, column));
    let mut select = SelectExpr::new(ids.next_alias(), vec![value], Some(customers.expr.clone()))
        .with_order_by(vec![OrderExpression::new(
            order,
            builder.column(&customers, "Name"),
        )]);
    if let Some(skip) = skip {
        select = select.with_skip(Expr::constant(skip));
    }
    builder.finish(select).expr
}

#[test]
fn test_not_equivalent_on_order_skip_or_column() {
    let base = ordered(&AliasAllocator::new(), "Name", OrderType::Ascending, Some(1));
    let renamed = ordered(&AliasAllocator::starting_at(20), "Name", OrderType::Ascending, Some(1));
    assert!(equivalent(&base, &renamed));

    let descending = ordered(&AliasAllocator::new(), "Name", OrderType::Descending, Some(1));
    let skip_two = ordered(&AliasAllocator::new(), "Name", OrderType::Ascending, Some(2));
    let no_skip = ordered(&AliasAllocator::new(), "Name", OrderType::Ascending, None);
    let other_column = ordered(&AliasAllocator::new(), "City", OrderType::Ascending, Some(1));

    assert!(!equivalent(&base, &descending));
    assert!(!equivalent(&base, &skip_two));
    assert!(!equivalent(&base, &no_skip));
    assert!(!equivalent(&base, &other_column));
}

#[test]
fn test_distinct_flag_matters() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let customers = builder.customers();
    let plain = builder.finish(builder.select_columns(&customers, &["City"])).expr;
    let distinct = builder
        .finish(builder.select_columns(&customers, &["City"]).with_distinct(true))
        .expr;
    assert!(!equivalent(&plain, &distinct));
}

#[test]
fn test_apply_scope_reaches_right_side() {
    let a = correlated(&AliasAllocator::new(), JoinType::CrossApply);
    let b = correlated(&AliasAllocator::starting_at(50), JoinType::CrossApply);
    assert!(equivalent(&a, &b));
}

#[test]
fn test_plain_join_does_not_scope_right_side() {
    // Outside an apply the right side cannot see the left aliases
    let a = correlated(&AliasAllocator::new(), JoinType::InnerJoin);
    let b = correlated(&AliasAllocator::starting_at(50), JoinType::InnerJoin);
    assert!(!equivalent(&a, &b));
}

#[test]
fn test_join_type_mismatch() {
    let ids = AliasAllocator::new();
    let a = correlated(&ids, JoinType::CrossApply);
    let b = correlated(&ids, JoinType::OuterApply);
    assert!(!equivalent(&a, &b));
}

#[test]
fn test_duplicate_is_equivalent() {
    let ids = AliasAllocator::new();
    let tree = QueryBuilder::new(&ids).nested_customers();
    let copy = duplicate(&tree, &ids).unwrap();
    assert!(equivalent(&tree, &copy));
}

#[test]
fn test_value_eq_override() {
    let a = filtered(&AliasAllocator::new(), "oslo", None);
    let b = filtered(&AliasAllocator::new(), "OSLO", None);
    assert!(!equivalent(&a, &b));

    let ignore_case = |x: &relq_ir::Value, y: &relq_ir::Value| match (x.as_str(), y.as_str()) {
        (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
        _ => x == y,
    };
    assert!(ExpressionComparer::new().with_value_eq(ignore_case).equivalent(&a, &b));
}

#[test]
fn test_lambda_over_query_parameter() {
    let left_ids = AliasAllocator::new();
    let right_ids = AliasAllocator::starting_at(9);
    let lambda = |ids: &AliasAllocator| {
        let c = ids.parameter_decl("c", Type::named("Customer"));
        let body = Expr::equal(
            Expr::member(relq_ir::IntoExpr::into_expr(c.clone()), "City", Type::String),
            Expr::constant("Oslo"),
        );
        Expr::lambda(vec![c], body)
    };
    assert!(equivalent(&lambda(&left_ids), &lambda(&right_ids)));
}
