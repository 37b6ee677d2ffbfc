// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Integration tests for the debug and SQL formatters

use relq_format::{DebugFormatter, FormatError, FormatOptions, format_debug, format_sql};
use relq_ir::{
    AliasAllocator, ColumnDeclaration, DataType, Expr, ExprKind, InValuesExpr, IntoExpr, JoinType,
    QueryType, SelectExpr,
};
use relq_test_utils::QueryBuilder;

#[test]
fn test_debug_projection_over_filtered_select() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let tree = builder.customers_in("London");

    let expected = "\
PROJECT new Row { CustomerID = t1.CustomerID, Name = t1.Name }
FROM (
  SELECT t0.CustomerID, t0.Name
  FROM customers AS t0
  WHERE (t0.City == \"London\")
) AS t1";
    assert_eq!(format_debug(&tree), expected);
}

#[test]
fn test_debug_indent_restored_after_nested_selects() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let tree = builder.nested_customers();

    let expected = "\
PROJECT new Row { CustomerID = t3.CustomerID, Name = t3.Name }
FROM (
  SELECT t2.CustomerID, t2.Name
  FROM (
    SELECT t1.CustomerID, t1.Name
    FROM (
      SELECT t0.CustomerID, t0.Name
      FROM customers AS t0
      WHERE (t0.City == \"London\")
    ) AS t1
  ) AS t2
) AS t3";
    assert_eq!(format_debug(&tree), expected);
}

#[test]
fn test_debug_marks_out_of_scope_reference() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let customers = builder.customers();
    let orders = builder.orders();
    let correlated = builder.finish(
        builder
            .select_columns(&orders, &["Total"])
            .with_where(Expr::equal(
                builder.column(&orders, "CustomerID"),
                builder.column(&customers, "CustomerID"),
            )),
    );
    let marker = format!("??{}??", customers.alias);

    let inner = builder.join(JoinType::InnerJoin, &customers, &correlated, None);
    assert!(format_debug(&inner).contains(&marker));

    let apply = builder.join(JoinType::CrossApply, &customers, &correlated, None);
    let text = format_debug(&apply);
    assert!(!text.contains(&marker), "{}", text);
    assert!(text.contains("WHERE (t1.CustomerID == t0.CustomerID)"), "{}", text);
}

#[test]
fn test_debug_marks_duplicate_declaration() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let customers = builder.customers();
    let join = builder.join(JoinType::CrossJoin, &customers, &customers, None);
    assert_eq!(
        format_debug(&join),
        format!("customers AS t0\nCROSS JOIN customers AS !!{}!!", customers.alias)
    );
}

#[test]
fn test_debug_output_is_deterministic() {
    let first = QueryBuilder::new(&AliasAllocator::new()).customers_in("Paris");
    let second = QueryBuilder::new(&AliasAllocator::starting_at(500)).customers_in("Paris");

    let text = format_debug(&first);
    assert_eq!(text, format_debug(&first));
    // Alias ids never reach the output by default
    assert_eq!(text, format_debug(&second));

    let with_ids = DebugFormatter::with_options(FormatOptions::default().with_alias_ids(true));
    assert_ne!(with_ids.format(&first), with_ids.format(&second));
}

#[test]
fn test_sql_join() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let select = builder.customer_orders();

    assert_eq!(
        format_sql(&select.expr).unwrap(),
        "SELECT t0.Name, t1.Total\nFROM customers AS t0\n\
         INNER JOIN orders AS t1 ON (t0.CustomerID = t1.CustomerID)"
    );
}

#[test]
fn test_sql_rejects_projection() {
    let ids = AliasAllocator::new();
    let tree = QueryBuilder::new(&ids).customers_in("Rome");
    assert_eq!(
        format_sql(&tree),
        Err(FormatError::Unsupported {
            kind: ExprKind::Projection
        })
    );
}

#[test]
fn test_sql_rejects_non_scalar_column() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let customers = builder.customers();
    let nested = builder.pass_through(&customers);
    let orders = builder.orders();
    let select = SelectExpr::new(
        ids.next_alias(),
        vec![ColumnDeclaration::new(
            "Nested",
            nested.expr,
            QueryType::new(DataType::Other("row".to_string())),
        )],
        Some(orders.expr),
    )
    .into_expr();

    assert_eq!(
        format_sql(&select),
        Err(FormatError::NonScalarProjection {
            name: "Nested".to_string(),
            kind: ExprKind::Select,
        })
    );
}

#[test]
fn test_sql_predicate_and_value_contexts() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let customers = builder.customers();
    let is_london = Expr::equal(builder.column(&customers, "City"), Expr::constant("London"));
    let select = SelectExpr::new(
        ids.next_alias(),
        vec![builder.declaration("IsLondon", is_london)],
        Some(customers.expr.clone()),
    )
    .with_where(Expr::constant(true))
    .into_expr();

    assert_eq!(
        format_sql(&select).unwrap(),
        "SELECT CASE WHEN (t0.City = 'London') THEN TRUE ELSE FALSE END AS IsLondon\n\
         FROM customers AS t0\n\
         WHERE 1 = 1"
    );
}

#[test]
fn test_sql_empty_in_list_is_false() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let customers = builder.customers();
    let none = InValuesExpr {
        expr: builder.column(&customers, "City"),
        values: Vec::new(),
    }
    .into_expr();
    let select = builder
        .select_columns(&customers, &["Name"])
        .with_where(none)
        .into_expr();

    assert_eq!(
        format_sql(&select).unwrap(),
        "SELECT t0.Name\nFROM customers AS t0\nWHERE 1 = 0"
    );
}
