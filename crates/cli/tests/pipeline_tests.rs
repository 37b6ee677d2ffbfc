// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! End-to-end tests: serialized tree in, rendered text out

use relq_cli::{OutputMode, PassConfig, RelqConfig, render, run_passes};
use relq_format::format_debug;
use relq_ir::{AliasAllocator, Expr, ExprRef, IntoExpr, JoinType, SelectExpr};
use relq_test_utils::QueryBuilder;

fn through_json(tree: &ExprRef) -> ExprRef {
    let json = serde_json::to_string(tree).unwrap();
    serde_json::from_str(&json).unwrap()
}

fn config(passes: PassConfig, output: OutputMode) -> RelqConfig {
    RelqConfig {
        passes,
        output,
        ..RelqConfig::default()
    }
}

#[test]
fn test_remove_redundant_after_json_round_trip() {
    let ids = AliasAllocator::new();
    let tree = through_json(&QueryBuilder::new(&ids).nested_customers());
    let passes = PassConfig {
        remove_redundant_subqueries: true,
        ..PassConfig::default()
    };
    let config = config(passes, OutputMode::Debug);

    let out = run_passes(&tree, &config).unwrap();
    let text = render(&out, &config).unwrap();
    assert_eq!(text.matches("SELECT").count(), 1, "{}", text);
    assert!(text.contains("FROM customers AS t0"), "{}", text);
    assert!(text.contains("WHERE (t0.City == \"London\")"), "{}", text);
}

#[test]
fn test_evaluate_then_sql() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let customers = builder.customers();
    let city = Expr::add(Expr::constant("Lon"), Expr::constant("don"));
    let select = builder
        .select_columns(&customers, &["Name"])
        .with_where(Expr::equal(builder.column(&customers, "City"), city))
        .into_expr();
    let passes = PassConfig {
        evaluate: true,
        ..PassConfig::default()
    };
    let config = config(passes, OutputMode::Sql);

    let out = run_passes(&through_json(&select), &config).unwrap();
    assert_eq!(
        render(&out, &config).unwrap(),
        "SELECT t0.Name\nFROM customers AS t0\nWHERE (t0.City = 'London')"
    );
}

#[test]
fn test_dedupe_clears_duplicate_markers() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let customers = builder.customers();
    let join = builder.join(JoinType::CrossJoin, &customers, &customers, None);
    let select = SelectExpr::new(
        ids.next_alias(),
        vec![builder.declaration("Name", builder.column(&customers, "Name"))],
        Some(join),
    )
    .into_expr();
    let tree = through_json(&select);
    assert!(format_debug(&tree).contains("!!"));

    let passes = PassConfig {
        deduplicate_aliases: true,
        ..PassConfig::default()
    };
    let config = config(passes, OutputMode::Debug);
    let out = run_passes(&tree, &config).unwrap();
    let text = render(&out, &config).unwrap();
    assert!(!text.contains("!!"), "{}", text);
    assert!(text.contains("CROSS JOIN customers AS t1"), "{}", text);
}

#[test]
fn test_sql_output_rejects_client_projection() {
    let ids = AliasAllocator::new();
    let tree = QueryBuilder::new(&ids).customers_in("Oslo");
    let config = config(PassConfig::default(), OutputMode::Sql);
    let err = render(&tree, &config).unwrap_err();
    assert!(err.to_string().contains("Projection"));
}
