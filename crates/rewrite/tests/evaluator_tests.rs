// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Integration tests for the partial evaluator

use std::sync::Arc;

use relq_ir::{
    AliasAllocator, BinaryOp, DefaultTypeSystem, Expr, ExprKind, ExprRef, IntoExpr, MethodRef,
    NamedValueExpr, Type, TypeSystem, Value,
};
use relq_rewrite::{
    EvalError, FunctionRegistry, PartialEvaluator, RewriteError, evaluate, eval::nominate,
};
use relq_test_utils::{QueryBuilder, TreeAssertions};

fn customer_age(ids: &AliasAllocator) -> ExprRef {
    let c = ids.parameter("c", Type::named("Customer"));
    Expr::member(c, "Age", Type::Int32)
}

#[test]
fn test_parameter_poisons_ancestors() {
    let ids = AliasAllocator::new();
    let age = customer_age(&ids);
    let tree = Expr::add(age.clone(), Expr::add(Expr::constant(2), Expr::constant(3)));

    let out = evaluate(&tree, None, None).unwrap();
    let Expr::Binary(sum) = out.as_ref() else {
        panic!("expected the outer addition to survive");
    };
    TreeAssertions::assert_same(&sum.left, &age);
    TreeAssertions::assert_constant(&sum.right, 5);
}

#[test]
fn test_nominate_excludes_parameter_chain() {
    let ids = AliasAllocator::new();
    let age = customer_age(&ids);
    let five = Expr::add(Expr::constant(2), Expr::constant(3));
    let tree = Expr::add(age.clone(), five.clone());

    let candidates = nominate(&tree).unwrap();
    assert!(candidates.contains(&relq_ir::node_id(&five)));
    assert!(!candidates.contains(&relq_ir::node_id(&age)));
    assert!(!candidates.contains(&relq_ir::node_id(&tree)));
}

#[test]
fn test_conditional_selects_branch_without_evaluating_other() {
    let ids = AliasAllocator::new();
    let age = customer_age(&ids);
    let boom = Expr::binary(BinaryOp::Divide, Expr::constant(1), Expr::constant(0));
    let test = Expr::binary(BinaryOp::LessThan, Expr::constant(1), Expr::constant(2));
    let tree = Expr::conditional(test, age.clone(), boom);

    let out = evaluate(&tree, None, None).unwrap();
    TreeAssertions::assert_same(&out, &age);
}

#[test]
fn test_failed_fold_propagates() {
    let ids = AliasAllocator::new();
    let age = customer_age(&ids);
    let boom = Expr::binary(BinaryOp::Divide, Expr::constant(1), Expr::constant(0));
    let test = Expr::binary(BinaryOp::GreaterThan, Expr::constant(1), Expr::constant(2));
    let tree = Expr::conditional(test, age, boom);

    let err = evaluate(&tree, None, None).unwrap_err();
    assert_eq!(err, RewriteError::Eval(EvalError::DivideByZero));
}

#[test]
fn test_captured_value_folds_inside_query() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let customers = builder.customers();
    let city = Expr::add(Expr::constant("Lon"), Expr::constant("don"));
    let select = builder.finish(
        builder
            .select_columns(&customers, &["Name"])
            .with_where(Expr::equal(builder.column(&customers, "City"), city)),
    );
    let tree = builder.projection(&select);

    let out = evaluate(&tree, None, None).unwrap();
    let folded = TreeAssertions::expect_projected_select(&out);
    let original = TreeAssertions::expect_projected_select(&tree);
    // The source is not evaluable and comes back untouched
    TreeAssertions::assert_same(
        folded.from.as_ref().unwrap(),
        original.from.as_ref().unwrap(),
    );
    let Some(Expr::Binary(predicate)) = folded.where_clause.as_deref() else {
        panic!("expected a binary predicate");
    };
    TreeAssertions::assert_constant(&predicate.right, "London");
}

#[test]
fn test_hook_reboxes_as_named_value() {
    let ids = AliasAllocator::new();
    let age = customer_age(&ids);
    let tree = Expr::binary(
        BinaryOp::GreaterThan,
        age,
        Expr::binary(BinaryOp::Multiply, Expr::constant(6), Expr::constant(3)),
    );

    let mut count = 0;
    let mut rebox = |constant: ExprRef| {
        count += 1;
        NamedValueExpr {
            name: format!("p{}", count - 1),
            query_type: DefaultTypeSystem.column_type(&constant.ty()),
            value: constant,
        }
        .into_expr()
    };
    let out = evaluate(&tree, None, Some(&mut rebox)).unwrap();

    let Expr::Binary(cmp) = out.as_ref() else {
        panic!("expected comparison");
    };
    match cmp.right.as_ref() {
        Expr::NamedValue(named) => {
            assert_eq!(named.name, "p0");
            TreeAssertions::assert_constant(&named.value, 18);
        }
        other => panic!("Expected NamedValue, found {:?}", other),
    }
    assert_eq!(count, 1);
}

#[test]
fn test_host_function_folds() {
    let mut registry = FunctionRegistry::new();
    registry.register("Geo", "Capital", |args: &[Value]| {
        match args.first().and_then(Value::as_str) {
            Some("Norway") => Ok(Value::from("Oslo")),
            _ => Err(EvalError::Host {
                name: "Geo.Capital".to_string(),
                message: "unknown country".to_string(),
            }),
        }
    });
    let call = Expr::call(
        MethodRef::new("Geo", "Capital"),
        None,
        vec![Expr::constant("Norway")],
        Type::String,
    );

    let out = PartialEvaluator::new()
        .with_registry(registry.clone())
        .evaluate(&call)
        .unwrap();
    TreeAssertions::assert_constant(&out, "Oslo");

    let failing = Expr::call(
        MethodRef::new("Geo", "Capital"),
        None,
        vec![Expr::constant("Atlantis")],
        Type::String,
    );
    let err = PartialEvaluator::new()
        .with_registry(registry)
        .evaluate(&failing)
        .unwrap_err();
    assert!(matches!(err, RewriteError::Eval(EvalError::Host { .. })));
}

#[test]
fn test_builtin_string_method() {
    let call = Expr::call(
        MethodRef::new("String", "ToUpper"),
        Some(Expr::constant("oslo")),
        vec![],
        Type::String,
    );
    let out = evaluate(&call, None, None).unwrap();
    TreeAssertions::assert_constant(&out, "OSLO");
}

#[test]
fn test_custom_predicate_keeps_calls() {
    let call = Expr::call(
        MethodRef::new("String", "ToUpper"),
        Some(Expr::constant("oslo")),
        vec![],
        Type::String,
    );
    let no_calls = |node: &ExprRef| node.kind() != ExprKind::Call;
    let out = evaluate(&call, Some(&no_calls), None).unwrap();
    assert!(Arc::ptr_eq(&out, &call));
}
