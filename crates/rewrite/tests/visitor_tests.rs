// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Integration tests for traversal, replacement and gathering over query trees

use std::collections::HashSet;

use relq_ir::{
    AggregateExpr, AggregateSubqueryExpr, AliasAllocator, BatchExpr, BetweenExpr, BlockCommand,
    ClientJoinExpr, ColumnAssignment, ColumnExpr, DataType, DeclarationCommand, DeleteCommand,
    EntityExpr, ExistsExpr, Expr, ExprKind, ExprRef, FunctionExpr, IfCommand, InSubqueryExpr,
    InValuesExpr, InsertCommand, IntoExpr, IsNullExpr, JoinType, MappingEntity, MethodRef,
    NamedValueExpr, OrderExpression, OrderType, OuterJoinedExpr, QueryType, RowNumberExpr,
    ScalarSubqueryExpr, TableAlias, Type, UnaryOp, UpdateCommand, VariableDeclaration, VariableExpr,
    same,
};
use relq_rewrite::{
    IdentityRewriter, RecursionGuard, RewriteResult, Rewriter, Visitor, declared_aliases,
    find_all, referenced_aliases, referenced_columns, replace,
};
use relq_test_utils::{QueryBuilder, TreeAssertions};

/// Retargets every column of one alias to another
struct Retarget {
    guard: RecursionGuard,
    from: TableAlias,
    to: TableAlias,
}

impl Rewriter for Retarget {
    fn guard(&self) -> &RecursionGuard {
        &self.guard
    }

    fn rewrite_column(&mut self, node: &ExprRef, column: &ColumnExpr) -> RewriteResult<ExprRef> {
        if column.alias != self.from {
            return Ok(node.clone());
        }
        Ok(ColumnExpr {
            alias: self.to,
            ..column.clone()
        }
        .into_expr())
    }
}

/// Counts selects, failing on anything it does not know how to enter
struct SelectCounter {
    guard: RecursionGuard,
}

impl Visitor for SelectCounter {
    type Output = usize;

    fn guard(&self) -> &RecursionGuard {
        &self.guard
    }

    fn visit_table(&mut self, _: &ExprRef, _: &relq_ir::TableExpr) -> RewriteResult<usize> {
        Ok(0)
    }

    fn visit_select(&mut self, _: &ExprRef, select: &relq_ir::SelectExpr) -> RewriteResult<usize> {
        let inner = match &select.from {
            Some(from) => self.visit(from)?,
            None => 0,
        };
        Ok(inner + 1)
    }

    fn visit_projection(
        &mut self,
        _: &ExprRef,
        projection: &relq_ir::ProjectionExpr,
    ) -> RewriteResult<usize> {
        self.visit(&projection.select)
    }
}

#[test]
fn test_identity_rewrite_of_query_tree() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let tree = builder.customers_in("London");
    let out = IdentityRewriter::new().rewrite(&tree).unwrap();
    TreeAssertions::assert_same(&out, &tree);
}

/// One node of every kind, each with non-empty children where the kind has any
fn one_of_every_kind(builder: &QueryBuilder) -> Vec<ExprRef> {
    let ids = builder.ids();
    let customers = builder.customers();
    let orders = builder.orders();
    let name = builder.column(&customers, "Name");
    let age = builder.column(&customers, "Age");
    let select = builder.pass_through(&customers);
    let single = builder.finish(builder.select_columns(&orders, &["Total"]));
    let order_by = vec![OrderExpression::new(OrderType::Descending, age.clone())];
    let text = QueryType::new(DataType::Text);

    let x = ids.parameter_decl("x", Type::Int32);
    let numbers = Expr::new_array(Type::Int32, vec![Expr::constant(1), Expr::constant(2)]);
    let count = AggregateExpr {
        name: "COUNT".to_string(),
        argument: Some(age.clone()),
        distinct: false,
        ty: Type::Int32,
    }
    .into_expr();
    let scalar = ScalarSubqueryExpr {
        select: single.expr.clone(),
        ty: Type::Float64,
    }
    .into_expr();
    let projection = builder.projection(&select);
    let assignment = ColumnAssignment::new(name.clone(), Expr::constant("Ann"));
    let delete = DeleteCommand {
        table: customers.expr.clone(),
        where_clause: Some(Expr::equal(age.clone(), Expr::constant(30))),
    }
    .into_expr();

    vec![
        Expr::constant(1),
        x.clone().into_expr(),
        Expr::add(age.clone(), Expr::constant(1)),
        Expr::unary(UnaryOp::Negate, age.clone()),
        Expr::conditional(Expr::constant(true), Expr::constant(1), Expr::constant(2)),
        Expr::call(
            MethodRef::new("Math", "Abs"),
            None,
            vec![age.clone()],
            Type::Int32,
        ),
        Expr::member(name.clone(), "Length", Type::Int32),
        Expr::lambda(vec![x.clone()], Expr::add(x.into_expr(), Expr::constant(1))),
        Expr::invoke(name.clone(), vec![Expr::constant(1)]),
        Expr::new_record("Row", vec!["Name".to_string()], vec![name.clone()]).unwrap(),
        numbers.clone(),
        Expr::index(numbers, Expr::constant(0)),
        customers.expr.clone(),
        name.clone(),
        select.expr.clone(),
        builder.join(JoinType::CrossJoin, &customers, &orders, None),
        projection.clone(),
        ClientJoinExpr {
            projection,
            outer_key: vec![name.clone()],
            inner_key: vec![builder.column(&orders, "CustomerID")],
        }
        .into_expr(),
        EntityExpr {
            entity: MappingEntity::new("Customer", Type::named("Customer")),
            expr: Expr::new_record("Customer", vec!["Name".to_string()], vec![name.clone()])
                .unwrap(),
        }
        .into_expr(),
        count.clone(),
        AggregateSubqueryExpr {
            group_by_alias: customers.alias,
            aggregate_in_group_select: count,
            aggregate_as_subquery: scalar.clone(),
        }
        .into_expr(),
        scalar,
        ExistsExpr {
            select: single.expr.clone(),
        }
        .into_expr(),
        InSubqueryExpr {
            expr: age.clone(),
            select: single.expr.clone(),
        }
        .into_expr(),
        InValuesExpr {
            expr: age.clone(),
            values: vec![Expr::constant(30), Expr::constant(40)],
        }
        .into_expr(),
        IsNullExpr { expr: name.clone() }.into_expr(),
        BetweenExpr {
            expr: age.clone(),
            lower: Expr::constant(18),
            upper: Expr::constant(65),
        }
        .into_expr(),
        RowNumberExpr {
            order_by,
        }
        .into_expr(),
        NamedValueExpr {
            name: "p0".to_string(),
            query_type: text.clone(),
            value: Expr::constant("London"),
        }
        .into_expr(),
        OuterJoinedExpr {
            test: Expr::constant(1),
            expr: name.clone(),
        }
        .into_expr(),
        FunctionExpr {
            name: "UPPER".to_string(),
            args: vec![name.clone()],
            ty: Type::String,
        }
        .into_expr(),
        InsertCommand {
            table: customers.expr.clone(),
            assignments: vec![assignment.clone()],
        }
        .into_expr(),
        UpdateCommand {
            table: customers.expr.clone(),
            where_clause: Some(Expr::equal(age.clone(), Expr::constant(30))),
            assignments: vec![assignment],
        }
        .into_expr(),
        delete.clone(),
        BatchExpr {
            input: Expr::new_array(Type::Int32, vec![Expr::constant(1)]),
            operation: Expr::lambda(
                vec![ids.parameter_decl("row", Type::Int32)],
                delete.clone(),
            ),
            batch_size: Expr::constant(50),
            stream: Expr::constant(false),
        }
        .into_expr(),
        BlockCommand {
            commands: vec![delete.clone()],
        }
        .into_expr(),
        IfCommand {
            check: Expr::constant(true),
            if_true: delete.clone(),
            if_false: Some(delete),
        }
        .into_expr(),
        DeclarationCommand {
            variables: vec![VariableDeclaration {
                name: "total".to_string(),
                query_type: text.clone(),
                expression: name,
            }],
            source: Some(customers.expr.clone()),
        }
        .into_expr(),
        VariableExpr {
            name: "total".to_string(),
            query_type: text,
            ty: Type::String,
        }
        .into_expr(),
    ]
}

#[test]
fn test_identity_rewrite_of_every_kind() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let nodes = one_of_every_kind(&builder);

    let kinds: HashSet<ExprKind> = nodes.iter().map(|node| node.kind()).collect();
    assert_eq!(kinds.len(), nodes.len());
    assert_eq!(kinds.len(), 39);

    for node in &nodes {
        let out = IdentityRewriter::new().rewrite(node).unwrap();
        assert!(same(&out, node), "{} was rebuilt", node.kind());
    }
}

#[test]
fn test_retarget_rebuilds_only_changed_path() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let source = builder.customer_orders();
    let select = TreeAssertions::expect_select(&source.expr);
    let Some(Expr::Join(join)) = select.from.as_deref() else {
        panic!("expected a join source");
    };
    let orders_alias = match join.right.as_ref() {
        Expr::Table(table) => table.alias,
        other => panic!("Expected Table, found {:?}", other),
    };
    let replacement = ids.next_alias();

    let out = Retarget {
        guard: RecursionGuard::new(),
        from: orders_alias,
        to: replacement,
    }
    .rewrite(&source.expr)
    .unwrap();

    TreeAssertions::assert_rebuilt(&out, &source.expr);
    let rewritten = TreeAssertions::expect_select(&out);
    // Name column references customers and is shared untouched
    TreeAssertions::assert_same(&rewritten.columns[0].expr, &select.columns[0].expr);
    TreeAssertions::assert_column_ref(&rewritten.columns[1].expr, replacement, "Total");
    assert!(!referenced_aliases(&out).contains(&orders_alias));
}

#[test]
fn test_visitor_counts_nested_selects() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let tree = builder.nested_customers();
    let mut counter = SelectCounter {
        guard: RecursionGuard::new(),
    };
    assert_eq!(counter.visit(&tree).unwrap(), 3);
}

#[test]
fn test_visitor_fails_loudly_on_unknown_kind() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let source = builder.customer_orders();
    let mut counter = SelectCounter {
        guard: RecursionGuard::new(),
    };
    let err = counter.visit(&source.expr).unwrap_err();
    assert!(matches!(
        err,
        relq_rewrite::RewriteError::UnhandledKind {
            kind: ExprKind::Join,
            ..
        }
    ));
}

#[test]
fn test_replace_by_identity() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let tree = builder.customers_in("London");
    let london = find_all(&tree, |n| n.kind() == ExprKind::Constant)
        .into_iter()
        .next()
        .unwrap();
    let out = replace(&tree, &london, &Expr::constant("Paris")).unwrap();

    let select = TreeAssertions::expect_projected_select(&out);
    let Some(Expr::Binary(predicate)) = select.where_clause.as_deref() else {
        panic!("expected a binary predicate");
    };
    TreeAssertions::assert_constant(&predicate.right, "Paris");
}

#[test]
fn test_declared_aliases_of_join_source() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let customers = builder.customers();
    let orders = builder.orders();
    let inner = builder.pass_through(&orders);
    let join = builder.join(relq_ir::JoinType::CrossJoin, &customers, &inner, None);

    // The select is recorded but its own source is not entered
    assert_eq!(declared_aliases(&join), vec![customers.alias, inner.alias]);
}

#[test]
fn test_referenced_columns_stop_at_nested_select() {
    let ids = AliasAllocator::new();
    let builder = QueryBuilder::new(&ids);
    let customers = builder.customers();
    let inner = builder.finish(
        builder
            .select_columns(&customers, &["Name", "City"])
            .with_where(Expr::equal(
                builder.column(&customers, "Age"),
                Expr::constant(30),
            )),
    );
    let outer = builder.finish(builder.select_columns(&inner, &["Name"]));

    let names: HashSet<String> = referenced_columns(&outer.expr)
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, HashSet::from(["Name".to_string()]));
}
