// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Alias and column gatherers
//!
//! Three read-only analyses over a subtree:
//!
//! - [`declared_aliases`]: aliases introduced by tables and selects. A select
//!   records its own alias and is not entered, since its inner scope is
//!   independent. Order follows a left-to-right walk, so two isomorphic
//!   sources yield positionally corresponding aliases.
//! - [`referenced_aliases`]: aliases consumed by any column in the subtree.
//! - [`referenced_columns`]: columns used directly by the *first* select
//!   reached, and nothing outside it. Nested selects below it have their own
//!   column sets and are skipped.

use std::collections::HashSet;

use relq_ir::{ColumnExpr, Expr, ExprRef, TableAlias, same};

use crate::walk::{find_first, walk};

/// Aliases declared by `source`, in walk order and without duplicates
pub fn declared_aliases(source: &ExprRef) -> Vec<TableAlias> {
    let mut aliases = Vec::new();
    walk(
        source,
        |node| {
            let alias = match node.as_ref() {
                Expr::Select(s) => s.alias,
                Expr::Table(t) => t.alias,
                _ => return,
            };
            if !aliases.contains(&alias) {
                aliases.push(alias);
            }
        },
        |_| {},
        |node| !matches!(node.as_ref(), Expr::Select(_)),
    );
    aliases
}

/// Every alias referenced by a column anywhere in `root`
pub fn referenced_aliases(root: &ExprRef) -> HashSet<TableAlias> {
    let mut aliases = HashSet::new();
    walk(
        root,
        |node| {
            if let Expr::Column(c) = node.as_ref() {
                aliases.insert(c.alias);
            }
        },
        |_| {},
        |_| true,
    );
    aliases
}

/// Distinct columns referenced directly by the first select in `root`
///
/// The walk starts at the first select in pre-order, so columns outside it
/// (a projection's projector, say) are not collected. Selects nested under it
/// (sources, subqueries) are skipped. A tree without a select is gathered
/// whole.
pub fn referenced_columns(root: &ExprRef) -> HashSet<ColumnExpr> {
    let start = find_first(root, |node| matches!(node.as_ref(), Expr::Select(_)))
        .unwrap_or_else(|| root.clone());
    let mut columns = HashSet::new();
    walk(
        &start,
        |node| {
            if let Expr::Column(c) = node.as_ref() {
                columns.insert(c.clone());
            }
        },
        |_| {},
        |node| same(node, &start) || !matches!(node.as_ref(), Expr::Select(_)),
    );
    columns
}

#[cfg(test)]
mod tests {
    use relq_ir::{
        AliasAllocator, ColumnDeclaration, DataType, IntoExpr, JoinExpr, JoinType, MappingEntity,
        ProjectionExpr, QueryType, SelectExpr, TableExpr, Type,
    };

    use super::*;

    fn table(ids: &AliasAllocator, name: &str) -> (TableAlias, ExprRef) {
        let alias = ids.next_alias();
        let entity = MappingEntity::new(name, Type::named(name));
        (alias, TableExpr::new(alias, entity, name).into_expr())
    }

    fn col(alias: TableAlias, name: &str) -> ExprRef {
        ColumnExpr::new(alias, name, QueryType::new(DataType::Integer), Type::Int32).into_expr()
    }

    fn decl(alias: TableAlias, name: &str) -> ColumnDeclaration {
        ColumnDeclaration::new(name, col(alias, name), QueryType::new(DataType::Integer))
    }

    #[test]
    fn test_declared_aliases_is_shallow() {
        let ids = AliasAllocator::new();
        let (t1, customers) = table(&ids, "customers");
        let inner =
            SelectExpr::new(ids.next_alias(), vec![decl(t1, "Id")], Some(customers)).into_expr();
        let inner_alias = inner.as_select().unwrap().alias;
        let (t2, orders) = table(&ids, "orders");
        let join = JoinExpr::new(JoinType::InnerJoin, inner, orders, None).into_expr();

        assert_eq!(declared_aliases(&join), vec![inner_alias, t2]);
        assert!(!declared_aliases(&join).contains(&t1));
    }

    #[test]
    fn test_referenced_aliases_full_descent() {
        let ids = AliasAllocator::new();
        let (t1, customers) = table(&ids, "customers");
        let inner =
            SelectExpr::new(ids.next_alias(), vec![decl(t1, "Id")], Some(customers)).into_expr();
        let outer_alias = ids.next_alias();
        let inner_alias = inner.as_select().unwrap().alias;
        let outer =
            SelectExpr::new(outer_alias, vec![decl(inner_alias, "Id")], Some(inner)).into_expr();

        let aliases = referenced_aliases(&outer);
        assert!(aliases.contains(&t1));
        assert!(aliases.contains(&inner_alias));
        assert!(!aliases.contains(&outer_alias));
    }

    #[test]
    fn test_referenced_columns_first_select_only() {
        let ids = AliasAllocator::new();
        let (t1, customers) = table(&ids, "customers");
        let inner = SelectExpr::new(
            ids.next_alias(),
            vec![decl(t1, "Id"), decl(t1, "Name")],
            Some(customers),
        )
        .into_expr();
        let inner_alias = inner.as_select().unwrap().alias;
        let outer = SelectExpr::new(ids.next_alias(), vec![decl(inner_alias, "Id")], Some(inner))
            .with_where(Expr::equal(col(inner_alias, "Id"), Expr::constant(1)))
            .into_expr();

        let columns = referenced_columns(&outer);
        assert_eq!(columns.len(), 1);
        assert!(columns.contains(&ColumnExpr::new(
            inner_alias,
            "Id",
            QueryType::new(DataType::Integer),
            Type::Int32
        )));
    }

    #[test]
    fn test_referenced_columns_skip_projector() {
        let ids = AliasAllocator::new();
        let (t1, customers) = table(&ids, "customers");
        let select = SelectExpr::new(ids.next_alias(), vec![decl(t1, "Id")], Some(customers));
        let select_alias = select.alias;
        let projector = Expr::add(col(select_alias, "Id"), col(select_alias, "Rank"));
        let projection = ProjectionExpr::new(select.into_expr(), projector).into_expr();

        let columns = referenced_columns(&projection);
        assert_eq!(columns.len(), 1);
        assert!(columns.iter().all(|c| c.alias == t1));
    }
}
