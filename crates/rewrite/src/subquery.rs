// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Redundant subquery removal
//!
//! Two cooperating passes flatten nested selects:
//!
//! 1. **Removal.** A select in a source position that only renames or
//!    re-exposes the columns of its own source, and adds no filter, ordering,
//!    grouping, paging or distinctness, is dropped. References to its columns
//!    are replaced by the expressions it declared.
//! 2. **Merging.** A select whose left-most source is a column-only select is
//!    merged with it when the combination is semantics-preserving: the
//!    `WHERE` clauses are AND-ed (inner first), and ordering, grouping, `SKIP`
//!    and `TAKE` come from the outer select when it has them and from the inner
//!    one otherwise. [`can_merge_with_from`] lists the combinations that block
//!    a merge.
//!
//! Running [`remove_redundant_subqueries`] on its own output changes nothing.

use std::collections::{HashMap, HashSet};

use relq_ir::{ColumnExpr, Expr, ExprRef, ProjectionExpr, SelectExpr, TableAlias, node_id};
use tracing::{debug, instrument, trace};

use crate::aggregate::has_aggregates;
use crate::error::{RewriteError, RewriteResult};
use crate::guard::RecursionGuard;
use crate::visitor::{Rewriter, rebuild};
use crate::walk::walk;

/// Whether every column of `select` re-exposes a source column under its
/// own name
pub fn is_simple_projection(select: &SelectExpr) -> bool {
    select.columns.iter().all(|decl| match decl.expr.as_column() {
        Some(column) => column.name == decl.name,
        None => false,
    })
}

/// Whether `select` maps the columns of a source select one-to-one, in
/// order and by name
pub fn is_name_map_projection(select: &SelectExpr) -> bool {
    let Some(from) = select.from.as_ref().and_then(|f| f.as_select()) else {
        return false;
    };
    select.columns.len() == from.columns.len()
        && select
            .columns
            .iter()
            .zip(&from.columns)
            .all(|(decl, inner)| match decl.expr.as_column() {
                Some(column) => column.name == inner.name,
                None => false,
            })
}

/// Whether removing `select` and reading its source directly is lossless
pub fn is_redundant_subquery(select: &SelectExpr) -> bool {
    select.from.is_some()
        && (is_simple_projection(select) || is_name_map_projection(select))
        && !select.distinct
        && !select.reverse
        && select.take.is_none()
        && select.skip.is_none()
        && select.where_clause.is_none()
        && select.order_by.is_empty()
        && select.group_by.is_empty()
}

/// Redundant selects reachable from `source` without entering a select or
/// subquery
pub fn redundant_subqueries(source: &ExprRef) -> Vec<ExprRef> {
    let mut found = Vec::new();
    walk(
        source,
        |node| {
            if let Expr::Select(select) = node.as_ref() {
                if is_redundant_subquery(select) {
                    found.push(node.clone());
                }
            }
        },
        |_| {},
        |node| {
            !matches!(
                node.as_ref(),
                Expr::Select(_) | Expr::ScalarSubquery(_) | Expr::Exists(_) | Expr::InSubquery(_)
            )
        },
    );
    found
}

struct SubqueryRemover {
    guard: RecursionGuard,
    remove: HashSet<usize>,
    columns: HashMap<TableAlias, HashMap<String, ExprRef>>,
}

impl SubqueryRemover {
    fn new(selects: &[ExprRef]) -> Self {
        let mut remove = HashSet::new();
        let mut columns = HashMap::new();
        for node in selects {
            if let Some(select) = node.as_select() {
                remove.insert(node_id(node));
                columns.insert(
                    select.alias,
                    select
                        .columns
                        .iter()
                        .map(|decl| (decl.name.clone(), decl.expr.clone()))
                        .collect(),
                );
            }
        }
        Self {
            guard: RecursionGuard::new(),
            remove,
            columns,
        }
    }
}

impl Rewriter for SubqueryRemover {
    fn guard(&self) -> &RecursionGuard {
        &self.guard
    }

    fn rewrite_select(&mut self, node: &ExprRef, select: &SelectExpr) -> RewriteResult<ExprRef> {
        match &select.from {
            Some(from) if self.remove.contains(&node_id(node)) => {
                trace!(alias = %select.alias, "removing subquery");
                self.rewrite(from)
            }
            _ => rebuild(self, node),
        }
    }

    fn rewrite_column(&mut self, node: &ExprRef, column: &ColumnExpr) -> RewriteResult<ExprRef> {
        let Some(names) = self.columns.get(&column.alias) else {
            return Ok(node.clone());
        };
        match names.get(&column.name).cloned() {
            Some(expr) => self.rewrite(&expr),
            None => Err(RewriteError::UndefinedColumn {
                alias: column.alias,
                name: column.name.clone(),
            }),
        }
    }
}

/// Remove each of `selects` (by identity) from `root`, substituting their
/// column expressions for references to them
pub fn remove_subqueries(root: &ExprRef, selects: &[ExprRef]) -> RewriteResult<ExprRef> {
    if selects.is_empty() {
        return Ok(root.clone());
    }
    SubqueryRemover::new(selects).rewrite(root)
}

struct RedundantSubqueryRemover {
    guard: RecursionGuard,
}

impl Rewriter for RedundantSubqueryRemover {
    fn guard(&self) -> &RecursionGuard {
        &self.guard
    }

    fn rewrite_select(&mut self, node: &ExprRef, _: &SelectExpr) -> RewriteResult<ExprRef> {
        let rebuilt = rebuild(self, node)?;
        let redundant = match rebuilt.as_select().and_then(|s| s.from.as_ref()) {
            Some(from) => redundant_subqueries(from),
            None => Vec::new(),
        };
        if redundant.is_empty() {
            return Ok(rebuilt);
        }
        debug!(count = redundant.len(), "removing redundant subqueries");
        remove_subqueries(&rebuilt, &redundant)
    }

    fn rewrite_projection(&mut self, node: &ExprRef, _: &ProjectionExpr) -> RewriteResult<ExprRef> {
        let rebuilt = rebuild(self, node)?;
        let Some(projection) = rebuilt.as_projection() else {
            return Ok(rebuilt);
        };
        let from_is_select = projection
            .select_expr()
            .and_then(|s| s.from.as_ref())
            .is_some_and(|f| f.as_select().is_some());
        if !from_is_select {
            return Ok(rebuilt);
        }
        let redundant = redundant_subqueries(&projection.select);
        if redundant.is_empty() {
            return Ok(rebuilt);
        }
        debug!(count = redundant.len(), "removing redundant projection select");
        remove_subqueries(&rebuilt, &redundant)
    }
}

fn left_most_select(source: &ExprRef) -> Option<&ExprRef> {
    match source.as_ref() {
        Expr::Select(_) => Some(source),
        Expr::Join(join) => left_most_select(&join.left),
        _ => None,
    }
}

fn is_column_projection(select: &SelectExpr) -> bool {
    select
        .columns
        .iter()
        .all(|decl| matches!(decl.expr.as_ref(), Expr::Column(_) | Expr::Constant(_)))
}

/// Whether `select` can absorb `from`, its left-most source select
///
/// Blocked when both order or both group, when either is reversed, and when
/// the inner select's ordering, grouping, paging, distinctness or aggregation
/// would change meaning under the outer select's own clauses.
pub fn can_merge_with_from(select: &SelectExpr, from: &SelectExpr, is_top_level: bool) -> bool {
    if !is_column_projection(from) {
        return false;
    }
    let sel_name_map = is_name_map_projection(select);
    let sel_order = !select.order_by.is_empty();
    let sel_group = !select.group_by.is_empty();
    let sel_aggregates = has_aggregates(select);
    let sel_join = select
        .from
        .as_ref()
        .is_some_and(|f| matches!(f.as_ref(), Expr::Join(_)));
    let sel_paged = select.take.is_some() || select.skip.is_some();
    let frm_order = !from.order_by.is_empty();
    let frm_group = !from.group_by.is_empty();
    let frm_aggregates = has_aggregates(from);

    if sel_order && frm_order {
        return false;
    }
    if sel_group && frm_group {
        return false;
    }
    if select.reverse || from.reverse {
        return false;
    }
    if frm_order && (sel_group || sel_aggregates || select.distinct) {
        return false;
    }
    // Moving a grouping forward would need the projections to be identical
    if frm_group {
        return false;
    }
    if from.take.is_some()
        && (sel_paged || select.distinct || sel_aggregates || sel_group || sel_join)
    {
        return false;
    }
    if from.skip.is_some()
        && (select.skip.is_some() || select.distinct || sel_aggregates || sel_group || sel_join)
    {
        return false;
    }
    if from.distinct
        && (sel_paged
            || !sel_name_map
            || sel_group
            || sel_aggregates
            || (sel_order && !is_top_level)
            || sel_join)
    {
        return false;
    }
    if frm_aggregates && (sel_paged || select.distinct || sel_aggregates || sel_group || sel_join) {
        return false;
    }
    true
}

struct SubqueryMerger {
    guard: RecursionGuard,
    is_top_level: bool,
}

impl SubqueryMerger {
    fn merge_once(&self, current: &ExprRef, was_top_level: bool) -> RewriteResult<Option<ExprRef>> {
        let Some(select) = current.as_select() else {
            return Ok(None);
        };
        let Some(from_node) = select.from.as_ref().and_then(left_most_select).cloned() else {
            return Ok(None);
        };
        let Some(from) = from_node.as_select() else {
            return Ok(None);
        };
        if !can_merge_with_from(select, from, was_top_level) {
            return Ok(None);
        }

        let removed = remove_subqueries(current, std::slice::from_ref(&from_node))?;
        let Some(outer) = removed.as_select() else {
            return Ok(Some(removed));
        };
        let where_clause = match (&from.where_clause, &outer.where_clause) {
            (Some(inner), Some(outer)) => Some(Expr::and_also(inner.clone(), outer.clone())),
            (Some(inner), None) => Some(inner.clone()),
            (None, outer) => outer.clone(),
        };
        let order_by = if outer.order_by.is_empty() {
            from.order_by.clone()
        } else {
            outer.order_by.clone()
        };
        let group_by = if outer.group_by.is_empty() {
            from.group_by.clone()
        } else {
            outer.group_by.clone()
        };
        debug!(outer = %outer.alias, inner = %from.alias, "merged select with its source");
        Ok(Some(outer.update(
            &removed,
            SelectExpr {
                alias: outer.alias,
                columns: outer.columns.clone(),
                from: outer.from.clone(),
                where_clause,
                order_by,
                group_by,
                skip: outer.skip.clone().or_else(|| from.skip.clone()),
                take: outer.take.clone().or_else(|| from.take.clone()),
                distinct: outer.distinct || from.distinct,
                reverse: outer.reverse,
            },
        )))
    }
}

impl Rewriter for SubqueryMerger {
    fn guard(&self) -> &RecursionGuard {
        &self.guard
    }

    fn rewrite_select(&mut self, node: &ExprRef, _: &SelectExpr) -> RewriteResult<ExprRef> {
        let was_top_level = std::mem::replace(&mut self.is_top_level, false);
        let mut current = rebuild(self, node)?;
        // Each merge removes one select, so this terminates
        while let Some(merged) = self.merge_once(&current, was_top_level)? {
            current = merged;
        }
        Ok(current)
    }
}

/// Merge selects with their left-most source select where possible
pub fn merge_subqueries(expr: &ExprRef) -> RewriteResult<ExprRef> {
    SubqueryMerger {
        guard: RecursionGuard::new(),
        is_top_level: true,
    }
    .rewrite(expr)
}

/// Remove redundant subqueries from `expr`, then merge what can be merged
#[instrument(skip_all)]
pub fn remove_redundant_subqueries(expr: &ExprRef) -> RewriteResult<ExprRef> {
    let removed = RedundantSubqueryRemover {
        guard: RecursionGuard::new(),
    }
    .rewrite(expr)?;
    merge_subqueries(&removed)
}

/// Flatten a select whose source is another select
///
/// Same pass as [`remove_redundant_subqueries`], named for the single-select
/// call site.
pub fn remove_redundant_from(select: &ExprRef) -> RewriteResult<ExprRef> {
    remove_redundant_subqueries(select)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use relq_ir::{
        AliasAllocator, BinaryOp, ColumnDeclaration, DataType, IntoExpr, MappingEntity,
        OrderExpression, OrderType, QueryType, TableExpr, Type,
    };

    use super::*;

    fn col(alias: TableAlias, name: &str) -> ExprRef {
        ColumnExpr::new(alias, name, QueryType::new(DataType::Integer), Type::Int32).into_expr()
    }

    fn decl(name: &str, expr: ExprRef) -> ColumnDeclaration {
        ColumnDeclaration::new(name, expr, QueryType::new(DataType::Integer))
    }

    fn table(ids: &AliasAllocator) -> (TableAlias, ExprRef) {
        let alias = ids.next_alias();
        let entity = MappingEntity::new("customers", Type::named("Customer"));
        (alias, TableExpr::new(alias, entity, "customers").into_expr())
    }

    #[test]
    fn test_simple_and_name_map_projection() {
        let ids = AliasAllocator::new();
        let (t, source) = table(&ids);
        let inner = SelectExpr::new(ids.next_alias(), vec![decl("Id", col(t, "Id"))], Some(source));
        assert!(is_simple_projection(&inner));
        assert!(!is_name_map_projection(&inner));

        let inner_alias = inner.alias;
        let renamed = SelectExpr::new(
            ids.next_alias(),
            vec![decl("Key", col(inner_alias, "Id"))],
            Some(inner.into_expr()),
        );
        assert!(!is_simple_projection(&renamed));
        assert!(!is_name_map_projection(&renamed));
    }

    #[test]
    fn test_filtered_select_is_not_redundant() {
        let ids = AliasAllocator::new();
        let (t, source) = table(&ids);
        let select = SelectExpr::new(ids.next_alias(), vec![decl("Id", col(t, "Id"))], Some(source))
            .with_where(Expr::binary(BinaryOp::GreaterThan, col(t, "Id"), Expr::constant(3)));
        assert!(!is_redundant_subquery(&select));
    }

    #[test]
    fn test_removes_pass_through_select() {
        let ids = AliasAllocator::new();
        let (t, source) = table(&ids);
        let inner = SelectExpr::new(
            ids.next_alias(),
            vec![decl("Id", col(t, "Id"))],
            Some(source.clone()),
        );
        let inner_alias = inner.alias;
        let outer = SelectExpr::new(
            ids.next_alias(),
            vec![decl("Id", col(inner_alias, "Id"))],
            Some(inner.into_expr()),
        )
        .into_expr();

        let out = remove_redundant_subqueries(&outer).unwrap();
        let select = out.as_select().unwrap();
        assert!(Arc::ptr_eq(select.from.as_ref().unwrap(), &source));
        assert_eq!(select.columns[0].expr.as_column().unwrap().alias, t);

        let again = remove_redundant_subqueries(&out).unwrap();
        assert!(Arc::ptr_eq(&again, &out));
    }

    #[test]
    fn test_merges_inner_where() {
        let ids = AliasAllocator::new();
        let (t, source) = table(&ids);
        let inner = SelectExpr::new(ids.next_alias(), vec![decl("Id", col(t, "Id"))], Some(source))
            .with_where(Expr::binary(BinaryOp::GreaterThan, col(t, "Id"), Expr::constant(3)));
        let inner_alias = inner.alias;
        let outer = SelectExpr::new(
            ids.next_alias(),
            vec![decl("Id", col(inner_alias, "Id"))],
            Some(inner.into_expr()),
        )
        .with_where(Expr::binary(BinaryOp::LessThan, col(inner_alias, "Id"), Expr::constant(9)))
        .into_expr();

        let out = remove_redundant_subqueries(&outer).unwrap();
        let select = out.as_select().unwrap();
        assert!(matches!(select.from.as_deref(), Some(Expr::Table(_))));
        let Some(Expr::Binary(both)) = select.where_clause.as_deref() else {
            panic!("expected combined predicate");
        };
        assert_eq!(both.op, BinaryOp::AndAlso);
    }

    #[test]
    fn test_both_ordered_blocks_merge() {
        let ids = AliasAllocator::new();
        let (t, source) = table(&ids);
        let inner = SelectExpr::new(ids.next_alias(), vec![decl("Id", col(t, "Id"))], Some(source))
            .with_order_by(vec![OrderExpression::new(OrderType::Ascending, col(t, "Id"))]);
        let inner_alias = inner.alias;
        let outer = SelectExpr::new(
            ids.next_alias(),
            vec![decl("Id", col(inner_alias, "Id"))],
            Some(inner.clone().into_expr()),
        )
        .with_order_by(vec![OrderExpression::new(OrderType::Descending, col(inner_alias, "Id"))]);
        assert!(!can_merge_with_from(&outer, &inner, true));
    }

    #[test]
    fn test_undefined_column_is_reported() {
        let ids = AliasAllocator::new();
        let (t, source) = table(&ids);
        let inner = SelectExpr::new(ids.next_alias(), vec![decl("Id", col(t, "Id"))], Some(source))
            .into_expr();
        let inner_alias = inner.as_select().unwrap().alias;
        let outer = SelectExpr::new(
            ids.next_alias(),
            vec![decl("Name", col(inner_alias, "Name"))],
            Some(inner.clone()),
        )
        .into_expr();
        let err = remove_subqueries(&outer, &[inner]).unwrap_err();
        assert!(matches!(err, RewriteError::UndefinedColumn { .. }));
    }
}
