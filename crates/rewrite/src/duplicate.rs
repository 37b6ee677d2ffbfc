// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Query duplication and alias de-duplication
//!
//! [`duplicate`] copies a subtree with every table and select alias it
//! declares replaced by a freshly minted one; column references inside the
//! copy follow the rename.
//!
//! [`deduplicate_aliases`] fixes trees in which one alias is declared more
//! than once, which happens when a shared subtree is embedded in two places.
//! The first declaration (in walk order) keeps its alias. Every later one is
//! replaced by a duplicate, and references to it from the enclosing scope
//! are retargeted to the new alias.

use std::collections::{HashMap, HashSet};

use relq_ir::{
    AggregateSubqueryExpr, AliasAllocator, ClientJoinExpr, ColumnExpr, DeleteCommand, ExprRef,
    InsertCommand, IntoExpr, JoinExpr, ProjectionExpr, SelectExpr, TableAlias, TableExpr,
    UpdateCommand, same,
};
use tracing::{debug, instrument, trace};

use crate::error::RewriteResult;
use crate::gather::declared_aliases;
use crate::guard::RecursionGuard;
use crate::visitor::{
    Rewriter, rebuild, rebuild_select_body, rewrite_assignments, rewrite_list, rewrite_opt,
};

struct QueryDuplicator<'a> {
    guard: RecursionGuard,
    allocator: &'a AliasAllocator,
    map: HashMap<TableAlias, TableAlias>,
}

impl Rewriter for QueryDuplicator<'_> {
    fn guard(&self) -> &RecursionGuard {
        &self.guard
    }

    fn rewrite_table(&mut self, _: &ExprRef, table: &TableExpr) -> RewriteResult<ExprRef> {
        let alias = self.allocator.next_alias();
        self.map.insert(table.alias, alias);
        Ok(TableExpr {
            alias,
            ..table.clone()
        }
        .into_expr())
    }

    fn rewrite_select(&mut self, node: &ExprRef, select: &SelectExpr) -> RewriteResult<ExprRef> {
        let alias = self.allocator.next_alias();
        self.map.insert(select.alias, alias);
        let rebuilt = rebuild(self, node)?;
        Ok(match rebuilt.as_select() {
            Some(s) => SelectExpr { alias, ..s.clone() }.into_expr(),
            None => rebuilt,
        })
    }

    fn rewrite_column(&mut self, node: &ExprRef, column: &ColumnExpr) -> RewriteResult<ExprRef> {
        Ok(match self.map.get(&column.alias) {
            Some(alias) => ColumnExpr {
                alias: *alias,
                ..column.clone()
            }
            .into_expr(),
            None => node.clone(),
        })
    }

    fn rewrite_aggregate_subquery(
        &mut self,
        node: &ExprRef,
        aggregate: &AggregateSubqueryExpr,
    ) -> RewriteResult<ExprRef> {
        let in_group = self.rewrite(&aggregate.aggregate_in_group_select)?;
        let as_subquery = self.rewrite(&aggregate.aggregate_as_subquery)?;
        Ok(match self.map.get(&aggregate.group_by_alias) {
            Some(alias) => AggregateSubqueryExpr {
                group_by_alias: *alias,
                aggregate_in_group_select: in_group,
                aggregate_as_subquery: as_subquery,
            }
            .into_expr(),
            None => aggregate.update(node, in_group, as_subquery),
        })
    }
}

/// Copy `expr` with fresh aliases for everything it declares
pub fn duplicate(expr: &ExprRef, allocator: &AliasAllocator) -> RewriteResult<ExprRef> {
    QueryDuplicator {
        guard: RecursionGuard::new(),
        allocator,
        map: HashMap::new(),
    }
    .rewrite(expr)
}

/// Positional alias renames between an old source and its rewrite
fn source_renames(old: &ExprRef, new: &ExprRef) -> HashMap<TableAlias, TableAlias> {
    if same(old, new) {
        return HashMap::new();
    }
    declared_aliases(old)
        .into_iter()
        .zip(declared_aliases(new))
        .filter(|(before, after)| before != after)
        .collect()
}

struct AliasDeduplicator<'a> {
    guard: RecursionGuard,
    allocator: &'a AliasAllocator,
    seen: HashSet<TableAlias>,
    scopes: Vec<HashMap<TableAlias, TableAlias>>,
    renamed: usize,
}

impl AliasDeduplicator<'_> {
    fn remap(&self, alias: TableAlias) -> Option<TableAlias> {
        self.scopes.iter().rev().find_map(|scope| scope.get(&alias).copied())
    }

    fn scoped<T>(
        &mut self,
        scope: HashMap<TableAlias, TableAlias>,
        f: impl FnOnce(&mut Self) -> RewriteResult<T>,
    ) -> RewriteResult<T> {
        if scope.is_empty() {
            return f(self);
        }
        self.scopes.push(scope);
        let result = f(self);
        self.scopes.pop();
        result
    }

    fn redeclare(&mut self, node: &ExprRef, alias: TableAlias) -> RewriteResult<ExprRef> {
        self.renamed += 1;
        trace!(%alias, "alias declared twice, duplicating");
        duplicate(node, self.allocator)
    }
}

impl Rewriter for AliasDeduplicator<'_> {
    fn guard(&self) -> &RecursionGuard {
        &self.guard
    }

    fn rewrite_table(&mut self, node: &ExprRef, table: &TableExpr) -> RewriteResult<ExprRef> {
        if self.seen.insert(table.alias) {
            Ok(node.clone())
        } else {
            self.redeclare(node, table.alias)
        }
    }

    fn rewrite_select(&mut self, node: &ExprRef, select: &SelectExpr) -> RewriteResult<ExprRef> {
        if !self.seen.insert(select.alias) {
            return self.redeclare(node, select.alias);
        }
        let from = rewrite_opt(self, &select.from)?;
        let scope = match (&select.from, &from) {
            (Some(old), Some(new)) => source_renames(old, new),
            _ => HashMap::new(),
        };
        self.scoped(scope, |this| rebuild_select_body(this, node, select, from))
    }

    fn rewrite_column(&mut self, node: &ExprRef, column: &ColumnExpr) -> RewriteResult<ExprRef> {
        Ok(match self.remap(column.alias) {
            Some(alias) => ColumnExpr {
                alias,
                ..column.clone()
            }
            .into_expr(),
            None => node.clone(),
        })
    }

    fn rewrite_join(&mut self, node: &ExprRef, join: &JoinExpr) -> RewriteResult<ExprRef> {
        let left = self.rewrite(&join.left)?;
        let left_renames = source_renames(&join.left, &left);
        let right = if join.join_type.is_apply() {
            self.scoped(left_renames.clone(), |this| this.rewrite(&join.right))?
        } else {
            self.rewrite(&join.right)?
        };
        let mut renames = left_renames;
        renames.extend(source_renames(&join.right, &right));
        let condition = self.scoped(renames, |this| rewrite_opt(this, &join.condition))?;
        Ok(join.update(node, left, right, condition))
    }

    fn rewrite_projection(
        &mut self,
        node: &ExprRef,
        projection: &ProjectionExpr,
    ) -> RewriteResult<ExprRef> {
        let select = self.rewrite(&projection.select)?;
        let scope = source_renames(&projection.select, &select);
        let (projector, aggregator) = self.scoped(scope, |this| {
            Ok((
                this.rewrite(&projection.projector)?,
                rewrite_opt(this, &projection.aggregator)?,
            ))
        })?;
        Ok(projection.update(node, select, projector, aggregator))
    }

    fn rewrite_client_join(
        &mut self,
        node: &ExprRef,
        join: &ClientJoinExpr,
    ) -> RewriteResult<ExprRef> {
        let projection = self.rewrite(&join.projection)?;
        let scope = match (join.projection.as_projection(), projection.as_projection()) {
            (Some(old), Some(new)) => source_renames(&old.select, &new.select),
            _ => HashMap::new(),
        };
        let outer_key = rewrite_list(self, &join.outer_key)?;
        let inner_key = self.scoped(scope, |this| rewrite_list(this, &join.inner_key))?;
        Ok(join.update(node, projection, outer_key, inner_key))
    }

    fn rewrite_aggregate_subquery(
        &mut self,
        node: &ExprRef,
        aggregate: &AggregateSubqueryExpr,
    ) -> RewriteResult<ExprRef> {
        let in_group = self.rewrite(&aggregate.aggregate_in_group_select)?;
        let as_subquery = self.rewrite(&aggregate.aggregate_as_subquery)?;
        Ok(match self.remap(aggregate.group_by_alias) {
            Some(alias) => AggregateSubqueryExpr {
                group_by_alias: alias,
                aggregate_in_group_select: in_group,
                aggregate_as_subquery: as_subquery,
            }
            .into_expr(),
            None => aggregate.update(node, in_group, as_subquery),
        })
    }

    fn rewrite_insert(&mut self, node: &ExprRef, insert: &InsertCommand) -> RewriteResult<ExprRef> {
        let table = self.rewrite(&insert.table)?;
        let scope = source_renames(&insert.table, &table);
        let assignments =
            self.scoped(scope, |this| rewrite_assignments(this, &insert.assignments))?;
        Ok(insert.update(node, table, assignments))
    }

    fn rewrite_update(&mut self, node: &ExprRef, update: &UpdateCommand) -> RewriteResult<ExprRef> {
        let table = self.rewrite(&update.table)?;
        let scope = source_renames(&update.table, &table);
        let (where_clause, assignments) = self.scoped(scope, |this| {
            Ok((
                rewrite_opt(this, &update.where_clause)?,
                rewrite_assignments(this, &update.assignments)?,
            ))
        })?;
        Ok(update.update(node, table, where_clause, assignments))
    }

    fn rewrite_delete(&mut self, node: &ExprRef, delete: &DeleteCommand) -> RewriteResult<ExprRef> {
        let table = self.rewrite(&delete.table)?;
        let scope = source_renames(&delete.table, &table);
        let where_clause = self.scoped(scope, |this| rewrite_opt(this, &delete.where_clause))?;
        Ok(delete.update(node, table, where_clause))
    }
}

/// Re-mint every alias declared more than once in `expr`
///
/// Returns `expr` itself when every alias is declared once.
#[instrument(skip_all)]
pub fn deduplicate_aliases(expr: &ExprRef, allocator: &AliasAllocator) -> RewriteResult<ExprRef> {
    let mut dedup = AliasDeduplicator {
        guard: RecursionGuard::new(),
        allocator,
        seen: HashSet::new(),
        scopes: Vec::new(),
        renamed: 0,
    };
    let result = dedup.rewrite(expr)?;
    if dedup.renamed > 0 {
        debug!(renamed = dedup.renamed, "re-minted duplicate alias declarations");
    }
    Ok(result)
}
