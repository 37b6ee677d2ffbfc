// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Pass pipeline: evaluate, de-duplicate aliases, remove redundant subqueries

use relq_format::{DebugFormatter, FormatResult, SqlFormatter};
use relq_ir::{AliasAllocator, Expr, ExprRef, same};
use relq_rewrite::{
    PartialEvaluator, RewriteResult, deduplicate_aliases, remove_redundant_subqueries, walk,
};
use tracing::{debug, info};

use crate::config::{OutputMode, RelqConfig};

/// An allocator whose aliases cannot collide with any alias in `expr`
///
/// A tree read from disk was built by another run, so minting from zero
/// could reuse one of its aliases. Every alias counts, including ones
/// declared in nested selects that nothing references.
pub fn fresh_allocator(expr: &ExprRef) -> AliasAllocator {
    let mut highest: Option<u64> = None;
    walk(
        expr,
        |node| {
            let alias = match node.as_ref() {
                Expr::Table(table) => table.alias,
                Expr::Select(select) => select.alias,
                Expr::Column(column) => column.alias,
                Expr::AggregateSubquery(aggregate) => aggregate.group_by_alias,
                _ => return,
            };
            highest = highest.max(Some(alias.id()));
        },
        |_| {},
        |_| true,
    );
    AliasAllocator::starting_at(highest.map_or(0, |id| id + 1))
}

/// Run the passes enabled in `config`, in pipeline order
pub fn run_passes(expr: &ExprRef, config: &RelqConfig) -> RewriteResult<ExprRef> {
    let passes = &config.passes;
    let mut tree = expr.clone();

    if passes.evaluate {
        tree = PartialEvaluator::new()
            .with_recursion_limit(config.recursion_limit)
            .evaluate(&tree)?;
        debug!(changed = !same(&tree, expr), "evaluate pass finished");
    }
    if passes.deduplicate_aliases {
        let allocator = fresh_allocator(&tree);
        tree = deduplicate_aliases(&tree, &allocator)?;
        debug!(minted = allocator.aliases_minted(), "alias de-duplication finished");
    }
    if passes.remove_redundant_subqueries {
        tree = remove_redundant_subqueries(&tree)?;
        debug!("redundant subquery removal finished");
    }

    info!(kind = %tree.kind(), "passes complete");
    Ok(tree)
}

/// Render `expr` as the configured output
pub fn render(expr: &ExprRef, config: &RelqConfig) -> FormatResult<String> {
    match config.output {
        OutputMode::Debug => Ok(DebugFormatter::with_options(config.format.clone())
            .with_recursion_limit(config.recursion_limit)
            .format(expr)),
        OutputMode::Sql => SqlFormatter::new(config.format.clone())
            .with_recursion_limit(config.recursion_limit)
            .format(expr),
    }
}
