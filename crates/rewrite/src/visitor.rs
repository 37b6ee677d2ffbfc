// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Visitor and rewriter traits
//!
//! Two traversal strategies over the whole node set:
//!
//! - [`Visitor`]: read-only, produces an associated `Output`. Every per-kind
//!   method defaults to [`RewriteError::UnhandledKind`]; an analysis
//!   overrides only the kinds it understands and fails loudly on the rest.
//! - [`Rewriter`]: produces a node. Every per-kind method defaults to
//!   [`rebuild`], which rewrites the children and reconstructs the node,
//!   returning the original reference when no child changed.
//!
//! Both dispatch through a single `match` on [`Expr`], so adding a node kind
//! is a compile error here until it is handled.
//!
//! Implementors own a [`RecursionGuard`] and expose it through `guard()`;
//! the provided `visit`/`rewrite` entry points enter and leave it around
//! every node.

use relq_ir::{
    AggregateExpr, AggregateSubqueryExpr, BatchExpr, BetweenExpr, BinaryExpr, BlockCommand,
    CallExpr, ClientJoinExpr, ColumnAssignment, ColumnDeclaration, ColumnExpr, ConditionalExpr,
    ConstantExpr, DeclarationCommand, DeleteCommand, EntityExpr, ExistsExpr, Expr, ExprRef,
    FunctionExpr, IfCommand, InSubqueryExpr, InValuesExpr, IndexExpr, InsertCommand, InvokeExpr,
    IsNullExpr, JoinExpr, LambdaExpr, MemberExpr, NamedValueExpr, NewArrayExpr, NewExpr,
    OrderExpression, OuterJoinedExpr, ParameterExpr, ProjectionExpr, RowNumberExpr,
    ScalarSubqueryExpr, SelectExpr, TableExpr, UnaryExpr, UpdateCommand, VariableDeclaration,
    VariableExpr,
};

use crate::error::{RewriteError, RewriteResult};
use crate::guard::RecursionGuard;

macro_rules! traversal_traits {
    ($($variant:ident($payload:ty) => $visit:ident, $rewrite:ident;)*) => {
        /// Read-only traversal producing a value per node
        pub trait Visitor {
            type Output;

            fn guard(&self) -> &RecursionGuard;

            /// Dispatch `node` to its per-kind method
            fn visit(&mut self, node: &ExprRef) -> RewriteResult<Self::Output> {
                self.guard().enter()?;
                let result = match node.as_ref() {
                    $(Expr::$variant(payload) => self.$visit(node, payload),)*
                };
                self.guard().exit();
                result
            }

            $(
                fn $visit(
                    &mut self,
                    node: &ExprRef,
                    payload: &$payload,
                ) -> RewriteResult<Self::Output> {
                    let _ = payload;
                    Err(RewriteError::unhandled(node.kind(), std::any::type_name::<Self>()))
                }
            )*
        }

        /// Traversal producing a rewritten tree
        pub trait Rewriter {
            fn guard(&self) -> &RecursionGuard;

            /// Dispatch `node` to its per-kind method
            fn rewrite(&mut self, node: &ExprRef) -> RewriteResult<ExprRef> {
                self.guard().enter()?;
                let result = match node.as_ref() {
                    $(Expr::$variant(payload) => self.$rewrite(node, payload),)*
                };
                self.guard().exit();
                result
            }

            $(
                fn $rewrite(
                    &mut self,
                    node: &ExprRef,
                    payload: &$payload,
                ) -> RewriteResult<ExprRef> {
                    let _ = payload;
                    rebuild(self, node)
                }
            )*
        }
    };
}

traversal_traits! {
    Constant(ConstantExpr) => visit_constant, rewrite_constant;
    Parameter(ParameterExpr) => visit_parameter, rewrite_parameter;
    Binary(BinaryExpr) => visit_binary, rewrite_binary;
    Unary(UnaryExpr) => visit_unary, rewrite_unary;
    Conditional(ConditionalExpr) => visit_conditional, rewrite_conditional;
    Call(CallExpr) => visit_call, rewrite_call;
    Member(MemberExpr) => visit_member, rewrite_member;
    Lambda(LambdaExpr) => visit_lambda, rewrite_lambda;
    Invoke(InvokeExpr) => visit_invoke, rewrite_invoke;
    New(NewExpr) => visit_new, rewrite_new;
    NewArray(NewArrayExpr) => visit_new_array, rewrite_new_array;
    Index(IndexExpr) => visit_index, rewrite_index;
    Table(TableExpr) => visit_table, rewrite_table;
    Column(ColumnExpr) => visit_column, rewrite_column;
    Select(SelectExpr) => visit_select, rewrite_select;
    Join(JoinExpr) => visit_join, rewrite_join;
    Projection(ProjectionExpr) => visit_projection, rewrite_projection;
    ClientJoin(ClientJoinExpr) => visit_client_join, rewrite_client_join;
    Entity(EntityExpr) => visit_entity, rewrite_entity;
    Aggregate(AggregateExpr) => visit_aggregate, rewrite_aggregate;
    AggregateSubquery(AggregateSubqueryExpr) =>
        visit_aggregate_subquery, rewrite_aggregate_subquery;
    ScalarSubquery(ScalarSubqueryExpr) => visit_scalar_subquery, rewrite_scalar_subquery;
    Exists(ExistsExpr) => visit_exists, rewrite_exists;
    InSubquery(InSubqueryExpr) => visit_in_subquery, rewrite_in_subquery;
    InValues(InValuesExpr) => visit_in_values, rewrite_in_values;
    IsNull(IsNullExpr) => visit_is_null, rewrite_is_null;
    Between(BetweenExpr) => visit_between, rewrite_between;
    RowNumber(RowNumberExpr) => visit_row_number, rewrite_row_number;
    NamedValue(NamedValueExpr) => visit_named_value, rewrite_named_value;
    OuterJoined(OuterJoinedExpr) => visit_outer_joined, rewrite_outer_joined;
    Function(FunctionExpr) => visit_function, rewrite_function;
    Insert(InsertCommand) => visit_insert, rewrite_insert;
    Update(UpdateCommand) => visit_update, rewrite_update;
    Delete(DeleteCommand) => visit_delete, rewrite_delete;
    Batch(BatchExpr) => visit_batch, rewrite_batch;
    Block(BlockCommand) => visit_block, rewrite_block;
    If(IfCommand) => visit_if, rewrite_if;
    Declaration(DeclarationCommand) => visit_declaration, rewrite_declaration;
    Variable(VariableExpr) => visit_variable, rewrite_variable;
}

pub fn rewrite_opt<R: Rewriter + ?Sized>(
    r: &mut R,
    node: &Option<ExprRef>,
) -> RewriteResult<Option<ExprRef>> {
    node.as_ref().map(|n| r.rewrite(n)).transpose()
}

pub fn rewrite_list<R: Rewriter + ?Sized>(
    r: &mut R,
    nodes: &[ExprRef],
) -> RewriteResult<Vec<ExprRef>> {
    nodes.iter().map(|n| r.rewrite(n)).collect()
}

pub fn rewrite_columns<R: Rewriter + ?Sized>(
    r: &mut R,
    columns: &[ColumnDeclaration],
) -> RewriteResult<Vec<ColumnDeclaration>> {
    columns
        .iter()
        .map(|c| Ok(c.with_expr(r.rewrite(&c.expr)?)))
        .collect()
}

pub fn rewrite_orderings<R: Rewriter + ?Sized>(
    r: &mut R,
    orderings: &[OrderExpression],
) -> RewriteResult<Vec<OrderExpression>> {
    orderings
        .iter()
        .map(|o| Ok(o.with_expr(r.rewrite(&o.expr)?)))
        .collect()
}

pub fn rewrite_assignments<R: Rewriter + ?Sized>(
    r: &mut R,
    assignments: &[ColumnAssignment],
) -> RewriteResult<Vec<ColumnAssignment>> {
    assignments
        .iter()
        .map(|a| Ok(ColumnAssignment::new(r.rewrite(&a.column)?, r.rewrite(&a.expression)?)))
        .collect()
}

fn rewrite_variables<R: Rewriter + ?Sized>(
    r: &mut R,
    variables: &[VariableDeclaration],
) -> RewriteResult<Vec<VariableDeclaration>> {
    variables
        .iter()
        .map(|v| Ok(v.with_expression(r.rewrite(&v.expression)?)))
        .collect()
}

/// Rewrite the parts of a select other than its source
///
/// Used by passes that handle `from` themselves (alias scoping) and then
/// continue with the default for everything else.
pub fn rebuild_select_body<R: Rewriter + ?Sized>(
    r: &mut R,
    node: &ExprRef,
    select: &SelectExpr,
    from: Option<ExprRef>,
) -> RewriteResult<ExprRef> {
    let where_clause = rewrite_opt(r, &select.where_clause)?;
    let order_by = rewrite_orderings(r, &select.order_by)?;
    let group_by = rewrite_list(r, &select.group_by)?;
    let skip = rewrite_opt(r, &select.skip)?;
    let take = rewrite_opt(r, &select.take)?;
    let columns = rewrite_columns(r, &select.columns)?;
    Ok(select.update(
        node,
        SelectExpr {
            alias: select.alias,
            columns,
            from,
            where_clause,
            order_by,
            group_by,
            skip,
            take,
            distinct: select.distinct,
            reverse: select.reverse,
        },
    ))
}

/// Rewrite every child of `node` with `r` and reconstruct it
///
/// Returns `node` itself when every child rewrote to itself.
pub fn rebuild<R: Rewriter + ?Sized>(r: &mut R, node: &ExprRef) -> RewriteResult<ExprRef> {
    let rebuilt = match node.as_ref() {
        Expr::Constant(_)
        | Expr::Parameter(_)
        | Expr::Table(_)
        | Expr::Column(_)
        | Expr::Variable(_) => node.clone(),

        Expr::Binary(b) => {
            let left = r.rewrite(&b.left)?;
            let right = r.rewrite(&b.right)?;
            b.update(node, left, right)
        }
        Expr::Unary(u) => {
            let operand = r.rewrite(&u.operand)?;
            u.update(node, operand)
        }
        Expr::Conditional(c) => {
            let test = r.rewrite(&c.test)?;
            let if_true = r.rewrite(&c.if_true)?;
            let if_false = r.rewrite(&c.if_false)?;
            c.update(node, test, if_true, if_false)
        }
        Expr::Call(c) => {
            let object = rewrite_opt(r, &c.object)?;
            let args = rewrite_list(r, &c.args)?;
            c.update(node, object, args)
        }
        Expr::Member(m) => {
            let object = rewrite_opt(r, &m.object)?;
            m.update(node, object)
        }
        Expr::Lambda(l) => {
            let body = r.rewrite(&l.body)?;
            l.update(node, body)
        }
        Expr::Invoke(i) => {
            let target = r.rewrite(&i.target)?;
            let args = rewrite_list(r, &i.args)?;
            i.update(node, target, args)
        }
        Expr::New(n) => {
            let args = rewrite_list(r, &n.args)?;
            n.update(node, args)
        }
        Expr::NewArray(a) => {
            let elements = rewrite_list(r, &a.elements)?;
            a.update(node, elements)
        }
        Expr::Index(i) => {
            let array = r.rewrite(&i.array)?;
            let index = r.rewrite(&i.index)?;
            i.update(node, array, index)
        }

        Expr::Select(s) => {
            let from = rewrite_opt(r, &s.from)?;
            return rebuild_select_body(r, node, s, from);
        }
        Expr::Join(j) => {
            let left = r.rewrite(&j.left)?;
            let right = r.rewrite(&j.right)?;
            let condition = rewrite_opt(r, &j.condition)?;
            j.update(node, left, right, condition)
        }
        Expr::Projection(p) => {
            let select = r.rewrite(&p.select)?;
            let projector = r.rewrite(&p.projector)?;
            let aggregator = rewrite_opt(r, &p.aggregator)?;
            p.update(node, select, projector, aggregator)
        }
        Expr::ClientJoin(j) => {
            let projection = r.rewrite(&j.projection)?;
            let outer_key = rewrite_list(r, &j.outer_key)?;
            let inner_key = rewrite_list(r, &j.inner_key)?;
            j.update(node, projection, outer_key, inner_key)
        }
        Expr::Entity(e) => {
            let expr = r.rewrite(&e.expr)?;
            e.update(node, expr)
        }
        Expr::Aggregate(a) => {
            let argument = rewrite_opt(r, &a.argument)?;
            a.update(node, argument)
        }
        Expr::AggregateSubquery(a) => {
            let in_group = r.rewrite(&a.aggregate_in_group_select)?;
            let as_subquery = r.rewrite(&a.aggregate_as_subquery)?;
            a.update(node, in_group, as_subquery)
        }
        Expr::ScalarSubquery(s) => {
            let select = r.rewrite(&s.select)?;
            s.update(node, select)
        }
        Expr::Exists(e) => {
            let select = r.rewrite(&e.select)?;
            e.update(node, select)
        }
        Expr::InSubquery(i) => {
            let expr = r.rewrite(&i.expr)?;
            let select = r.rewrite(&i.select)?;
            i.update(node, expr, select)
        }
        Expr::InValues(i) => {
            let expr = r.rewrite(&i.expr)?;
            let values = rewrite_list(r, &i.values)?;
            i.update(node, expr, values)
        }
        Expr::IsNull(i) => {
            let expr = r.rewrite(&i.expr)?;
            i.update(node, expr)
        }
        Expr::Between(b) => {
            let expr = r.rewrite(&b.expr)?;
            let lower = r.rewrite(&b.lower)?;
            let upper = r.rewrite(&b.upper)?;
            b.update(node, expr, lower, upper)
        }
        Expr::RowNumber(rn) => {
            let order_by = rewrite_orderings(r, &rn.order_by)?;
            rn.update(node, order_by)
        }
        Expr::NamedValue(n) => {
            let value = r.rewrite(&n.value)?;
            n.update(node, value)
        }
        Expr::OuterJoined(o) => {
            let test = r.rewrite(&o.test)?;
            let expr = r.rewrite(&o.expr)?;
            o.update(node, test, expr)
        }
        Expr::Function(f) => {
            let args = rewrite_list(r, &f.args)?;
            f.update(node, args)
        }

        Expr::Insert(i) => {
            let table = r.rewrite(&i.table)?;
            let assignments = rewrite_assignments(r, &i.assignments)?;
            i.update(node, table, assignments)
        }
        Expr::Update(u) => {
            let table = r.rewrite(&u.table)?;
            let where_clause = rewrite_opt(r, &u.where_clause)?;
            let assignments = rewrite_assignments(r, &u.assignments)?;
            u.update(node, table, where_clause, assignments)
        }
        Expr::Delete(d) => {
            let table = r.rewrite(&d.table)?;
            let where_clause = rewrite_opt(r, &d.where_clause)?;
            d.update(node, table, where_clause)
        }
        Expr::Batch(b) => {
            let input = r.rewrite(&b.input)?;
            let operation = r.rewrite(&b.operation)?;
            let batch_size = r.rewrite(&b.batch_size)?;
            let stream = r.rewrite(&b.stream)?;
            b.update(node, input, operation, batch_size, stream)
        }
        Expr::Block(b) => {
            let commands = rewrite_list(r, &b.commands)?;
            b.update(node, commands)
        }
        Expr::If(i) => {
            let check = r.rewrite(&i.check)?;
            let if_true = r.rewrite(&i.if_true)?;
            let if_false = rewrite_opt(r, &i.if_false)?;
            i.update(node, check, if_true, if_false)
        }
        Expr::Declaration(d) => {
            let variables = rewrite_variables(r, &d.variables)?;
            let source = rewrite_opt(r, &d.source)?;
            d.update(node, variables, source)
        }
    };
    Ok(rebuilt)
}

/// A rewriter that changes nothing
///
/// Useful as a baseline: rewriting any tree with it returns the same
/// reference.
#[derive(Debug, Default)]
pub struct IdentityRewriter {
    guard: RecursionGuard,
}

impl IdentityRewriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Rewriter for IdentityRewriter {
    fn guard(&self) -> &RecursionGuard {
        &self.guard
    }
}
