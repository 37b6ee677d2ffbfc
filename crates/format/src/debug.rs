// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Debug formatter
//!
//! Renders every node kind as a readable pseudo-language: SQL-like clauses
//! for the relational nodes, C-like expressions for the base algebra.
//! Output is deterministic for a given tree and options.
//!
//! The formatter never fails. A failure while rendering a node (for example
//! a tripped recursion guard) is written inline as `<error: ...>` and the
//! rest of the tree is still rendered.
//!
//! ```text
//! PROJECT new Row { CustomerID = t1.CustomerID, Name = t1.Name }
//! FROM (
//!   SELECT t0.CustomerID, t0.Name
//!   FROM customers AS t0
//!   WHERE (t0.City == "London")
//! ) AS t1
//! ```

use relq_ir::{
    ColumnAssignment, ColumnDeclaration, Expr, ExprRef, JoinExpr, JoinType, OrderExpression,
    OrderType, ProjectionExpr, SelectExpr, UnaryOp,
};
use relq_rewrite::{DEFAULT_RECURSION_LIMIT, RecursionGuard};

use crate::literal::write_value;
use crate::options::FormatOptions;
use crate::writer::TextWriter;

/// Formatter for diagnostic output
#[derive(Debug, Clone)]
pub struct DebugFormatter {
    options: FormatOptions,
    recursion_limit: usize,
}

impl Default for DebugFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugFormatter {
    pub fn new() -> Self {
        Self::with_options(FormatOptions::default())
    }

    pub fn with_options(options: FormatOptions) -> Self {
        Self {
            options,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn format(&self, expr: &ExprRef) -> String {
        let mut w = TextWriter::new(self.options.clone());
        DebugWriter {
            guard: RecursionGuard::with_limit(self.recursion_limit),
        }
        .expr(&mut w, expr);
        w.finish()
    }
}

/// Render `expr` with the default options
pub fn format_debug(expr: &ExprRef) -> String {
    DebugFormatter::new().format(expr)
}

struct DebugWriter {
    guard: RecursionGuard,
}

impl DebugWriter {
    fn expr(&mut self, w: &mut TextWriter, node: &ExprRef) {
        if let Err(err) = self.guard.enter() {
            write!(w, "<error: {}>", err);
            return;
        }
        self.node(w, node);
        self.guard.exit();
    }

    fn list(&mut self, w: &mut TextWriter, nodes: &[ExprRef]) {
        for (i, node) in nodes.iter().enumerate() {
            if i > 0 {
                w.write_str(", ");
            }
            self.expr(w, node);
        }
    }

    fn node(&mut self, w: &mut TextWriter, node: &ExprRef) {
        match node.as_ref() {
            Expr::Constant(constant) => write_value(w, &constant.value),
            Expr::Parameter(parameter) => w.write_str(&parameter.name),
            Expr::Binary(binary) => {
                w.write_str("(");
                self.expr(w, &binary.left);
                write!(w, " {} ", binary.op.symbol());
                self.expr(w, &binary.right);
                w.write_str(")");
            }
            Expr::Unary(unary) => match unary.op {
                UnaryOp::Negate => {
                    w.write_str("-");
                    self.expr(w, &unary.operand);
                }
                UnaryOp::Not => {
                    w.write_str("!");
                    self.expr(w, &unary.operand);
                }
                UnaryOp::Convert => {
                    write!(w, "({})", unary.ty);
                    self.expr(w, &unary.operand);
                }
                UnaryOp::Quote => {
                    w.write_str("quote(");
                    self.expr(w, &unary.operand);
                    w.write_str(")");
                }
                UnaryOp::ArrayLength => {
                    self.expr(w, &unary.operand);
                    w.write_str(".Length");
                }
            },
            Expr::Conditional(conditional) => {
                w.write_str("(");
                self.expr(w, &conditional.test);
                w.write_str(" ? ");
                self.expr(w, &conditional.if_true);
                w.write_str(" : ");
                self.expr(w, &conditional.if_false);
                w.write_str(")");
            }
            Expr::Call(call) => {
                match &call.object {
                    Some(object) => self.expr(w, object),
                    None => w.write_str(&call.method.declaring_type),
                }
                write!(w, ".{}(", call.method.name);
                self.list(w, &call.args);
                w.write_str(")");
            }
            Expr::Member(member) => {
                if let Some(object) = &member.object {
                    self.expr(w, object);
                    w.write_str(".");
                }
                w.write_str(&member.member);
            }
            Expr::Lambda(lambda) => {
                w.write_str("(");
                for (i, param) in lambda.params.iter().enumerate() {
                    if i > 0 {
                        w.write_str(", ");
                    }
                    w.write_str(&param.name);
                }
                w.write_str(") => ");
                self.expr(w, &lambda.body);
            }
            Expr::Invoke(invoke) => {
                w.write_str("invoke(");
                self.expr(w, &invoke.target);
                for arg in &invoke.args {
                    w.write_str(", ");
                    self.expr(w, arg);
                }
                w.write_str(")");
            }
            Expr::New(new) => {
                write!(w, "new {} {{ ", new.type_name);
                for (i, (member, arg)) in new.members.iter().zip(&new.args).enumerate() {
                    if i > 0 {
                        w.write_str(", ");
                    }
                    write!(w, "{} = ", member);
                    self.expr(w, arg);
                }
                w.write_str(" }");
            }
            Expr::NewArray(array) => {
                write!(w, "new {}[] {{ ", array.element_type);
                self.list(w, &array.elements);
                w.write_str(" }");
            }
            Expr::Index(index) => {
                self.expr(w, &index.array);
                w.write_str("[");
                self.expr(w, &index.index);
                w.write_str("]");
            }

            Expr::Table(_) | Expr::Join(_) => self.source(w, node),
            Expr::Column(column) => {
                let alias = w.reference(column.alias);
                write!(w, "{}.{}", alias, column.name);
            }
            Expr::Select(select) => self.select(w, select),
            Expr::Projection(projection) => w.scoped(|w| self.projection(w, projection)),
            Expr::ClientJoin(join) => {
                w.write_str("CLIENT JOIN (");
                let ((), inner) = w.indented(|w| {
                    w.newline();
                    w.capture(|w| match join.projection.as_projection() {
                        Some(projection) => self.projection(w, projection),
                        None => self.expr(w, &join.projection),
                    })
                });
                w.newline();
                w.write_str(") ON [");
                self.list(w, &join.outer_key);
                w.write_str("] == [");
                w.scoped(|w| {
                    w.bring_into_scope(&inner);
                    self.list(w, &join.inner_key);
                });
                w.write_str("]");
            }
            Expr::Entity(entity) => {
                write!(w, "ENTITY {}(", entity.entity.entity_id);
                self.expr(w, &entity.expr);
                w.write_str(")");
            }
            Expr::Aggregate(aggregate) => {
                write!(w, "{}(", aggregate.name);
                match &aggregate.argument {
                    Some(argument) => {
                        if aggregate.distinct {
                            w.write_str("DISTINCT ");
                        }
                        self.expr(w, argument);
                    }
                    None => w.write_str("*"),
                }
                w.write_str(")");
            }
            Expr::AggregateSubquery(aggregate) => self.expr(w, &aggregate.aggregate_as_subquery),
            Expr::ScalarSubquery(subquery) => self.subquery(w, &subquery.select),
            Expr::Exists(exists) => {
                w.write_str("EXISTS ");
                self.subquery(w, &exists.select);
            }
            Expr::InSubquery(in_subquery) => {
                w.write_str("(");
                self.expr(w, &in_subquery.expr);
                w.write_str(" IN ");
                self.subquery(w, &in_subquery.select);
                w.write_str(")");
            }
            Expr::InValues(in_values) => {
                w.write_str("(");
                self.expr(w, &in_values.expr);
                w.write_str(" IN (");
                self.list(w, &in_values.values);
                w.write_str("))");
            }
            Expr::IsNull(is_null) => {
                w.write_str("(");
                self.expr(w, &is_null.expr);
                w.write_str(" IS NULL)");
            }
            Expr::Between(between) => {
                w.write_str("(");
                self.expr(w, &between.expr);
                w.write_str(" BETWEEN ");
                self.expr(w, &between.lower);
                w.write_str(" AND ");
                self.expr(w, &between.upper);
                w.write_str(")");
            }
            Expr::RowNumber(row_number) => {
                w.write_str("ROW_NUMBER() OVER (ORDER BY ");
                self.orderings(w, &row_number.order_by);
                w.write_str(")");
            }
            Expr::NamedValue(named) => write!(w, "@{}", named.name),
            Expr::OuterJoined(outer) => {
                w.write_str("OUTER_JOINED(");
                self.expr(w, &outer.test);
                w.write_str(", ");
                self.expr(w, &outer.expr);
                w.write_str(")");
            }
            Expr::Function(function) => {
                write!(w, "{}(", function.name);
                self.list(w, &function.args);
                w.write_str(")");
            }

            Expr::Insert(insert) => w.scoped(|w| {
                w.write_str("INSERT INTO ");
                self.source(w, &insert.table);
                w.write_str(" (");
                for (i, assignment) in insert.assignments.iter().enumerate() {
                    if i > 0 {
                        w.write_str(", ");
                    }
                    self.assignment_target(w, assignment);
                }
                w.write_str(")");
                w.newline();
                w.write_str("VALUES (");
                for (i, assignment) in insert.assignments.iter().enumerate() {
                    if i > 0 {
                        w.write_str(", ");
                    }
                    self.expr(w, &assignment.expression);
                }
                w.write_str(")");
            }),
            Expr::Update(update) => w.scoped(|w| {
                w.write_str("UPDATE ");
                self.source(w, &update.table);
                w.newline();
                w.write_str("SET ");
                self.assignments(w, &update.assignments);
                if let Some(predicate) = &update.where_clause {
                    w.newline();
                    w.write_str("WHERE ");
                    self.expr(w, predicate);
                }
            }),
            Expr::Delete(delete) => w.scoped(|w| {
                w.write_str("DELETE FROM ");
                self.source(w, &delete.table);
                if let Some(predicate) = &delete.where_clause {
                    w.newline();
                    w.write_str("WHERE ");
                    self.expr(w, predicate);
                }
            }),
            Expr::Batch(batch) => {
                w.write_str("BATCH(size: ");
                self.expr(w, &batch.batch_size);
                w.write_str(", stream: ");
                self.expr(w, &batch.stream);
                w.write_str(")");
                w.indented(|w| {
                    w.newline();
                    w.write_str("INPUT ");
                    self.expr(w, &batch.input);
                    w.newline();
                    w.write_str("OPERATION ");
                    self.expr(w, &batch.operation);
                });
            }
            Expr::Block(block) => {
                w.write_str("BEGIN");
                w.indented(|w| {
                    for command in &block.commands {
                        w.newline();
                        self.expr(w, command);
                        w.write_str(";");
                    }
                });
                w.newline();
                w.write_str("END");
            }
            Expr::If(command) => {
                w.write_str("IF ");
                self.expr(w, &command.check);
                w.write_str(" THEN");
                w.indented(|w| {
                    w.newline();
                    self.expr(w, &command.if_true);
                });
                if let Some(if_false) = &command.if_false {
                    w.newline();
                    w.write_str("ELSE");
                    w.indented(|w| {
                        w.newline();
                        self.expr(w, if_false);
                    });
                }
                w.newline();
                w.write_str("END IF");
            }
            Expr::Declaration(declaration) => w.scoped(|w| {
                let from = declaration.source.as_ref().map(|source| {
                    w.buffered(|w| {
                        w.write_str("FROM ");
                        self.source(w, source);
                    })
                    .1
                });
                w.write_str("DECLARE ");
                for (i, variable) in declaration.variables.iter().enumerate() {
                    if i > 0 {
                        w.write_str(", ");
                    }
                    write!(w, "@{} {} = ", variable.name, variable.query_type);
                    self.expr(w, &variable.expression);
                }
                if let Some(from) = from {
                    w.newline();
                    w.splice(&from);
                }
            }),
            Expr::Variable(variable) => write!(w, "@{}", variable.name),
        }
    }

    /// A node in a `FROM` position: declares the aliases it introduces
    fn source(&mut self, w: &mut TextWriter, node: &ExprRef) {
        if let Err(err) = self.guard.enter() {
            write!(w, "<error: {}>", err);
            return;
        }
        match node.as_ref() {
            Expr::Table(table) => {
                let name = w.declare(table.alias);
                write!(w, "{} AS {}", table.name, name);
            }
            Expr::Select(select) => self.parenthesized(w, select),
            Expr::Join(join) => self.join(w, join),
            _ => self.node(w, node),
        }
        self.guard.exit();
    }

    fn join(&mut self, w: &mut TextWriter, join: &JoinExpr) {
        let ((), left) = w.capture(|w| self.source(w, &join.left));
        w.newline();
        write!(w, "{} ", join_keyword(join.join_type));
        let ((), right) = w.capture(|w| {
            if join.join_type.is_apply() {
                w.bring_into_scope(&left);
            }
            self.source(w, &join.right)
        });
        w.bring_into_scope(&left);
        w.bring_into_scope(&right);
        if let Some(condition) = &join.condition {
            w.write_str(" ON ");
            self.expr(w, condition);
        }
    }

    fn subquery(&mut self, w: &mut TextWriter, node: &ExprRef) {
        match node.as_select() {
            Some(select) => self.parenthesized(w, select),
            None => self.expr(w, node),
        }
    }

    fn parenthesized(&mut self, w: &mut TextWriter, select: &SelectExpr) {
        w.write_str("(");
        w.indented(|w| {
            w.newline();
            self.select(w, select);
        });
        w.newline();
        let name = w.declare(select.alias);
        write!(w, ") AS {}", name);
    }

    fn select(&mut self, w: &mut TextWriter, select: &SelectExpr) {
        w.scoped(|w| {
            let from = select.from.as_ref().map(|from| {
                w.buffered(|w| {
                    w.write_str("FROM ");
                    self.source(w, from);
                })
                .1
            });
            w.write_str("SELECT ");
            if select.distinct {
                w.write_str("DISTINCT ");
            }
            self.columns(w, &select.columns);
            if let Some(from) = from {
                w.newline();
                w.splice(&from);
            }
            if let Some(predicate) = &select.where_clause {
                w.newline();
                w.write_str("WHERE ");
                self.expr(w, predicate);
            }
            if !select.group_by.is_empty() {
                w.newline();
                w.write_str("GROUP BY ");
                self.list(w, &select.group_by);
            }
            if !select.order_by.is_empty() {
                w.newline();
                w.write_str("ORDER BY ");
                self.orderings(w, &select.order_by);
            }
            if let Some(skip) = &select.skip {
                w.newline();
                w.write_str("SKIP ");
                self.expr(w, skip);
            }
            if let Some(take) = &select.take {
                w.newline();
                w.write_str("TAKE ");
                self.expr(w, take);
            }
            if select.reverse {
                w.newline();
                w.write_str("REVERSE");
            }
        });
    }

    fn columns(&mut self, w: &mut TextWriter, columns: &[ColumnDeclaration]) {
        if columns.is_empty() {
            w.write_str("()");
            return;
        }
        for (i, decl) in columns.iter().enumerate() {
            if i > 0 {
                w.write_str(", ");
            }
            self.expr(w, &decl.expr);
            let same_name = decl.expr.as_column().is_some_and(|c| c.name == decl.name);
            if !same_name {
                write!(w, " AS {}", decl.name);
            }
        }
    }

    fn orderings(&mut self, w: &mut TextWriter, orderings: &[OrderExpression]) {
        for (i, ordering) in orderings.iter().enumerate() {
            if i > 0 {
                w.write_str(", ");
            }
            self.expr(w, &ordering.expr);
            if ordering.order_type == OrderType::Descending {
                w.write_str(" DESC");
            }
        }
    }

    fn projection(&mut self, w: &mut TextWriter, projection: &ProjectionExpr) {
        let ((), from) = w.buffered(|w| {
            w.write_str("FROM ");
            self.source(w, &projection.select);
        });
        w.write_str("PROJECT ");
        if projection.is_singleton {
            w.write_str("SINGLE ");
        }
        self.expr(w, &projection.projector);
        w.newline();
        w.splice(&from);
        if let Some(aggregator) = &projection.aggregator {
            w.newline();
            w.write_str("AGGREGATE ");
            self.expr(w, aggregator);
        }
    }

    fn assignment_target(&mut self, w: &mut TextWriter, assignment: &ColumnAssignment) {
        match assignment.column.as_column() {
            Some(column) => w.write_str(&column.name),
            None => self.expr(w, &assignment.column),
        }
    }

    fn assignments(&mut self, w: &mut TextWriter, assignments: &[ColumnAssignment]) {
        for (i, assignment) in assignments.iter().enumerate() {
            if i > 0 {
                w.write_str(", ");
            }
            self.assignment_target(w, assignment);
            w.write_str(" = ");
            self.expr(w, &assignment.expression);
        }
    }
}

fn join_keyword(join_type: JoinType) -> &'static str {
    match join_type {
        JoinType::CrossJoin => "CROSS JOIN",
        JoinType::InnerJoin => "INNER JOIN",
        JoinType::CrossApply => "CROSS APPLY",
        JoinType::OuterApply => "OUTER APPLY",
        JoinType::LeftOuter => "LEFT OUTER JOIN",
        JoinType::SingletonLeftOuter => "SINGLETON LEFT OUTER JOIN",
    }
}

#[cfg(test)]
mod tests {
    use relq_ir::{AliasAllocator, BinaryOp, BlockCommand, IfCommand, IntoExpr, MethodRef, Type};

    use super::*;

    #[test]
    fn test_base_algebra() {
        let ids = AliasAllocator::new();
        let x = ids.parameter_decl("x", Type::Int32);
        let body = Expr::conditional(
            Expr::binary(BinaryOp::GreaterThan, x.clone().into_expr(), Expr::constant(0)),
            Expr::call(
                MethodRef::new("Math", "Abs"),
                None,
                vec![Expr::unary(UnaryOp::Negate, Expr::constant(2))],
                Type::Int32,
            ),
            Expr::convert(Expr::constant(1), Type::nullable(Type::Int32)),
        );
        let lambda = Expr::lambda(vec![x], body);
        assert_eq!(
            format_debug(&lambda),
            "(x) => ((x > 0) ? Math.Abs(-2) : (int?)1)"
        );
    }

    #[test]
    fn test_block_and_if_indentation() {
        let block = BlockCommand {
            commands: vec![
                IfCommand {
                    check: Expr::constant(true),
                    if_true: Expr::constant(1),
                    if_false: Some(Expr::constant(2)),
                }
                .into_expr(),
                Expr::constant("done"),
            ],
        }
        .into_expr();
        assert_eq!(
            format_debug(&block),
            "BEGIN\n  IF true THEN\n    1\n  ELSE\n    2\n  END IF;\n  \"done\";\nEND"
        );
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_guard_failure_is_inline() {
        let mut tree = Expr::constant(0);
        for i in 1..10 {
            tree = Expr::add(tree, Expr::constant(i));
        }
        let text = DebugFormatter::new().with_recursion_limit(4).format(&tree);
        assert!(text.contains("<error: Recursion limit exceeded"));
        assert!(text.ends_with(" + 9)"));
    }
}
