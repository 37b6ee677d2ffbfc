// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQL formatter
//!
//! Renders a finished command tree (no client projections, no lambda
//! parameters) as dialect-neutral SQL. Anything without a SQL form is an
//! error rather than a best effort.
//!
//! Boolean expressions are rendered in one of two contexts. A `WHERE`, `ON`
//! or `CASE WHEN` position needs a predicate, so a plain boolean value is
//! compared against `TRUE`. A column or operand position needs a value, so a
//! predicate is wrapped in `CASE WHEN p THEN TRUE ELSE FALSE END`.

use relq_ir::{
    BinaryExpr, BinaryOp, ColumnAssignment, DefaultTypeSystem, Expr, ExprKind, ExprRef, JoinExpr,
    OrderExpression, OrderType, SelectExpr, Type, TypeSystem, UnaryOp, Value,
};
use relq_rewrite::{DEFAULT_RECURSION_LIMIT, RecursionGuard};
use tracing::{debug, instrument};

use crate::error::{FormatError, FormatResult};
use crate::options::FormatOptions;
use crate::writer::TextWriter;

/// Formatter for finished command trees
#[derive(Debug, Clone)]
pub struct SqlFormatter {
    options: FormatOptions,
    recursion_limit: usize,
}

impl Default for SqlFormatter {
    fn default() -> Self {
        Self::new(FormatOptions::default())
    }
}

impl SqlFormatter {
    pub fn new(options: FormatOptions) -> Self {
        Self {
            options,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn format(&self, expr: &ExprRef) -> FormatResult<String> {
        let mut w = TextWriter::new(self.options.clone());
        let mut sql = SqlWriter {
            guard: RecursionGuard::with_limit(self.recursion_limit),
            types: DefaultTypeSystem,
        };
        match expr.as_ref() {
            Expr::Select(select) => sql.select(&mut w, select)?,
            _ => sql.statement(&mut w, expr)?,
        }
        Ok(w.finish())
    }
}

/// Render `expr` as SQL with the default options
#[instrument(skip_all, fields(kind = %expr.kind()))]
pub fn format_sql(expr: &ExprRef) -> FormatResult<String> {
    let result = SqlFormatter::default().format(expr);
    if let Err(err) = &result {
        debug!(error = %err, "SQL rendering failed");
    }
    result
}

struct SqlWriter {
    guard: RecursionGuard,
    types: DefaultTypeSystem,
}

impl SqlWriter {
    fn statement(&mut self, w: &mut TextWriter, node: &ExprRef) -> FormatResult<()> {
        self.guard.enter()?;
        let result = match node.as_ref() {
            Expr::Select(select) => self.select(w, select),
            Expr::Insert(_) | Expr::Update(_) | Expr::Delete(_) => {
                w.scoped(|w| self.command(w, node))
            }
            Expr::Block(block) => {
                let mut result = Ok(());
                for (i, command) in block.commands.iter().enumerate() {
                    if i > 0 {
                        w.newline();
                    }
                    result = self.statement(w, command);
                    if result.is_err() {
                        break;
                    }
                    w.write_str(";");
                }
                result
            }
            _ => self.value(w, node),
        };
        self.guard.exit();
        result
    }

    /// Render `node` where SQL expects a value
    fn value(&mut self, w: &mut TextWriter, node: &ExprRef) -> FormatResult<()> {
        if node.is_predicate() {
            w.write_str("CASE WHEN ");
            self.expr(w, node)?;
            w.write_str(" THEN TRUE ELSE FALSE END");
            return Ok(());
        }
        self.expr(w, node)
    }

    /// Render `node` where SQL expects a search condition
    fn predicate(&mut self, w: &mut TextWriter, node: &ExprRef) -> FormatResult<()> {
        if node.is_predicate() {
            return self.expr(w, node);
        }
        match node.as_constant() {
            Some(Value::Bool(true)) => {
                w.write_str("1 = 1");
                Ok(())
            }
            Some(Value::Bool(false)) => {
                w.write_str("1 = 0");
                Ok(())
            }
            _ => {
                w.write_str("(");
                self.expr(w, node)?;
                w.write_str(" = TRUE)");
                Ok(())
            }
        }
    }

    fn values(&mut self, w: &mut TextWriter, nodes: &[ExprRef]) -> FormatResult<()> {
        for (i, node) in nodes.iter().enumerate() {
            if i > 0 {
                w.write_str(", ");
            }
            self.value(w, node)?;
        }
        Ok(())
    }

    fn expr(&mut self, w: &mut TextWriter, node: &ExprRef) -> FormatResult<()> {
        self.guard.enter()?;
        let result = self.node(w, node);
        self.guard.exit();
        result
    }

    fn node(&mut self, w: &mut TextWriter, node: &ExprRef) -> FormatResult<()> {
        match node.as_ref() {
            Expr::Constant(constant) => write_literal(w, &constant.value, &constant.ty)?,
            Expr::Binary(binary) => self.binary(w, binary)?,
            Expr::Unary(unary) => match unary.op {
                UnaryOp::Negate => {
                    w.write_str("-");
                    self.value(w, &unary.operand)?;
                }
                UnaryOp::Not if unary.ty.is_bool() => {
                    w.write_str("NOT ");
                    self.predicate(w, &unary.operand)?;
                }
                UnaryOp::Not => {
                    w.write_str("~");
                    self.value(w, &unary.operand)?;
                }
                UnaryOp::Convert => {
                    w.write_str("CAST(");
                    self.value(w, &unary.operand)?;
                    let query_type = self.types.column_type(&unary.ty);
                    write!(w, " AS {})", query_type.data_type);
                }
                UnaryOp::Quote | UnaryOp::ArrayLength => return Err(unsupported(node)),
            },
            Expr::Conditional(conditional) => {
                w.write_str("CASE WHEN ");
                self.predicate(w, &conditional.test)?;
                w.write_str(" THEN ");
                self.value(w, &conditional.if_true)?;
                w.write_str(" ELSE ");
                self.value(w, &conditional.if_false)?;
                w.write_str(" END");
            }
            Expr::Column(column) => {
                let alias = w.reference(column.alias);
                write!(w, "{}.{}", alias, quote_identifier(&column.name));
            }
            Expr::Select(select) => self.subquery(w, select)?,
            Expr::Entity(entity) => self.expr(w, &entity.expr)?,
            Expr::Aggregate(aggregate) => {
                write!(w, "{}(", aggregate.name);
                match &aggregate.argument {
                    Some(argument) => {
                        if aggregate.distinct {
                            w.write_str("DISTINCT ");
                        }
                        self.value(w, argument)?;
                    }
                    None => w.write_str("*"),
                }
                w.write_str(")");
            }
            Expr::AggregateSubquery(aggregate) => self.expr(w, &aggregate.aggregate_as_subquery)?,
            Expr::ScalarSubquery(subquery) => self.subquery_node(w, &subquery.select)?,
            Expr::Exists(exists) => {
                w.write_str("EXISTS");
                self.subquery_node(w, &exists.select)?;
            }
            Expr::InSubquery(in_subquery) => {
                w.write_str("(");
                self.value(w, &in_subquery.expr)?;
                w.write_str(" IN ");
                self.subquery_node(w, &in_subquery.select)?;
                w.write_str(")");
            }
            Expr::InValues(in_values) => {
                if in_values.values.is_empty() {
                    w.write_str("1 = 0");
                } else {
                    w.write_str("(");
                    self.value(w, &in_values.expr)?;
                    w.write_str(" IN (");
                    self.values(w, &in_values.values)?;
                    w.write_str("))");
                }
            }
            Expr::IsNull(is_null) => {
                w.write_str("(");
                self.value(w, &is_null.expr)?;
                w.write_str(" IS NULL)");
            }
            Expr::Between(between) => {
                w.write_str("(");
                self.value(w, &between.expr)?;
                w.write_str(" BETWEEN ");
                self.value(w, &between.lower)?;
                w.write_str(" AND ");
                self.value(w, &between.upper)?;
                w.write_str(")");
            }
            Expr::RowNumber(row_number) => {
                w.write_str("ROW_NUMBER() OVER (ORDER BY ");
                if row_number.order_by.is_empty() {
                    w.write_str("(SELECT 1)");
                } else {
                    self.orderings(w, &row_number.order_by, false)?;
                }
                w.write_str(")");
            }
            Expr::NamedValue(named) => write!(w, "@{}", named.name),
            Expr::Variable(variable) => write!(w, "@{}", variable.name),
            Expr::OuterJoined(outer) => self.expr(w, &outer.expr)?,
            Expr::Function(function) => {
                write!(w, "{}(", function.name);
                self.values(w, &function.args)?;
                w.write_str(")");
            }
            Expr::Insert(_) | Expr::Update(_) | Expr::Delete(_) | Expr::Block(_) => {
                self.statement(w, node)?
            }

            Expr::Parameter(_)
            | Expr::Call(_)
            | Expr::Member(_)
            | Expr::Lambda(_)
            | Expr::Invoke(_)
            | Expr::New(_)
            | Expr::NewArray(_)
            | Expr::Index(_)
            | Expr::Table(_)
            | Expr::Join(_)
            | Expr::Projection(_)
            | Expr::ClientJoin(_)
            | Expr::Batch(_)
            | Expr::If(_)
            | Expr::Declaration(_) => return Err(unsupported(node)),
        }
        Ok(())
    }

    fn binary(&mut self, w: &mut TextWriter, binary: &BinaryExpr) -> FormatResult<()> {
        let logical = binary.op.is_logical()
            || (matches!(binary.op, BinaryOp::And | BinaryOp::Or) && binary.ty.is_bool());
        if logical {
            let keyword = match binary.op {
                BinaryOp::AndAlso | BinaryOp::And => "AND",
                _ => "OR",
            };
            w.write_str("(");
            self.predicate(w, &binary.left)?;
            write!(w, " {} ", keyword);
            self.predicate(w, &binary.right)?;
            w.write_str(")");
            return Ok(());
        }

        if matches!(binary.op, BinaryOp::Equal | BinaryOp::NotEqual) {
            let null_operand = if is_null_constant(&binary.right) {
                Some(&binary.left)
            } else if is_null_constant(&binary.left) {
                Some(&binary.right)
            } else {
                None
            };
            if let Some(operand) = null_operand {
                w.write_str("(");
                self.value(w, operand)?;
                match binary.op {
                    BinaryOp::Equal => w.write_str(" IS NULL)"),
                    _ => w.write_str(" IS NOT NULL)"),
                }
                return Ok(());
            }
        }

        let function = match binary.op {
            BinaryOp::Modulo => Some("MOD"),
            BinaryOp::Power => Some("POWER"),
            BinaryOp::Coalesce => Some("COALESCE"),
            _ => None,
        };
        if let Some(function) = function {
            write!(w, "{}(", function);
            self.value(w, &binary.left)?;
            w.write_str(", ");
            self.value(w, &binary.right)?;
            w.write_str(")");
            return Ok(());
        }

        let operator = match binary.op {
            BinaryOp::Add if binary.ty.non_nullable() == &Type::String => "||",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::ExclusiveOr => "^",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "<>",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            _ => {
                return Err(FormatError::Unsupported {
                    kind: ExprKind::Binary,
                });
            }
        };
        w.write_str("(");
        self.value(w, &binary.left)?;
        write!(w, " {} ", operator);
        self.value(w, &binary.right)?;
        w.write_str(")");
        Ok(())
    }

    fn select(&mut self, w: &mut TextWriter, select: &SelectExpr) -> FormatResult<()> {
        w.scoped(|w| -> FormatResult<()> {
            let from = match &select.from {
                Some(from) => {
                    let (result, text) = w.buffered(|w| {
                        w.write_str("FROM ");
                        self.source(w, from)
                    });
                    result?;
                    Some(text)
                }
                None => None,
            };
            w.write_str("SELECT ");
            if select.distinct {
                w.write_str("DISTINCT ");
            }
            if select.columns.is_empty() {
                w.write_str("NULL");
            }
            for (i, decl) in select.columns.iter().enumerate() {
                if !is_scalar(decl.expr.kind()) {
                    return Err(FormatError::NonScalarProjection {
                        name: decl.name.clone(),
                        kind: decl.expr.kind(),
                    });
                }
                if i > 0 {
                    w.write_str(", ");
                }
                self.value(w, &decl.expr)?;
                let same_name = decl.expr.as_column().is_some_and(|c| c.name == decl.name);
                if !same_name {
                    write!(w, " AS {}", quote_identifier(&decl.name));
                }
            }
            if let Some(from) = from {
                w.newline();
                w.splice(&from);
            }
            if let Some(predicate) = &select.where_clause {
                w.newline();
                w.write_str("WHERE ");
                self.predicate(w, predicate)?;
            }
            if !select.group_by.is_empty() {
                w.newline();
                w.write_str("GROUP BY ");
                self.values(w, &select.group_by)?;
            }
            if !select.order_by.is_empty() {
                w.newline();
                w.write_str("ORDER BY ");
                self.orderings(w, &select.order_by, select.reverse)?;
            }
            match (&select.skip, &select.take) {
                (Some(skip), take) => {
                    w.newline();
                    w.write_str("OFFSET ");
                    self.value(w, skip)?;
                    w.write_str(" ROWS");
                    if let Some(take) = take {
                        w.write_str(" FETCH NEXT ");
                        self.value(w, take)?;
                        w.write_str(" ROWS ONLY");
                    }
                }
                (None, Some(take)) => {
                    w.newline();
                    w.write_str("FETCH FIRST ");
                    self.value(w, take)?;
                    w.write_str(" ROWS ONLY");
                }
                (None, None) => {}
            }
            Ok(())
        })
    }

    fn orderings(
        &mut self,
        w: &mut TextWriter,
        orderings: &[OrderExpression],
        reverse: bool,
    ) -> FormatResult<()> {
        for (i, ordering) in orderings.iter().enumerate() {
            if i > 0 {
                w.write_str(", ");
            }
            self.value(w, &ordering.expr)?;
            let descending = (ordering.order_type == OrderType::Descending) != reverse;
            if descending {
                w.write_str(" DESC");
            }
        }
        Ok(())
    }

    fn source(&mut self, w: &mut TextWriter, node: &ExprRef) -> FormatResult<()> {
        self.guard.enter()?;
        let result = match node.as_ref() {
            Expr::Table(table) => {
                let name = w.declare(table.alias);
                write!(w, "{} AS {}", quote_identifier(&table.name), name);
                Ok(())
            }
            Expr::Select(select) => self.subquery(w, select).map(|()| {
                let name = w.declare(select.alias);
                write!(w, " AS {}", name);
            }),
            Expr::Join(join) => self.join(w, join),
            _ => Err(unsupported(node)),
        };
        self.guard.exit();
        result
    }

    fn join(&mut self, w: &mut TextWriter, join: &JoinExpr) -> FormatResult<()> {
        let (result, left) = w.capture(|w| self.source(w, &join.left));
        result?;
        w.newline();
        write!(w, "{} ", join.join_type);
        let (result, right) = w.capture(|w| {
            if join.join_type.is_apply() {
                w.bring_into_scope(&left);
            }
            self.source(w, &join.right)
        });
        result?;
        w.bring_into_scope(&left);
        w.bring_into_scope(&right);
        if let Some(condition) = &join.condition {
            w.write_str(" ON ");
            self.predicate(w, condition)?;
        }
        Ok(())
    }

    fn subquery_node(&mut self, w: &mut TextWriter, node: &ExprRef) -> FormatResult<()> {
        match node.as_select() {
            Some(select) => self.subquery(w, select),
            None => Err(unsupported(node)),
        }
    }

    /// A parenthesized select, without its alias
    fn subquery(&mut self, w: &mut TextWriter, select: &SelectExpr) -> FormatResult<()> {
        w.write_str("(");
        w.indented(|w| {
            w.newline();
            self.select(w, select)
        })?;
        w.newline();
        w.write_str(")");
        Ok(())
    }

    fn command(&mut self, w: &mut TextWriter, node: &ExprRef) -> FormatResult<()> {
        match node.as_ref() {
            Expr::Insert(insert) => {
                let Expr::Table(table) = insert.table.as_ref() else {
                    return Err(unsupported(&insert.table));
                };
                write!(w, "INSERT INTO {} (", quote_identifier(&table.name));
                for (i, assignment) in insert.assignments.iter().enumerate() {
                    if i > 0 {
                        w.write_str(", ");
                    }
                    self.assignment_target(w, assignment)?;
                }
                w.write_str(")");
                w.newline();
                w.write_str("VALUES (");
                for (i, assignment) in insert.assignments.iter().enumerate() {
                    if i > 0 {
                        w.write_str(", ");
                    }
                    self.value(w, &assignment.expression)?;
                }
                w.write_str(")");
            }
            Expr::Update(update) => {
                w.write_str("UPDATE ");
                self.source(w, &update.table)?;
                w.newline();
                w.write_str("SET ");
                for (i, assignment) in update.assignments.iter().enumerate() {
                    if i > 0 {
                        w.write_str(", ");
                    }
                    self.assignment_target(w, assignment)?;
                    w.write_str(" = ");
                    self.value(w, &assignment.expression)?;
                }
                if let Some(predicate) = &update.where_clause {
                    w.newline();
                    w.write_str("WHERE ");
                    self.predicate(w, predicate)?;
                }
            }
            Expr::Delete(delete) => {
                w.write_str("DELETE FROM ");
                self.source(w, &delete.table)?;
                if let Some(predicate) = &delete.where_clause {
                    w.newline();
                    w.write_str("WHERE ");
                    self.predicate(w, predicate)?;
                }
            }
            _ => return Err(unsupported(node)),
        }
        Ok(())
    }

    fn assignment_target(
        &mut self,
        w: &mut TextWriter,
        assignment: &ColumnAssignment,
    ) -> FormatResult<()> {
        match assignment.column.as_column() {
            Some(column) => {
                w.write_str(&quote_identifier(&column.name));
                Ok(())
            }
            None => Err(unsupported(&assignment.column)),
        }
    }
}

fn unsupported(node: &ExprRef) -> FormatError {
    FormatError::Unsupported { kind: node.kind() }
}

fn is_null_constant(node: &ExprRef) -> bool {
    node.as_constant().is_some_and(Value::is_null)
}

/// Whether a node of this kind can stand in a select column
fn is_scalar(kind: ExprKind) -> bool {
    !matches!(
        kind,
        ExprKind::Select
            | ExprKind::Table
            | ExprKind::Join
            | ExprKind::Projection
            | ExprKind::ClientJoin
            | ExprKind::Lambda
    ) && !kind.is_command()
}

/// Quote `name` with double quotes unless it is a plain identifier
fn quote_identifier(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        return name.to_string();
    }
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn write_literal(w: &mut TextWriter, value: &Value, ty: &Type) -> FormatResult<()> {
    match value {
        Value::Null => w.write_str("NULL"),
        Value::Bool(true) => w.write_str("TRUE"),
        Value::Bool(false) => w.write_str("FALSE"),
        Value::Int32(v) => write!(w, "{}", v),
        Value::Int64(v) => write!(w, "{}", v),
        Value::Float64(v) if v.is_finite() => write!(w, "{:?}", v),
        Value::String(s) => write!(w, "'{}'", s.replace('\'', "''")),
        Value::Bytes(bytes) => {
            w.write_str("X'");
            for b in bytes {
                write!(w, "{:02X}", b);
            }
            w.write_str("'");
        }
        Value::Float64(_) | Value::Sequence(_) | Value::Record(_) => {
            return Err(FormatError::UnrepresentableLiteral {
                type_name: ty.to_string(),
            });
        }
    }
    Ok(())
}
