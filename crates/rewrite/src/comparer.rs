// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Structural comparison
//!
//! [`ExpressionComparer`] decides whether two trees are equivalent up to a
//! consistent renaming of lambda parameters and table aliases.
//!
//! ## Scopes
//!
//! Two maps from left-hand identities to right-hand identities are carried
//! through the recursion. They grow when a binding construct is entered and
//! shrink again when it is left:
//!
//! - a lambda maps its parameters positionally;
//! - a select maps the aliases declared by its `from` clause (see
//!   [`declared_aliases`]) before comparing anything that may reference them;
//! - an apply join maps the aliases of its left side before comparing the
//!   right side; other joins map both sides only for the condition;
//! - a projection maps its select's alias before comparing the projector.
//!
//! An identity without a mapping only matches itself.
//!
//! ## Constants
//!
//! Literal values go through a caller-suppliable equality, ordinary `==`
//! by default.

use std::sync::Arc;

use relq_ir::{
    ColumnAssignment, ColumnDeclaration, Expr, ExprRef, OrderExpression, ParameterId, TableAlias,
    Value,
};

use crate::gather::declared_aliases;

type ValueEq<'a> = dyn Fn(&Value, &Value) -> bool + 'a;

/// Equivalence test with scoped identity maps
pub struct ExpressionComparer<'a> {
    parameters: Vec<(ParameterId, ParameterId)>,
    aliases: Vec<(TableAlias, TableAlias)>,
    value_eq: Option<Box<ValueEq<'a>>>,
}

impl Default for ExpressionComparer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `a` and `b` are equivalent with no pre-seeded identity maps
pub fn equivalent(a: &ExprRef, b: &ExprRef) -> bool {
    ExpressionComparer::new().equivalent(a, b)
}

impl<'a> ExpressionComparer<'a> {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
            aliases: Vec::new(),
            value_eq: None,
        }
    }

    /// Builder method: decide literal equality with `value_eq`
    pub fn with_value_eq(mut self, value_eq: impl Fn(&Value, &Value) -> bool + 'a) -> Self {
        self.value_eq = Some(Box::new(value_eq));
        self
    }

    /// Builder method: treat each left parameter as its paired right parameter
    pub fn with_parameter_map(
        mut self,
        pairs: impl IntoIterator<Item = (ParameterId, ParameterId)>,
    ) -> Self {
        self.parameters.extend(pairs);
        self
    }

    /// Builder method: treat each left alias as its paired right alias
    pub fn with_alias_map(
        mut self,
        pairs: impl IntoIterator<Item = (TableAlias, TableAlias)>,
    ) -> Self {
        self.aliases.extend(pairs);
        self
    }

    pub fn equivalent(&mut self, a: &ExprRef, b: &ExprRef) -> bool {
        self.compare(a, b)
    }

    fn compare(&mut self, a: &ExprRef, b: &ExprRef) -> bool {
        if Arc::ptr_eq(a, b) {
            return true;
        }
        if a.kind() != b.kind() || a.ty() != b.ty() {
            return false;
        }
        match (a.as_ref(), b.as_ref()) {
            (Expr::Constant(a), Expr::Constant(b)) => self.values_equal(&a.value, &b.value),
            (Expr::Parameter(a), Expr::Parameter(b)) => self.parameter_matches(a.id, b.id),
            (Expr::Binary(a), Expr::Binary(b)) => {
                a.op == b.op && self.compare(&a.left, &b.left) && self.compare(&a.right, &b.right)
            }
            (Expr::Unary(a), Expr::Unary(b)) => {
                a.op == b.op && self.compare(&a.operand, &b.operand)
            }
            (Expr::Conditional(a), Expr::Conditional(b)) => {
                self.compare(&a.test, &b.test)
                    && self.compare(&a.if_true, &b.if_true)
                    && self.compare(&a.if_false, &b.if_false)
            }
            (Expr::Call(a), Expr::Call(b)) => {
                a.method == b.method
                    && self.compare_opt(&a.object, &b.object)
                    && self.compare_list(&a.args, &b.args)
            }
            (Expr::Member(a), Expr::Member(b)) => {
                a.member == b.member && self.compare_opt(&a.object, &b.object)
            }
            (Expr::Lambda(a), Expr::Lambda(b)) => {
                if a.params.len() != b.params.len()
                    || a.params.iter().zip(&b.params).any(|(pa, pb)| pa.ty != pb.ty)
                {
                    return false;
                }
                let mark = self.parameters.len();
                self.parameters
                    .extend(a.params.iter().zip(&b.params).map(|(pa, pb)| (pa.id, pb.id)));
                let result = self.compare(&a.body, &b.body);
                self.parameters.truncate(mark);
                result
            }
            (Expr::Invoke(a), Expr::Invoke(b)) => {
                self.compare(&a.target, &b.target) && self.compare_list(&a.args, &b.args)
            }
            (Expr::New(a), Expr::New(b)) => {
                a.type_name == b.type_name
                    && a.members == b.members
                    && self.compare_list(&a.args, &b.args)
            }
            (Expr::NewArray(a), Expr::NewArray(b)) => self.compare_list(&a.elements, &b.elements),
            (Expr::Index(a), Expr::Index(b)) => {
                self.compare(&a.array, &b.array) && self.compare(&a.index, &b.index)
            }

            (Expr::Table(a), Expr::Table(b)) => a.name == b.name,
            (Expr::Column(a), Expr::Column(b)) => {
                self.alias_matches(a.alias, b.alias) && a.name == b.name
            }
            (Expr::Select(a), Expr::Select(b)) => {
                if !self.compare_opt(&a.from, &b.from) {
                    return false;
                }
                let mark = self.aliases.len();
                if let (Some(fa), Some(fb)) = (&a.from, &b.from) {
                    self.map_aliases(fa, fb);
                }
                let result = self.compare_opt(&a.where_clause, &b.where_clause)
                    && self.compare_orderings(&a.order_by, &b.order_by)
                    && self.compare_list(&a.group_by, &b.group_by)
                    && self.compare_opt(&a.skip, &b.skip)
                    && self.compare_opt(&a.take, &b.take)
                    && a.distinct == b.distinct
                    && a.reverse == b.reverse
                    && self.compare_declarations(&a.columns, &b.columns);
                self.aliases.truncate(mark);
                result
            }
            (Expr::Join(a), Expr::Join(b)) => {
                if a.join_type != b.join_type || !self.compare(&a.left, &b.left) {
                    return false;
                }
                let mark = self.aliases.len();
                let result = if a.join_type.is_apply() {
                    self.map_aliases(&a.left, &b.left);
                    if self.compare(&a.right, &b.right) {
                        self.map_aliases(&a.right, &b.right);
                        self.compare_opt(&a.condition, &b.condition)
                    } else {
                        false
                    }
                } else if self.compare(&a.right, &b.right) {
                    self.map_aliases(&a.left, &b.left);
                    self.map_aliases(&a.right, &b.right);
                    self.compare_opt(&a.condition, &b.condition)
                } else {
                    false
                };
                self.aliases.truncate(mark);
                result
            }
            (Expr::Projection(a), Expr::Projection(b)) => {
                if a.is_singleton != b.is_singleton || !self.compare(&a.select, &b.select) {
                    return false;
                }
                let mark = self.aliases.len();
                if let (Some(sa), Some(sb)) = (a.select_expr(), b.select_expr()) {
                    self.aliases.push((sa.alias, sb.alias));
                }
                let result = self.compare(&a.projector, &b.projector)
                    && self.compare_opt(&a.aggregator, &b.aggregator);
                self.aliases.truncate(mark);
                result
            }
            (Expr::ClientJoin(a), Expr::ClientJoin(b)) => {
                if !self.compare(&a.projection, &b.projection)
                    || !self.compare_list(&a.outer_key, &b.outer_key)
                {
                    return false;
                }
                let mark = self.aliases.len();
                if let (Some(pa), Some(pb)) =
                    (a.projection.as_projection(), b.projection.as_projection())
                {
                    self.map_aliases(&pa.select, &pb.select);
                }
                let result = self.compare_list(&a.inner_key, &b.inner_key);
                self.aliases.truncate(mark);
                result
            }
            (Expr::Entity(a), Expr::Entity(b)) => {
                a.entity == b.entity && self.compare(&a.expr, &b.expr)
            }
            (Expr::Aggregate(a), Expr::Aggregate(b)) => {
                a.name == b.name
                    && a.distinct == b.distinct
                    && self.compare_opt(&a.argument, &b.argument)
            }
            (Expr::AggregateSubquery(a), Expr::AggregateSubquery(b)) => {
                self.alias_matches(a.group_by_alias, b.group_by_alias)
                    && self.compare(&a.aggregate_in_group_select, &b.aggregate_in_group_select)
                    && self.compare(&a.aggregate_as_subquery, &b.aggregate_as_subquery)
            }
            (Expr::ScalarSubquery(a), Expr::ScalarSubquery(b)) => {
                self.compare(&a.select, &b.select)
            }
            (Expr::Exists(a), Expr::Exists(b)) => self.compare(&a.select, &b.select),
            (Expr::InSubquery(a), Expr::InSubquery(b)) => {
                self.compare(&a.expr, &b.expr) && self.compare(&a.select, &b.select)
            }
            (Expr::InValues(a), Expr::InValues(b)) => {
                self.compare(&a.expr, &b.expr) && self.compare_list(&a.values, &b.values)
            }
            (Expr::IsNull(a), Expr::IsNull(b)) => self.compare(&a.expr, &b.expr),
            (Expr::Between(a), Expr::Between(b)) => {
                self.compare(&a.expr, &b.expr)
                    && self.compare(&a.lower, &b.lower)
                    && self.compare(&a.upper, &b.upper)
            }
            (Expr::RowNumber(a), Expr::RowNumber(b)) => {
                self.compare_orderings(&a.order_by, &b.order_by)
            }
            (Expr::NamedValue(a), Expr::NamedValue(b)) => {
                a.name == b.name && self.compare(&a.value, &b.value)
            }
            (Expr::OuterJoined(a), Expr::OuterJoined(b)) => {
                self.compare(&a.test, &b.test) && self.compare(&a.expr, &b.expr)
            }
            (Expr::Function(a), Expr::Function(b)) => {
                a.name == b.name && self.compare_list(&a.args, &b.args)
            }

            (Expr::Insert(a), Expr::Insert(b)) => {
                if !self.compare(&a.table, &b.table) {
                    return false;
                }
                let mark = self.aliases.len();
                self.map_aliases(&a.table, &b.table);
                let result = self.compare_assignments(&a.assignments, &b.assignments);
                self.aliases.truncate(mark);
                result
            }
            (Expr::Update(a), Expr::Update(b)) => {
                if !self.compare(&a.table, &b.table) {
                    return false;
                }
                let mark = self.aliases.len();
                self.map_aliases(&a.table, &b.table);
                let result = self.compare_opt(&a.where_clause, &b.where_clause)
                    && self.compare_assignments(&a.assignments, &b.assignments);
                self.aliases.truncate(mark);
                result
            }
            (Expr::Delete(a), Expr::Delete(b)) => {
                if !self.compare(&a.table, &b.table) {
                    return false;
                }
                let mark = self.aliases.len();
                self.map_aliases(&a.table, &b.table);
                let result = self.compare_opt(&a.where_clause, &b.where_clause);
                self.aliases.truncate(mark);
                result
            }
            (Expr::Batch(a), Expr::Batch(b)) => {
                self.compare(&a.input, &b.input)
                    && self.compare(&a.operation, &b.operation)
                    && self.compare(&a.batch_size, &b.batch_size)
                    && self.compare(&a.stream, &b.stream)
            }
            (Expr::Block(a), Expr::Block(b)) => self.compare_list(&a.commands, &b.commands),
            (Expr::If(a), Expr::If(b)) => {
                self.compare(&a.check, &b.check)
                    && self.compare(&a.if_true, &b.if_true)
                    && self.compare_opt(&a.if_false, &b.if_false)
            }
            (Expr::Declaration(a), Expr::Declaration(b)) => {
                a.variables.len() == b.variables.len()
                    && a.variables.iter().zip(&b.variables).all(|(va, vb)| {
                        va.name == vb.name
                            && va.query_type == vb.query_type
                            && self.compare(&va.expression, &vb.expression)
                    })
                    && self.compare_opt(&a.source, &b.source)
            }
            (Expr::Variable(a), Expr::Variable(b)) => a.name == b.name,
            _ => false,
        }
    }

    fn compare_opt(&mut self, a: &Option<ExprRef>, b: &Option<ExprRef>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => self.compare(a, b),
            _ => false,
        }
    }

    fn compare_list(&mut self, a: &[ExprRef], b: &[ExprRef]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(a, b)| self.compare(a, b))
    }

    fn compare_orderings(&mut self, a: &[OrderExpression], b: &[OrderExpression]) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b)
                .all(|(a, b)| a.order_type == b.order_type && self.compare(&a.expr, &b.expr))
    }

    fn compare_declarations(&mut self, a: &[ColumnDeclaration], b: &[ColumnDeclaration]) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b)
                .all(|(a, b)| a.name == b.name && self.compare(&a.expr, &b.expr))
    }

    fn compare_assignments(&mut self, a: &[ColumnAssignment], b: &[ColumnAssignment]) -> bool {
        a.len() == b.len()
            && a.iter().zip(b).all(|(a, b)| {
                self.compare(&a.column, &b.column) && self.compare(&a.expression, &b.expression)
            })
    }

    fn values_equal(&self, a: &Value, b: &Value) -> bool {
        match &self.value_eq {
            Some(value_eq) => value_eq(a, b),
            None => a == b,
        }
    }

    fn parameter_matches(&self, a: ParameterId, b: ParameterId) -> bool {
        match self.parameters.iter().rev().find(|(from, _)| *from == a) {
            Some((_, mapped)) => *mapped == b,
            None => a == b,
        }
    }

    fn alias_matches(&self, a: TableAlias, b: TableAlias) -> bool {
        match self.aliases.iter().rev().find(|(from, _)| *from == a) {
            Some((_, mapped)) => *mapped == b,
            None => a == b,
        }
    }

    fn map_aliases(&mut self, a: &ExprRef, b: &ExprRef) {
        let declared_a = declared_aliases(a);
        let declared_b = declared_aliases(b);
        self.aliases.extend(declared_a.into_iter().zip(declared_b));
    }
}
