// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Relational extension
//!
//! Node payloads describing what the database executes, and the boundary
//! nodes that hand rows back to the client.
//!
//! ## Scoping
//!
//! Every row source is named by a [`TableAlias`]. [`TableExpr`] and
//! [`SelectExpr`] *declare* an alias; [`ColumnExpr`] *references* one. A
//! column is only meaningful inside a subtree where its alias is declared by
//! an enclosing select's `from` clause.
//!
//! Join sides are independent scopes, except for [`JoinType::CrossApply`] and
//! [`JoinType::OuterApply`], whose right side may reference aliases declared
//! by the left side (a correlated subquery).
//!
//! ```text
//! Select A2 (c0 = A1.Name)
//! └── from: Join(CrossApply)
//!     ├── Table A1 customers
//!     └── Select A3 ... where A3.CustomerId == A1.Id
//! ```
//!
//! ## Client boundary
//!
//! [`ProjectionExpr`] pairs a server-side select with a client-side
//! projector (one row to one value) and an optional aggregator (all values
//! to the final result). [`ClientJoinExpr`] defers a correlation to the
//! client.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::alias::TableAlias;
use crate::expr::{ExprRef, IntoExpr, same, same_list, same_opt};
use crate::metadata::{MappingEntity, QueryType};
use crate::types::Type;

/// Physical table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableExpr {
    pub alias: TableAlias,
    pub entity: MappingEntity,
    pub name: String,
}

impl TableExpr {
    pub fn new(alias: TableAlias, entity: MappingEntity, name: impl Into<String>) -> Self {
        Self {
            alias,
            entity,
            name: name.into(),
        }
    }
}

/// Reference to a named column of an aliased row source
///
/// Equality and hashing consider only `(alias, name)`: two references to the
/// same column are interchangeable regardless of the type metadata they
/// carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnExpr {
    pub alias: TableAlias,
    pub name: String,
    pub query_type: QueryType,
    pub ty: Type,
}

impl ColumnExpr {
    pub fn new(
        alias: TableAlias,
        name: impl Into<String>,
        query_type: QueryType,
        ty: Type,
    ) -> Self {
        Self {
            alias,
            name: name.into(),
            query_type,
            ty,
        }
    }
}

impl PartialEq for ColumnExpr {
    fn eq(&self, other: &Self) -> bool {
        self.alias == other.alias && self.name == other.name
    }
}

impl Eq for ColumnExpr {}

impl Hash for ColumnExpr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.alias.hash(state);
        self.name.hash(state);
    }
}

/// A named output column of a select
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDeclaration {
    pub name: String,
    pub expr: ExprRef,
    pub query_type: QueryType,
}

impl ColumnDeclaration {
    pub fn new(name: impl Into<String>, expr: ExprRef, query_type: QueryType) -> Self {
        Self {
            name: name.into(),
            expr,
            query_type,
        }
    }

    /// Same declaration over a different expression
    pub fn with_expr(&self, expr: ExprRef) -> Self {
        Self {
            name: self.name.clone(),
            expr,
            query_type: self.query_type.clone(),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderType {
    #[default]
    Ascending,
    Descending,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Ascending => write!(f, "ASC"),
            OrderType::Descending => write!(f, "DESC"),
        }
    }
}

/// One `ORDER BY` term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderExpression {
    pub order_type: OrderType,
    pub expr: ExprRef,
}

impl OrderExpression {
    pub fn new(order_type: OrderType, expr: ExprRef) -> Self {
        Self { order_type, expr }
    }

    pub fn with_expr(&self, expr: ExprRef) -> Self {
        Self {
            order_type: self.order_type,
            expr,
        }
    }
}

/// A `SELECT` over an optional source
///
/// Column names are unique within one select. `from` is `None` only for a
/// select without a source (a constant projection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectExpr {
    pub alias: TableAlias,
    pub columns: Vec<ColumnDeclaration>,
    pub from: Option<ExprRef>,
    pub where_clause: Option<ExprRef>,
    pub order_by: Vec<OrderExpression>,
    pub group_by: Vec<ExprRef>,
    pub skip: Option<ExprRef>,
    pub take: Option<ExprRef>,
    pub distinct: bool,
    pub reverse: bool,
}

impl SelectExpr {
    pub fn new(alias: TableAlias, columns: Vec<ColumnDeclaration>, from: Option<ExprRef>) -> Self {
        Self {
            alias,
            columns,
            from,
            where_clause: None,
            order_by: Vec::new(),
            group_by: Vec::new(),
            skip: None,
            take: None,
            distinct: false,
            reverse: false,
        }
    }

    /// Builder method: set the `WHERE` predicate
    pub fn with_where(mut self, predicate: ExprRef) -> Self {
        self.where_clause = Some(predicate);
        self
    }

    /// Builder method: set the `ORDER BY` list
    pub fn with_order_by(mut self, order_by: Vec<OrderExpression>) -> Self {
        self.order_by = order_by;
        self
    }

    /// Builder method: set the `GROUP BY` list
    pub fn with_group_by(mut self, group_by: Vec<ExprRef>) -> Self {
        self.group_by = group_by;
        self
    }

    pub fn with_skip(mut self, skip: ExprRef) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn with_take(mut self, take: ExprRef) -> Self {
        self.take = Some(take);
        self
    }

    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Find a column declaration by name
    pub fn column(&self, name: &str) -> Option<&ColumnDeclaration> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Whether `rebuilt` holds exactly the same child references and flags
    fn shares_children_with(&self, rebuilt: &SelectExpr) -> bool {
        self.alias == rebuilt.alias
            && self.distinct == rebuilt.distinct
            && self.reverse == rebuilt.reverse
            && same_opt(&self.from, &rebuilt.from)
            && same_opt(&self.where_clause, &rebuilt.where_clause)
            && same_opt(&self.skip, &rebuilt.skip)
            && same_opt(&self.take, &rebuilt.take)
            && same_list(&self.group_by, &rebuilt.group_by)
            && self.order_by.len() == rebuilt.order_by.len()
            && self
                .order_by
                .iter()
                .zip(&rebuilt.order_by)
                .all(|(a, b)| a.order_type == b.order_type && same(&a.expr, &b.expr))
            && self.columns.len() == rebuilt.columns.len()
            && self
                .columns
                .iter()
                .zip(&rebuilt.columns)
                .all(|(a, b)| a.name == b.name && same(&a.expr, &b.expr))
    }

    /// Return `original` if `rebuilt` changed nothing, otherwise a new node
    pub fn update(&self, original: &ExprRef, rebuilt: SelectExpr) -> ExprRef {
        if self.shares_children_with(&rebuilt) {
            return original.clone();
        }
        rebuilt.into_expr()
    }
}

/// Join kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    CrossJoin,
    InnerJoin,
    CrossApply,
    OuterApply,
    LeftOuter,
    /// Left outer join known to match at most one right row
    SingletonLeftOuter,
}

impl JoinType {
    /// Whether the right side may reference aliases declared by the left
    pub fn is_apply(self) -> bool {
        matches!(self, JoinType::CrossApply | JoinType::OuterApply)
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::CrossJoin => write!(f, "CROSS JOIN"),
            JoinType::InnerJoin => write!(f, "INNER JOIN"),
            JoinType::CrossApply => write!(f, "CROSS APPLY"),
            JoinType::OuterApply => write!(f, "OUTER APPLY"),
            JoinType::LeftOuter | JoinType::SingletonLeftOuter => write!(f, "LEFT OUTER JOIN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinExpr {
    pub join_type: JoinType,
    pub left: ExprRef,
    pub right: ExprRef,
    pub condition: Option<ExprRef>,
}

impl JoinExpr {
    pub fn new(
        join_type: JoinType,
        left: ExprRef,
        right: ExprRef,
        condition: Option<ExprRef>,
    ) -> Self {
        Self {
            join_type,
            left,
            right,
            condition,
        }
    }

    pub fn update(
        &self,
        original: &ExprRef,
        left: ExprRef,
        right: ExprRef,
        condition: Option<ExprRef>,
    ) -> ExprRef {
        if same(&self.left, &left)
            && same(&self.right, &right)
            && same_opt(&self.condition, &condition)
        {
            return original.clone();
        }
        JoinExpr::new(self.join_type, left, right, condition).into_expr()
    }
}

/// Client projection over a server-side select
///
/// `select` is always a [`SelectExpr`] node. `projector` is evaluated once
/// per row against a [`FieldReader`](crate::reader::FieldReader);
/// `aggregator`, when present, is a lambda reducing the projected sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionExpr {
    pub select: ExprRef,
    pub projector: ExprRef,
    pub aggregator: Option<ExprRef>,
    pub is_singleton: bool,
}

impl ProjectionExpr {
    pub fn new(select: ExprRef, projector: ExprRef) -> Self {
        Self {
            select,
            projector,
            aggregator: None,
            is_singleton: false,
        }
    }

    pub fn with_aggregator(mut self, aggregator: ExprRef) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn with_singleton(mut self, is_singleton: bool) -> Self {
        self.is_singleton = is_singleton;
        self
    }

    /// The server-side select
    pub fn select_expr(&self) -> Option<&SelectExpr> {
        self.select.as_select()
    }

    /// Sequence of projected values, or the aggregator's result
    pub fn ty(&self) -> Type {
        match &self.aggregator {
            Some(aggregator) => aggregator
                .ty()
                .return_type()
                .cloned()
                .unwrap_or(Type::Object),
            None => Type::sequence(self.projector.ty()),
        }
    }

    pub fn update(
        &self,
        original: &ExprRef,
        select: ExprRef,
        projector: ExprRef,
        aggregator: Option<ExprRef>,
    ) -> ExprRef {
        if same(&self.select, &select)
            && same(&self.projector, &projector)
            && same_opt(&self.aggregator, &aggregator)
        {
            return original.clone();
        }
        ProjectionExpr {
            select,
            projector,
            aggregator,
            is_singleton: self.is_singleton,
        }
        .into_expr()
    }
}

/// Join evaluated on the client by matching `outer_key` against `inner_key`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientJoinExpr {
    pub projection: ExprRef,
    pub outer_key: Vec<ExprRef>,
    pub inner_key: Vec<ExprRef>,
}

impl ClientJoinExpr {
    pub fn update(
        &self,
        original: &ExprRef,
        projection: ExprRef,
        outer_key: Vec<ExprRef>,
        inner_key: Vec<ExprRef>,
    ) -> ExprRef {
        if same(&self.projection, &projection)
            && same_list(&self.outer_key, &outer_key)
            && same_list(&self.inner_key, &inner_key)
        {
            return original.clone();
        }
        ClientJoinExpr {
            projection,
            outer_key,
            inner_key,
        }
        .into_expr()
    }
}

/// Marks a subtree that yields a materialized entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityExpr {
    pub entity: MappingEntity,
    pub expr: ExprRef,
}

impl EntityExpr {
    pub fn update(&self, original: &ExprRef, expr: ExprRef) -> ExprRef {
        if same(&self.expr, &expr) {
            return original.clone();
        }
        EntityExpr {
            entity: self.entity.clone(),
            expr,
        }
        .into_expr()
    }
}

/// Aggregate function (`COUNT`, `SUM`, ...), `COUNT(*)` when `argument` is `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateExpr {
    pub name: String,
    pub argument: Option<ExprRef>,
    pub distinct: bool,
    pub ty: Type,
}

impl AggregateExpr {
    pub fn update(&self, original: &ExprRef, argument: Option<ExprRef>) -> ExprRef {
        if same_opt(&self.argument, &argument) {
            return original.clone();
        }
        AggregateExpr {
            name: self.name.clone(),
            argument,
            distinct: self.distinct,
            ty: self.ty.clone(),
        }
        .into_expr()
    }
}

/// An aggregate over a grouping, with its equivalent scalar subquery form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSubqueryExpr {
    pub group_by_alias: TableAlias,
    pub aggregate_in_group_select: ExprRef,
    /// A `ScalarSubquery` node
    pub aggregate_as_subquery: ExprRef,
}

impl AggregateSubqueryExpr {
    pub fn update(
        &self,
        original: &ExprRef,
        aggregate_in_group_select: ExprRef,
        aggregate_as_subquery: ExprRef,
    ) -> ExprRef {
        if same(&self.aggregate_in_group_select, &aggregate_in_group_select)
            && same(&self.aggregate_as_subquery, &aggregate_as_subquery)
        {
            return original.clone();
        }
        AggregateSubqueryExpr {
            group_by_alias: self.group_by_alias,
            aggregate_in_group_select,
            aggregate_as_subquery,
        }
        .into_expr()
    }
}

/// Subquery yielding a single value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarSubqueryExpr {
    pub select: ExprRef,
    pub ty: Type,
}

impl ScalarSubqueryExpr {
    pub fn update(&self, original: &ExprRef, select: ExprRef) -> ExprRef {
        if same(&self.select, &select) {
            return original.clone();
        }
        ScalarSubqueryExpr {
            select,
            ty: self.ty.clone(),
        }
        .into_expr()
    }
}

/// `EXISTS (select)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistsExpr {
    pub select: ExprRef,
}

impl ExistsExpr {
    pub fn update(&self, original: &ExprRef, select: ExprRef) -> ExprRef {
        if same(&self.select, &select) {
            return original.clone();
        }
        ExistsExpr { select }.into_expr()
    }
}

/// `expr IN (select)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InSubqueryExpr {
    pub expr: ExprRef,
    pub select: ExprRef,
}

impl InSubqueryExpr {
    pub fn update(&self, original: &ExprRef, expr: ExprRef, select: ExprRef) -> ExprRef {
        if same(&self.expr, &expr) && same(&self.select, &select) {
            return original.clone();
        }
        InSubqueryExpr { expr, select }.into_expr()
    }
}

/// `expr IN (v1, v2, ...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InValuesExpr {
    pub expr: ExprRef,
    pub values: Vec<ExprRef>,
}

impl InValuesExpr {
    pub fn update(&self, original: &ExprRef, expr: ExprRef, values: Vec<ExprRef>) -> ExprRef {
        if same(&self.expr, &expr) && same_list(&self.values, &values) {
            return original.clone();
        }
        InValuesExpr { expr, values }.into_expr()
    }
}

/// `expr IS NULL`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsNullExpr {
    pub expr: ExprRef,
}

impl IsNullExpr {
    pub fn update(&self, original: &ExprRef, expr: ExprRef) -> ExprRef {
        if same(&self.expr, &expr) {
            return original.clone();
        }
        IsNullExpr { expr }.into_expr()
    }
}

/// `expr BETWEEN lower AND upper`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetweenExpr {
    pub expr: ExprRef,
    pub lower: ExprRef,
    pub upper: ExprRef,
}

impl BetweenExpr {
    pub fn update(
        &self,
        original: &ExprRef,
        expr: ExprRef,
        lower: ExprRef,
        upper: ExprRef,
    ) -> ExprRef {
        if same(&self.expr, &expr) && same(&self.lower, &lower) && same(&self.upper, &upper) {
            return original.clone();
        }
        BetweenExpr { expr, lower, upper }.into_expr()
    }
}

/// `ROW_NUMBER() OVER (ORDER BY ...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowNumberExpr {
    pub order_by: Vec<OrderExpression>,
}

impl RowNumberExpr {
    pub fn update(&self, original: &ExprRef, order_by: Vec<OrderExpression>) -> ExprRef {
        let unchanged = self.order_by.len() == order_by.len()
            && self
                .order_by
                .iter()
                .zip(&order_by)
                .all(|(a, b)| a.order_type == b.order_type && same(&a.expr, &b.expr));
        if unchanged {
            return original.clone();
        }
        RowNumberExpr { order_by }.into_expr()
    }
}

/// Query parameter, rendered `@name`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValueExpr {
    pub name: String,
    pub query_type: QueryType,
    pub value: ExprRef,
}

impl NamedValueExpr {
    pub fn update(&self, original: &ExprRef, value: ExprRef) -> ExprRef {
        if same(&self.value, &value) {
            return original.clone();
        }
        NamedValueExpr {
            name: self.name.clone(),
            query_type: self.query_type.clone(),
            value,
        }
        .into_expr()
    }
}

/// A value drawn from the optional side of an outer join; `test` is null
/// when no row matched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OuterJoinedExpr {
    pub test: ExprRef,
    pub expr: ExprRef,
}

impl OuterJoinedExpr {
    pub fn update(&self, original: &ExprRef, test: ExprRef, expr: ExprRef) -> ExprRef {
        if same(&self.test, &test) && same(&self.expr, &expr) {
            return original.clone();
        }
        OuterJoinedExpr { test, expr }.into_expr()
    }
}

/// Database function call by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionExpr {
    pub name: String,
    pub args: Vec<ExprRef>,
    pub ty: Type,
}

impl FunctionExpr {
    pub fn update(&self, original: &ExprRef, args: Vec<ExprRef>) -> ExprRef {
        if same_list(&self.args, &args) {
            return original.clone();
        }
        FunctionExpr {
            name: self.name.clone(),
            args,
            ty: self.ty.clone(),
        }
        .into_expr()
    }
}
