// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Test fixtures and sample query trees
//!
//! Every tree is built over a two-entity mapping:
//!
//! ```text
//! customers(CustomerID string, Name string, City string, Age int)
//! orders(OrderID int, CustomerID string, Total float)
//! ```
//!
//! A [`QueryBuilder`] borrows the [`AliasAllocator`] of the test so that
//! aliases are deterministic per test and never collide across trees built
//! from the same allocator.

use relq_ir::{
    AliasAllocator, ColumnDeclaration, ColumnExpr, DefaultTypeSystem, Expr, ExprRef, IntoExpr,
    JoinExpr, JoinType, MappingEntity, NewExpr, ProjectionExpr, SelectExpr, TableAlias,
    TableExpr, Type, TypeSystem,
};

/// Columns of the `customers` table
pub fn customer_columns() -> Vec<(&'static str, Type)> {
    vec![
        ("CustomerID", Type::String),
        ("Name", Type::String),
        ("City", Type::String),
        ("Age", Type::Int32),
    ]
}

/// Columns of the `orders` table
pub fn order_columns() -> Vec<(&'static str, Type)> {
    vec![
        ("OrderID", Type::Int32),
        ("CustomerID", Type::String),
        ("Total", Type::Float64),
    ]
}

/// A built row source: its alias, its node, and the columns it exposes
#[derive(Debug, Clone)]
pub struct Source {
    pub alias: TableAlias,
    pub expr: ExprRef,
    pub columns: Vec<(String, Type)>,
}

impl Source {
    /// Type of an exposed column; `Object` for unknown names
    pub fn column_type(&self, name: &str) -> Type {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, ty)| ty.clone())
            .unwrap_or(Type::Object)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Builder for sample query trees
pub struct QueryBuilder<'a> {
    ids: &'a AliasAllocator,
    types: DefaultTypeSystem,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(ids: &'a AliasAllocator) -> Self {
        Self {
            ids,
            types: DefaultTypeSystem,
        }
    }

    pub fn ids(&self) -> &'a AliasAllocator {
        self.ids
    }

    // ===== Tables =====

    /// A table over `entity` with the given columns
    pub fn table(&self, entity: &str, name: &str, columns: Vec<(&str, Type)>) -> Source {
        let alias = self.ids.next_alias();
        let expr = TableExpr::new(alias, MappingEntity::new(entity, Type::named(entity)), name)
            .into_expr();
        Source {
            alias,
            expr,
            columns: columns
                .into_iter()
                .map(|(name, ty)| (name.to_string(), ty))
                .collect(),
        }
    }

    pub fn customers(&self) -> Source {
        self.table("Customer", "customers", customer_columns())
    }

    pub fn orders(&self) -> Source {
        self.table("Order", "orders", order_columns())
    }

    // ===== Columns =====

    /// Reference to column `name` of `source`
    pub fn column(&self, source: &Source, name: &str) -> ExprRef {
        let ty = source.column_type(name);
        let query_type = self.types.column_type(&ty);
        ColumnExpr::new(source.alias, name, query_type, ty).into_expr()
    }

    /// Output column declaration typed through the default type system
    pub fn declaration(&self, name: &str, expr: ExprRef) -> ColumnDeclaration {
        let query_type = self.types.column_type(&expr.ty());
        ColumnDeclaration::new(name, expr, query_type)
    }

    // ===== Selects =====

    /// `SELECT names... FROM from` under a fresh alias, left open for
    /// further `with_*` calls
    pub fn select_columns(&self, from: &Source, names: &[&str]) -> SelectExpr {
        let columns = names
            .iter()
            .map(|name| self.declaration(name, self.column(from, name)))
            .collect();
        SelectExpr::new(self.ids.next_alias(), columns, Some(from.expr.clone()))
    }

    /// Select every column of `from` under its own name
    pub fn pass_through(&self, from: &Source) -> Source {
        let names = from.column_names();
        self.finish(self.select_columns(from, &names))
    }

    /// Wrap a select into a [`Source`]
    pub fn finish(&self, select: SelectExpr) -> Source {
        let alias = select.alias;
        let columns = select
            .columns
            .iter()
            .map(|column| (column.name.clone(), column.expr.ty()))
            .collect();
        Source {
            alias,
            expr: select.into_expr(),
            columns,
        }
    }

    // ===== Joins =====

    pub fn join(
        &self,
        join_type: JoinType,
        left: &Source,
        right: &Source,
        condition: Option<ExprRef>,
    ) -> ExprRef {
        JoinExpr::new(join_type, left.expr.clone(), right.expr.clone(), condition).into_expr()
    }

    /// `customers INNER JOIN orders ON c.CustomerID = o.CustomerID`,
    /// selecting the customer name and order total
    pub fn customer_orders(&self) -> Source {
        let customers = self.customers();
        let orders = self.orders();
        let condition = Expr::equal(
            self.column(&customers, "CustomerID"),
            self.column(&orders, "CustomerID"),
        );
        let join = self.join(JoinType::InnerJoin, &customers, &orders, Some(condition));
        let columns = vec![
            self.declaration("Name", self.column(&customers, "Name")),
            self.declaration("Total", self.column(&orders, "Total")),
        ];
        self.finish(SelectExpr::new(self.ids.next_alias(), columns, Some(join)))
    }

    // ===== Projections =====

    /// Client projection building one record per row of `select`
    pub fn projection(&self, select: &Source) -> ExprRef {
        let members: Vec<String> = select.columns.iter().map(|(name, _)| name.clone()).collect();
        let args = select
            .columns
            .iter()
            .map(|(name, _)| self.column(select, name))
            .collect();
        let projector = NewExpr {
            type_name: "Row".to_string(),
            members,
            args,
        }
        .into_expr();
        ProjectionExpr::new(select.expr.clone(), projector).into_expr()
    }

    /// `customers.Where(c => c.City == city)` as a finished projection
    pub fn customers_in(&self, city: &str) -> ExprRef {
        let customers = self.customers();
        let predicate = Expr::equal(self.column(&customers, "City"), Expr::constant(city));
        let select = self
            .select_columns(&customers, &["CustomerID", "Name"])
            .with_where(predicate);
        self.projection(&self.finish(select))
    }

    /// A projection over a pass-through select over a filtered select:
    /// the middle select is redundant
    pub fn nested_customers(&self) -> ExprRef {
        let customers = self.customers();
        let predicate = Expr::equal(self.column(&customers, "City"), Expr::constant("London"));
        let inner = self.finish(
            self.select_columns(&customers, &["CustomerID", "Name"])
                .with_where(predicate),
        );
        let middle = self.pass_through(&inner);
        let outer = self.pass_through(&middle);
        self.projection(&outer)
    }
}

#[cfg(test)]
mod tests {
    use relq_ir::ExprKind;

    use super::*;

    #[test]
    fn test_fresh_aliases_per_table() {
        let ids = AliasAllocator::new();
        let builder = QueryBuilder::new(&ids);
        let a = builder.customers();
        let b = builder.customers();
        assert_ne!(a.alias, b.alias);
        assert_eq!(ids.aliases_minted(), 2);
    }

    #[test]
    fn test_column_types() {
        let ids = AliasAllocator::new();
        let builder = QueryBuilder::new(&ids);
        let orders = builder.orders();
        assert_eq!(builder.column(&orders, "Total").ty(), Type::Float64);
        assert_eq!(builder.column(&orders, "Missing").ty(), Type::Object);
    }

    #[test]
    fn test_projection_shape() {
        let ids = AliasAllocator::new();
        let builder = QueryBuilder::new(&ids);
        let projection = builder.customers_in("Paris");
        assert_eq!(projection.kind(), ExprKind::Projection);
        let select = projection
            .as_projection()
            .and_then(|p| p.select.as_select())
            .unwrap();
        assert_eq!(select.columns.len(), 2);
        assert!(select.where_clause.is_some());
    }
}
