// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Copy-on-write helpers for [`SelectExpr`]
//!
//! Every helper leaves `self` untouched and returns a new select. Parts that
//! are not edited keep their references, so downstream identity checks still
//! see them as unchanged.

use crate::alias::TableAlias;
use crate::error::{IrError, IrResult};
use crate::expr::{ExprRef, IntoExpr};
use crate::metadata::TypeSystem;
use crate::query::{ColumnDeclaration, ColumnExpr, OrderExpression, SelectExpr};

/// First of `base`, `base0`, `base1`, ... not used by `columns`
pub fn available_column_name(columns: &[ColumnDeclaration], base: &str) -> String {
    let mut name = base.to_string();
    let mut n = 0;
    while columns.iter().any(|c| c.name == name) {
        name = format!("{}{}", base, n);
        n += 1;
    }
    name
}

impl SelectExpr {
    pub fn add_column(&self, column: ColumnDeclaration) -> IrResult<SelectExpr> {
        if self.column(&column.name).is_some() {
            return Err(IrError::DuplicateColumnName {
                alias: self.alias,
                name: column.name,
            });
        }
        let mut columns = self.columns.clone();
        columns.push(column);
        Ok(self.set_columns(columns))
    }

    pub fn remove_column(&self, name: &str) -> IrResult<SelectExpr> {
        if self.column(name).is_none() {
            return Err(IrError::ColumnNotFound {
                alias: self.alias,
                name: name.to_string(),
            });
        }
        let columns = self
            .columns
            .iter()
            .filter(|c| c.name != name)
            .cloned()
            .collect();
        Ok(self.set_columns(columns))
    }

    pub fn set_columns(&self, columns: Vec<ColumnDeclaration>) -> SelectExpr {
        SelectExpr {
            columns,
            ..self.clone()
        }
    }

    pub fn set_where(&self, where_clause: Option<ExprRef>) -> SelectExpr {
        SelectExpr {
            where_clause,
            ..self.clone()
        }
    }

    pub fn add_order_expression(&self, ordering: OrderExpression) -> SelectExpr {
        let mut order_by = self.order_by.clone();
        order_by.push(ordering);
        SelectExpr {
            order_by,
            ..self.clone()
        }
    }

    pub fn add_group_expression(&self, expr: ExprRef) -> SelectExpr {
        let mut group_by = self.group_by.clone();
        group_by.push(expr);
        SelectExpr {
            group_by,
            ..self.clone()
        }
    }

    pub fn set_distinct(&self, distinct: bool) -> SelectExpr {
        SelectExpr {
            distinct,
            ..self.clone()
        }
    }

    pub fn set_reverse(&self, reverse: bool) -> SelectExpr {
        SelectExpr {
            reverse,
            ..self.clone()
        }
    }

    pub fn set_skip(&self, skip: Option<ExprRef>) -> SelectExpr {
        SelectExpr {
            skip,
            ..self.clone()
        }
    }

    pub fn set_take(&self, take: Option<ExprRef>) -> SelectExpr {
        SelectExpr {
            take,
            ..self.clone()
        }
    }

    pub fn set_from(&self, from: Option<ExprRef>) -> SelectExpr {
        SelectExpr {
            from,
            ..self.clone()
        }
    }

    /// A column name derived from `base` that this select does not use yet
    pub fn available_column_name(&self, base: &str) -> String {
        available_column_name(&self.columns, base)
    }

    /// Push this select down one level
    ///
    /// The current select keeps everything except its alias, which becomes
    /// `new_alias`. The returned select keeps the original alias, reads from
    /// the pushed-down select, and re-exposes each of its columns by name.
    pub fn add_redundant_select(
        &self,
        type_system: &dyn TypeSystem,
        new_alias: TableAlias,
    ) -> SelectExpr {
        let columns = self
            .columns
            .iter()
            .map(|decl| {
                let query_type = match decl.expr.as_column() {
                    Some(column) => column.query_type.clone(),
                    None => type_system.column_type(&decl.expr.ty()),
                };
                let reference = ColumnExpr::new(
                    new_alias,
                    decl.name.clone(),
                    query_type.clone(),
                    decl.expr.ty(),
                );
                ColumnDeclaration::new(decl.name.clone(), reference.into_expr(), query_type)
            })
            .collect();

        let inner = SelectExpr {
            alias: new_alias,
            ..self.clone()
        };
        SelectExpr::new(self.alias, columns, Some(inner.into_expr()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasAllocator;
    use crate::expr::{Expr, same};
    use crate::metadata::{DataType, DefaultTypeSystem, QueryType};
    use crate::types::Type;

    fn decl(name: &str, value: i32) -> ColumnDeclaration {
        ColumnDeclaration::new(name, Expr::constant(value), QueryType::new(DataType::Integer))
    }

    #[test]
    fn test_available_column_name() {
        let columns = vec![decl("c", 1), decl("c0", 2)];
        assert_eq!(available_column_name(&columns, "c"), "c1");
        assert_eq!(available_column_name(&columns, "x"), "x");
    }

    #[test]
    fn test_add_and_remove_column() {
        let ids = AliasAllocator::new();
        let select = SelectExpr::new(ids.next_alias(), vec![decl("a", 1)], None);

        let added = select.add_column(decl("b", 2)).unwrap();
        assert_eq!(added.columns.len(), 2);
        assert_eq!(select.columns.len(), 1);

        let err = added.add_column(decl("a", 3)).unwrap_err();
        assert!(matches!(err, IrError::DuplicateColumnName { .. }));

        let removed = added.remove_column("a").unwrap();
        assert_eq!(removed.columns[0].name, "b");
        assert!(removed.remove_column("zzz").is_err());
    }

    #[test]
    fn test_setters_keep_untouched_parts() {
        let ids = AliasAllocator::new();
        let predicate = Expr::constant(true);
        let select = SelectExpr::new(ids.next_alias(), vec![decl("a", 1)], None)
            .with_where(predicate.clone());
        let distinct = select.set_distinct(true);
        assert!(distinct.distinct);
        assert!(same(distinct.where_clause.as_ref().unwrap(), &predicate));
        assert!(same(&distinct.columns[0].expr, &select.columns[0].expr));
    }

    #[test]
    fn test_add_redundant_select() {
        let ids = AliasAllocator::new();
        let outer_alias = ids.next_alias();
        let select = SelectExpr::new(outer_alias, vec![decl("a", 1)], None).with_distinct(true);
        let new_alias = ids.next_alias();

        let wrapped = select.add_redundant_select(&DefaultTypeSystem, new_alias);
        assert_eq!(wrapped.alias, outer_alias);
        assert!(!wrapped.distinct);

        let column = wrapped.columns[0].expr.as_column().unwrap();
        assert_eq!(column.alias, new_alias);
        assert_eq!(column.name, "a");
        assert_eq!(column.ty, Type::Int32);

        let inner = wrapped.from.as_ref().and_then(|f| f.as_select()).unwrap();
        assert_eq!(inner.alias, new_alias);
        assert!(inner.distinct);
    }
}
