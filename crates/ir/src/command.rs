// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Commands
//!
//! Write and control-flow nodes: `INSERT`, `UPDATE`, `DELETE`, batched
//! execution, blocks, conditionals and variable declarations.

use serde::{Deserialize, Serialize};

use crate::expr::{ExprRef, IntoExpr, same, same_list, same_opt};
use crate::metadata::QueryType;
use crate::types::Type;

/// `column = expression` inside an insert or update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnAssignment {
    /// A `Column` node
    pub column: ExprRef,
    pub expression: ExprRef,
}

impl ColumnAssignment {
    pub fn new(column: ExprRef, expression: ExprRef) -> Self {
        Self { column, expression }
    }
}

fn same_assignments(a: &[ColumnAssignment], b: &[ColumnAssignment]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(a, b)| same(&a.column, &b.column) && same(&a.expression, &b.expression))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertCommand {
    /// A `Table` node
    pub table: ExprRef,
    pub assignments: Vec<ColumnAssignment>,
}

impl InsertCommand {
    pub fn update(
        &self,
        original: &ExprRef,
        table: ExprRef,
        assignments: Vec<ColumnAssignment>,
    ) -> ExprRef {
        if same(&self.table, &table) && same_assignments(&self.assignments, &assignments) {
            return original.clone();
        }
        InsertCommand { table, assignments }.into_expr()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateCommand {
    pub table: ExprRef,
    pub where_clause: Option<ExprRef>,
    pub assignments: Vec<ColumnAssignment>,
}

impl UpdateCommand {
    pub fn update(
        &self,
        original: &ExprRef,
        table: ExprRef,
        where_clause: Option<ExprRef>,
        assignments: Vec<ColumnAssignment>,
    ) -> ExprRef {
        if same(&self.table, &table)
            && same_opt(&self.where_clause, &where_clause)
            && same_assignments(&self.assignments, &assignments)
        {
            return original.clone();
        }
        UpdateCommand {
            table,
            where_clause,
            assignments,
        }
        .into_expr()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteCommand {
    pub table: ExprRef,
    pub where_clause: Option<ExprRef>,
}

impl DeleteCommand {
    pub fn update(
        &self,
        original: &ExprRef,
        table: ExprRef,
        where_clause: Option<ExprRef>,
    ) -> ExprRef {
        if same(&self.table, &table) && same_opt(&self.where_clause, &where_clause) {
            return original.clone();
        }
        DeleteCommand { table, where_clause }.into_expr()
    }
}

/// Apply `operation` (a lambda) to every item of `input`, `batch_size` items
/// per round trip; `stream` selects streamed rather than buffered results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchExpr {
    pub input: ExprRef,
    pub operation: ExprRef,
    pub batch_size: ExprRef,
    pub stream: ExprRef,
}

impl BatchExpr {
    pub fn update(
        &self,
        original: &ExprRef,
        input: ExprRef,
        operation: ExprRef,
        batch_size: ExprRef,
        stream: ExprRef,
    ) -> ExprRef {
        if same(&self.input, &input)
            && same(&self.operation, &operation)
            && same(&self.batch_size, &batch_size)
            && same(&self.stream, &stream)
        {
            return original.clone();
        }
        BatchExpr {
            input,
            operation,
            batch_size,
            stream,
        }
        .into_expr()
    }
}

/// Ordered commands; yields the last command's result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockCommand {
    pub commands: Vec<ExprRef>,
}

impl BlockCommand {
    pub fn update(&self, original: &ExprRef, commands: Vec<ExprRef>) -> ExprRef {
        if same_list(&self.commands, &commands) {
            return original.clone();
        }
        BlockCommand { commands }.into_expr()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfCommand {
    pub check: ExprRef,
    pub if_true: ExprRef,
    pub if_false: Option<ExprRef>,
}

impl IfCommand {
    pub fn update(
        &self,
        original: &ExprRef,
        check: ExprRef,
        if_true: ExprRef,
        if_false: Option<ExprRef>,
    ) -> ExprRef {
        if same(&self.check, &check)
            && same(&self.if_true, &if_true)
            && same_opt(&self.if_false, &if_false)
        {
            return original.clone();
        }
        IfCommand {
            check,
            if_true,
            if_false,
        }
        .into_expr()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub name: String,
    pub query_type: QueryType,
    pub expression: ExprRef,
}

impl VariableDeclaration {
    pub fn with_expression(&self, expression: ExprRef) -> Self {
        Self {
            name: self.name.clone(),
            query_type: self.query_type.clone(),
            expression,
        }
    }
}

/// Variable declarations, optionally initialised from a select
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclarationCommand {
    pub variables: Vec<VariableDeclaration>,
    pub source: Option<ExprRef>,
}

impl DeclarationCommand {
    pub fn update(
        &self,
        original: &ExprRef,
        variables: Vec<VariableDeclaration>,
        source: Option<ExprRef>,
    ) -> ExprRef {
        let unchanged = same_opt(&self.source, &source)
            && self.variables.len() == variables.len()
            && self
                .variables
                .iter()
                .zip(&variables)
                .all(|(a, b)| a.name == b.name && same(&a.expression, &b.expression));
        if unchanged {
            return original.clone();
        }
        DeclarationCommand { variables, source }.into_expr()
    }
}

/// Reference to a declared variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableExpr {
    pub name: String,
    pub query_type: QueryType,
    pub ty: Type,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expr;

    #[test]
    fn test_block_type_is_last_command() {
        let block = BlockCommand {
            commands: vec![Expr::constant(1), Expr::constant("done")],
        }
        .into_expr();
        assert_eq!(block.ty(), Type::String);

        let empty = BlockCommand { commands: Vec::new() }.into_expr();
        assert_eq!(empty.ty(), Type::Void);
    }

    #[test]
    fn test_if_update_identity() {
        let check = Expr::constant(true);
        let then = Expr::constant(1);
        let node = IfCommand {
            check: check.clone(),
            if_true: then.clone(),
            if_false: None,
        }
        .into_expr();
        let crate::Expr::If(cmd) = node.as_ref() else {
            panic!("expected if");
        };
        assert!(same(&cmd.update(&node, check, then, None), &node));
    }
}
