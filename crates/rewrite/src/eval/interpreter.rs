// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Expression interpreter
//!
//! Executes the base algebra directly over [`Value`]s. This is what the
//! partial evaluator runs on a subtree once it has been nominated.
//!
//! Semantics:
//!
//! - Integer arithmetic is checked: division by zero and overflow are
//!   errors, never wrapped results. `int32` op `int32` stays `int32`; any
//!   `int64` operand widens to `int64`; any float operand computes in `f64`.
//! - `+` with a string operand concatenates (`null` concatenates as empty).
//! - Other operators lift over `null`: arithmetic yields `null`, ordering
//!   comparisons yield `false`, and `==`/`!=` compare null-ness.
//! - `&&`, `||` and `??` short-circuit.
//! - Method calls resolve through a [`FunctionRegistry`]; instance methods
//!   get the receiver as their first argument.
//!
//! Relational and command nodes, bare lambdas and quotes are not values and
//! fail with [`EvalError::NotEvaluable`].

use std::cmp::Ordering;

use relq_ir::{
    BinaryExpr, BinaryOp, CallExpr, ConditionalExpr, ConstantExpr, ExprRef, IndexExpr,
    InvokeExpr, LambdaExpr, MemberExpr, NewArrayExpr, NewExpr, ParameterExpr, ParameterId, Record,
    Type, UnaryExpr, UnaryOp, Value,
};

use super::registry::FunctionRegistry;
use crate::error::{EvalError, EvalResult, RewriteResult};
use crate::guard::RecursionGuard;
use crate::visitor::Visitor;

/// Tree-walking evaluator for the base algebra
pub struct Interpreter<'a> {
    guard: RecursionGuard,
    registry: &'a FunctionRegistry,
    env: Vec<(ParameterId, Value)>,
}

impl<'a> Interpreter<'a> {
    pub fn new(registry: &'a FunctionRegistry) -> Self {
        Self {
            guard: RecursionGuard::new(),
            registry,
            env: Vec::new(),
        }
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.guard = RecursionGuard::with_limit(limit);
        self
    }

    /// Builder method: bind a free parameter
    pub fn with_binding(mut self, id: ParameterId, value: Value) -> Self {
        self.env.push((id, value));
        self
    }

    /// Evaluate `expr` to a value of its declared type
    pub fn interpret(&mut self, expr: &ExprRef) -> RewriteResult<Value> {
        let value = self.visit(expr)?;
        Ok(coerce(value, &expr.ty()))
    }

    fn lookup(&self, id: ParameterId) -> Option<&Value> {
        self.env
            .iter()
            .rev()
            .find(|(bound, _)| *bound == id)
            .map(|(_, value)| value)
    }

    fn visit_bool(&mut self, node: &ExprRef) -> RewriteResult<bool> {
        match self.visit(node)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::type_mismatch("Bool", other.type_of().to_string()).into()),
        }
    }

    fn visit_all(&mut self, nodes: &[ExprRef]) -> RewriteResult<Vec<Value>> {
        nodes.iter().map(|n| self.visit(n)).collect()
    }
}

fn not_evaluable<T>(node: &ExprRef) -> RewriteResult<T> {
    Err(EvalError::NotEvaluable { kind: node.kind() }.into())
}

macro_rules! not_evaluable {
    ($($visit:ident($payload:ident)),* $(,)?) => {
        $(
            fn $visit(&mut self, node: &ExprRef, _: &relq_ir::$payload) -> RewriteResult<Value> {
                not_evaluable(node)
            }
        )*
    };
}

impl Visitor for Interpreter<'_> {
    type Output = Value;

    fn guard(&self) -> &RecursionGuard {
        &self.guard
    }

    fn visit_constant(&mut self, _: &ExprRef, constant: &ConstantExpr) -> RewriteResult<Value> {
        Ok(constant.value.clone())
    }

    fn visit_parameter(&mut self, _: &ExprRef, parameter: &ParameterExpr) -> RewriteResult<Value> {
        match self.lookup(parameter.id) {
            Some(value) => Ok(value.clone()),
            None => Err(EvalError::UnboundParameter {
                name: parameter.name.clone(),
            }
            .into()),
        }
    }

    fn visit_binary(&mut self, _: &ExprRef, binary: &BinaryExpr) -> RewriteResult<Value> {
        match binary.op {
            BinaryOp::AndAlso => {
                Ok(Value::Bool(self.visit_bool(&binary.left)? && self.visit_bool(&binary.right)?))
            }
            BinaryOp::OrElse => {
                Ok(Value::Bool(self.visit_bool(&binary.left)? || self.visit_bool(&binary.right)?))
            }
            BinaryOp::Coalesce => match self.visit(&binary.left)? {
                Value::Null => self.visit(&binary.right),
                value => Ok(value),
            },
            op => {
                let left = self.visit(&binary.left)?;
                let right = self.visit(&binary.right)?;
                Ok(apply_binary(op, left, right)?)
            }
        }
    }

    fn visit_unary(&mut self, node: &ExprRef, unary: &UnaryExpr) -> RewriteResult<Value> {
        if unary.op == UnaryOp::Quote {
            return not_evaluable(node);
        }
        let operand = self.visit(&unary.operand)?;
        Ok(apply_unary(unary.op, operand, &unary.ty)?)
    }

    fn visit_conditional(
        &mut self,
        _: &ExprRef,
        conditional: &ConditionalExpr,
    ) -> RewriteResult<Value> {
        if self.visit_bool(&conditional.test)? {
            self.visit(&conditional.if_true)
        } else {
            self.visit(&conditional.if_false)
        }
    }

    fn visit_call(&mut self, _: &ExprRef, call: &CallExpr) -> RewriteResult<Value> {
        let mut args = Vec::with_capacity(call.args.len() + 1);
        if let Some(object) = &call.object {
            args.push(self.visit(object)?);
        }
        args.extend(self.visit_all(&call.args)?);
        let function = self
            .registry
            .get_function(&call.method)
            .ok_or_else(|| EvalError::UnknownFunction {
                name: call.method.to_string(),
            })?;
        Ok(coerce(function(&args)?, &call.ty))
    }

    fn visit_member(&mut self, _: &ExprRef, member: &MemberExpr) -> RewriteResult<Value> {
        let Some(object) = &member.object else {
            return Err(EvalError::UnknownMember {
                type_name: "static".to_string(),
                member: member.member.clone(),
            }
            .into());
        };
        let value = self.visit(object)?;
        Ok(member_of(&value, &member.member)?)
    }

    fn visit_lambda(&mut self, node: &ExprRef, _: &LambdaExpr) -> RewriteResult<Value> {
        not_evaluable(node)
    }

    fn visit_invoke(&mut self, _: &ExprRef, invoke: &InvokeExpr) -> RewriteResult<Value> {
        let Some(lambda) = invoke.target.as_lambda() else {
            return not_evaluable(&invoke.target);
        };
        if lambda.params.len() != invoke.args.len() {
            return Err(EvalError::type_mismatch(
                format!("{} arguments", lambda.params.len()),
                format!("{} arguments", invoke.args.len()),
            )
            .into());
        }
        let args = self.visit_all(&invoke.args)?;
        let mark = self.env.len();
        self.env
            .extend(lambda.params.iter().map(|p| p.id).zip(args));
        let result = self.visit(&lambda.body);
        self.env.truncate(mark);
        result
    }

    fn visit_new(&mut self, _: &ExprRef, new: &NewExpr) -> RewriteResult<Value> {
        let mut record = Record::new(new.type_name.clone());
        for (name, arg) in new.members.iter().zip(&new.args) {
            let value = self.visit(arg)?;
            record = record.with_field(name.clone(), value);
        }
        Ok(Value::Record(record))
    }

    fn visit_new_array(&mut self, _: &ExprRef, array: &NewArrayExpr) -> RewriteResult<Value> {
        Ok(Value::Sequence(self.visit_all(&array.elements)?))
    }

    fn visit_index(&mut self, _: &ExprRef, index: &IndexExpr) -> RewriteResult<Value> {
        let array = self.visit(&index.array)?;
        let position = self.visit(&index.index)?;
        let Some(i) = position.as_i64() else {
            return Err(EvalError::type_mismatch("integer", position.type_of().to_string()).into());
        };
        let out_of_range = |len: usize| EvalError::IndexOutOfRange { index: i, len };
        match array {
            Value::Sequence(items) => {
                let len = items.len();
                usize::try_from(i)
                    .ok()
                    .and_then(|i| items.into_iter().nth(i))
                    .ok_or_else(|| out_of_range(len).into())
            }
            Value::Bytes(bytes) => usize::try_from(i)
                .ok()
                .and_then(|i| bytes.get(i))
                .map(|b| Value::Int32(i32::from(*b)))
                .ok_or_else(|| out_of_range(bytes.len()).into()),
            other => Err(EvalError::type_mismatch("Sequence", other.type_of().to_string()).into()),
        }
    }

    not_evaluable! {
        visit_table(TableExpr),
        visit_column(ColumnExpr),
        visit_select(SelectExpr),
        visit_join(JoinExpr),
        visit_projection(ProjectionExpr),
        visit_client_join(ClientJoinExpr),
        visit_entity(EntityExpr),
        visit_aggregate(AggregateExpr),
        visit_aggregate_subquery(AggregateSubqueryExpr),
        visit_scalar_subquery(ScalarSubqueryExpr),
        visit_exists(ExistsExpr),
        visit_in_subquery(InSubqueryExpr),
        visit_in_values(InValuesExpr),
        visit_is_null(IsNullExpr),
        visit_between(BetweenExpr),
        visit_row_number(RowNumberExpr),
        visit_named_value(NamedValueExpr),
        visit_outer_joined(OuterJoinedExpr),
        visit_function(FunctionExpr),
        visit_insert(InsertCommand),
        visit_update(UpdateCommand),
        visit_delete(DeleteCommand),
        visit_batch(BatchExpr),
        visit_block(BlockCommand),
        visit_if(IfCommand),
        visit_declaration(DeclarationCommand),
        visit_variable(VariableExpr),
    }
}

fn member_of(value: &Value, member: &str) -> EvalResult<Value> {
    let found = match (value, member) {
        (Value::Record(record), name) => record.field(name).cloned(),
        (Value::String(s), "Length") => i32::try_from(s.chars().count()).ok().map(Value::Int32),
        (Value::Sequence(items), "Count" | "Length") => {
            i32::try_from(items.len()).ok().map(Value::Int32)
        }
        (Value::Bytes(bytes), "Length") => i32::try_from(bytes.len()).ok().map(Value::Int32),
        _ => None,
    };
    found.ok_or_else(|| EvalError::UnknownMember {
        type_name: match value {
            Value::Record(record) => record.type_name.clone(),
            other => other.type_of().to_string(),
        },
        member: member.to_string(),
    })
}

fn overflow(op: BinaryOp) -> EvalError {
    EvalError::Overflow {
        op: op.symbol().to_string(),
    }
}

fn display_for_concat(value: &Value) -> EvalResult<String> {
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => if *b { "True" } else { "False" }.to_string(),
        Value::Int32(v) => v.to_string(),
        Value::Int64(v) => v.to_string(),
        Value::Float64(v) => v.to_string(),
        other => return Err(EvalError::type_mismatch("String", other.type_of().to_string())),
    })
}

/// Order two values of comparable types
fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Int32(_) | Value::Int64(_), Value::Int32(_) | Value::Int64(_)) => {
            Some(left.as_i64()?.cmp(&right.as_i64()?))
        }
        (Value::Float64(_), _) | (_, Value::Float64(_)) => {
            left.as_f64()?.partial_cmp(&right.as_f64()?)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ if left == right => Some(Ordering::Equal),
        _ => None,
    }
}

fn apply_binary(op: BinaryOp, left: Value, right: Value) -> EvalResult<Value> {
    let is_string = |value: &Value| matches!(value, Value::String(_));
    if op == BinaryOp::Add && (is_string(&left) || is_string(&right)) {
        return Ok(Value::String(display_for_concat(&left)? + &display_for_concat(&right)?));
    }
    if op.is_comparison() {
        return compare(op, &left, &right);
    }
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    match op {
        BinaryOp::And | BinaryOp::Or | BinaryOp::ExclusiveOr => bitwise(op, left, right),
        BinaryOp::LeftShift | BinaryOp::RightShift => shift(op, left, right),
        BinaryOp::Power => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float64(a.powf(b))),
            _ => Err(mismatch_pair("number", &left, &right)),
        },
        _ => arithmetic(op, left, right),
    }
}

fn mismatch_pair(expected: &str, left: &Value, right: &Value) -> EvalError {
    EvalError::type_mismatch(expected, format!("{} and {}", left.type_of(), right.type_of()))
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    if left.is_null() || right.is_null() {
        let both = left.is_null() && right.is_null();
        return Ok(Value::Bool(match op {
            BinaryOp::Equal => both,
            BinaryOp::NotEqual => !both,
            _ => false,
        }));
    }
    let ordering = compare_values(left, right);
    let result = match op {
        BinaryOp::Equal => ordering == Some(Ordering::Equal),
        BinaryOp::NotEqual => ordering != Some(Ordering::Equal),
        _ => {
            let Some(ordering) = ordering else {
                return Err(mismatch_pair("comparable values", left, right));
            };
            match op {
                BinaryOp::LessThan => ordering == Ordering::Less,
                BinaryOp::LessThanOrEqual => ordering != Ordering::Greater,
                BinaryOp::GreaterThan => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }
        }
    };
    Ok(Value::Bool(result))
}

fn arithmetic(op: BinaryOp, left: Value, right: Value) -> EvalResult<Value> {
    match (&left, &right) {
        (Value::Int32(a), Value::Int32(b)) => {
            let (a, b) = (*a, *b);
            if matches!(op, BinaryOp::Divide | BinaryOp::Modulo) && b == 0 {
                return Err(EvalError::DivideByZero);
            }
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Subtract => a.checked_sub(b),
                BinaryOp::Multiply => a.checked_mul(b),
                BinaryOp::Divide => a.checked_div(b),
                BinaryOp::Modulo => a.checked_rem(b),
                _ => return Err(mismatch_pair("arithmetic operands", &left, &right)),
            };
            result.map(Value::Int32).ok_or_else(|| overflow(op))
        }
        (Value::Int32(_) | Value::Int64(_), Value::Int32(_) | Value::Int64(_)) => {
            let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) else {
                return Err(mismatch_pair("integers", &left, &right));
            };
            if matches!(op, BinaryOp::Divide | BinaryOp::Modulo) && b == 0 {
                return Err(EvalError::DivideByZero);
            }
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Subtract => a.checked_sub(b),
                BinaryOp::Multiply => a.checked_mul(b),
                BinaryOp::Divide => a.checked_div(b),
                BinaryOp::Modulo => a.checked_rem(b),
                _ => return Err(mismatch_pair("arithmetic operands", &left, &right)),
            };
            result.map(Value::Int64).ok_or_else(|| overflow(op))
        }
        _ => {
            let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
                return Err(mismatch_pair("number", &left, &right));
            };
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Subtract => a - b,
                BinaryOp::Multiply => a * b,
                BinaryOp::Divide => a / b,
                BinaryOp::Modulo => a % b,
                _ => return Err(mismatch_pair("arithmetic operands", &left, &right)),
            };
            Ok(Value::Float64(result))
        }
    }
}

fn bitwise(op: BinaryOp, left: Value, right: Value) -> EvalResult<Value> {
    match (&left, &right) {
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(match op {
            BinaryOp::And => *a & *b,
            BinaryOp::Or => *a | *b,
            _ => *a ^ *b,
        })),
        (Value::Int32(a), Value::Int32(b)) => Ok(Value::Int32(match op {
            BinaryOp::And => a & b,
            BinaryOp::Or => a | b,
            _ => a ^ b,
        })),
        _ => match (left.as_i64(), right.as_i64()) {
            (Some(a), Some(b)) => Ok(Value::Int64(match op {
                BinaryOp::And => a & b,
                BinaryOp::Or => a | b,
                _ => a ^ b,
            })),
            _ => Err(mismatch_pair("integers or booleans", &left, &right)),
        },
    }
}

/// Shift counts are masked to the operand width
fn shift(op: BinaryOp, left: Value, right: Value) -> EvalResult<Value> {
    let Some(count) = right.as_i64() else {
        return Err(mismatch_pair("integer shift count", &left, &right));
    };
    // Masked to at most 63, so the cast cannot truncate
    let count = (count & 63) as u32;
    match left {
        Value::Int32(v) => Ok(Value::Int32(match op {
            BinaryOp::LeftShift => v.wrapping_shl(count & 31),
            _ => v.wrapping_shr(count & 31),
        })),
        Value::Int64(v) => Ok(Value::Int64(match op {
            BinaryOp::LeftShift => v.wrapping_shl(count),
            _ => v.wrapping_shr(count),
        })),
        other => Err(EvalError::type_mismatch("integer", other.type_of().to_string())),
    }
}

fn apply_unary(op: UnaryOp, operand: Value, ty: &Type) -> EvalResult<Value> {
    match op {
        UnaryOp::Convert => convert(operand, ty),
        _ if operand.is_null() => Ok(Value::Null),
        UnaryOp::Negate => match operand {
            Value::Int32(v) => v.checked_neg().map(Value::Int32).ok_or_else(|| EvalError::Overflow {
                op: "-".to_string(),
            }),
            Value::Int64(v) => v.checked_neg().map(Value::Int64).ok_or_else(|| EvalError::Overflow {
                op: "-".to_string(),
            }),
            Value::Float64(v) => Ok(Value::Float64(-v)),
            other => Err(EvalError::type_mismatch("number", other.type_of().to_string())),
        },
        UnaryOp::Not => match operand {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            Value::Int32(v) => Ok(Value::Int32(!v)),
            Value::Int64(v) => Ok(Value::Int64(!v)),
            other => Err(EvalError::type_mismatch("Bool", other.type_of().to_string())),
        },
        UnaryOp::ArrayLength => match operand {
            Value::Sequence(items) => length(items.len()),
            Value::Bytes(bytes) => length(bytes.len()),
            other => Err(EvalError::type_mismatch("Sequence", other.type_of().to_string())),
        },
        UnaryOp::Quote => Err(EvalError::NotEvaluable {
            kind: relq_ir::ExprKind::Unary,
        }),
    }
}

fn length(len: usize) -> EvalResult<Value> {
    i32::try_from(len).map(Value::Int32).map_err(|_| EvalError::Overflow {
        op: "length".to_string(),
    })
}

/// Convert `value` to `target`, failing on lossy integer conversions
pub fn convert(value: Value, target: &Type) -> EvalResult<Value> {
    let inner = target.non_nullable();
    if value.is_null() {
        return match inner {
            Type::Int32 | Type::Int64 | Type::Float64 | Type::Bool if !target.is_nullable() => {
                Err(EvalError::type_mismatch(target.to_string(), "Null"))
            }
            _ => Ok(Value::Null),
        };
    }
    let conversion_overflow = || EvalError::Overflow {
        op: format!("convert to {}", target),
    };
    match (inner, &value) {
        (Type::Int32, Value::Int32(_)) => Ok(value),
        (Type::Int32, Value::Int64(v)) => i32::try_from(*v)
            .map(Value::Int32)
            .map_err(|_| conversion_overflow()),
        (Type::Int32, Value::Float64(v)) => {
            let truncated = v.trunc();
            let range = f64::from(i32::MIN)..=f64::from(i32::MAX);
            if truncated.is_finite() && range.contains(&truncated) {
                // Range-checked above
                Ok(Value::Int32(truncated as i32))
            } else {
                Err(conversion_overflow())
            }
        }
        (Type::Int64, Value::Int32(v)) => Ok(Value::Int64(i64::from(*v))),
        (Type::Int64, Value::Int64(_)) => Ok(value),
        (Type::Int64, Value::Float64(v)) => {
            let truncated = v.trunc();
            // i64::MAX is not representable in f64; 2^63 is the exclusive bound
            let range = -9.223_372_036_854_776e18..9.223_372_036_854_776e18;
            if truncated.is_finite() && range.contains(&truncated) {
                Ok(Value::Int64(truncated as i64))
            } else {
                Err(conversion_overflow())
            }
        }
        (Type::Float64, Value::Int32(_) | Value::Int64(_) | Value::Float64(_)) => {
            Ok(Value::Float64(value.as_f64().unwrap_or_default()))
        }
        (Type::Bool, Value::Bool(_))
        | (Type::String, Value::String(_))
        | (Type::Bytes, Value::Bytes(_)) => Ok(value),
        (
            Type::Object
            | Type::Named(_)
            | Type::Sequence(_)
            | Type::Void
            | Type::Reader
            | Type::Function { .. },
            _,
        ) => Ok(value),
        (_, other) => Err(EvalError::type_mismatch(
            target.to_string(),
            other.type_of().to_string(),
        )),
    }
}

/// Widen `value` to `ty` where that is lossless; otherwise leave it alone
pub fn coerce(value: Value, ty: &Type) -> Value {
    match (ty.non_nullable(), &value) {
        (Type::Int64, Value::Int32(v)) => Value::Int64(i64::from(*v)),
        (Type::Float64, Value::Int32(_) | Value::Int64(_)) => {
            Value::Float64(value.as_f64().unwrap_or_default())
        }
        _ => value,
    }
}
