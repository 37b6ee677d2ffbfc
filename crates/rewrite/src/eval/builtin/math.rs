// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! `Math` functions
//!
//! `Abs`, `Max` and `Min` keep integer operands integral; everything else
//! computes in `f64`.

use std::cmp::Ordering;
use std::sync::Arc;

use relq_ir::{MethodRef, Value};

use super::{arity, float_arg};
use crate::error::{EvalError, EvalResult};
use crate::eval::registry::HostFunction;

fn method(name: &str, f: fn(&[Value]) -> EvalResult<Value>) -> (MethodRef, HostFunction) {
    let function: HostFunction = Arc::new(f);
    (MethodRef::new("Math", name), function)
}

pub fn all_functions() -> Vec<(MethodRef, HostFunction)> {
    vec![
        method("Abs", abs),
        method("Max", max),
        method("Min", min),
        method("Round", round),
        method("Floor", floor),
        method("Ceiling", ceiling),
        method("Sqrt", sqrt),
        method("Pow", pow),
    ]
}

fn overflow(op: &str) -> EvalError {
    EvalError::Overflow { op: op.to_string() }
}

fn abs(args: &[Value]) -> EvalResult<Value> {
    arity("Math.Abs", args, 1)?;
    match &args[0] {
        Value::Int32(v) => v.checked_abs().map(Value::Int32).ok_or_else(|| overflow("Math.Abs")),
        Value::Int64(v) => v.checked_abs().map(Value::Int64).ok_or_else(|| overflow("Math.Abs")),
        _ => Ok(Value::Float64(float_arg(args, 0)?.abs())),
    }
}

/// The left argument unless comparing it to the right gives `loses_on`
fn pick(name: &str, args: &[Value], loses_on: Ordering) -> EvalResult<Value> {
    arity(name, args, 2)?;
    let keep_left = |ord: Option<Ordering>| ord.is_some_and(|ord| ord != loses_on);
    match (&args[0], &args[1]) {
        (Value::Int32(a), Value::Int32(b)) => {
            Ok(Value::Int32(if keep_left(Some(a.cmp(b))) { *a } else { *b }))
        }
        (Value::Int64(_) | Value::Int32(_), Value::Int64(_) | Value::Int32(_)) => {
            let a = args[0].as_i64().unwrap_or_default();
            let b = args[1].as_i64().unwrap_or_default();
            Ok(Value::Int64(if keep_left(Some(a.cmp(&b))) { a } else { b }))
        }
        _ => {
            let (a, b) = (float_arg(args, 0)?, float_arg(args, 1)?);
            Ok(Value::Float64(if keep_left(a.partial_cmp(&b)) { a } else { b }))
        }
    }
}

fn max(args: &[Value]) -> EvalResult<Value> {
    pick("Math.Max", args, Ordering::Less)
}

fn min(args: &[Value]) -> EvalResult<Value> {
    pick("Math.Min", args, Ordering::Greater)
}

fn unary_float(name: &str, args: &[Value], f: fn(f64) -> f64) -> EvalResult<Value> {
    arity(name, args, 1)?;
    Ok(Value::Float64(f(float_arg(args, 0)?)))
}

/// Rounds half to even, like the CLR default
fn round(args: &[Value]) -> EvalResult<Value> {
    unary_float("Math.Round", args, f64::round_ties_even)
}

fn floor(args: &[Value]) -> EvalResult<Value> {
    unary_float("Math.Floor", args, f64::floor)
}

fn ceiling(args: &[Value]) -> EvalResult<Value> {
    unary_float("Math.Ceiling", args, f64::ceil)
}

fn sqrt(args: &[Value]) -> EvalResult<Value> {
    unary_float("Math.Sqrt", args, f64::sqrt)
}

fn pow(args: &[Value]) -> EvalResult<Value> {
    arity("Math.Pow", args, 2)?;
    Ok(Value::Float64(float_arg(args, 0)?.powf(float_arg(args, 1)?)))
}
