// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Builtin host functions
//!
//! Each module exposes `all_functions()` returning its method table.

pub mod math;
pub mod string;

use relq_ir::Value;

use crate::error::{EvalError, EvalResult};

fn arity(name: &str, args: &[Value], expected: usize) -> EvalResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(EvalError::Host {
            name: name.to_string(),
            message: format!("expected {} arguments, found {}", expected, args.len()),
        })
    }
}

fn string_arg<'a>(args: &'a [Value], index: usize) -> EvalResult<&'a str> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(EvalError::type_mismatch("String", other.type_of().to_string())),
        None => Err(EvalError::type_mismatch("String", "nothing")),
    }
}

fn float_arg(args: &[Value], index: usize) -> EvalResult<f64> {
    match args.get(index) {
        Some(value) => value
            .as_f64()
            .ok_or_else(|| EvalError::type_mismatch("number", value.type_of().to_string())),
        None => Err(EvalError::type_mismatch("number", "nothing")),
    }
}

fn int_arg(args: &[Value], index: usize) -> EvalResult<i64> {
    match args.get(index) {
        Some(value) => value
            .as_i64()
            .ok_or_else(|| EvalError::type_mismatch("integer", value.type_of().to_string())),
        None => Err(EvalError::type_mismatch("integer", "nothing")),
    }
}
