// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! `String` methods
//!
//! Instance methods take the receiver as argument 0. Positions count
//! characters, not bytes.

use std::sync::Arc;

use relq_ir::{MethodRef, Value};

use super::{arity, int_arg, string_arg};
use crate::error::{EvalError, EvalResult};
use crate::eval::registry::HostFunction;

fn method(name: &str, f: fn(&[Value]) -> EvalResult<Value>) -> (MethodRef, HostFunction) {
    let function: HostFunction = Arc::new(f);
    (MethodRef::new("String", name), function)
}

pub fn all_functions() -> Vec<(MethodRef, HostFunction)> {
    vec![
        method("ToUpper", to_upper),
        method("ToLower", to_lower),
        method("Trim", trim),
        method("Substring", substring),
        method("Contains", contains),
        method("StartsWith", starts_with),
        method("EndsWith", ends_with),
        method("Replace", replace),
        method("Concat", concat),
    ]
}

fn to_upper(args: &[Value]) -> EvalResult<Value> {
    arity("String.ToUpper", args, 1)?;
    Ok(Value::String(string_arg(args, 0)?.to_uppercase()))
}

fn to_lower(args: &[Value]) -> EvalResult<Value> {
    arity("String.ToLower", args, 1)?;
    Ok(Value::String(string_arg(args, 0)?.to_lowercase()))
}

fn trim(args: &[Value]) -> EvalResult<Value> {
    arity("String.Trim", args, 1)?;
    Ok(Value::String(string_arg(args, 0)?.trim().to_string()))
}

fn substring(args: &[Value]) -> EvalResult<Value> {
    if args.len() != 2 {
        arity("String.Substring", args, 3)?;
    }
    let s = string_arg(args, 0)?;
    let len = s.chars().count();
    let start = int_arg(args, 1)?;
    let start = usize::try_from(start)
        .ok()
        .filter(|start| *start <= len)
        .ok_or(EvalError::IndexOutOfRange { index: start, len })?;
    let count = if args.len() == 3 {
        let count = int_arg(args, 2)?;
        usize::try_from(count)
            .ok()
            .filter(|count| start + *count <= len)
            .ok_or(EvalError::IndexOutOfRange {
                index: count,
                len: len - start,
            })?
    } else {
        len - start
    };
    Ok(Value::String(s.chars().skip(start).take(count).collect()))
}

fn contains(args: &[Value]) -> EvalResult<Value> {
    arity("String.Contains", args, 2)?;
    Ok(Value::Bool(string_arg(args, 0)?.contains(string_arg(args, 1)?)))
}

fn starts_with(args: &[Value]) -> EvalResult<Value> {
    arity("String.StartsWith", args, 2)?;
    Ok(Value::Bool(string_arg(args, 0)?.starts_with(string_arg(args, 1)?)))
}

fn ends_with(args: &[Value]) -> EvalResult<Value> {
    arity("String.EndsWith", args, 2)?;
    Ok(Value::Bool(string_arg(args, 0)?.ends_with(string_arg(args, 1)?)))
}

fn replace(args: &[Value]) -> EvalResult<Value> {
    arity("String.Replace", args, 3)?;
    let s = string_arg(args, 0)?;
    let from = string_arg(args, 1)?;
    if from.is_empty() {
        return Err(EvalError::Host {
            name: "String.Replace".to_string(),
            message: "search string is empty".to_string(),
        });
    }
    Ok(Value::String(s.replace(from, string_arg(args, 2)?)))
}

/// Static concatenation; nulls concatenate as empty
fn concat(args: &[Value]) -> EvalResult<Value> {
    let mut out = String::new();
    for arg in args {
        match arg {
            Value::Null => {}
            Value::String(s) => out.push_str(s),
            Value::Int32(v) => out.push_str(&v.to_string()),
            Value::Int64(v) => out.push_str(&v.to_string()),
            Value::Float64(v) => out.push_str(&v.to_string()),
            Value::Bool(v) => out.push_str(if *v { "True" } else { "False" }),
            other => return Err(EvalError::type_mismatch("String", other.type_of().to_string())),
        }
    }
    Ok(Value::String(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::from(v)
    }

    #[test]
    fn test_case_and_trim() {
        assert_eq!(to_upper(&[s("ab")]).unwrap(), s("AB"));
        assert_eq!(to_lower(&[s("AB")]).unwrap(), s("ab"));
        assert_eq!(trim(&[s("  x ")]).unwrap(), s("x"));
    }

    #[test]
    fn test_substring_bounds() {
        assert_eq!(substring(&[s("London"), Value::Int32(2)]).unwrap(), s("ndon"));
        assert_eq!(substring(&[s("London"), Value::Int32(1), Value::Int32(3)]).unwrap(), s("ond"));
        assert!(matches!(
            substring(&[s("abc"), Value::Int32(5)]),
            Err(EvalError::IndexOutOfRange { index: 5, len: 3 })
        ));
    }

    #[test]
    fn test_predicates() {
        assert_eq!(contains(&[s("London"), s("ond")]).unwrap(), Value::Bool(true));
        assert_eq!(starts_with(&[s("London"), s("Lo")]).unwrap(), Value::Bool(true));
        assert_eq!(ends_with(&[s("London"), s("x")]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_concat_skips_null() {
        assert_eq!(concat(&[s("a"), Value::Null, Value::Int32(1)]).unwrap(), s("a1"));
    }

    #[test]
    fn test_wrong_receiver_type() {
        assert!(matches!(to_upper(&[Value::Int32(1)]), Err(EvalError::TypeMismatch { .. })));
    }
}
