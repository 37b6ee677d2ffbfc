// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Row reader contract
//!
//! Projectors inside a [`ProjectionExpr`](crate::ProjectionExpr) are written
//! against an ordinal-indexed, typed row reader. This crate never implements
//! the reader; it only defines the shape and builds projector calls against
//! it.

use crate::expr::{Expr, ExprRef, MethodRef};
use crate::types::Type;
use crate::value::Value;

/// Declaring type name used for reader method calls
pub const READER_TYPE: &str = "FieldReader";

/// Ordinal-indexed typed access to one result row
pub trait FieldReader {
    fn field_count(&self) -> usize;
    fn field_type(&self, ordinal: usize) -> Option<Type>;
    fn is_null(&self, ordinal: usize) -> bool;
    fn get_int32(&self, ordinal: usize) -> Option<i32>;
    fn get_int64(&self, ordinal: usize) -> Option<i64>;
    fn get_double(&self, ordinal: usize) -> Option<f64>;
    fn get_boolean(&self, ordinal: usize) -> Option<bool>;
    fn get_string(&self, ordinal: usize) -> Option<String>;
    fn get_bytes(&self, ordinal: usize) -> Option<Vec<u8>>;

    /// Read a field as a [`Value`] of the requested type
    fn get_value(&self, ordinal: usize, ty: &Type) -> Option<Value> {
        if self.is_null(ordinal) {
            return Some(Value::Null);
        }
        match ty.non_nullable() {
            Type::Int32 => self.get_int32(ordinal).map(Value::Int32),
            Type::Int64 => self.get_int64(ordinal).map(Value::Int64),
            Type::Float64 => self.get_double(ordinal).map(Value::Float64),
            Type::Bool => self.get_boolean(ordinal).map(Value::Bool),
            Type::String => self.get_string(ordinal).map(Value::String),
            Type::Bytes => self.get_bytes(ordinal).map(Value::Bytes),
            _ => None,
        }
    }
}

/// Reader method that produces values of `ty`
pub fn reader_method(ty: &Type) -> &'static str {
    match ty.non_nullable() {
        Type::Int32 => "GetInt32",
        Type::Int64 => "GetInt64",
        Type::Float64 => "GetDouble",
        Type::Bool => "GetBoolean",
        Type::String => "GetString",
        Type::Bytes => "GetBytes",
        _ => "GetValue",
    }
}

/// Projector fragment reading field `ordinal` of `reader` as `ty`
pub fn read_field(reader: ExprRef, ordinal: i32, ty: Type) -> ExprRef {
    Expr::call(
        MethodRef::new(READER_TYPE, reader_method(&ty)),
        Some(reader),
        vec![Expr::constant(ordinal)],
        ty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasAllocator;

    struct Row(Vec<Value>);

    impl FieldReader for Row {
        fn field_count(&self) -> usize {
            self.0.len()
        }
        fn field_type(&self, ordinal: usize) -> Option<Type> {
            self.0.get(ordinal).map(Value::type_of)
        }
        fn is_null(&self, ordinal: usize) -> bool {
            matches!(self.0.get(ordinal), Some(Value::Null))
        }
        fn get_int32(&self, ordinal: usize) -> Option<i32> {
            match self.0.get(ordinal) {
                Some(Value::Int32(v)) => Some(*v),
                _ => None,
            }
        }
        fn get_int64(&self, ordinal: usize) -> Option<i64> {
            self.0.get(ordinal).and_then(Value::as_i64)
        }
        fn get_double(&self, ordinal: usize) -> Option<f64> {
            self.0.get(ordinal).and_then(Value::as_f64)
        }
        fn get_boolean(&self, ordinal: usize) -> Option<bool> {
            self.0.get(ordinal).and_then(Value::as_bool)
        }
        fn get_string(&self, ordinal: usize) -> Option<String> {
            self.0.get(ordinal).and_then(Value::as_str).map(str::to_string)
        }
        fn get_bytes(&self, _ordinal: usize) -> Option<Vec<u8>> {
            None
        }
    }

    #[test]
    fn test_get_value_by_type() {
        let row = Row(vec![Value::Int32(7), Value::Null, Value::from("x")]);
        assert_eq!(row.get_value(0, &Type::Int32), Some(Value::Int32(7)));
        assert_eq!(row.get_value(1, &Type::nullable(Type::Int32)), Some(Value::Null));
        assert_eq!(row.get_value(2, &Type::String), Some(Value::from("x")));
        assert_eq!(row.field_count(), 3);
    }

    #[test]
    fn test_read_field_builds_call() {
        let reader = AliasAllocator::new().parameter("reader", Type::Reader);
        let call = read_field(reader, 2, Type::String);
        let Expr::Call(call) = call.as_ref() else {
            panic!("expected call");
        };
        assert_eq!(call.method.name, "GetString");
        assert_eq!(call.ty, Type::String);
        assert_eq!(call.args.len(), 1);
    }
}
