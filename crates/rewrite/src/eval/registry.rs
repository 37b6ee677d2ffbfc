// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use relq_ir::{MethodRef, Value};

use super::builtin;
use crate::error::EvalResult;

/// A function the interpreter can call
///
/// Instance methods receive the target object as the first argument.
pub type HostFunction = Arc<dyn Fn(&[Value]) -> EvalResult<Value> + Send + Sync>;

/// Host functions available to the partial evaluator
///
/// Functions are keyed by declaring type and name. Lookup falls back to a
/// case-insensitive match so `"string.toupper"` still resolves.
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: HashMap<MethodRef, HostFunction>,
}

impl FunctionRegistry {
    /// Create a registry with the builtin string and math functions loaded
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for (method, function) in builtin::string::all_functions()
            .into_iter()
            .chain(builtin::math::all_functions())
        {
            registry.functions.insert(method, function);
        }
        registry
    }

    /// Create a registry with no functions
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Register (or replace) a host function
    pub fn register<F>(&mut self, declaring_type: &str, name: &str, function: F)
    where
        F: Fn(&[Value]) -> EvalResult<Value> + Send + Sync + 'static,
    {
        self.functions
            .insert(MethodRef::new(declaring_type, name), Arc::new(function));
    }

    /// Lookup a function by method identity
    pub fn get_function(&self, method: &MethodRef) -> Option<&HostFunction> {
        self.functions.get(method).or_else(|| {
            self.functions
                .iter()
                .find(|(key, _)| {
                    key.declaring_type.eq_ignore_ascii_case(&method.declaring_type)
                        && key.name.eq_ignore_ascii_case(&method.name)
                })
                .map(|(_, function)| function)
        })
    }

    pub fn has_function(&self, method: &MethodRef) -> bool {
        self.get_function(method).is_some()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.functions.keys().map(|m| m.to_string()).collect();
        names.sort();
        f.debug_struct("FunctionRegistry").field("functions", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_builtins() {
        let registry = FunctionRegistry::new();
        assert!(!registry.is_empty());
        assert!(registry.has_function(&MethodRef::new("String", "ToUpper")));
        assert!(registry.has_function(&MethodRef::new("Math", "Abs")));
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let registry = FunctionRegistry::new();
        assert!(registry.has_function(&MethodRef::new("string", "toupper")));
        assert!(!registry.has_function(&MethodRef::new("String", "Reverse")));
    }

    #[test]
    fn test_register_host_function() {
        let mut registry = FunctionRegistry::empty();
        registry.register("Host", "Answer", |_| Ok(Value::Int32(42)));
        let function = registry.get_function(&MethodRef::new("Host", "Answer")).unwrap();
        assert_eq!(function(&[]).unwrap(), Value::Int32(42));
    }
}
