// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Partial evaluation
//!
//! Folds every subtree that does not depend on a query parameter into a
//! literal, in two passes:
//!
//! 1. **Nominate** ([`nominator`]): bottom-up, mark the candidates.
//! 2. **Evaluate**: top-down, the first candidate met on each path is run
//!    through the [`Interpreter`] and replaced by a constant. Its subtree is
//!    not visited further.
//!
//! A conditional whose test is a candidate but whose branches are not has
//! only the test executed; the selected branch replaces the conditional and
//! the other one is dropped without being evaluated.
//!
//! A caller-supplied hook sees every new constant and may replace it, for
//! example with a named query parameter.

pub mod builtin;
pub mod interpreter;
pub mod nominator;
pub mod registry;

use std::collections::HashSet;

use relq_ir::{ConditionalExpr, Expr, ExprRef, UnaryOp, Value, node_id};
use tracing::{debug, instrument, trace};

use crate::error::RewriteResult;
use crate::guard::{DEFAULT_RECURSION_LIMIT, RecursionGuard};
use crate::visitor::{Rewriter, rebuild};

pub use interpreter::Interpreter;
pub use nominator::{Nominator, can_evaluate_locally, nominate};
pub use registry::{FunctionRegistry, HostFunction};

/// Configurable partial evaluator
pub struct PartialEvaluator<'a> {
    can_evaluate: Box<dyn Fn(&ExprRef) -> bool + 'a>,
    on_eval: Option<Box<dyn FnMut(ExprRef) -> ExprRef + 'a>>,
    registry: FunctionRegistry,
    recursion_limit: usize,
}

impl Default for PartialEvaluator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> PartialEvaluator<'a> {
    /// Evaluator with the default predicate, no hook and the builtin functions
    pub fn new() -> Self {
        Self {
            can_evaluate: Box::new(can_evaluate_locally),
            on_eval: None,
            registry: FunctionRegistry::new(),
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Builder method: replace the candidacy predicate
    pub fn with_can_evaluate(mut self, can_evaluate: impl Fn(&ExprRef) -> bool + 'a) -> Self {
        self.can_evaluate = Box::new(can_evaluate);
        self
    }

    /// Builder method: post-process every folded constant
    pub fn with_on_eval(mut self, on_eval: impl FnMut(ExprRef) -> ExprRef + 'a) -> Self {
        self.on_eval = Some(Box::new(on_eval));
        self
    }

    pub fn with_registry(mut self, registry: FunctionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn registry_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.registry
    }

    /// Fold every locally evaluable subtree of `expr`
    #[instrument(skip_all)]
    pub fn evaluate(&mut self, expr: &ExprRef) -> RewriteResult<ExprRef> {
        let can_evaluate = &self.can_evaluate;
        let candidates = Nominator::new(|node: &ExprRef| can_evaluate(node))
            .with_recursion_limit(self.recursion_limit)
            .nominate(expr)?;
        if candidates.is_empty() {
            return Ok(expr.clone());
        }

        let mut folder = SubtreeEvaluator {
            guard: RecursionGuard::with_limit(self.recursion_limit),
            candidates,
            registry: &self.registry,
            recursion_limit: self.recursion_limit,
            on_eval: self.on_eval.as_deref_mut(),
            folded: 0,
        };
        let result = folder.rewrite(expr)?;
        if folder.folded > 0 {
            debug!(folded = folder.folded, "partially evaluated expression");
        }
        Ok(result)
    }
}

/// Fold `expr` with an optional candidacy predicate and post-evaluation hook
///
/// `None` selects [`can_evaluate_locally`] and no hook respectively.
pub fn evaluate(
    expr: &ExprRef,
    can_evaluate: Option<&dyn Fn(&ExprRef) -> bool>,
    on_eval: Option<&mut dyn FnMut(ExprRef) -> ExprRef>,
) -> RewriteResult<ExprRef> {
    let mut evaluator = PartialEvaluator::new();
    if let Some(can_evaluate) = can_evaluate {
        evaluator = evaluator.with_can_evaluate(can_evaluate);
    }
    if let Some(on_eval) = on_eval {
        evaluator = evaluator.with_on_eval(on_eval);
    }
    evaluator.evaluate(expr)
}

struct SubtreeEvaluator<'b, 'a> {
    guard: RecursionGuard,
    candidates: HashSet<usize>,
    registry: &'b FunctionRegistry,
    recursion_limit: usize,
    on_eval: Option<&'b mut (dyn FnMut(ExprRef) -> ExprRef + 'a)>,
    folded: usize,
}

impl SubtreeEvaluator<'_, '_> {
    fn interpret(&self, node: &ExprRef) -> RewriteResult<Value> {
        Interpreter::new(self.registry)
            .with_recursion_limit(self.recursion_limit)
            .interpret(node)
    }

    fn evaluate(&mut self, node: &ExprRef) -> RewriteResult<ExprRef> {
        let ty = node.ty();
        let mut target = node;
        if let Expr::Unary(unary) = node.as_ref() {
            if unary.op == UnaryOp::Convert
                && unary.operand.ty().non_nullable() == ty.non_nullable()
            {
                target = &unary.operand;
            }
        }
        if let Expr::Constant(constant) = target.as_ref() {
            if constant.ty == ty {
                return Ok(target.clone());
            }
            if constant.ty.non_nullable() == ty.non_nullable() {
                return Ok(Expr::typed_constant(constant.value.clone(), ty));
            }
        }

        let value = interpreter::coerce(self.interpret(target)?, &ty);
        self.folded += 1;
        trace!(kind = %node.kind(), "folded subtree");
        let folded = Expr::typed_constant(value, ty);
        Ok(match self.on_eval.as_deref_mut() {
            Some(on_eval) => on_eval(folded),
            None => folded,
        })
    }

    fn fold_conditional(
        &mut self,
        node: &ExprRef,
        conditional: &ConditionalExpr,
    ) -> RewriteResult<ExprRef> {
        if self.candidates.contains(&node_id(&conditional.test)) {
            if let Value::Bool(test) = self.interpret(&conditional.test)? {
                trace!(test, "selected conditional branch");
                let branch = if test {
                    &conditional.if_true
                } else {
                    &conditional.if_false
                };
                return self.rewrite(branch);
            }
        }
        rebuild(self, node)
    }
}

impl Rewriter for SubtreeEvaluator<'_, '_> {
    fn guard(&self) -> &RecursionGuard {
        &self.guard
    }

    fn rewrite(&mut self, node: &ExprRef) -> RewriteResult<ExprRef> {
        if self.candidates.contains(&node_id(node)) {
            return self.evaluate(node);
        }
        self.guard.enter()?;
        let result = match node.as_ref() {
            Expr::Conditional(conditional) => self.fold_conditional(node, conditional),
            _ => rebuild(self, node),
        };
        self.guard.exit();
        result
    }
}
