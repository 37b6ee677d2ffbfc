// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Expressions
//!
//! This module defines the closed node set every pass in the workspace
//! operates on.
//!
//! ## Design
//!
//! [`Expr`] is one sum type covering two families:
//!
//! - the **base algebra**: constants, parameters, arithmetic and logic,
//!   conditionals, member access, calls, lambdas, record and array
//!   construction. It describes client-side computation.
//! - the **relational extension** ([`crate::query`], [`crate::command`]):
//!   tables, columns, selects, joins, subqueries, aggregates, client
//!   projections and write commands. It describes what the database runs.
//!
//! Nodes are immutable and shared through [`ExprRef`] (`Arc<Expr>`). A
//! structural edit always produces a new node; the `update` methods on each
//! payload return the *original* reference when no child changed, so
//! `Arc::ptr_eq` doubles as a cheap "nothing changed" test for the caller.
//!
//! ```text
//! Binary(Add)
//! ├── Member(c.Price)
//! │   └── Parameter(c)
//! └── Constant(5)
//! ```
//!
//! ## Result types
//!
//! Every node reports the client [`Type`] it would produce via
//! [`Expr::ty`]. Relational sources (tables, selects, joins) produce
//! [`Type::Void`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::alias::ParameterId;
use crate::command::{
    BatchExpr, BlockCommand, DeclarationCommand, DeleteCommand, IfCommand, InsertCommand,
    UpdateCommand, VariableExpr,
};
use crate::error::{IrError, IrResult};
use crate::query::{
    AggregateExpr, AggregateSubqueryExpr, BetweenExpr, ClientJoinExpr, ColumnExpr, EntityExpr,
    ExistsExpr, FunctionExpr, InSubqueryExpr, InValuesExpr, IsNullExpr, JoinExpr,
    NamedValueExpr, OuterJoinedExpr, ProjectionExpr, RowNumberExpr, ScalarSubqueryExpr,
    SelectExpr, TableExpr,
};
use crate::types::Type;
use crate::value::Value;

/// Shared handle to an immutable node
pub type ExprRef = Arc<Expr>;

/// An expression node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    // Base algebra
    Constant(ConstantExpr),
    Parameter(ParameterExpr),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Conditional(ConditionalExpr),
    Call(CallExpr),
    Member(MemberExpr),
    Lambda(LambdaExpr),
    Invoke(InvokeExpr),
    New(NewExpr),
    NewArray(NewArrayExpr),
    Index(IndexExpr),

    // Relational extension
    Table(TableExpr),
    Column(ColumnExpr),
    Select(SelectExpr),
    Join(JoinExpr),
    Projection(ProjectionExpr),
    ClientJoin(ClientJoinExpr),
    Entity(EntityExpr),
    Aggregate(AggregateExpr),
    AggregateSubquery(AggregateSubqueryExpr),
    ScalarSubquery(ScalarSubqueryExpr),
    Exists(ExistsExpr),
    InSubquery(InSubqueryExpr),
    InValues(InValuesExpr),
    IsNull(IsNullExpr),
    Between(BetweenExpr),
    RowNumber(RowNumberExpr),
    NamedValue(NamedValueExpr),
    OuterJoined(OuterJoinedExpr),
    Function(FunctionExpr),

    // Commands
    Insert(InsertCommand),
    Update(UpdateCommand),
    Delete(DeleteCommand),
    Batch(BatchExpr),
    Block(BlockCommand),
    If(IfCommand),
    Declaration(DeclarationCommand),
    Variable(VariableExpr),
}

/// Discriminant of [`Expr`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExprKind {
    Constant,
    Parameter,
    Binary,
    Unary,
    Conditional,
    Call,
    Member,
    Lambda,
    Invoke,
    New,
    NewArray,
    Index,
    Table,
    Column,
    Select,
    Join,
    Projection,
    ClientJoin,
    Entity,
    Aggregate,
    AggregateSubquery,
    ScalarSubquery,
    Exists,
    InSubquery,
    InValues,
    IsNull,
    Between,
    RowNumber,
    NamedValue,
    OuterJoined,
    Function,
    Insert,
    Update,
    Delete,
    Batch,
    Block,
    If,
    Declaration,
    Variable,
}

impl ExprKind {
    pub fn name(self) -> &'static str {
        match self {
            ExprKind::Constant => "Constant",
            ExprKind::Parameter => "Parameter",
            ExprKind::Binary => "Binary",
            ExprKind::Unary => "Unary",
            ExprKind::Conditional => "Conditional",
            ExprKind::Call => "Call",
            ExprKind::Member => "Member",
            ExprKind::Lambda => "Lambda",
            ExprKind::Invoke => "Invoke",
            ExprKind::New => "New",
            ExprKind::NewArray => "NewArray",
            ExprKind::Index => "Index",
            ExprKind::Table => "Table",
            ExprKind::Column => "Column",
            ExprKind::Select => "Select",
            ExprKind::Join => "Join",
            ExprKind::Projection => "Projection",
            ExprKind::ClientJoin => "ClientJoin",
            ExprKind::Entity => "Entity",
            ExprKind::Aggregate => "Aggregate",
            ExprKind::AggregateSubquery => "AggregateSubquery",
            ExprKind::ScalarSubquery => "ScalarSubquery",
            ExprKind::Exists => "Exists",
            ExprKind::InSubquery => "InSubquery",
            ExprKind::InValues => "InValues",
            ExprKind::IsNull => "IsNull",
            ExprKind::Between => "Between",
            ExprKind::RowNumber => "RowNumber",
            ExprKind::NamedValue => "NamedValue",
            ExprKind::OuterJoined => "OuterJoined",
            ExprKind::Function => "Function",
            ExprKind::Insert => "Insert",
            ExprKind::Update => "Update",
            ExprKind::Delete => "Delete",
            ExprKind::Batch => "Batch",
            ExprKind::Block => "Block",
            ExprKind::If => "If",
            ExprKind::Declaration => "Declaration",
            ExprKind::Variable => "Variable",
        }
    }

    /// Whether this kind belongs to the relational extension
    pub fn is_relational(self) -> bool {
        !matches!(
            self,
            ExprKind::Constant
                | ExprKind::Parameter
                | ExprKind::Binary
                | ExprKind::Unary
                | ExprKind::Conditional
                | ExprKind::Call
                | ExprKind::Member
                | ExprKind::Lambda
                | ExprKind::Invoke
                | ExprKind::New
                | ExprKind::NewArray
                | ExprKind::Index
        )
    }

    /// Whether this kind is a write/control command
    pub fn is_command(self) -> bool {
        matches!(
            self,
            ExprKind::Insert
                | ExprKind::Update
                | ExprKind::Delete
                | ExprKind::Batch
                | ExprKind::Block
                | ExprKind::If
                | ExprKind::Declaration
        )
    }
}

impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wrap a payload into a shared node
pub trait IntoExpr {
    fn into_expr(self) -> ExprRef;
}

macro_rules! impl_into_expr {
    ($($variant:ident($payload:ty)),* $(,)?) => {
        $(
            impl From<$payload> for Expr {
                fn from(payload: $payload) -> Self {
                    Expr::$variant(payload)
                }
            }

            impl IntoExpr for $payload {
                fn into_expr(self) -> ExprRef {
                    Arc::new(Expr::$variant(self))
                }
            }
        )*
    };
}

impl_into_expr! {
    Constant(ConstantExpr),
    Parameter(ParameterExpr),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Conditional(ConditionalExpr),
    Call(CallExpr),
    Member(MemberExpr),
    Lambda(LambdaExpr),
    Invoke(InvokeExpr),
    New(NewExpr),
    NewArray(NewArrayExpr),
    Index(IndexExpr),
    Table(TableExpr),
    Column(ColumnExpr),
    Select(SelectExpr),
    Join(JoinExpr),
    Projection(ProjectionExpr),
    ClientJoin(ClientJoinExpr),
    Entity(EntityExpr),
    Aggregate(AggregateExpr),
    AggregateSubquery(AggregateSubqueryExpr),
    ScalarSubquery(ScalarSubqueryExpr),
    Exists(ExistsExpr),
    InSubquery(InSubqueryExpr),
    InValues(InValuesExpr),
    IsNull(IsNullExpr),
    Between(BetweenExpr),
    RowNumber(RowNumberExpr),
    NamedValue(NamedValueExpr),
    OuterJoined(OuterJoinedExpr),
    Function(FunctionExpr),
    Insert(InsertCommand),
    Update(UpdateCommand),
    Delete(DeleteCommand),
    Batch(BatchExpr),
    Block(BlockCommand),
    If(IfCommand),
    Declaration(DeclarationCommand),
    Variable(VariableExpr),
}

impl IntoExpr for Expr {
    fn into_expr(self) -> ExprRef {
        Arc::new(self)
    }
}

/// Reference identity of two nodes
pub fn same(a: &ExprRef, b: &ExprRef) -> bool {
    Arc::ptr_eq(a, b)
}

/// Reference identity of two optional nodes
pub fn same_opt(a: &Option<ExprRef>, b: &Option<ExprRef>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

/// Element-wise reference identity of two node lists
pub fn same_list(a: &[ExprRef], b: &[ExprRef]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| Arc::ptr_eq(a, b))
}

/// Address of a node, usable as a map key for identity-based bookkeeping
pub fn node_id(node: &ExprRef) -> usize {
    Arc::as_ptr(node) as usize
}

// ---------------------------------------------------------------------------
// Base algebra payloads
// ---------------------------------------------------------------------------

/// Literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantExpr {
    pub value: Value,
    pub ty: Type,
}

/// Lambda-bound variable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterExpr {
    pub id: ParameterId,
    pub name: String,
    pub ty: Type,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,

    // Bitwise / non-short-circuit logical
    And,
    Or,
    ExclusiveOr,
    LeftShift,
    RightShift,

    // Short-circuit logical
    AndAlso,
    OrElse,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,

    // Other
    Coalesce,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::LessThan
                | BinaryOp::LessThanOrEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanOrEqual
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::AndAlso | BinaryOp::OrElse)
    }

    /// Source-level operator token
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Power => "^",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::ExclusiveOr => "^^",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
            BinaryOp::AndAlso => "&&",
            BinaryOp::OrElse => "||",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::Coalesce => "??",
        }
    }
}

/// Binary operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: ExprRef,
    pub right: ExprRef,
    pub ty: Type,
}

impl BinaryExpr {
    pub fn update(&self, original: &ExprRef, left: ExprRef, right: ExprRef) -> ExprRef {
        if same(&self.left, &left) && same(&self.right, &right) {
            return original.clone();
        }
        BinaryExpr {
            op: self.op,
            left,
            right,
            ty: self.ty.clone(),
        }
        .into_expr()
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Negate,
    Not,
    /// Conversion to the node's result type
    Convert,
    /// Quoted lambda (kept as an expression, not a value)
    Quote,
    ArrayLength,
}

/// Unary operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: ExprRef,
    pub ty: Type,
}

impl UnaryExpr {
    pub fn update(&self, original: &ExprRef, operand: ExprRef) -> ExprRef {
        if same(&self.operand, &operand) {
            return original.clone();
        }
        UnaryExpr {
            op: self.op,
            operand,
            ty: self.ty.clone(),
        }
        .into_expr()
    }
}

/// Ternary conditional (`test ? if_true : if_false`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalExpr {
    pub test: ExprRef,
    pub if_true: ExprRef,
    pub if_false: ExprRef,
    pub ty: Type,
}

impl ConditionalExpr {
    pub fn update(
        &self,
        original: &ExprRef,
        test: ExprRef,
        if_true: ExprRef,
        if_false: ExprRef,
    ) -> ExprRef {
        if same(&self.test, &test)
            && same(&self.if_true, &if_true)
            && same(&self.if_false, &if_false)
        {
            return original.clone();
        }
        ConditionalExpr {
            test,
            if_true,
            if_false,
            ty: self.ty.clone(),
        }
        .into_expr()
    }
}

/// Identity of a called method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub declaring_type: String,
    pub name: String,
}

impl MethodRef {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.name)
    }
}

/// Method call, static when `object` is `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    pub method: MethodRef,
    pub object: Option<ExprRef>,
    pub args: Vec<ExprRef>,
    pub ty: Type,
}

impl CallExpr {
    pub fn update(
        &self,
        original: &ExprRef,
        object: Option<ExprRef>,
        args: Vec<ExprRef>,
    ) -> ExprRef {
        if same_opt(&self.object, &object) && same_list(&self.args, &args) {
            return original.clone();
        }
        CallExpr {
            method: self.method.clone(),
            object,
            args,
            ty: self.ty.clone(),
        }
        .into_expr()
    }
}

/// Field or property access, static when `object` is `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberExpr {
    pub object: Option<ExprRef>,
    pub member: String,
    pub ty: Type,
}

impl MemberExpr {
    pub fn update(&self, original: &ExprRef, object: Option<ExprRef>) -> ExprRef {
        if same_opt(&self.object, &object) {
            return original.clone();
        }
        MemberExpr {
            object,
            member: self.member.clone(),
            ty: self.ty.clone(),
        }
        .into_expr()
    }
}

/// Lambda abstraction; `params` bind the parameter ids used in `body`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LambdaExpr {
    pub params: Vec<ParameterExpr>,
    pub body: ExprRef,
}

impl LambdaExpr {
    pub fn update(&self, original: &ExprRef, body: ExprRef) -> ExprRef {
        if same(&self.body, &body) {
            return original.clone();
        }
        LambdaExpr {
            params: self.params.clone(),
            body,
        }
        .into_expr()
    }

    pub fn ty(&self) -> Type {
        Type::Function {
            params: self.params.iter().map(|p| p.ty.clone()).collect(),
            ret: Box::new(self.body.ty()),
        }
    }
}

/// Application of a lambda (or other callable expression) to arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeExpr {
    pub target: ExprRef,
    pub args: Vec<ExprRef>,
    pub ty: Type,
}

impl InvokeExpr {
    pub fn update(&self, original: &ExprRef, target: ExprRef, args: Vec<ExprRef>) -> ExprRef {
        if same(&self.target, &target) && same_list(&self.args, &args) {
            return original.clone();
        }
        InvokeExpr {
            target,
            args,
            ty: self.ty.clone(),
        }
        .into_expr()
    }
}

/// Record construction; `members[i]` is initialised from `args[i]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpr {
    pub type_name: String,
    pub members: Vec<String>,
    pub args: Vec<ExprRef>,
}

impl NewExpr {
    pub fn update(&self, original: &ExprRef, args: Vec<ExprRef>) -> ExprRef {
        if same_list(&self.args, &args) {
            return original.clone();
        }
        NewExpr {
            type_name: self.type_name.clone(),
            members: self.members.clone(),
            args,
        }
        .into_expr()
    }
}

/// Array construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArrayExpr {
    pub element_type: Type,
    pub elements: Vec<ExprRef>,
}

impl NewArrayExpr {
    pub fn update(&self, original: &ExprRef, elements: Vec<ExprRef>) -> ExprRef {
        if same_list(&self.elements, &elements) {
            return original.clone();
        }
        NewArrayExpr {
            element_type: self.element_type.clone(),
            elements,
        }
        .into_expr()
    }
}

/// Array indexing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexExpr {
    pub array: ExprRef,
    pub index: ExprRef,
    pub ty: Type,
}

impl IndexExpr {
    pub fn update(&self, original: &ExprRef, array: ExprRef, index: ExprRef) -> ExprRef {
        if same(&self.array, &array) && same(&self.index, &index) {
            return original.clone();
        }
        IndexExpr {
            array,
            index,
            ty: self.ty.clone(),
        }
        .into_expr()
    }
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

impl Expr {
    /// Constant typed by its value
    pub fn constant(value: impl Into<Value>) -> ExprRef {
        let value = value.into();
        let ty = value.type_of();
        ConstantExpr { value, ty }.into_expr()
    }

    /// Constant with an explicit type (e.g. a typed null)
    pub fn typed_constant(value: Value, ty: Type) -> ExprRef {
        ConstantExpr { value, ty }.into_expr()
    }

    /// Binary operation; comparisons and logical operators produce `bool`,
    /// coalesce produces the right operand's type, everything else the left's
    pub fn binary(op: BinaryOp, left: ExprRef, right: ExprRef) -> ExprRef {
        let ty = if op.is_comparison() || op.is_logical() {
            Type::Bool
        } else if op == BinaryOp::Coalesce {
            right.ty()
        } else {
            left.ty()
        };
        BinaryExpr { op, left, right, ty }.into_expr()
    }

    pub fn add(left: ExprRef, right: ExprRef) -> ExprRef {
        Expr::binary(BinaryOp::Add, left, right)
    }

    pub fn equal(left: ExprRef, right: ExprRef) -> ExprRef {
        Expr::binary(BinaryOp::Equal, left, right)
    }

    pub fn and_also(left: ExprRef, right: ExprRef) -> ExprRef {
        Expr::binary(BinaryOp::AndAlso, left, right)
    }

    pub fn or_else(left: ExprRef, right: ExprRef) -> ExprRef {
        Expr::binary(BinaryOp::OrElse, left, right)
    }

    /// Unary operation typed by its operand (`ArrayLength` produces `int`)
    pub fn unary(op: UnaryOp, operand: ExprRef) -> ExprRef {
        let ty = match op {
            UnaryOp::ArrayLength => Type::Int32,
            _ => operand.ty(),
        };
        UnaryExpr { op, operand, ty }.into_expr()
    }

    pub fn not(operand: ExprRef) -> ExprRef {
        Expr::unary(UnaryOp::Not, operand)
    }

    pub fn convert(operand: ExprRef, ty: Type) -> ExprRef {
        UnaryExpr {
            op: UnaryOp::Convert,
            operand,
            ty,
        }
        .into_expr()
    }

    pub fn conditional(test: ExprRef, if_true: ExprRef, if_false: ExprRef) -> ExprRef {
        let ty = if_true.ty();
        ConditionalExpr {
            test,
            if_true,
            if_false,
            ty,
        }
        .into_expr()
    }

    pub fn call(
        method: MethodRef,
        object: Option<ExprRef>,
        args: Vec<ExprRef>,
        ty: Type,
    ) -> ExprRef {
        CallExpr {
            method,
            object,
            args,
            ty,
        }
        .into_expr()
    }

    pub fn member(object: ExprRef, member: impl Into<String>, ty: Type) -> ExprRef {
        MemberExpr {
            object: Some(object),
            member: member.into(),
            ty,
        }
        .into_expr()
    }

    pub fn lambda(params: Vec<ParameterExpr>, body: ExprRef) -> ExprRef {
        LambdaExpr { params, body }.into_expr()
    }

    /// Invocation typed by the target's return type
    pub fn invoke(target: ExprRef, args: Vec<ExprRef>) -> ExprRef {
        let ty = target.ty().return_type().cloned().unwrap_or(Type::Object);
        InvokeExpr { target, args, ty }.into_expr()
    }

    /// Record construction; `members` and `args` must line up
    pub fn new_record(
        type_name: impl Into<String>,
        members: Vec<String>,
        args: Vec<ExprRef>,
    ) -> IrResult<ExprRef> {
        let type_name = type_name.into();
        if members.len() != args.len() {
            return Err(IrError::InvalidArity {
                context: format!("new {}", type_name),
                expected: members.len(),
                found: args.len(),
            });
        }
        Ok(NewExpr {
            type_name,
            members,
            args,
        }
        .into_expr())
    }

    pub fn new_array(element_type: Type, elements: Vec<ExprRef>) -> ExprRef {
        NewArrayExpr {
            element_type,
            elements,
        }
        .into_expr()
    }

    /// Indexing typed by the array's element type
    pub fn index(array: ExprRef, index: ExprRef) -> ExprRef {
        let ty = array.ty().element_type().cloned().unwrap_or(Type::Object);
        IndexExpr { array, index, ty }.into_expr()
    }
}

// ---------------------------------------------------------------------------
// Inspection
// ---------------------------------------------------------------------------

impl Expr {
    pub fn kind(&self) -> ExprKind {
        match self {
            Expr::Constant(_) => ExprKind::Constant,
            Expr::Parameter(_) => ExprKind::Parameter,
            Expr::Binary(_) => ExprKind::Binary,
            Expr::Unary(_) => ExprKind::Unary,
            Expr::Conditional(_) => ExprKind::Conditional,
            Expr::Call(_) => ExprKind::Call,
            Expr::Member(_) => ExprKind::Member,
            Expr::Lambda(_) => ExprKind::Lambda,
            Expr::Invoke(_) => ExprKind::Invoke,
            Expr::New(_) => ExprKind::New,
            Expr::NewArray(_) => ExprKind::NewArray,
            Expr::Index(_) => ExprKind::Index,
            Expr::Table(_) => ExprKind::Table,
            Expr::Column(_) => ExprKind::Column,
            Expr::Select(_) => ExprKind::Select,
            Expr::Join(_) => ExprKind::Join,
            Expr::Projection(_) => ExprKind::Projection,
            Expr::ClientJoin(_) => ExprKind::ClientJoin,
            Expr::Entity(_) => ExprKind::Entity,
            Expr::Aggregate(_) => ExprKind::Aggregate,
            Expr::AggregateSubquery(_) => ExprKind::AggregateSubquery,
            Expr::ScalarSubquery(_) => ExprKind::ScalarSubquery,
            Expr::Exists(_) => ExprKind::Exists,
            Expr::InSubquery(_) => ExprKind::InSubquery,
            Expr::InValues(_) => ExprKind::InValues,
            Expr::IsNull(_) => ExprKind::IsNull,
            Expr::Between(_) => ExprKind::Between,
            Expr::RowNumber(_) => ExprKind::RowNumber,
            Expr::NamedValue(_) => ExprKind::NamedValue,
            Expr::OuterJoined(_) => ExprKind::OuterJoined,
            Expr::Function(_) => ExprKind::Function,
            Expr::Insert(_) => ExprKind::Insert,
            Expr::Update(_) => ExprKind::Update,
            Expr::Delete(_) => ExprKind::Delete,
            Expr::Batch(_) => ExprKind::Batch,
            Expr::Block(_) => ExprKind::Block,
            Expr::If(_) => ExprKind::If,
            Expr::Declaration(_) => ExprKind::Declaration,
            Expr::Variable(_) => ExprKind::Variable,
        }
    }

    /// Client type this node produces
    pub fn ty(&self) -> Type {
        match self {
            Expr::Constant(c) => c.ty.clone(),
            Expr::Parameter(p) => p.ty.clone(),
            Expr::Binary(b) => b.ty.clone(),
            Expr::Unary(u) => u.ty.clone(),
            Expr::Conditional(c) => c.ty.clone(),
            Expr::Call(c) => c.ty.clone(),
            Expr::Member(m) => m.ty.clone(),
            Expr::Lambda(l) => l.ty(),
            Expr::Invoke(i) => i.ty.clone(),
            Expr::New(n) => Type::Named(n.type_name.clone()),
            Expr::NewArray(a) => Type::sequence(a.element_type.clone()),
            Expr::Index(i) => i.ty.clone(),

            Expr::Table(_) | Expr::Select(_) | Expr::Join(_) | Expr::Declaration(_) => Type::Void,
            Expr::Column(c) => c.ty.clone(),
            Expr::Projection(p) => p.ty(),
            Expr::ClientJoin(j) => j.projection.ty(),
            Expr::Entity(e) => e.expr.ty(),
            Expr::Aggregate(a) => a.ty.clone(),
            Expr::AggregateSubquery(a) => a.aggregate_as_subquery.ty(),
            Expr::ScalarSubquery(s) => s.ty.clone(),
            Expr::Exists(_)
            | Expr::InSubquery(_)
            | Expr::InValues(_)
            | Expr::IsNull(_)
            | Expr::Between(_) => Type::Bool,
            Expr::RowNumber(_) => Type::Int32,
            Expr::NamedValue(n) => n.value.ty(),
            Expr::OuterJoined(o) => o.expr.ty(),
            Expr::Function(f) => f.ty.clone(),

            Expr::Insert(_) | Expr::Update(_) | Expr::Delete(_) => Type::Int32,
            Expr::Batch(b) => Type::sequence(
                b.operation
                    .ty()
                    .return_type()
                    .cloned()
                    .unwrap_or(Type::Object),
            ),
            Expr::Block(b) => b.commands.last().map(|c| c.ty()).unwrap_or(Type::Void),
            Expr::If(i) => i.if_true.ty(),
            Expr::Variable(v) => v.ty.clone(),
        }
    }

    /// Direct children, in the order rewriters visit them
    pub fn children(&self) -> Vec<&ExprRef> {
        let mut out = Vec::new();
        match self {
            Expr::Constant(_)
            | Expr::Parameter(_)
            | Expr::Table(_)
            | Expr::Column(_)
            | Expr::Variable(_) => {}
            Expr::Binary(b) => {
                out.push(&b.left);
                out.push(&b.right);
            }
            Expr::Unary(u) => out.push(&u.operand),
            Expr::Conditional(c) => {
                out.push(&c.test);
                out.push(&c.if_true);
                out.push(&c.if_false);
            }
            Expr::Call(c) => {
                out.extend(c.object.iter());
                out.extend(c.args.iter());
            }
            Expr::Member(m) => out.extend(m.object.iter()),
            Expr::Lambda(l) => out.push(&l.body),
            Expr::Invoke(i) => {
                out.push(&i.target);
                out.extend(i.args.iter());
            }
            Expr::New(n) => out.extend(n.args.iter()),
            Expr::NewArray(a) => out.extend(a.elements.iter()),
            Expr::Index(i) => {
                out.push(&i.array);
                out.push(&i.index);
            }
            Expr::Select(s) => {
                out.extend(s.from.iter());
                out.extend(s.where_clause.iter());
                out.extend(s.order_by.iter().map(|o| &o.expr));
                out.extend(s.group_by.iter());
                out.extend(s.skip.iter());
                out.extend(s.take.iter());
                out.extend(s.columns.iter().map(|c| &c.expr));
            }
            Expr::Join(j) => {
                out.push(&j.left);
                out.push(&j.right);
                out.extend(j.condition.iter());
            }
            Expr::Projection(p) => {
                out.push(&p.select);
                out.push(&p.projector);
                out.extend(p.aggregator.iter());
            }
            Expr::ClientJoin(j) => {
                out.push(&j.projection);
                out.extend(j.outer_key.iter());
                out.extend(j.inner_key.iter());
            }
            Expr::Entity(e) => out.push(&e.expr),
            Expr::Aggregate(a) => out.extend(a.argument.iter()),
            Expr::AggregateSubquery(a) => {
                out.push(&a.aggregate_in_group_select);
                out.push(&a.aggregate_as_subquery);
            }
            Expr::ScalarSubquery(s) => out.push(&s.select),
            Expr::Exists(e) => out.push(&e.select),
            Expr::InSubquery(i) => {
                out.push(&i.expr);
                out.push(&i.select);
            }
            Expr::InValues(i) => {
                out.push(&i.expr);
                out.extend(i.values.iter());
            }
            Expr::IsNull(i) => out.push(&i.expr),
            Expr::Between(b) => {
                out.push(&b.expr);
                out.push(&b.lower);
                out.push(&b.upper);
            }
            Expr::RowNumber(r) => out.extend(r.order_by.iter().map(|o| &o.expr)),
            Expr::NamedValue(n) => out.push(&n.value),
            Expr::OuterJoined(o) => {
                out.push(&o.test);
                out.push(&o.expr);
            }
            Expr::Function(f) => out.extend(f.args.iter()),
            Expr::Insert(i) => {
                out.push(&i.table);
                for assignment in &i.assignments {
                    out.push(&assignment.column);
                    out.push(&assignment.expression);
                }
            }
            Expr::Update(u) => {
                out.push(&u.table);
                out.extend(u.where_clause.iter());
                for assignment in &u.assignments {
                    out.push(&assignment.column);
                    out.push(&assignment.expression);
                }
            }
            Expr::Delete(d) => {
                out.push(&d.table);
                out.extend(d.where_clause.iter());
            }
            Expr::Batch(b) => {
                out.push(&b.input);
                out.push(&b.operation);
                out.push(&b.batch_size);
                out.push(&b.stream);
            }
            Expr::Block(b) => out.extend(b.commands.iter()),
            Expr::If(i) => {
                out.push(&i.check);
                out.push(&i.if_true);
                out.extend(i.if_false.iter());
            }
            Expr::Declaration(d) => {
                out.extend(d.variables.iter().map(|v| &v.expression));
                out.extend(d.source.iter());
            }
        }
        out
    }

    /// Whether this node yields a boolean suitable for a `WHERE`/`ON` clause
    /// without further conversion
    pub fn is_predicate(&self) -> bool {
        match self {
            Expr::Binary(b) => {
                b.op.is_comparison()
                    || b.op.is_logical()
                    || (matches!(b.op, BinaryOp::And | BinaryOp::Or) && b.ty.is_bool())
            }
            Expr::Unary(u) => u.op == UnaryOp::Not && u.ty.is_bool(),
            Expr::IsNull(_)
            | Expr::Between(_)
            | Expr::Exists(_)
            | Expr::InSubquery(_)
            | Expr::InValues(_) => true,
            _ => false,
        }
    }

    pub fn as_select(&self) -> Option<&SelectExpr> {
        match self {
            Expr::Select(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_column(&self) -> Option<&ColumnExpr> {
        match self {
            Expr::Column(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            Expr::Constant(c) => Some(&c.value),
            _ => None,
        }
    }

    pub fn as_lambda(&self) -> Option<&LambdaExpr> {
        match self {
            Expr::Lambda(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_projection(&self) -> Option<&ProjectionExpr> {
        match self {
            Expr::Projection(p) => Some(p),
            _ => None,
        }
    }
}
