//! Syntax tree for predicate programs.

use crate::predicate::value::Value;

/// A parsed predicate: an optional arrow parameter and one expression body.
#[derive(Debug, Clone)]
pub struct Program {
    /// Name bound by an `x =>` header. Without a header the item is bound
    /// to both `item` and `cast`.
    pub param: Option<String>,
    pub body: Expr,
}

#[derive(Debug, Clone)]
pub enum Expr {
    /// Number, string, boolean, null, or compiled regex literal.
    Literal(Value),
    List(Vec<Expr>),
    Ident(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `&&`, `||`, `??`: right side evaluated only when needed.
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        optional: bool,
    },
    /// Builtin function call `name(args)`.
    Call {
        function: String,
        args: Vec<Expr>,
    },
    /// Method call `receiver.name(args)` or `receiver?.name(args)`.
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
        optional: bool,
    },
    /// `x => body`, only valid as a method argument.
    Lambda {
        param: String,
        body: Box<Expr>,
    },
    /// Boundary of an optional chain: a short-circuit anywhere inside
    /// yields `null` here and stops.
    Chain(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }
}
