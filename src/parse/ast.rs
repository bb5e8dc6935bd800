use crate::lex::{Span, Token};
use std::fmt;

/// Root of the tree: an ordered sequence of function declarations. Nothing
/// else may appear at the top level.
#[derive(Debug, PartialEq)]
pub struct Prog {
    pub funcs: Vec<FuncDecl>,
}

#[derive(Debug, PartialEq)]
pub struct FuncDecl {
    pub header: FuncHeader,
    pub body: Block,
}

#[derive(Debug, PartialEq)]
pub struct FuncHeader {
    pub name: Token,
    pub params: Vec<Param>,
    /// `None` when the header has no `-> type` clause.
    pub ret_ty: Option<VarType>,
}

#[derive(Debug, PartialEq)]
pub struct Param {
    pub mutable: bool,
    pub name: Token,
    pub ty: VarType,
}

/// Reference prefix on a type or factor: nothing, `&`, or `&mut`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Normal,
    Immutable,
    Mutable,
}

#[derive(Debug, PartialEq)]
pub struct VarType {
    pub kind: TyKind,
    pub ref_kind: RefKind,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum TyKind {
    Int,
    Array { len: i64, elem: Box<VarType> },
    /// Always two or more elements; a parenthesized single type collapses to
    /// the inner type during parsing.
    Tuple(Vec<VarType>),
}

/// Statement block. `tail` holds the trailing semicolon-less expression when
/// the block is used in expression position (function/if/loop value blocks).
#[derive(Debug, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub tail: Option<Box<Expr>>,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum Stmt {
    VarDecl {
        mutable: bool,
        name: Token,
        ty: Option<VarType>,
        init: Option<Box<Expr>>,
    },
    Assign {
        target: AssignElement,
        value: Box<Expr>,
    },
    Expr(Box<Expr>),
    Ret(Span, Option<Box<Expr>>),
    If(IfStmt),
    While {
        cond: Box<Expr>,
        body: Block,
    },
    For {
        mutable: bool,
        var: Token,
        start: Box<Expr>,
        end: Box<Expr>,
        body: Block,
    },
    Loop {
        body: Block,
    },
    Break(Span, Option<Box<Expr>>),
    Continue(Span),
    /// A bare `;`.
    Null,
}

#[derive(Debug, PartialEq)]
pub struct IfStmt {
    pub cond: Box<Expr>,
    pub then_block: Block,
    /// At most one terminal (conditionless) clause, and it is always last.
    pub else_clauses: Vec<ElseClause>,
}

#[derive(Debug, PartialEq)]
pub struct ElseClause {
    pub cond: Option<Box<Expr>>,
    pub block: Block,
}

/// The four prefixes usable both as an assignment target and as an
/// expression operand. The parser builds one of these before it knows which
/// role it will play.
#[derive(Debug, PartialEq)]
pub enum AssignElement {
    Variable {
        name: Token,
    },
    Dereference {
        name: Token,
    },
    ArrayAccess {
        name: Token,
        index: Box<Expr>,
    },
    TupleAccess {
        name: Token,
        field: i64,
        span: Span,
    },
}

impl AssignElement {
    pub fn span(&self) -> Span {
        match self {
            AssignElement::Variable { name } | AssignElement::Dereference { name } => name.span,
            AssignElement::ArrayAccess { name, index } => name.span.to(index.span),
            AssignElement::TupleAccess { span, .. } => *span,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum ExprKind {
    Number(i64),
    Element(AssignElement),
    /// `&expr` / `&mut expr` factor prefix. A factor with no prefix is just
    /// its element; no wrapper node is built for `RefKind::Normal`.
    Ref {
        kind: RefKind,
        expr: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        callee: Token,
        args: Vec<Expr>,
    },
    Paren(Box<Expr>),
    Array(Vec<Expr>),
    /// Always two or more elements (single-element parentheses are `Paren`).
    Tuple(Vec<Expr>),
    Block(Block),
    If {
        cond: Box<Expr>,
        then_block: Block,
        else_block: Block,
    },
    Loop(Block),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,

    // Comparisons
    Lt,
    Gt,
    Le,
    Ge,
    Ne,
    Eq,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinOp::Add => f.write_str("+"),
            BinOp::Sub => f.write_str("-"),
            BinOp::Mul => f.write_str("*"),
            BinOp::Div => f.write_str("/"),
            BinOp::Lt => f.write_str("<"),
            BinOp::Gt => f.write_str(">"),
            BinOp::Le => f.write_str("<="),
            BinOp::Ge => f.write_str(">="),
            BinOp::Ne => f.write_str("!="),
            BinOp::Eq => f.write_str("=="),
        }
    }
}
