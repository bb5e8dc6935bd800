use crate::lex::Span;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: Rc<str>,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: &str, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }

    pub fn dummy() -> Self {
        Self {
            kind: TokenKind::Eof,
            text: "".into(),
            span: Span::DUMMY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Single-character tokens.
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenSquare,
    CloseSquare,
    Comma,
    Dot,
    Colon,
    SemiColon,
    And,
    Eq,
    Lt,
    Gt,
    Plus,
    Minus,
    Star,
    Slash,

    // Two-character tokens.
    EqEq,
    Ne,
    Le,
    Ge,
    Range,
    Arrow,

    // Literals.
    Ident,
    Int,

    // Keywords.
    Fn,
    Let,
    Mut,
    If,
    Else,
    While,
    For,
    In,
    Loop,
    Break,
    Continue,
    Return,
    I32,

    Eof,
}
