use crate::{
    err::{LexError, LexErrorKind},
    lex::{Span, Token, TokenKind, TokenKind::*},
};
use std::{collections::HashMap, rc::Rc};

pub struct Lexer {
    src: Rc<str>,
    start_pos: usize,
    pos: usize,
    keywords: HashMap<&'static str, TokenKind>,
}

impl Lexer {
    pub fn new(src: Rc<str>) -> Self {
        Self {
            src,
            start_pos: 0,
            pos: 0,
            keywords: keywords(),
        }
    }

    /// Pull the next token. Comments and whitespace are skipped here, so the
    /// parser never sees them. An unknown character is returned as a
    /// `LexError` instead of a token; the caller decides whether that is
    /// fatal.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        while !self.eof() {
            self.start_pos = self.pos;
            if let Some(t) = self.scan_token() {
                return t;
            }
        }

        Ok(Token::new(
            Eof,
            "",
            Span::new(self.src.len(), self.src.len()),
        ))
    }

    fn scan_token(&mut self) -> Option<Result<Token, LexError>> {
        let c = self.peek();
        self.advance();
        let t = match c {
            b'(' => self.add_token(OpenParen),
            b')' => self.add_token(CloseParen),
            b'{' => self.add_token(OpenBrace),
            b'}' => self.add_token(CloseBrace),
            b'[' => self.add_token(OpenSquare),
            b']' => self.add_token(CloseSquare),
            b',' => self.add_token(Comma),
            b':' => self.add_token(Colon),
            b';' => self.add_token(SemiColon),
            b'&' => self.add_token(And),
            b'+' => self.add_token(Plus),
            b'*' => self.add_token(Star),
            b'.' => {
                if self.eat(b'.') {
                    self.add_token(Range)
                } else {
                    self.add_token(Dot)
                }
            }
            b'-' => {
                if self.eat(b'>') {
                    self.add_token(Arrow)
                } else {
                    self.add_token(Minus)
                }
            }
            b'=' => {
                if self.eat(b'=') {
                    self.add_token(EqEq)
                } else {
                    self.add_token(Eq)
                }
            }
            b'!' => {
                if self.eat(b'=') {
                    self.add_token(Ne)
                } else {
                    return Some(Err(self.unknown_token()));
                }
            }
            b'<' => {
                if self.eat(b'=') {
                    self.add_token(Le)
                } else {
                    self.add_token(Lt)
                }
            }
            b'>' => {
                if self.eat(b'=') {
                    self.add_token(Ge)
                } else {
                    self.add_token(Gt)
                }
            }
            b'/' => {
                if self.eat(b'/') {
                    self.line_comment();
                    return None;
                } else if self.eat(b'*') {
                    self.block_comment();
                    return None;
                } else {
                    self.add_token(Slash)
                }
            }
            b' ' | b'\r' | b'\t' | b'\n' => return None,
            c if c.is_ascii_digit() => self.number(),
            c if is_ident_start(c) => self.ident(),
            _ => {
                // A multi-byte character must be consumed whole before the
                // token text is sliced out of the source.
                self.eat_continuation_bytes();
                return Some(Err(self.unknown_token()));
            }
        };
        Some(Ok(t))
    }

    fn add_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, &self.src[self.start_pos..self.pos], self.mk_span())
    }

    fn unknown_token(&self) -> LexError {
        LexError {
            kind: LexErrorKind::UnknownToken,
            token: self.src[self.start_pos..self.pos].to_string(),
            span: self.mk_span(),
        }
    }

    fn mk_span(&self) -> Span {
        Span::new(self.start_pos, self.pos)
    }

    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == c {
            self.advance();
            true
        } else {
            false
        }
    }

    fn number(&mut self) -> Token {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        self.add_token(Int)
    }

    fn ident(&mut self) -> Token {
        while is_ident_continue(self.peek()) {
            self.advance();
        }

        let text = &self.src[self.start_pos..self.pos];
        let kind = self.keywords.get(text).copied().unwrap_or(Ident);
        self.add_token(kind)
    }

    fn line_comment(&mut self) {
        while self.peek() != b'\n' && !self.eof() {
            self.advance();
        }
    }

    // Block comments nest, so a depth counter is required. An unterminated
    // comment silently runs to end of input.
    fn block_comment(&mut self) {
        let mut depth = 1;
        while depth > 0 && !self.eof() {
            if self.peek() == b'/' && self.peek_next() == b'*' {
                depth += 1;
                self.advance();
                self.advance();
            } else if self.peek() == b'*' && self.peek_next() == b'/' {
                depth -= 1;
                self.advance();
                self.advance();
            } else {
                self.advance();
            }
        }
    }

    fn eat_continuation_bytes(&mut self) {
        while matches!(self.peek(), 0x80..=0xBF) {
            self.advance();
        }
    }

    fn eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> u8 {
        self.src.as_bytes().get(self.pos).copied().unwrap_or_default()
    }

    fn peek_next(&self) -> u8 {
        self.src
            .as_bytes()
            .get(self.pos + 1)
            .copied()
            .unwrap_or_default()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }
}

fn is_ident_start(c: u8) -> bool {
    matches!(c, b'a'..=b'z' | b'A'..=b'Z' | b'_')
}

fn is_ident_continue(c: u8) -> bool {
    matches!(c, b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'0'..=b'9')
}

fn keywords() -> HashMap<&'static str, TokenKind> {
    let mut m = HashMap::new();
    m.insert("fn", Fn);
    m.insert("let", Let);
    m.insert("mut", Mut);
    m.insert("if", If);
    m.insert("else", Else);
    m.insert("while", While);
    m.insert("for", For);
    m.insert("in", In);
    m.insert("loop", Loop);
    m.insert("break", Break);
    m.insert("continue", Continue);
    m.insert("return", Return);
    m.insert("i32", I32);
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src.into());
        let mut out = vec![];
        loop {
            let t = lexer.next_token().unwrap();
            if t.kind == Eof {
                return out;
            }
            out.push(t.kind);
        }
    }

    #[test]
    fn punctuation() {
        assert_eq!(
            kinds("-> .. . = == != <= < >= >"),
            vec![Arrow, Range, Dot, Eq, EqEq, Ne, Le, Lt, Ge, Gt]
        );
    }

    #[test]
    fn keywords_and_idents() {
        assert_eq!(
            kinds("fn foo(mut x: i32) { loop {} }"),
            vec![
                Fn, Ident, OpenParen, Mut, Ident, Colon, I32, CloseParen, OpenBrace, Loop,
                OpenBrace, CloseBrace, CloseBrace
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(kinds("1 // one\n/* two /* three */ */ 2"), vec![Int, Int]);
    }

    #[test]
    fn unknown_char() {
        let mut lexer = Lexer::new("let a = @;".into());
        for _ in 0..3 {
            lexer.next_token().unwrap();
        }
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnknownToken);
        assert_eq!(err.token, "@");
    }

    #[test]
    fn unknown_multibyte_char() {
        let mut lexer = Lexer::new("let a = § 2;".into());
        for _ in 0..3 {
            lexer.next_token().unwrap();
        }
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnknownToken);
        assert_eq!(err.token, "§");
        // The scanner resynchronizes on the next character.
        assert_eq!(lexer.next_token().unwrap().kind, Int);
    }
}
