pub mod ast;

use crate::{
    err::{Handler, Result},
    lex::{Lexer, Token, TokenKind, TokenKind::*},
};
use ast::{
    AssignElement, BinOp, Block, ElseClause, Expr, ExprKind, FuncDecl, FuncHeader, IfStmt, Param,
    Prog, RefKind, Stmt, TyKind, VarType,
};
use std::rc::Rc;

/// Outcome of `stmt_or_expr`: a committed statement, or an expression whose
/// role (expression statement vs. block tail value) the enclosing block
/// decides based on the presence of a semicolon.
enum StmtOrExpr {
    Stmt(Stmt),
    Expr(Box<Expr>),
}

pub struct Parser {
    lexer: Lexer,
    handler: Rc<Handler>,
    curr: Token,
    lookahead: Option<Token>,
}

impl Parser {
    pub fn new(src: Rc<str>, handler: &Rc<Handler>) -> Self {
        Self {
            lexer: Lexer::new(src),
            handler: handler.clone(),
            curr: Token::dummy(),
            lookahead: None,
        }
    }

    /// Parse a whole program: function declarations until end of input.
    /// The first syntax error aborts parsing; the diagnostic is recorded in
    /// the `Handler` before `Err` is returned.
    pub fn parse(&mut self) -> Result<Prog> {
        self.advance()?;
        let mut funcs = vec![];
        while !self.eof() {
            funcs.push(self.func_decl()?);
        }
        Ok(Prog { funcs })
    }

    fn func_decl(&mut self) -> Result<FuncDecl> {
        let header = self.func_header()?;
        let body = self.block()?;
        Ok(FuncDecl { header, body })
    }

    fn func_header(&mut self) -> Result<FuncHeader> {
        self.expect(Fn, "Expected 'fn'")?;
        let name = self.expect(Ident, "Expected function name")?;

        self.expect(OpenParen, "Expected '(' after function name")?;
        let mut params = vec![];
        while !self.check(CloseParen) {
            params.push(self.param()?);
            if !self.eat(Comma)? {
                break;
            }
        }
        self.expect(CloseParen, "Expected ')' after parameters")?;

        let ret_ty = if self.eat(Arrow)? {
            Some(self.var_type()?)
        } else {
            None
        };
        Ok(FuncHeader {
            name,
            params,
            ret_ty,
        })
    }

    fn param(&mut self) -> Result<Param> {
        let mutable = self.eat(Mut)?;
        let name = self.expect(Ident, "Expected parameter name")?;
        self.expect(Colon, "Expected ':' after parameter name")?;
        let ty = self.var_type()?;
        Ok(Param { mutable, name, ty })
    }

    /// `{ stmt* expr? }`. A trailing expression with no semicolon becomes
    /// the block's tail value, which is how a block gets reclassified as an
    /// expression block.
    fn block(&mut self) -> Result<Block> {
        let start = self.curr.span;
        self.expect(OpenBrace, "Expected '{'")?;

        let mut stmts = vec![];
        let mut tail = None;
        while !self.check(CloseBrace) && !self.eof() {
            match self.stmt_or_expr()? {
                StmtOrExpr::Stmt(s) => stmts.push(s),
                StmtOrExpr::Expr(e) => {
                    if self.eat(SemiColon)? {
                        stmts.push(Stmt::Expr(e));
                    } else {
                        tail = Some(e);
                        break;
                    }
                }
            }
        }

        let close = self.expect(CloseBrace, "Expected '}' after block")?;
        Ok(Block {
            stmts,
            tail,
            span: start.to(close.span),
        })
    }

    fn stmt_or_expr(&mut self) -> Result<StmtOrExpr> {
        let stmt = match self.curr.kind {
            Let => self.var_decl_stmt()?,
            Return => self.ret_stmt()?,
            Ident | Star => {
                if self.check(Ident) && self.check_ahead(OpenParen)? {
                    return Ok(StmtOrExpr::Expr(self.call_expr()?));
                }
                // x, *x, x[i] and x.0 can all open either an assignment or
                // an expression. Parse the common prefix once, then peek for
                // '='; without it, the element is handed down to the
                // expression ladder as a pre-parsed leaf.
                let elem = self.assign_element()?;
                if self.check(Eq) {
                    self.assign_stmt(elem)?
                } else {
                    return Ok(StmtOrExpr::Expr(self.expr(Some(elem))?));
                }
            }
            Int | OpenParen | OpenSquare | And => {
                return Ok(StmtOrExpr::Expr(self.expr(None)?));
            }
            If => self.if_stmt()?,
            While => self.while_stmt()?,
            For => self.for_stmt()?,
            Loop => self.loop_stmt()?,
            Break => self.break_stmt()?,
            Continue => {
                let span = self.curr.span;
                self.advance()?;
                self.expect(SemiColon, "Expected ';' after 'continue'")?;
                Stmt::Continue(span)
            }
            SemiColon => {
                self.advance()?;
                Stmt::Null
            }
            _ => {
                return self
                    .handler
                    .raise(self.curr.span, &self.curr.text, "Expected a statement");
            }
        };
        Ok(StmtOrExpr::Stmt(stmt))
    }

    fn var_decl_stmt(&mut self) -> Result<Stmt> {
        self.expect(Let, "Expected 'let'")?;
        let mutable = self.eat(Mut)?;
        let name = self.expect(Ident, "Expected variable name")?;

        let ty = if self.eat(Colon)? {
            Some(self.var_type()?)
        } else {
            None
        };

        let init = if self.eat(Eq)? {
            Some(self.expr(None)?)
        } else {
            None
        };

        self.expect(SemiColon, "Expected ';' after variable declaration")?;
        Ok(Stmt::VarDecl {
            mutable,
            name,
            ty,
            init,
        })
    }

    fn ret_stmt(&mut self) -> Result<Stmt> {
        let ret = self.expect(Return, "Expected 'return'")?;

        if self.eat(SemiColon)? {
            return Ok(Stmt::Ret(ret.span, None));
        }

        let val = self.cmp_expr(None)?;
        self.expect(SemiColon, "Expected ';' after return value")?;
        Ok(Stmt::Ret(ret.span, Some(val)))
    }

    fn assign_stmt(&mut self, target: AssignElement) -> Result<Stmt> {
        self.expect(Eq, "Expected '='")?;
        let value = self.expr(None)?;
        self.expect(SemiColon, "Expected ';' after assignment")?;
        Ok(Stmt::Assign { target, value })
    }

    fn assign_element(&mut self) -> Result<AssignElement> {
        if self.eat(Star)? {
            let name = self.expect(Ident, "Expected identifier after '*'")?;
            return Ok(AssignElement::Dereference { name });
        }

        let name = self.expect(Ident, "Expected identifier")?;
        if self.eat(OpenSquare)? {
            let index = self.expr(None)?;
            self.expect(CloseSquare, "Expected ']' after index")?;
            return Ok(AssignElement::ArrayAccess { name, index });
        }

        if self.eat(Dot)? {
            let field_tok = self.expect(Int, "Expected tuple index after '.'")?;
            let field = match field_tok.text.parse() {
                Ok(v) => v,
                Err(_) => {
                    return self.handler.raise(
                        field_tok.span,
                        &field_tok.text,
                        "Tuple index out of range",
                    )
                }
            };
            let span = name.span.to(field_tok.span);
            return Ok(AssignElement::TupleAccess { name, field, span });
        }

        Ok(AssignElement::Variable { name })
    }

    /// Expression entry point. `elem` is an already-parsed assignable element
    /// that becomes the leftmost leaf instead of being re-parsed.
    fn expr(&mut self, elem: Option<AssignElement>) -> Result<Box<Expr>> {
        if elem.is_none() {
            if self.check(OpenBrace) {
                let block = self.block()?;
                let span = block.span;
                return Ok(Box::new(Expr {
                    kind: ExprKind::Block(block),
                    span,
                }));
            }
            if self.check(If) {
                return self.if_expr();
            }
            if self.check(Loop) {
                return self.loop_expr();
            }
        }
        self.cmp_expr(elem)
    }

    // Comparisons chain left-associatively: a < b < c is (a < b) < c. This
    // is a policy choice, not an accident.
    fn cmp_expr(&mut self, elem: Option<AssignElement>) -> Result<Box<Expr>> {
        let mut left = self.add_expr(elem)?;

        loop {
            let op = if self.eat(Lt)? {
                BinOp::Lt
            } else if self.eat(Le)? {
                BinOp::Le
            } else if self.eat(Gt)? {
                BinOp::Gt
            } else if self.eat(Ge)? {
                BinOp::Ge
            } else if self.eat(EqEq)? {
                BinOp::Eq
            } else if self.eat(Ne)? {
                BinOp::Ne
            } else {
                break;
            };
            let right = self.add_expr(None)?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn add_expr(&mut self, elem: Option<AssignElement>) -> Result<Box<Expr>> {
        let mut left = self.mul_expr(elem)?;

        loop {
            let op = if self.eat(Plus)? {
                BinOp::Add
            } else if self.eat(Minus)? {
                BinOp::Sub
            } else {
                break;
            };
            let right = self.mul_expr(None)?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn mul_expr(&mut self, elem: Option<AssignElement>) -> Result<Box<Expr>> {
        let mut left = self.factor(elem)?;

        loop {
            let op = if self.eat(Star)? {
                BinOp::Mul
            } else if self.eat(Slash)? {
                BinOp::Div
            } else {
                break;
            };
            let right = self.factor(None)?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn factor(&mut self, elem: Option<AssignElement>) -> Result<Box<Expr>> {
        if let Some(elem) = elem {
            let span = elem.span();
            return Ok(Box::new(Expr {
                kind: ExprKind::Element(elem),
                span,
            }));
        }

        let start = self.curr.span;

        // Array literal.
        if self.eat(OpenSquare)? {
            let mut elems = vec![];
            while !self.check(CloseSquare) {
                elems.push(*self.expr(None)?);
                if !self.eat(Comma)? {
                    break;
                }
            }
            let close = self.expect(CloseSquare, "Expected ']' after array elements")?;
            return Ok(Box::new(Expr {
                kind: ExprKind::Array(elems),
                span: start.to(close.span),
            }));
        }

        // Tuple literal or parenthesized expression.
        if self.eat(OpenParen)? {
            let mut elems = vec![];
            while !self.check(CloseParen) {
                elems.push(*self.expr(None)?);
                if !self.eat(Comma)? {
                    break;
                }
            }
            let close = self.expect(CloseParen, "Expected ')'")?;
            let span = start.to(close.span);

            if elems.is_empty() {
                return self
                    .handler
                    .raise(span, ")", "Expected expression: the unit type is not supported");
            }
            // A single parenthesized expression is not a tuple.
            let kind = if elems.len() == 1 {
                ExprKind::Paren(Box::new(elems.swap_remove(0)))
            } else {
                ExprKind::Tuple(elems)
            };
            return Ok(Box::new(Expr { kind, span }));
        }

        let ref_kind = if self.eat(And)? {
            if self.eat(Mut)? {
                RefKind::Mutable
            } else {
                RefKind::Immutable
            }
        } else {
            RefKind::Normal
        };

        let element = self.element()?;
        if ref_kind == RefKind::Normal {
            return Ok(element);
        }
        let span = start.to(element.span);
        Ok(Box::new(Expr {
            kind: ExprKind::Ref {
                kind: ref_kind,
                expr: element,
            },
            span,
        }))
    }

    fn element(&mut self) -> Result<Box<Expr>> {
        // Reached with '(' only under a '&' prefix; bare parentheses are
        // consumed one level up in `factor`.
        if self.check(OpenParen) {
            let start = self.curr.span;
            self.advance()?;
            let inner = self.cmp_expr(None)?;
            let close = self.expect(CloseParen, "Expected ')'")?;
            return Ok(Box::new(Expr {
                kind: ExprKind::Paren(inner),
                span: start.to(close.span),
            }));
        }

        if self.check(Int) {
            let tok = self.curr.clone();
            self.advance()?;
            let value = match tok.text.parse() {
                Ok(v) => v,
                Err(_) => {
                    return self
                        .handler
                        .raise(tok.span, &tok.text, "Integer literal out of range")
                }
            };
            return Ok(Box::new(Expr {
                kind: ExprKind::Number(value),
                span: tok.span,
            }));
        }

        if self.check(Ident) {
            if self.check_ahead(OpenSquare)? || self.check_ahead(Dot)? {
                return self.element_expr();
            }
            if self.check_ahead(OpenParen)? {
                return self.call_expr();
            }
            let name = self.expect(Ident, "Expected identifier")?;
            let span = name.span;
            return Ok(Box::new(Expr {
                kind: ExprKind::Element(AssignElement::Variable { name }),
                span,
            }));
        }

        if self.check(Star) && self.check_ahead(Ident)? {
            return self.element_expr();
        }

        self.handler
            .raise(self.curr.span, &self.curr.text, "Expected expression")
    }

    fn element_expr(&mut self) -> Result<Box<Expr>> {
        let elem = self.assign_element()?;
        let span = elem.span();
        Ok(Box::new(Expr {
            kind: ExprKind::Element(elem),
            span,
        }))
    }

    fn call_expr(&mut self) -> Result<Box<Expr>> {
        let callee = self.expect(Ident, "Expected function name")?;
        self.expect(OpenParen, "Expected '(' after function name")?;

        let mut args = vec![];
        while !self.check(CloseParen) {
            args.push(*self.cmp_expr(None)?);
            if !self.eat(Comma)? {
                break;
            }
        }

        let close = self.expect(CloseParen, "Expected ')' after arguments")?;
        let span = callee.span.to(close.span);
        Ok(Box::new(Expr {
            kind: ExprKind::Call { callee, args },
            span,
        }))
    }

    fn if_stmt(&mut self) -> Result<Stmt> {
        self.expect(If, "Expected 'if'")?;
        let cond = self.cmp_expr(None)?;
        let then_block = self.block()?;

        let mut else_clauses = vec![];
        while self.eat(Else)? {
            // An `else` not followed by `if` terminates the chain.
            let terminal = !self.check(If);
            else_clauses.push(self.else_clause()?);
            if terminal {
                break;
            }
        }

        Ok(Stmt::If(IfStmt {
            cond,
            then_block,
            else_clauses,
        }))
    }

    fn else_clause(&mut self) -> Result<ElseClause> {
        if self.eat(If)? {
            let cond = self.cmp_expr(None)?;
            let block = self.block()?;
            return Ok(ElseClause {
                cond: Some(cond),
                block,
            });
        }
        let block = self.block()?;
        Ok(ElseClause { cond: None, block })
    }

    fn while_stmt(&mut self) -> Result<Stmt> {
        self.expect(While, "Expected 'while'")?;
        let cond = self.cmp_expr(None)?;
        let body = self.block()?;
        Ok(Stmt::While { cond, body })
    }

    fn for_stmt(&mut self) -> Result<Stmt> {
        self.expect(For, "Expected 'for'")?;
        let mutable = self.eat(Mut)?;
        let var = self.expect(Ident, "Expected loop variable")?;
        self.expect(In, "Expected 'in'")?;
        let start = self.cmp_expr(None)?;
        self.expect(Range, "Expected '..' in range")?;
        let end = self.cmp_expr(None)?;
        let body = self.block()?;
        Ok(Stmt::For {
            mutable,
            var,
            start,
            end,
            body,
        })
    }

    fn loop_stmt(&mut self) -> Result<Stmt> {
        self.expect(Loop, "Expected 'loop'")?;
        let body = self.block()?;
        Ok(Stmt::Loop { body })
    }

    fn break_stmt(&mut self) -> Result<Stmt> {
        let tok = self.expect(Break, "Expected 'break'")?;

        let val = if self.check(SemiColon) {
            None
        } else {
            Some(self.expr(None)?)
        };
        self.expect(SemiColon, "Expected ';' after 'break'")?;
        Ok(Stmt::Break(tok.span, val))
    }

    fn if_expr(&mut self) -> Result<Box<Expr>> {
        let start = self.curr.span;
        self.expect(If, "Expected 'if'")?;
        let cond = self.expr(None)?;
        let then_block = self.block()?;
        self.expect(Else, "Expected 'else' for if expression")?;
        let else_block = self.block()?;
        let span = start.to(else_block.span);
        Ok(Box::new(Expr {
            kind: ExprKind::If {
                cond,
                then_block,
                else_block,
            },
            span,
        }))
    }

    fn loop_expr(&mut self) -> Result<Box<Expr>> {
        let start = self.curr.span;
        self.expect(Loop, "Expected 'loop'")?;
        let body = self.block()?;
        let span = start.to(body.span);
        Ok(Box::new(Expr {
            kind: ExprKind::Loop(body),
            span,
        }))
    }

    fn var_type(&mut self) -> Result<VarType> {
        let start = self.curr.span;

        let ref_kind = if self.eat(And)? {
            if self.eat(Mut)? {
                RefKind::Mutable
            } else {
                RefKind::Immutable
            }
        } else {
            RefKind::Normal
        };

        // [type; N]
        if self.eat(OpenSquare)? {
            let elem = self.var_type()?;
            self.expect(SemiColon, "Expected ';' in array type")?;
            let len_tok = self.expect(Int, "Expected array length")?;
            let len = match len_tok.text.parse() {
                Ok(v) => v,
                Err(_) => {
                    return self
                        .handler
                        .raise(len_tok.span, &len_tok.text, "Array length out of range")
                }
            };
            let close = self.expect(CloseSquare, "Expected ']' in array type")?;
            return Ok(VarType {
                kind: TyKind::Array {
                    len,
                    elem: Box::new(elem),
                },
                ref_kind,
                span: start.to(close.span),
            });
        }

        // (t1, t2, ...); one element collapses to the inner type.
        if self.eat(OpenParen)? {
            let mut elems = vec![];
            while !self.check(CloseParen) {
                elems.push(self.var_type()?);
                if !self.eat(Comma)? {
                    break;
                }
            }
            let close = self.expect(CloseParen, "Expected ')' in tuple type")?;
            let span = start.to(close.span);

            if elems.is_empty() {
                return self
                    .handler
                    .raise(span, ")", "Expected type: the unit type is not supported");
            }
            if elems.len() == 1 {
                return Ok(elems.swap_remove(0));
            }
            return Ok(VarType {
                kind: TyKind::Tuple(elems),
                ref_kind,
                span,
            });
        }

        if self.check(I32) {
            let tok = self.curr.clone();
            self.advance()?;
            return Ok(VarType {
                kind: TyKind::Int,
                ref_kind,
                span: start.to(tok.span),
            });
        }

        self.handler
            .raise(self.curr.span, &self.curr.text, "Expected type")
    }

    fn expect(&mut self, kind: TokenKind, msg: &str) -> Result<Token> {
        if self.check(kind) {
            let tok = self.curr.clone();
            self.advance()?;
            return Ok(tok);
        }

        self.handler.raise(self.curr.span, &self.curr.text, msg)
    }

    fn eat(&mut self, kind: TokenKind) -> Result<bool> {
        if self.check(kind) {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.curr.kind == kind
    }

    /// Test the token after the current one without consuming anything. The
    /// token is pulled lazily and buffered; `advance` will promote it.
    fn check_ahead(&mut self, kind: TokenKind) -> Result<bool> {
        if self.lookahead.is_none() {
            let t = self.next_token()?;
            self.lookahead = Some(t);
        }
        Ok(self.lookahead.as_ref().map(|t| t.kind) == Some(kind))
    }

    fn advance(&mut self) -> Result<()> {
        self.curr = match self.lookahead.take() {
            Some(t) => t,
            None => self.next_token()?,
        };
        Ok(())
    }

    // A failed fetch is fatal for the parser: no grammar meaning can be
    // assigned to an unknown token. The lex diagnostic itself stays
    // warning-level.
    fn next_token(&mut self) -> Result<Token> {
        match self.lexer.next_token() {
            Ok(t) => Ok(t),
            Err(e) => {
                let span = e.span;
                let token = e.token.clone();
                self.handler.report_lex_err(e);
                self.handler.raise(span, &token, "Cannot parse past an unknown token")
            }
        }
    }

    fn eof(&self) -> bool {
        self.curr.kind == Eof
    }
}

fn binary(op: BinOp, left: Box<Expr>, right: Box<Expr>) -> Box<Expr> {
    let span = left.span.to(right.span);
    Box::new(Expr {
        kind: ExprKind::Binary { op, left, right },
        span,
    })
}
