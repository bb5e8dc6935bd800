use crate::lex::Span;
use std::{cell::RefCell, fmt, rc::Rc};

/// Result used for fatal (parse-time) failures: the diagnostic itself lives
/// in the `Handler`, so the error carries no payload.
pub type Result<T> = std::result::Result<T, ()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    UnknownToken,
}

#[derive(Debug, Clone)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub token: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnexpectedToken,
}

#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub msg: String,
    pub token: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticErrorKind {
    ArgCountMismatch,
    FuncReturnTypeMismatch,
    VoidFuncReturnValue,
    MissingReturnValue,
    UndefinedFunctionCall,
    UndeclaredVariable,
    UninitializedVariable,
    AssignToNonVariable,
    AssignToUndeclaredVar,
    TypeInferenceFailure,
    TypeMismatch,
}

impl fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SemanticErrorKind::ArgCountMismatch => "ArgCountMismatch",
            SemanticErrorKind::FuncReturnTypeMismatch => "FuncReturnTypeMismatch",
            SemanticErrorKind::VoidFuncReturnValue => "VoidFuncReturnValue",
            SemanticErrorKind::MissingReturnValue => "MissingReturnValue",
            SemanticErrorKind::UndefinedFunctionCall => "UndefinedFunctionCall",
            SemanticErrorKind::UndeclaredVariable => "UndeclaredVariable",
            SemanticErrorKind::UninitializedVariable => "UninitializedVariable",
            SemanticErrorKind::AssignToNonVariable => "AssignToNonVariable",
            SemanticErrorKind::AssignToUndeclaredVar => "AssignToUndeclaredVar",
            SemanticErrorKind::TypeInferenceFailure => "TypeInferenceFailure",
            SemanticErrorKind::TypeMismatch => "TypeMismatch",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub msg: String,
    pub scope: String,
}

/// Collects diagnostics for one compilation.
///
/// Parse errors are fatal on first occurrence: `raise` records the diagnostic
/// and hands back `Err(())` for the caller to propagate with `?`. Lex errors
/// are warnings and semantic errors accumulate; both are flushed by the
/// `display_*` family once the pass that produced them finishes.
pub struct Handler {
    src: Rc<str>,
    lex_errs: RefCell<Vec<LexError>>,
    parse_errs: RefCell<Vec<ParseError>>,
    semantic_errs: RefCell<Vec<SemanticError>>,
}

impl Handler {
    pub fn new(src: &Rc<str>) -> Self {
        Self {
            src: src.clone(),
            lex_errs: RefCell::new(vec![]),
            parse_errs: RefCell::new(vec![]),
            semantic_errs: RefCell::new(vec![]),
        }
    }

    pub fn report_lex_err(&self, err: LexError) {
        self.lex_errs.borrow_mut().push(err);
    }

    pub fn raise<T>(&self, span: Span, token: &str, msg: &str) -> Result<T> {
        self.parse_errs.borrow_mut().push(ParseError {
            kind: ParseErrorKind::UnexpectedToken,
            msg: msg.to_string(),
            token: token.to_string(),
            span,
        });
        Err(())
    }

    pub fn report_semantic_err(&self, kind: SemanticErrorKind, msg: String, scope: &str) {
        self.semantic_errs.borrow_mut().push(SemanticError {
            kind,
            msg,
            scope: scope.to_string(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.has_parse_err() || self.has_semantic_err()
    }

    pub fn has_lex_err(&self) -> bool {
        !self.lex_errs.borrow().is_empty()
    }

    pub fn has_parse_err(&self) -> bool {
        !self.parse_errs.borrow().is_empty()
    }

    pub fn has_semantic_err(&self) -> bool {
        !self.semantic_errs.borrow().is_empty()
    }

    /// Kinds of the accumulated semantic diagnostics, in report order.
    pub fn semantic_err_kinds(&self) -> Vec<SemanticErrorKind> {
        self.semantic_errs.borrow().iter().map(|e| e.kind).collect()
    }

    pub fn display_lex_errs(&self) {
        for err in self.lex_errs.borrow().iter() {
            eprintln!("warning[{:?}]: unknown token '{}'", err.kind, err.token);
            self.display_snippet(err.span);
        }
    }

    pub fn display_parse_errs(&self) {
        for err in self.parse_errs.borrow().iter() {
            eprintln!(
                "error[{:?}]: {} (found '{}')",
                err.kind, err.msg, err.token
            );
            self.display_snippet(err.span);
        }
    }

    pub fn display_semantic_errs(&self) {
        for err in self.semantic_errs.borrow().iter() {
            eprintln!("error[{}]: {}", err.kind, err.msg);
            eprintln!(" --> scope: {}", err.scope);
            eprintln!();
        }
    }

    /// Print the offending source line with a caret under the span.
    fn display_snippet(&self, mut span: Span) {
        if self.src.is_empty() {
            return;
        }
        if span.lo() >= self.src.len() {
            span = Span::new(self.src.len() - 1, self.src.len());
        }

        let lo = self.line_start(span);
        let hi = self.line_end(span);
        let (row, col) = self.position(span);
        eprintln!(" --> <row: {}, col: {}>", row, col);
        eprintln!("  |  {}", &self.src[lo..hi]);
        eprintln!(
            "  |  {}{}",
            " ".repeat(span.lo() - lo),
            "^".repeat((span.hi().min(hi) - span.lo()).max(1))
        );
        eprintln!();
    }

    /// 1-based row and column of the span start.
    pub fn position(&self, span: Span) -> (usize, usize) {
        let lo = span.lo().min(self.src.len());
        let row = self.src[..lo].matches('\n').count() + 1;
        let col = lo - self.src[..lo].rfind('\n').map(|i| i + 1).unwrap_or(0) + 1;
        (row, col)
    }

    fn line_start(&self, span: Span) -> usize {
        self.src[..span.lo()]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    fn line_end(&self, span: Span) -> usize {
        self.src[span.lo()..]
            .find('\n')
            .map(|i| span.lo() + i)
            .unwrap_or(self.src.len())
    }
}
