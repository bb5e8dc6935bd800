use self::{check::Checker, err::Handler, parse::Parser};
use anyhow::{bail, Result};
use std::rc::Rc;

pub mod args;
pub mod check;
pub mod dot;
pub mod err;
pub mod lex;
pub mod parse;
pub mod symbol;

/// Everything the front end produces for a well-formed program.
pub struct Output {
    pub prog: parse::ast::Prog,
    pub table: symbol::SymbolTable,
}

pub struct Compiler {}

impl Compiler {
    pub fn new() -> Self {
        Self {}
    }

    /// Run the whole front end over one source text. Diagnostics are printed
    /// before `Err` is returned; the error itself only says which stage gave
    /// up.
    pub fn run(&mut self, src: &str) -> Result<Output> {
        let src: Rc<str> = src.into();
        let handler = Rc::new(Handler::new(&src));

        let mut parser = Parser::new(src, &handler);
        let prog = match parser.parse() {
            Ok(prog) => prog,
            Err(()) => {
                handler.display_lex_errs();
                handler.display_parse_errs();
                bail!("the program does not parse");
            }
        };
        log::debug!("parsed {} function declaration(s)", prog.funcs.len());

        let table = Checker::new(&handler).check(&prog)?;
        if handler.has_errors() {
            handler.display_semantic_errs();
            bail!("semantic checks failed");
        }
        log::debug!("semantic checks passed");

        Ok(Output { prog, table })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
