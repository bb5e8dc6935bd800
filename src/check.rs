use crate::{
    err::{Handler, SemanticErrorKind},
    parse::ast::{AssignElement, Block, Expr, ExprKind, FuncDecl, FuncHeader, Prog, Stmt},
    symbol::{Function, SymbolTable, VarType, Variable},
};
use anyhow::{bail, Result};
use std::rc::Rc;

/// Walks a parsed program, populating the symbol table and reporting
/// semantic diagnostics through the `Handler`.
///
/// Semantic errors are never fatal: after reporting, checking continues with
/// `VarType::Null` as the fallback so one bad construct does not hide later,
/// unrelated errors. `Err` from any method means an internal invariant was
/// violated (malformed tree, broken scope cursor), which is a bug in the
/// front end, not in the user's input.
pub struct Checker {
    handler: Rc<Handler>,
    table: SymbolTable,
}

impl Checker {
    pub fn new(handler: &Rc<Handler>) -> Self {
        Self {
            handler: handler.clone(),
            table: SymbolTable::new(),
        }
    }

    /// Check the whole program; the populated table is handed back so its
    /// contents can be dumped.
    pub fn check(mut self, prog: &Prog) -> Result<SymbolTable> {
        // Register every header first so a call may reference a function
        // declared later in the file.
        for f in &prog.funcs {
            self.declare_header(&f.header)?;
        }
        for f in &prog.funcs {
            self.check_func(f)?;
        }
        Ok(self.table)
    }

    fn declare_header(&mut self, header: &FuncHeader) -> Result<()> {
        let ret_ty = if header.ret_ty.is_some() {
            VarType::I32
        } else {
            VarType::Null
        };
        let func = Function {
            name: header.name.text.to_string(),
            argc: header.params.len(),
            auto_deduce: header.ret_ty.is_none(),
            ret_ty,
        };
        self.table.declare_func(&header.name.text, func)
    }

    fn check_func(&mut self, func: &FuncDecl) -> Result<()> {
        self.table.enter_scope(&func.header.name.text, true)?;
        for param in &func.header.params {
            self.table
                .declare_var(&param.name.text, Variable::param(&param.name.text));
        }
        self.check_block(&func.body)?;
        self.leave_scope()?;
        Ok(())
    }

    /// Check a block's statements (and tail expression) in the current
    /// scope. Scope creation is the caller's business: the function body
    /// shares the function scope with the parameters, while control-flow
    /// bodies get fresh scopes via `scoped_block`.
    fn check_block(&mut self, block: &Block) -> Result<()> {
        for stmt in &block.stmts {
            self.check_stmt(stmt)?;
        }
        if let Some(tail) = &block.tail {
            self.check_expr(tail)?;
        }
        Ok(())
    }

    fn scoped_block(&mut self, block: &Block, prefix: &'static str) -> Result<()> {
        let name = self.table.fresh_scope_name(prefix);
        self.table.enter_scope(&name, true)?;
        self.check_block(block)?;
        self.leave_scope()?;
        Ok(())
    }

    /// Check a block in expression position in a fresh scope; its value is
    /// the type of the tail expression.
    fn check_expr_block(&mut self, block: &Block, prefix: &'static str) -> Result<VarType> {
        let name = self.table.fresh_scope_name(prefix);
        self.table.enter_scope(&name, true)?;
        for stmt in &block.stmts {
            self.check_stmt(stmt)?;
        }
        let ty = match &block.tail {
            Some(tail) => self.check_expr(tail)?,
            None => VarType::Null,
        };
        self.leave_scope()?;
        Ok(ty)
    }

    /// Flag unresolved types in the scope being left, then pop it.
    fn leave_scope(&mut self) -> Result<()> {
        for name in self.table.unknown_vars() {
            self.report(
                SemanticErrorKind::TypeInferenceFailure,
                format!("cannot infer a type for variable '{}'", name),
            );
        }
        self.table.exit_scope()?;
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::VarDecl { name, ty, init, .. } => {
                // The initializer sees the previous binding of the name, so
                // it is checked before the redeclaration overwrites.
                let var_ty = if ty.is_some() || init.is_some() {
                    VarType::I32
                } else {
                    VarType::Unknown
                };
                let mut var = Variable::local(&name.text, var_ty);
                if let Some(init) = init {
                    self.check_expr(init)?;
                    var.initialized = true;
                }
                self.table.declare_var(&name.text, var);
            }
            Stmt::Assign { target, value } => self.check_assign(target, value)?,
            Stmt::Expr(expr) => {
                self.check_expr(expr)?;
            }
            Stmt::Ret(_, val) => self.check_ret(val.as_deref())?,
            Stmt::If(ifs) => {
                // Conditions cannot declare, so they are checked in the
                // enclosing scope; only the branch bodies open scopes.
                self.check_expr(&ifs.cond)?;
                self.scoped_block(&ifs.then_block, "if")?;
                for clause in &ifs.else_clauses {
                    if let Some(cond) = &clause.cond {
                        self.check_expr(cond)?;
                    }
                    self.scoped_block(&clause.block, "else")?;
                }
            }
            Stmt::While { cond, body } => {
                self.check_expr(cond)?;
                self.scoped_block(body, "while")?;
            }
            Stmt::For {
                var, start, end, body, ..
            } => {
                self.check_expr(start)?;
                self.check_expr(end)?;
                let name = self.table.fresh_scope_name("for");
                self.table.enter_scope(&name, true)?;
                // The range supplies the loop variable's value.
                self.table.declare_var(&var.text, Variable::bound(&var.text));
                self.check_block(body)?;
                self.leave_scope()?;
            }
            Stmt::Loop { body } => self.scoped_block(body, "loop")?,
            Stmt::Break(_, val) => {
                if let Some(val) = val {
                    self.check_expr(val)?;
                }
            }
            Stmt::Continue(_) | Stmt::Null => {}
        }
        Ok(())
    }

    fn check_assign(&mut self, target: &AssignElement, value: &Expr) -> Result<()> {
        let var_name = match target {
            AssignElement::Variable { name } => {
                if self.table.lookup_var(&name.text).is_none() {
                    self.report(
                        SemanticErrorKind::AssignToUndeclaredVar,
                        format!("cannot assign to undeclared variable '{}'", name.text),
                    );
                    None
                } else {
                    Some(name.text.to_string())
                }
            }
            // Assignment through *x, a[i] and t.0 parses but is not
            // semantically supported yet.
            _ => {
                self.report(
                    SemanticErrorKind::AssignToNonVariable,
                    "assignment target must be a plain variable".to_string(),
                );
                None
            }
        };

        // The right-hand side is checked either way; only a successful check
        // of a valid target marks the variable initialized.
        self.check_expr(value)?;
        if let Some(name) = var_name {
            self.table.mark_initialized(&name);
        }
        Ok(())
    }

    fn check_ret(&mut self, val: Option<&Expr>) -> Result<()> {
        let fname = match self.table.func_name() {
            Some(name) => name.to_string(),
            None => bail!("return statement checked outside of any function scope"),
        };
        let func = match self.table.lookup_func(&fname) {
            Some(f) => f.clone(),
            None => bail!("no symbol registered for enclosing function '{}'", fname),
        };

        match val {
            Some(expr) => {
                let ty = self.check_expr(expr)?;
                if func.ret_ty == VarType::Null {
                    self.report(
                        SemanticErrorKind::VoidFuncReturnValue,
                        format!("function '{}' has no return type but returns a value", fname),
                    );
                } else if ty != func.ret_ty {
                    self.report(
                        SemanticErrorKind::FuncReturnTypeMismatch,
                        format!("return value of function '{}' has the wrong type", fname),
                    );
                }
            }
            None => {
                if func.ret_ty != VarType::Null {
                    self.report(
                        SemanticErrorKind::MissingReturnValue,
                        format!("function '{}' must return a value", fname),
                    );
                }
            }
        }
        Ok(())
    }

    fn check_expr(&mut self, expr: &Expr) -> Result<VarType> {
        match &expr.kind {
            ExprKind::Number(_) => Ok(VarType::I32),
            ExprKind::Element(elem) => self.check_element(elem),
            ExprKind::Ref { expr, .. } => self.check_expr(expr),
            ExprKind::Paren(inner) => self.check_expr(inner),
            // No boolean type exists, so comparisons resolve to I32 like
            // arithmetic.
            ExprKind::Binary { left, right, .. } => {
                self.check_expr(left)?;
                self.check_expr(right)?;
                Ok(VarType::I32)
            }
            ExprKind::Call { callee, args } => {
                let fname = callee.text.to_string();
                self.check_call(&fname, args)
            }
            ExprKind::Array(elems) | ExprKind::Tuple(elems) => {
                for elem in elems {
                    self.check_expr(elem)?;
                }
                Ok(VarType::I32)
            }
            ExprKind::Block(block) => self.check_expr_block(block, "block"),
            ExprKind::If {
                cond,
                then_block,
                else_block,
            } => {
                self.check_expr(cond)?;
                let then_ty = self.check_expr_block(then_block, "if")?;
                let else_ty = self.check_expr_block(else_block, "else")?;
                if then_ty != else_ty {
                    self.report(
                        SemanticErrorKind::TypeMismatch,
                        "if and else arms have different types".to_string(),
                    );
                }
                Ok(then_ty)
            }
            // A loop's value comes from its break expressions; simplified
            // to I32 like every other value here.
            ExprKind::Loop(block) => {
                self.check_expr_block(block, "loop")?;
                Ok(VarType::I32)
            }
        }
    }

    fn check_element(&mut self, elem: &AssignElement) -> Result<VarType> {
        match elem {
            AssignElement::Variable { name } | AssignElement::Dereference { name } => {
                Ok(self.check_var(&name.text))
            }
            AssignElement::ArrayAccess { name, index } => {
                let ty = self.check_var(&name.text);
                self.check_expr(index)?;
                Ok(ty)
            }
            AssignElement::TupleAccess { name, .. } => Ok(self.check_var(&name.text)),
        }
    }

    fn check_var(&mut self, name: &str) -> VarType {
        match self.table.lookup_var(name) {
            None => {
                self.report(
                    SemanticErrorKind::UndeclaredVariable,
                    format!("variable '{}' is not declared", name),
                );
                VarType::Null
            }
            Some(var) => {
                let ty = var.ty;
                if !var.initialized && !var.formal {
                    self.report(
                        SemanticErrorKind::UninitializedVariable,
                        format!("variable '{}' is used before it is initialized", name),
                    );
                }
                ty
            }
        }
    }

    fn check_call(&mut self, fname: &str, args: &[Expr]) -> Result<VarType> {
        let func = match self.table.lookup_func(fname) {
            Some(f) => f.clone(),
            None => {
                self.report(
                    SemanticErrorKind::UndefinedFunctionCall,
                    format!("call to undefined function '{}'", fname),
                );
                // The arguments are still checked so their own errors
                // surface.
                for arg in args {
                    self.check_expr(arg)?;
                }
                return Ok(VarType::Null);
            }
        };

        if args.len() != func.argc {
            self.report(
                SemanticErrorKind::ArgCountMismatch,
                format!(
                    "function '{}' expects {} arguments, but {} were supplied",
                    fname,
                    func.argc,
                    args.len()
                ),
            );
        }
        for arg in args {
            self.check_expr(arg)?;
        }
        Ok(func.ret_ty)
    }

    fn report(&self, kind: SemanticErrorKind, msg: String) {
        self.handler
            .report_semantic_err(kind, msg, &self.table.cur_scope());
    }
}
