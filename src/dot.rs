//! Graphviz rendering of a parsed program. Every tree node becomes a
//! labelled graph node, so `dot -Tpng` gives a picture of exactly what the
//! parser built.

use crate::parse::ast::{
    AssignElement, Block, Expr, ExprKind, FuncDecl, Prog, RefKind, Stmt, TyKind, VarType,
};

pub fn render(prog: &Prog) -> String {
    let mut dot = Dot::new();
    let root = dot.node("prog");
    for func in &prog.funcs {
        let f = dot.func_decl(func);
        dot.edge(root, f);
    }
    dot.finish()
}

type NodeId = usize;

struct Dot {
    body: String,
    next_id: NodeId,
}

impl Dot {
    fn new() -> Self {
        Self {
            body: String::new(),
            next_id: 0,
        }
    }

    fn node(&mut self, label: &str) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.body
            .push_str(&format!("    n{} [label=\"{}\"];\n", id, escape(label)));
        id
    }

    fn edge(&mut self, from: NodeId, to: NodeId) {
        self.body.push_str(&format!("    n{} -> n{};\n", from, to));
    }

    fn finish(self) -> String {
        format!("digraph ast {{\n{}}}\n", self.body)
    }

    fn func_decl(&mut self, func: &FuncDecl) -> NodeId {
        let label = match &func.header.ret_ty {
            Some(ty) => format!("fn {} -> {}", func.header.name.text, ty_label(ty)),
            None => format!("fn {}", func.header.name.text),
        };
        let id = self.node(&label);
        for param in &func.header.params {
            let p = self.node(&format!(
                "param {}{}: {}",
                if param.mutable { "mut " } else { "" },
                param.name.text,
                ty_label(&param.ty)
            ));
            self.edge(id, p);
        }
        let body = self.block(&func.body);
        self.edge(id, body);
        id
    }

    fn block(&mut self, block: &Block) -> NodeId {
        let id = self.node("block");
        for stmt in &block.stmts {
            let s = self.stmt(stmt);
            self.edge(id, s);
        }
        if let Some(tail) = &block.tail {
            let t = self.node("tail");
            self.edge(id, t);
            let e = self.expr(tail);
            self.edge(t, e);
        }
        id
    }

    fn stmt(&mut self, stmt: &Stmt) -> NodeId {
        match stmt {
            Stmt::VarDecl {
                mutable,
                name,
                ty,
                init,
            } => {
                let mut label = format!(
                    "let {}{}",
                    if *mutable { "mut " } else { "" },
                    name.text
                );
                if let Some(ty) = ty {
                    label.push_str(&format!(": {}", ty_label(ty)));
                }
                let id = self.node(&label);
                if let Some(init) = init {
                    let e = self.expr(init);
                    self.edge(id, e);
                }
                id
            }
            Stmt::Assign { target, value } => {
                let id = self.node("=");
                let t = self.element(target);
                let v = self.expr(value);
                self.edge(id, t);
                self.edge(id, v);
                id
            }
            Stmt::Expr(expr) => self.expr(expr),
            Stmt::Ret(_, val) => {
                let id = self.node("return");
                if let Some(val) = val {
                    let v = self.expr(val);
                    self.edge(id, v);
                }
                id
            }
            Stmt::If(ifs) => {
                let id = self.node("if");
                let c = self.expr(&ifs.cond);
                self.edge(id, c);
                let b = self.block(&ifs.then_block);
                self.edge(id, b);
                for clause in &ifs.else_clauses {
                    let e = match &clause.cond {
                        Some(cond) => {
                            let e = self.node("else if");
                            let c = self.expr(cond);
                            self.edge(e, c);
                            e
                        }
                        None => self.node("else"),
                    };
                    let b = self.block(&clause.block);
                    self.edge(e, b);
                    self.edge(id, e);
                }
                id
            }
            Stmt::While { cond, body } => {
                let id = self.node("while");
                let c = self.expr(cond);
                let b = self.block(body);
                self.edge(id, c);
                self.edge(id, b);
                id
            }
            Stmt::For {
                mutable,
                var,
                start,
                end,
                body,
            } => {
                let id = self.node(&format!(
                    "for {}{}",
                    if *mutable { "mut " } else { "" },
                    var.text
                ));
                let s = self.expr(start);
                let e = self.expr(end);
                let b = self.block(body);
                self.edge(id, s);
                self.edge(id, e);
                self.edge(id, b);
                id
            }
            Stmt::Loop { body } => {
                let id = self.node("loop");
                let b = self.block(body);
                self.edge(id, b);
                id
            }
            Stmt::Break(_, val) => {
                let id = self.node("break");
                if let Some(val) = val {
                    let v = self.expr(val);
                    self.edge(id, v);
                }
                id
            }
            Stmt::Continue(_) => self.node("continue"),
            Stmt::Null => self.node(";"),
        }
    }

    fn expr(&mut self, expr: &Expr) -> NodeId {
        match &expr.kind {
            ExprKind::Number(n) => self.node(&n.to_string()),
            ExprKind::Element(elem) => self.element(elem),
            ExprKind::Ref { kind, expr } => {
                let id = self.node(match kind {
                    RefKind::Mutable => "&mut",
                    _ => "&",
                });
                let e = self.expr(expr);
                self.edge(id, e);
                id
            }
            ExprKind::Binary { op, left, right } => {
                let id = self.node(&op.to_string());
                let l = self.expr(left);
                let r = self.expr(right);
                self.edge(id, l);
                self.edge(id, r);
                id
            }
            ExprKind::Call { callee, args } => {
                let id = self.node(&format!("call {}", callee.text));
                for arg in args {
                    let a = self.expr(arg);
                    self.edge(id, a);
                }
                id
            }
            ExprKind::Paren(inner) => self.expr(inner),
            ExprKind::Array(elems) => {
                let id = self.node("array");
                for elem in elems {
                    let e = self.expr(elem);
                    self.edge(id, e);
                }
                id
            }
            ExprKind::Tuple(elems) => {
                let id = self.node("tuple");
                for elem in elems {
                    let e = self.expr(elem);
                    self.edge(id, e);
                }
                id
            }
            ExprKind::Block(block) => self.block(block),
            ExprKind::If {
                cond,
                then_block,
                else_block,
            } => {
                let id = self.node("if expr");
                let c = self.expr(cond);
                let t = self.block(then_block);
                let e = self.block(else_block);
                self.edge(id, c);
                self.edge(id, t);
                self.edge(id, e);
                id
            }
            ExprKind::Loop(block) => {
                let id = self.node("loop expr");
                let b = self.block(block);
                self.edge(id, b);
                id
            }
        }
    }

    fn element(&mut self, elem: &AssignElement) -> NodeId {
        match elem {
            AssignElement::Variable { name } => self.node(&name.text),
            AssignElement::Dereference { name } => self.node(&format!("*{}", name.text)),
            AssignElement::ArrayAccess { name, index } => {
                let id = self.node(&format!("{}[ ]", name.text));
                let i = self.expr(index);
                self.edge(id, i);
                id
            }
            AssignElement::TupleAccess { name, field, .. } => {
                self.node(&format!("{}.{}", name.text, field))
            }
        }
    }
}

fn ty_label(ty: &VarType) -> String {
    let prefix = match ty.ref_kind {
        RefKind::Normal => "",
        RefKind::Immutable => "&",
        RefKind::Mutable => "&mut ",
    };
    match &ty.kind {
        TyKind::Int => format!("{}i32", prefix),
        TyKind::Array { len, elem } => format!("{}[{}; {}]", prefix, ty_label(elem), len),
        TyKind::Tuple(elems) => {
            let inner: Vec<String> = elems.iter().map(ty_label).collect();
            format!("{}({})", prefix, inner.join(", "))
        }
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use crate::{err::Handler, parse::Parser};
    use std::rc::Rc;

    fn render(src: &str) -> String {
        let src: Rc<str> = src.into();
        let handler = Rc::new(Handler::new(&src));
        let mut parser = Parser::new(src, &handler);
        let prog = parser.parse().unwrap();
        super::render(&prog)
    }

    #[test]
    fn renders_a_graph() {
        let out = render("fn main() { let x = 1 + 2; }");
        assert!(out.starts_with("digraph ast {"));
        assert!(out.contains("label=\"fn main\""));
        assert!(out.contains("label=\"+\""));
        assert!(out.ends_with("}\n"));
    }

    #[test]
    fn quotes_are_escaped() {
        assert_eq!(super::escape("a\"b"), "a\\\"b");
    }
}
