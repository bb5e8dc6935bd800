use crate::symbol::{Function, VarType, Variable};
use anyhow::{bail, Result};
use std::collections::HashMap;

pub type ScopeId = usize;

/// One lexical scope: a variable map plus its position in the scope tree.
/// Construct-scope counters (`if1`, `while2`, ...) live on the parent, so
/// names are unique among siblings by construction.
struct Scope {
    name: String,
    parent: Option<ScopeId>,
    vars: HashMap<String, Variable>,
    children: HashMap<String, ScopeId>,
    counters: HashMap<&'static str, u32>,
}

impl Scope {
    fn new(name: &str, parent: Option<ScopeId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            vars: HashMap::new(),
            children: HashMap::new(),
            counters: HashMap::new(),
        }
    }
}

/// Scope-tree symbol table. Scopes live in an arena indexed by `ScopeId`;
/// index 0 is the global root. Functions live in one flat table: there are
/// no nested functions and no overloading. The whole table outlives the
/// checking pass so it can be dumped afterwards.
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: ScopeId,
    funcs: HashMap<String, Function>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new("global", None)],
            current: 0,
            funcs: HashMap::new(),
        }
    }

    /// Move the cursor into the child scope `name`, creating it when
    /// `create` is set. Creating an already-existing child, or entering a
    /// missing one, is a caller bug.
    pub fn enter_scope(&mut self, name: &str, create: bool) -> Result<()> {
        if create {
            if self.scopes[self.current].children.contains_key(name) {
                bail!(
                    "scope '{}' already exists under '{}'",
                    name,
                    self.cur_scope()
                );
            }
            let id = self.scopes.len();
            self.scopes.push(Scope::new(name, Some(self.current)));
            self.scopes[self.current].children.insert(name.to_string(), id);
            self.current = id;
            return Ok(());
        }

        match self.scopes[self.current].children.get(name) {
            Some(&id) => {
                self.current = id;
                Ok(())
            }
            None => bail!("scope '{}' not found under '{}'", name, self.cur_scope()),
        }
    }

    /// Move the cursor back to the parent scope; returns the name of the
    /// scope that was left.
    pub fn exit_scope(&mut self) -> Result<String> {
        match self.scopes[self.current].parent {
            Some(parent) => {
                let name = self.scopes[self.current].name.clone();
                self.current = parent;
                Ok(name)
            }
            None => bail!("cannot exit the global scope"),
        }
    }

    /// Next construct-scope name with the given prefix for the current
    /// scope: `if1`, `if2`, `while1`, ...
    pub fn fresh_scope_name(&mut self, prefix: &'static str) -> String {
        let n = self.scopes[self.current].counters.entry(prefix).or_insert(0);
        *n += 1;
        format!("{}{}", prefix, n)
    }

    pub fn declare_func(&mut self, name: &str, func: Function) -> Result<()> {
        if self.funcs.contains_key(name) {
            bail!("function '{}' is already declared", name);
        }
        self.funcs.insert(name.to_string(), func);
        Ok(())
    }

    /// Redeclaration silently overwrites: `let x ...; let x ...;` in one
    /// scope re-binds the name.
    pub fn declare_var(&mut self, name: &str, var: Variable) {
        self.scopes[self.current].vars.insert(name.to_string(), var);
    }

    pub fn lookup_func(&self, name: &str) -> Option<&Function> {
        self.funcs.get(name)
    }

    /// Walk from the current scope up to the root, returning the first
    /// binding of `name`.
    pub fn lookup_var(&self, name: &str) -> Option<&Variable> {
        let mut id = Some(self.current);
        while let Some(i) = id {
            if let Some(v) = self.scopes[i].vars.get(name) {
                return Some(v);
            }
            id = self.scopes[i].parent;
        }
        None
    }

    /// Mark the nearest binding of `name` initialized. An assignment also
    /// settles the type of a binding that was still waiting on inference.
    /// Returns false if no binding exists.
    pub fn mark_initialized(&mut self, name: &str) -> bool {
        let mut id = Some(self.current);
        while let Some(i) = id {
            if let Some(v) = self.scopes[i].vars.get_mut(name) {
                v.initialized = true;
                if v.ty == VarType::Unknown {
                    v.ty = VarType::I32;
                }
                return true;
            }
            id = self.scopes[i].parent;
        }
        false
    }

    /// Names in the current scope whose type never resolved, sorted.
    pub fn unknown_vars(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scopes[self.current]
            .vars
            .values()
            .filter(|v| v.ty == VarType::Unknown)
            .map(|v| v.name.clone())
            .collect();
        names.sort();
        names
    }

    /// `::`-joined path of the current scope, e.g. `global::main::if1`.
    pub fn cur_scope(&self) -> String {
        self.scope_path(self.current)
    }

    fn scope_path(&self, mut id: ScopeId) -> String {
        let mut parts = vec![];
        loop {
            parts.push(self.scopes[id].name.as_str());
            match self.scopes[id].parent {
                Some(parent) => id = parent,
                None => break,
            }
        }
        parts.reverse();
        parts.join("::")
    }

    /// Name of the function whose scope encloses the current one: the
    /// ancestor directly below the global root.
    pub fn func_name(&self) -> Option<&str> {
        let mut id = self.current;
        loop {
            match self.scopes[id].parent {
                None => return None,
                Some(0) => return Some(&self.scopes[id].name),
                Some(parent) => id = parent,
            }
        }
    }

    /// Plain-text report of everything the table collected: one fact per
    /// line, sorted for stable output. Meant for humans and tests, not a
    /// machine format.
    pub fn dump(&self) -> String {
        let mut out = String::from("functions:\n");

        let mut funcs: Vec<&Function> = self.funcs.values().collect();
        funcs.sort_by(|a, b| a.name.cmp(&b.name));
        for f in funcs {
            out.push_str(&format!(
                "fn {}: argc={}, ret={}{}\n",
                f.name,
                f.argc,
                f.ret_ty,
                if f.auto_deduce { " (deduced)" } else { "" }
            ));
        }

        out.push_str("variables:\n");
        let mut vars: Vec<(String, &Variable)> = vec![];
        for id in 0..self.scopes.len() {
            let path = self.scope_path(id);
            for v in self.scopes[id].vars.values() {
                vars.push((path.clone(), v));
            }
        }
        vars.sort_by(|a, b| (&a.0, &a.1.name).cmp(&(&b.0, &b.1.name)));
        for (path, v) in vars {
            out.push_str(&format!("var {}::{}: {}\n", path, v.name, v.ty));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outwards() {
        let mut t = SymbolTable::new();
        t.enter_scope("main", true).unwrap();
        t.declare_var("a", Variable::local("a", VarType::I32));
        t.enter_scope("if1", true).unwrap();
        t.declare_var("b", Variable::local("b", VarType::I32));

        assert!(t.lookup_var("a").is_some());
        assert!(t.lookup_var("b").is_some());
        assert_eq!(t.cur_scope(), "global::main::if1");

        assert_eq!(t.exit_scope().unwrap(), "if1");
        assert!(t.lookup_var("b").is_none());
    }

    #[test]
    fn redeclare_overwrites() {
        let mut t = SymbolTable::new();
        t.enter_scope("f", true).unwrap();
        t.declare_var("x", Variable::local("x", VarType::I32));
        let mut init = Variable::local("x", VarType::I32);
        init.initialized = true;
        t.declare_var("x", init);
        assert!(t.lookup_var("x").unwrap().initialized);
    }

    #[test]
    fn sibling_counters_do_not_collide() {
        let mut t = SymbolTable::new();
        t.enter_scope("f", true).unwrap();
        assert_eq!(t.fresh_scope_name("if"), "if1");
        assert_eq!(t.fresh_scope_name("if"), "if2");
        t.enter_scope("if1", true).unwrap();
        // A nested block starts its own counter.
        assert_eq!(t.fresh_scope_name("if"), "if1");
    }

    #[test]
    fn exit_at_root_is_an_error() {
        let mut t = SymbolTable::new();
        assert!(t.exit_scope().is_err());
    }
}
