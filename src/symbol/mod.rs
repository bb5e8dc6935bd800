mod table;

pub use table::SymbolTable;

use std::fmt;

/// The value types the checker tracks. `Null` doubles as "no return value"
/// for functions and as the best-effort fallback after a reported error;
/// `Unknown` marks a variable whose type inference has not resolved yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Null,
    I32,
    Unknown,
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Null => f.write_str("Null"),
            VarType::I32 => f.write_str("I32"),
            VarType::Unknown => f.write_str("Unknown"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    /// Function parameters are exempt from initialized-before-use checking;
    /// their value is supplied by the caller.
    pub formal: bool,
    pub initialized: bool,
    pub ty: VarType,
}

impl Variable {
    /// A `let`-declared local, not yet initialized.
    pub fn local(name: &str, ty: VarType) -> Self {
        Self {
            name: name.to_string(),
            formal: false,
            initialized: false,
            ty,
        }
    }

    /// A formal function parameter.
    pub fn param(name: &str) -> Self {
        Self {
            name: name.to_string(),
            formal: true,
            initialized: false,
            ty: VarType::I32,
        }
    }

    /// A binding whose value exists as soon as it is in scope, such as a
    /// `for`-loop variable.
    pub fn bound(name: &str) -> Self {
        Self {
            name: name.to_string(),
            formal: false,
            initialized: true,
            ty: VarType::I32,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub argc: usize,
    /// True when the header omitted `-> type`. Return-type deduction is not
    /// performed; the flag records the distinction for the symbol dump.
    pub auto_deduce: bool,
    pub ret_ty: VarType,
}
