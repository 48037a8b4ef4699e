//! Identifier resolution for the equation parser.
//!
//! The table is built per parse from the [`VariableBinding`] of the request. The names of the
//! elementary functions and constants come from the compile-time enums [`Func`] and [`Constant`];
//! the bound variable names shadow them, so a dependent variable called `e` is the unknown function
//! and not Euler's number.

use std::str::FromStr;

use crate::symbolic::symbolic_engine::{Constant, Func};

/// What an identifier stands for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Binding {
    /// the independent variable, a plain symbol
    Independent,
    /// the unknown function of the independent variable
    Dependent,
    Function(Func),
    /// `sqrt`
    Root,
    Constant(Constant),
    /// `Derivative(expr, x[, n])` and `diff(expr, x[, n])`
    Derivative,
}

/// Names of the independent and dependent variables of one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableBinding {
    pub independent: String,
    pub dependent: String,
}

impl Default for VariableBinding {
    fn default() -> Self {
        VariableBinding {
            independent: "x".to_string(),
            dependent: "y".to_string(),
        }
    }
}

impl VariableBinding {
    pub fn new(independent: &str, dependent: &str) -> Self {
        VariableBinding {
            independent: independent.trim().to_string(),
            dependent: dependent.trim().to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SymbolTable {
    bindings: VariableBinding,
}

impl SymbolTable {
    pub fn new(bindings: &VariableBinding) -> Self {
        SymbolTable {
            bindings: bindings.clone(),
        }
    }

    pub fn bindings(&self) -> &VariableBinding {
        &self.bindings
    }

    pub fn independent(&self) -> &str {
        &self.bindings.independent
    }

    pub fn dependent(&self) -> &str {
        &self.bindings.dependent
    }

    pub fn lookup(&self, ident: &str) -> Option<Binding> {
        if ident == self.bindings.independent {
            return Some(Binding::Independent);
        }
        if ident == self.bindings.dependent {
            return Some(Binding::Dependent);
        }
        builtin(ident)
    }
}

/// Fixed, process-wide part of the table.
pub fn builtin(ident: &str) -> Option<Binding> {
    match ident {
        "Derivative" | "diff" => Some(Binding::Derivative),
        "sqrt" => Some(Binding::Root),
        _ => Func::from_str(ident)
            .map(Binding::Function)
            .or_else(|_| Constant::from_str(ident).map(Binding::Constant))
            .ok(),
    }
}

/// `true` for names of functions and operators that cannot be used as variable names.
pub fn is_reserved(ident: &str) -> bool {
    matches!(
        builtin(ident),
        Some(Binding::Function(_) | Binding::Root | Binding::Derivative)
    )
}
