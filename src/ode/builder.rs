//! Turns normalized equation text into a [`SymbolicEquation`].
//!
//! The text is split on the first `=`; each side is parsed against a fresh [`SymbolTable`] built
//! from the request bindings. Without `=` the whole text is the left side of `expr = 0`.

use std::fmt;

use log::debug;

use crate::ode::error::ParseError;
use crate::symbolic::parse_expr::parse_with_table;
use crate::symbolic::symbol_table::{SymbolTable, VariableBinding};
use crate::symbolic::symbolic_engine::{Expr, plain_name};

/// `lhs = rhs` with at least one derivative of the dependent function on either side.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolicEquation {
    pub lhs: Expr,
    pub rhs: Expr,
    pub bindings: VariableBinding,
}

impl SymbolicEquation {
    pub fn independent(&self) -> &str {
        &self.bindings.independent
    }

    pub fn dependent(&self) -> &str {
        &self.bindings.dependent
    }

    /// Highest derivative order of the dependent function.
    pub fn order(&self) -> usize {
        let dep = self.dependent();
        self.lhs
            .max_order(dep)
            .into_iter()
            .chain(self.rhs.max_order(dep))
            .max()
            .unwrap_or(0)
    }

    /// `lhs - rhs`
    pub fn residual(&self) -> Expr {
        Expr::Sub(self.lhs.clone().boxed(), self.rhs.clone().boxed())
    }

    /// Residual with the unknown and its derivatives replaced by plain symbols `y`, `y'`, ...
    pub fn plain_residual(&self) -> Expr {
        self.residual().to_plain()
    }

    /// Names of the plain symbols `y`, `y'`, ..., up to the order of the equation.
    pub fn plain_unknowns(&self) -> Vec<String> {
        (0..=self.order())
            .map(|k| plain_name(self.dependent(), k))
            .collect()
    }

    /// `true` if the residual is linear in the unknown and all its derivatives.
    pub fn is_linear(&self) -> bool {
        let residual = self.plain_residual();
        let names = self.plain_unknowns();
        let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        names
            .iter()
            .all(|name| residual.diff(name).simplify().is_free_of(&refs))
    }
}

impl fmt::Display for SymbolicEquation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} = {}", self.lhs, self.rhs)
    }
}

/// `true` for a constant subexpression without a finite value, like `1/0` or `log(0)`, and for a
/// division by such a zero.
fn undefined_constant(e: &Expr) -> bool {
    if let Some(v) = e.eval_constant() {
        return !v.is_finite();
    }
    match e {
        Expr::Div(lhs, rhs) => {
            rhs.eval_constant() == Some(0.0) || undefined_constant(lhs) || undefined_constant(rhs)
        }
        Expr::Add(lhs, rhs) | Expr::Sub(lhs, rhs) | Expr::Mul(lhs, rhs) | Expr::Pow(lhs, rhs) => {
            undefined_constant(lhs) || undefined_constant(rhs)
        }
        Expr::Fun(_, arg) => undefined_constant(arg),
        _ => false,
    }
}

fn parse_side(text: &str, side: &str, table: &SymbolTable) -> Result<Expr, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::Syntax(format!("the {} side of the equation is empty", side)));
    }
    let expr = parse_with_table(text, table)?;
    if undefined_constant(&expr) {
        return Err(ParseError::Syntax(format!(
            "the {} side of the equation contains an undefined value such as a division by zero",
            side
        )));
    }
    Ok(expr)
}

/// Builds the equation from normalized text.
pub fn build(normalized: &str, bindings: &VariableBinding) -> Result<SymbolicEquation, ParseError> {
    let table = SymbolTable::new(bindings);
    let (lhs, rhs) = match normalized.split_once('=') {
        Some((left, right)) => (
            parse_side(left, "left", &table)?,
            parse_side(right, "right", &table)?,
        ),
        None => (parse_side(normalized, "left", &table)?, Expr::Const(0.0)),
    };
    let dep = bindings.dependent.as_str();
    let mut equation = SymbolicEquation {
        lhs,
        rhs,
        bindings: bindings.clone(),
    };
    let reduced = equation.residual().simplify();
    let order = reduced.max_order(dep).unwrap_or(0);
    if order == 0 {
        return Err(ParseError::NotDifferential(dep.to_string()));
    }
    if order < equation.order() {
        // derivatives cancelling across the sides do not count towards the order
        debug!("{} reduces to {} = 0", equation, reduced);
        equation.lhs = reduced;
        equation.rhs = Expr::Const(0.0);
    }
    debug!("built equation {} of order {}", equation, equation.order());
    Ok(equation)
}
