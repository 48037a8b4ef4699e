//! # ODE solvers
//!
//! The solving capability of the calculator. [`SolveCapability`] is the seam the dispatcher talks
//! to: classify an equation, and solve it, optionally restricted to one method. [`BuiltinSolver`]
//! implements it with the method solvers of the submodules:
//!
//! - `first_order`: separable, exact, linear, Bernoulli and homogeneous-coefficient equations
//! - `constant_coeff`: linear equations with constant coefficients (characteristic roots,
//!   undetermined coefficients, variation of parameters)
//!
//! Solutions are returned as [`SolutionExpression`]s; integration constants are the plain symbols
//! `C1`, `C2`, ... and are recognized by name.

pub mod constant_coeff;
pub mod first_order;

use std::fmt;

use log::debug;

use crate::ode::builder::SymbolicEquation;
use crate::ode::classifier::{Method, OdeClass, classify};
use crate::ode::error::SolveError;
use crate::symbolic::symbol_table::VariableBinding;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::natural_cmp;

/// One equality of a solution: `y(x) = rhs` when explicit, `F(x, y(x)) = C1` when implicit.
#[derive(Clone, Debug, PartialEq)]
pub struct SolutionEq {
    pub lhs: Expr,
    pub rhs: Expr,
}

impl SolutionEq {
    /// `dep(indep) = rhs`
    pub fn explicit(dep: &str, indep: &str, rhs: Expr) -> SolutionEq {
        SolutionEq {
            lhs: Expr::unknown(dep, indep, 0),
            rhs,
        }
    }

    /// `true` for `y(x) = rhs` with `rhs` free of the unknown.
    pub fn is_explicit(&self, dep: &str) -> bool {
        matches!(&self.lhs, Expr::Unknown { name, order: 0, .. } if name == dep)
            && self.rhs.max_order(dep).is_none()
    }

    pub fn map(&self, f: &dyn Fn(&Expr) -> Expr) -> SolutionEq {
        SolutionEq {
            lhs: f(&self.lhs),
            rhs: f(&self.rhs),
        }
    }
}

impl fmt::Display for SolutionEq {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} = {}", self.lhs, self.rhs)
    }
}

/// A single solution or several branches (e.g. the two signs of a square root).
#[derive(Clone, Debug, PartialEq)]
pub enum SolutionExpression {
    Single(SolutionEq),
    Branches(Vec<SolutionEq>),
}

impl SolutionExpression {
    pub fn from_branches(mut branches: Vec<SolutionEq>) -> SolutionExpression {
        if branches.len() == 1 {
            SolutionExpression::Single(branches.remove(0))
        } else {
            SolutionExpression::Branches(branches)
        }
    }

    pub fn branches(&self) -> &[SolutionEq] {
        match self {
            SolutionExpression::Single(eq) => std::slice::from_ref(eq),
            SolutionExpression::Branches(eqs) => eqs,
        }
    }

    pub fn map(&self, f: &dyn Fn(&Expr) -> Expr) -> SolutionExpression {
        SolutionExpression::from_branches(self.branches().iter().map(|b| b.map(f)).collect())
    }

    /// Integration constants: free symbols containing `C` other than the bound variables,
    /// naturally sorted.
    pub fn constants(&self, bindings: &VariableBinding) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for branch in self.branches() {
            for side in [&branch.lhs, &branch.rhs] {
                for name in side.extract_variables() {
                    if is_constant_name(&name, bindings) && !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }
        names.sort_by(|a, b| natural_cmp(a, b));
        names
    }
}

impl fmt::Display for SolutionExpression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SolutionExpression::Single(eq) => write!(f, "{}", eq),
            SolutionExpression::Branches(eqs) => {
                let parts: Vec<String> = eqs.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

pub fn is_constant_name(name: &str, bindings: &VariableBinding) -> bool {
    name.contains('C') && name != bindings.independent && name != bindings.dependent
}

/// `C1`, `C2`, ...
pub fn constant(k: usize) -> Expr {
    Expr::Var(format!("C{}", k))
}

/// The shorter of the simplified and the expanded form.
pub fn tidy(e: &Expr) -> Expr {
    let simplified = e.simplify();
    let expanded = e.expand();
    if expanded.size() < simplified.size() {
        expanded
    } else {
        simplified
    }
}

/// Antiderivative as a solver result.
pub(crate) fn integral(e: &Expr, var: &str) -> Result<Expr, SolveError> {
    e.simplify()
        .integrate(var)
        .map(|r| r.simplify())
        .map_err(SolveError::NotImplemented)
}

/// Result of a successful solve.
#[derive(Clone, Debug, PartialEq)]
pub struct Solved {
    pub solution: SolutionExpression,
    pub method: Method,
}

/// The solving capability the dispatcher relies on.
pub trait SolveCapability {
    /// Patterns of the equation in preference order.
    fn classify(&self, eq: &SymbolicEquation) -> Vec<OdeClass>;

    /// With `Some(method)` only that method is tried; with `None` every classified method is
    /// tried once in preference order.
    fn dsolve(&self, eq: &SymbolicEquation, hint: Option<Method>) -> Result<Solved, SolveError>;
}

/// Solves with the methods of this crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinSolver;

impl BuiltinSolver {
    pub fn solve_class(
        &self,
        eq: &SymbolicEquation,
        class: &OdeClass,
    ) -> Result<SolutionExpression, SolveError> {
        match class {
            OdeClass::Separable { g, h } => first_order::separable(eq, g, h),
            OdeClass::FirstExact { m, n } => first_order::exact(eq, m, n),
            OdeClass::FirstLinear { p, q } => first_order::linear(eq, p, q),
            OdeClass::Bernoulli { p, q, n } => first_order::bernoulli(eq, p, q, *n),
            OdeClass::FirstHomogeneousCoeff { f } => first_order::homogeneous_coefficients(eq, f),
            OdeClass::ConstCoeffHomogeneous { coeffs } => constant_coeff::homogeneous(eq, coeffs),
            OdeClass::UndeterminedCoefficients { coeffs, forcing } => {
                constant_coeff::undetermined_coefficients(eq, coeffs, forcing)
            }
            OdeClass::VariationOfParameters { coeffs, forcing } => {
                constant_coeff::variation_of_parameters(eq, coeffs, forcing)
            }
        }
    }
}

impl SolveCapability for BuiltinSolver {
    fn classify(&self, eq: &SymbolicEquation) -> Vec<OdeClass> {
        classify(eq)
    }

    fn dsolve(&self, eq: &SymbolicEquation, hint: Option<Method>) -> Result<Solved, SolveError> {
        let classes = classify(eq);
        if let Some(method) = hint {
            let class = classes
                .iter()
                .find(|c| c.method() == method)
                .ok_or(SolveError::NotApplicable(method))?;
            let solution = self.solve_class(eq, class)?;
            return Ok(Solved { solution, method });
        }
        let mut last_error =
            SolveError::NotImplemented(format!("no solution method matches {}", eq));
        for class in &classes {
            match self.solve_class(eq, class) {
                Ok(solution) => {
                    return Ok(Solved {
                        solution,
                        method: class.method(),
                    });
                }
                Err(e) => {
                    debug!("method {} failed: {}", class.tag(), e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_naturally_sorted() {
        let rhs = constant(10) + constant(2) * Expr::var("x") + constant(1);
        let sol = SolutionExpression::Single(SolutionEq::explicit("y", "x", rhs));
        assert_eq!(sol.constants(&VariableBinding::default()), vec!["C1", "C2", "C10"]);
    }

    #[test]
    fn test_bound_names_are_not_constants() {
        let bindings = VariableBinding::new("Cx", "y");
        let sol = SolutionExpression::Single(SolutionEq::explicit("y", "Cx", Expr::var("Cx")));
        assert!(sol.constants(&bindings).is_empty());
    }

    #[test]
    fn test_branches() {
        let a = SolutionEq::explicit("y", "x", Expr::var("x"));
        let b = SolutionEq::explicit("y", "x", Expr::Const(-1.0) * Expr::var("x"));
        let single = SolutionExpression::from_branches(vec![a.clone()]);
        assert_eq!(single.branches().len(), 1);
        let both = SolutionExpression::from_branches(vec![a, b]);
        assert_eq!(both.to_string(), "[y(x) = x, y(x) = -x]");
        assert!(both.branches()[1].is_explicit("y"));
    }

    #[test]
    fn test_tidy_prefers_shorter_form() {
        let x = Expr::var("x");
        let e = (x.clone() * x.clone().exp() + constant(1)) * (Expr::Const(-1.0) * x.clone()).exp();
        let t = tidy(&e);
        assert!(t.size() <= e.simplify().size());
        let expected = x.clone() + constant(1) * (Expr::Const(-1.0) * x).exp();
        assert!((t - expected).is_identically_zero());
    }
}
