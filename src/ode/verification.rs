//! Checks a solution by substituting it back into the equation.
//!
//! An explicit branch `y(x) = f(x)` replaces the unknown and its derivatives by `f` and its
//! derivatives. An implicit first-order branch `F(x, y) = C1` replaces `y'` by `-F_x/F_y`.
//! The residual is first simplified; what the term algebra cannot cancel is evaluated at sample
//! points, with the integration constants fixed to a few value sets.

use log::{debug, warn};
use strum_macros::Display;

use crate::ode::builder::SymbolicEquation;
use crate::ode::solvers::{SolutionEq, SolutionExpression, is_constant_name};
use crate::symbolic::symbolic_engine::{Expr, plain_name};
use crate::symbolic::utils::as_fraction;

/// Values tried for `C1`; `Ck` gets the value shifted by `0.37*(k - 1)`.
const CONSTANT_VALUES: [f64; 3] = [1.3, 20.0, -0.7];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum Verification {
    #[strum(to_string = "verified symbolically")]
    Symbolic,
    #[strum(to_string = "verified numerically")]
    Numeric,
    #[strum(to_string = "verification failed")]
    Failed,
    #[strum(to_string = "could not be verified")]
    Inconclusive,
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Symbolic | Verification::Numeric)
    }

    /// The weaker of two outcomes.
    fn combine(self, other: Verification) -> Verification {
        use Verification::*;
        match (self, other) {
            (Failed, _) | (_, Failed) => Failed,
            (Inconclusive, _) | (_, Inconclusive) => Inconclusive,
            (Numeric, _) | (_, Numeric) => Numeric,
            _ => Symbolic,
        }
    }
}

fn constants_in(e: &Expr, eq: &SymbolicEquation) -> Vec<String> {
    e.extract_variables()
        .into_iter()
        .filter(|name| is_constant_name(name, &eq.bindings))
        .collect()
}

/// `true` if a power with an even root of a non-constant base occurs, like `sqrt(u)` or `u^(3/4)`.
fn has_even_root(e: &Expr) -> bool {
    match e {
        Expr::Pow(base, exponent) => {
            let even = exponent
                .as_const()
                .and_then(as_fraction)
                .is_some_and(|(_, q)| q % 2 == 0);
            (even && base.eval_constant().is_none()) || has_even_root(base) || has_even_root(exponent)
        }
        Expr::Add(lhs, rhs) | Expr::Sub(lhs, rhs) | Expr::Mul(lhs, rhs) | Expr::Div(lhs, rhs) => {
            has_even_root(lhs) || has_even_root(rhs)
        }
        Expr::Fun(_, arg) => has_even_root(arg),
        _ => false,
    }
}

fn numeric_check(residual: &Expr, constants: &[String]) -> Verification {
    let (mut confirmed, mut vanishing, mut failing) = (0, 0, 0);
    for base in CONSTANT_VALUES {
        let mut e = residual.clone();
        for (k, name) in constants.iter().enumerate() {
            e = e.set_variable(name, base + 0.37 * k as f64);
        }
        let (zero, other) = e.numeric_zero_counts();
        if other > 0 {
            debug!("residual {} does not vanish for C1 = {}", residual, base);
        } else if zero >= 3 {
            confirmed += 1;
        }
        vanishing += zero;
        failing += other;
    }
    if failing > 0 {
        // the principal root differs in sign from the branch the solution follows
        if vanishing > 0 && has_even_root(residual) {
            debug!("residual {} vanishes only where the root keeps its sign", residual);
            return Verification::Inconclusive;
        }
        return Verification::Failed;
    }
    if confirmed > 0 {
        Verification::Numeric
    } else {
        Verification::Inconclusive
    }
}

fn verify_explicit(eq: &SymbolicEquation, rhs: &Expr) -> Verification {
    let x = eq.independent();
    let derivatives: Vec<Expr> = (0..=eq.order())
        .map(|k| rhs.n_th_derivative1D(x, k))
        .collect();
    let residual = eq.residual().substitute_unknown(eq.dependent(), &derivatives);
    check_residual(&residual, eq)
}

fn verify_implicit(eq: &SymbolicEquation, branch: &SolutionEq) -> Verification {
    if eq.order() != 1 {
        return Verification::Inconclusive;
    }
    let (x, y) = (eq.independent(), eq.dependent());
    let relation = (branch.lhs.clone() - branch.rhs.clone()).to_plain();
    let fy = relation.diff(y).simplify();
    if fy.is_zero() {
        return Verification::Inconclusive;
    }
    let slope = Expr::Const(-1.0) * relation.diff(x) / fy;
    let residual = eq
        .plain_residual()
        .substitute_variable(&plain_name(y, 1), &slope);
    check_residual(&residual, eq)
}

/// Outcome for one branch of a solution.
pub fn verify_branch(eq: &SymbolicEquation, branch: &SolutionEq) -> Verification {
    if branch.is_explicit(eq.dependent()) {
        verify_explicit(eq, &branch.rhs)
    } else {
        verify_implicit(eq, branch)
    }
}

/// The weakest outcome over all branches.
pub fn verify(eq: &SymbolicEquation, solution: &SolutionExpression) -> Verification {
    let outcome = solution
        .branches()
        .iter()
        .map(|b| verify_branch(eq, b))
        .fold(Verification::Symbolic, Verification::combine);
    if outcome == Verification::Failed {
        warn!("{} does not satisfy {}", solution, eq);
    }
    outcome
}
