//! First-order methods.
//!
//! The solvers work on the plain form (`x`, `y` as symbols) handed over by the classifier and
//! produce `y(x) = ...` branches when the relation they find can be solved for `y`, or an implicit
//! solution `F(x, y(x)) = C1` otherwise.
//!
//! A freshly introduced constant is simplified away where possible: `exp(g(x) + C1)` becomes
//! `C1*exp(g(x))`, `2*C1` becomes `C1`, and a number added to `C1` disappears.

use log::debug;

use crate::ode::builder::SymbolicEquation;
use crate::ode::classifier::Method;
use crate::ode::error::SolveError;
use crate::ode::solvers::{SolutionEq, SolutionExpression, constant, integral, tidy};
use crate::symbolic::polynomial::rational_parts;
use crate::symbolic::symbolic_engine::{Constant, Expr, Func};
use crate::symbolic::symbolic_simplify::Term;

/// Symbol of the ratio `y/x` in the homogeneous-coefficient substitution.
const RATIO: &str = "v_ratio";
const MAX_INVERSION_DEPTH: usize = 8;
const CONSTANT: &str = "C1";

fn occurrences(e: &Expr, name: &str) -> usize {
    match e {
        Expr::Var(n) => usize::from(n == name),
        Expr::Add(lhs, rhs)
        | Expr::Sub(lhs, rhs)
        | Expr::Mul(lhs, rhs)
        | Expr::Div(lhs, rhs)
        | Expr::Pow(lhs, rhs) => occurrences(lhs, name) + occurrences(rhs, name),
        Expr::Fun(_, arg) => occurrences(arg, name),
        _ => 0,
    }
}

fn is_bare(t: &Term, name: &str) -> bool {
    matches!(t.factors.as_slice(), [(Expr::Var(n), e)] if n == name && e.is_one())
}

/// Absorbs numeric factors, added numbers and `exp` of the constant `name` into the constant.
/// Only done when the constant occurs exactly once.
pub fn absorb_constant(e: &Expr, name: &str) -> Expr {
    let e = e.simplify();
    if occurrences(&e, name) != 1 {
        return e;
    }
    absorb(&e, name).simplify()
}

fn absorb(e: &Expr, name: &str) -> Expr {
    let terms: Vec<Term> = e.terms().iter().map(|t| absorb_term(t, name)).collect();
    let has_bare = terms.iter().any(|t| is_bare(t, name) && t.coeff == 1.0);
    let kept: Vec<Term> = if has_bare && terms.len() > 1 {
        terms.into_iter().filter(|t| !t.is_constant()).collect()
    } else {
        terms
    };
    Expr::from_terms(&kept)
}

fn absorb_term(t: &Term, name: &str) -> Term {
    if !t.contains_variable(name) {
        return t.clone();
    }
    if is_bare(t, name) {
        return Term::factor(Expr::var(name), Expr::Const(1.0));
    }
    let mut out = Term::constant(t.coeff);
    let mut absorbed = false;
    for (base, exponent) in &t.factors {
        if !base.contains_variable(name) && !exponent.contains_variable(name) {
            out.push_factor(base.clone(), exponent.clone());
            continue;
        }
        if *base == Expr::Sym(Constant::E) {
            let parts = exponent.terms();
            if let Some(pos) = parts.iter().position(|p| {
                matches!(p.factors.as_slice(), [(Expr::Var(n), e)] if n == name && e.is_one())
            }) {
                let rest: Vec<Term> = parts
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != pos)
                    .map(|(_, p)| p.clone())
                    .collect();
                out.push_factor(base.clone(), Expr::from_terms(&rest));
                out.push_factor(Expr::var(name), Expr::Const(1.0));
                absorbed = true;
                continue;
            }
        }
        if exponent.contains_variable(name) {
            out.push_factor(base.clone(), exponent.clone());
        } else {
            out.push_factor(absorb(base, name), exponent.clone());
        }
    }
    if absorbed {
        out.coeff = 1.0;
    }
    out
}

fn inverse_function(f: Func, value: Expr) -> Option<Expr> {
    let inverse = match f {
        Func::ln => return Some(value.exp()),
        Func::exp => return Some(value.ln()),
        Func::sin => Func::arcsin,
        Func::cos => Func::arccos,
        Func::tan => Func::arctan,
        Func::arcsin => Func::sin,
        Func::arccos => Func::cos,
        Func::arctan => Func::tan,
        _ => return None,
    };
    Some(Expr::func(inverse, value))
}

/// Coefficients `c0, c1, c2` of `e = c0 + c1*y + c2*y^2`, symbolic in the other variables.
fn quadratic_coefficients(e: &Expr, y: &str) -> Option<[Expr; 3]> {
    let y_sym = Expr::var(y);
    let mut parts: [Vec<Term>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for term in e.expanded_terms() {
        let mut k = 0usize;
        let mut rest = Term::constant(term.coeff);
        for (base, exponent) in &term.factors {
            if *base == y_sym {
                let p = exponent.as_const()?;
                if p < 0.0 || p.fract() != 0.0 {
                    return None;
                }
                k += p as usize;
            } else if base.contains_variable(y) || exponent.contains_variable(y) {
                return None;
            } else {
                rest.push_factor(base.clone(), exponent.clone());
            }
        }
        parts.get_mut(k)?.push(rest);
    }
    Some(parts.map(|terms| Expr::from_terms(&terms).simplify()))
}

fn invert_polynomial(lhs: &Expr, y: &str, rhs: &Expr) -> Option<Vec<Expr>> {
    let [c0, c1, c2] = quadratic_coefficients(lhs, y)?;
    let c0 = (c0 - rhs.clone()).simplify();
    if !c2.is_zero() {
        let disc = (c1.clone().pow(Expr::Const(2.0)) - Expr::Const(4.0) * c2.clone() * c0).simplify();
        let root = disc.sqrt();
        let den = Expr::Const(2.0) * c2;
        let minus = (Expr::Const(-1.0) * c1.clone() - root.clone()) / den.clone();
        let plus = (Expr::Const(-1.0) * c1 + root) / den;
        return Some(vec![tidy(&minus), tidy(&plus)]);
    }
    if !c1.is_zero() {
        return Some(vec![tidy(&(Expr::Const(-1.0) * c0 / c1))]);
    }
    None
}

/// Solutions `y` of `lhs(y) = rhs`, `None` when the relation cannot be inverted.
pub fn solve_for(lhs: &Expr, y: &str, rhs: &Expr) -> Option<Vec<Expr>> {
    invert(&lhs.simplify(), y, rhs.clone(), 0)
}

fn invert(lhs: &Expr, y: &str, rhs: Expr, depth: usize) -> Option<Vec<Expr>> {
    if depth > MAX_INVERSION_DEPTH || lhs.is_free_of(&[y]) {
        return None;
    }
    if *lhs == Expr::var(y) {
        return Some(vec![rhs.simplify()]);
    }
    if let Some(roots) = invert_polynomial(lhs, y, &rhs) {
        return Some(roots);
    }
    let (dependent, free): (Vec<Term>, Vec<Term>) =
        lhs.terms().into_iter().partition(|t| t.contains_variable(y));
    let [term] = dependent.as_slice() else {
        return None;
    };
    let rhs = (rhs - Expr::from_terms(&free)).simplify();
    let mut rest = Term::constant(term.coeff);
    let mut inner: Option<(Expr, Expr)> = None;
    for (base, exponent) in &term.factors {
        if base.contains_variable(y) || exponent.contains_variable(y) {
            if inner.is_some() {
                return None;
            }
            inner = Some((base.clone(), exponent.clone()));
        } else {
            rest.push_factor(base.clone(), exponent.clone());
        }
    }
    let (base, exponent) = inner?;
    let rhs = (rhs / rest.to_expr()).simplify();
    if exponent.contains_variable(y) {
        return match base {
            Expr::Sym(Constant::E) => invert(&exponent.simplify(), y, rhs.ln(), depth + 1),
            _ => None,
        };
    }
    if !exponent.is_one() {
        let k = exponent.as_const()?;
        let root = rhs.pow(Expr::Const(1.0 / k)).simplify();
        let even = k.fract() == 0.0 && (k as i64) % 2 == 0;
        let candidates = if even {
            vec![(Expr::Const(-1.0) * root.clone()).simplify(), root]
        } else {
            vec![root]
        };
        let mut out = Vec::new();
        for c in candidates {
            out.extend(invert(&base, y, c, depth + 1)?);
        }
        return Some(out);
    }
    match base {
        Expr::Fun(f, arg) => invert(&arg.simplify(), y, inverse_function(f, rhs)?, depth + 1),
        other if other != *lhs => invert(&other, y, rhs, depth + 1),
        _ => None,
    }
}

/// Solution of `lhs(x, y) = particular(x) + C1`.
fn finish(eq: &SymbolicEquation, lhs: &Expr, particular: &Expr) -> SolutionExpression {
    let (x, y) = (eq.independent(), eq.dependent());
    let rhs = particular.clone() + constant(1);
    match solve_for(lhs, y, &rhs) {
        Some(branches) if branches.iter().all(|b| b.is_free_of(&[y])) => {
            SolutionExpression::from_branches(
                branches
                    .iter()
                    .map(|b| SolutionEq::explicit(y, x, tidy(&absorb_constant(b, CONSTANT))))
                    .collect(),
            )
        }
        _ => {
            debug!("{} = {} + C1 kept in implicit form", lhs, particular);
            SolutionExpression::Single(SolutionEq {
                lhs: (lhs.clone() - particular.clone()).simplify().from_plain(y, x),
                rhs: constant(1),
            })
        }
    }
}

/// `y' = g(x)*h(y)`: `∫dy/h(y) = ∫g(x)dx + C1`
pub fn separable(eq: &SymbolicEquation, g: &Expr, h: &Expr) -> Result<SolutionExpression, SolveError> {
    let (x, y) = (eq.independent(), eq.dependent());
    let hy = integral(&(Expr::Const(1.0) / h.clone()), y)?;
    let gx = integral(g, x)?;
    debug!("separated integrals: {} | {}", hy, gx);
    Ok(finish(eq, &hy, &gx))
}

/// `(∫μ*q dx + C1)/μ` with `μ = exp(∫p dx)`
fn integrating_factor(p: &Expr, q: &Expr, x: &str) -> Result<Expr, SolveError> {
    let ip = integral(p, x)?;
    let mu = ip.clone().exp().simplify();
    let inner = integral(&(mu * q.clone()), x)?;
    Ok(tidy(&((inner + constant(1)) * (Expr::Const(-1.0) * ip).exp())))
}

/// `y' + P(x)*y = Q(x)`
pub fn linear(eq: &SymbolicEquation, p: &Expr, q: &Expr) -> Result<SolutionExpression, SolveError> {
    let (x, y) = (eq.independent(), eq.dependent());
    let rhs = integrating_factor(p, q, x)?;
    Ok(SolutionExpression::Single(SolutionEq::explicit(y, x, rhs)))
}

/// `y' + P(x)*y = Q(x)*y^n` through the linear equation for `v = y^(1-n)`
pub fn bernoulli(
    eq: &SymbolicEquation,
    p: &Expr,
    q: &Expr,
    n: f64,
) -> Result<SolutionExpression, SolveError> {
    let (x, y) = (eq.independent(), eq.dependent());
    let k = 1.0 - n;
    let v = integrating_factor(
        &(Expr::Const(k) * p.clone()).simplify(),
        &(Expr::Const(k) * q.clone()).simplify(),
        x,
    )?;
    let root = v.pow(Expr::Const(1.0 / k)).simplify();
    let even = k.fract() == 0.0 && (k as i64) % 2 == 0;
    let branches = if even {
        vec![(Expr::Const(-1.0) * root.clone()).simplify(), root]
    } else {
        vec![root]
    };
    Ok(SolutionExpression::from_branches(
        branches
            .iter()
            .map(|b| SolutionEq::explicit(y, x, tidy(b)))
            .collect(),
    ))
}

/// `M dx + N dy = 0` with a potential `F`, `∂F/∂x = M`, `∂F/∂y = N`: `F(x, y) = C1`
pub fn exact(eq: &SymbolicEquation, m: &Expr, n: &Expr) -> Result<SolutionExpression, SolveError> {
    let (x, y) = (eq.independent(), eq.dependent());
    let fx = integral(m, x)?;
    let rest = (n.clone() - fx.diff(y)).expand();
    if !rest.diff(x).is_identically_zero() {
        return Err(SolveError::NotApplicable(Method::FirstExact));
    }
    let rest = if rest.is_free_of(&[x]) {
        rest
    } else {
        rest.set_variable(x, 1.0).simplify()
    };
    let gy = integral(&rest, y)?;
    let potential = (fx + gy).simplify();
    debug!("potential of the exact equation: {}", potential);
    Ok(finish(eq, &potential, &Expr::Const(0.0)))
}

/// `y' = f(y/x)`: with `y = v*x`, `∫dv/(f(1, v) - v) = log(x) + C1`
pub fn homogeneous_coefficients(eq: &SymbolicEquation, f: &Expr) -> Result<SolutionExpression, SolveError> {
    let (x, y) = (eq.independent(), eq.dependent());
    let v = Expr::var(RATIO);
    let fv = f
        .substitute_variable(x, &Expr::Const(1.0))
        .substitute_variable(y, &v)
        .simplify();
    let denom = (fv - v).simplify();
    if denom.is_identically_zero() {
        return Err(SolveError::NotApplicable(Method::FirstHomogeneousCoeff));
    }
    let integrand = Expr::Const(1.0) / denom;
    let integrand = match rational_parts(&integrand, RATIO) {
        Some((n, d)) if d.degree() == 0 => n.scale(1.0 / d.leading()).to_expr(RATIO),
        Some((n, d)) => n.to_expr(RATIO) / d.to_expr(RATIO),
        None => integrand,
    };
    let hv = integral(&integrand, RATIO)?;
    let log_x = Expr::var(x).ln();
    let rhs = log_x.clone() + constant(1);
    match solve_for(&hv, RATIO, &rhs) {
        Some(values) if values.iter().all(|v| v.is_free_of(&[RATIO])) => {
            Ok(SolutionExpression::from_branches(
                values
                    .into_iter()
                    .map(|v| {
                        let rhs = absorb_constant(&(Expr::var(x) * v), CONSTANT);
                        SolutionEq::explicit(y, x, tidy(&rhs))
                    })
                    .collect(),
            ))
        }
        _ => {
            let ratio = Expr::var(y) / Expr::var(x);
            let lhs = (hv.substitute_variable(RATIO, &ratio) - log_x).simplify();
            Ok(SolutionExpression::Single(SolutionEq {
                lhs: lhs.from_plain(y, x),
                rhs: constant(1),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ode::builder::build;
    use crate::ode::normalizer::normalize;
    use crate::ode::solvers::{BuiltinSolver, SolveCapability};
    use crate::ode::verification::{Verification, verify};
    use crate::symbolic::symbol_table::VariableBinding;

    fn equation(raw: &str) -> SymbolicEquation {
        let bindings = VariableBinding::default();
        build(&normalize(raw, &bindings), &bindings).unwrap()
    }

    fn solve(raw: &str, method: Method) -> (SymbolicEquation, SolutionExpression) {
        let eq = equation(raw);
        let solved = BuiltinSolver.dsolve(&eq, Some(method)).unwrap();
        (eq, solved.solution)
    }

    fn assert_verified(eq: &SymbolicEquation, sol: &SolutionExpression) {
        let v = verify(eq, sol);
        assert!(
            matches!(v, Verification::Symbolic | Verification::Numeric),
            "{} does not solve {}: {:?}",
            sol,
            eq,
            v
        );
    }

    #[test]
    fn test_absorb_constant() {
        let c1 = Expr::var("C1");
        let x = Expr::var("x");
        let e = (x.clone().pow(Expr::Const(2.0)) / Expr::Const(2.0) + c1.clone()).exp();
        let absorbed = absorb_constant(&e, "C1");
        let expected = c1.clone() * (x.clone().pow(Expr::Const(2.0)) / Expr::Const(2.0)).exp();
        assert!((absorbed - expected).is_identically_zero());
        let e = Expr::Const(2.0) * c1.clone() + x.clone() + Expr::Const(1.0);
        let absorbed = absorb_constant(&e, "C1");
        assert!((absorbed - (c1.clone() + x.clone())).is_identically_zero());
        let twice = c1.clone() * x.clone() + c1;
        assert_eq!(absorb_constant(&twice, "C1"), twice.simplify());
    }

    #[test]
    fn test_solve_for() {
        let y = Expr::var("y");
        let rhs = Expr::var("x") + Expr::var("C1");
        let roots = solve_for(&y.clone().ln(), "y", &rhs).unwrap();
        assert_eq!(roots.len(), 1);
        assert!((roots[0].clone() - rhs.clone().exp()).is_identically_zero());
        let roots = solve_for(&y.clone().pow(Expr::Const(2.0)), "y", &rhs).unwrap();
        assert_eq!(roots.len(), 2);
        let roots = solve_for(&Expr::func(Func::arctan, y.clone()), "y", &rhs).unwrap();
        assert_eq!(roots.len(), 1);
        assert!((roots[0].clone() - Expr::func(Func::tan, rhs.clone())).is_identically_zero());
        assert!(solve_for(&(y.clone() + y.clone().exp()), "y", &rhs).is_none());
    }

    #[test]
    fn test_separable_exponential() {
        let (eq, sol) = solve("y' = x*y", Method::Separable);
        assert_eq!(sol.to_string(), "y(x) = C1*exp(x**2/2)");
        assert_eq!(sol.constants(&eq.bindings), vec!["C1"]);
        assert_verified(&eq, &sol);
    }

    #[test]
    fn test_separable_two_branches() {
        let (eq, sol) = solve("y' = x/y", Method::Separable);
        assert_eq!(sol.branches().len(), 2);
        assert_verified(&eq, &sol);
        let (eq, sol) = solve("y' = (1 + y**2)*cos(x)", Method::Separable);
        assert_verified(&eq, &sol);
    }

    #[test]
    fn test_linear() {
        for raw in ["y' + 2*y = x", "y' + y/x = x**2", "y' - 3*y = exp(x)"] {
            let (eq, sol) = solve(raw, Method::FirstLinear);
            assert_eq!(sol.constants(&eq.bindings).len(), 1);
            assert_verified(&eq, &sol);
        }
    }

    #[test]
    fn test_exact() {
        let (eq, sol) = solve("(2*x + y) + (x + 2*y)*y' = 0", Method::FirstExact);
        assert_eq!(sol.branches().len(), 2);
        assert_verified(&eq, &sol);
        let (eq, sol) = solve("(2*x*y + 1) + (x**2 + 2*y)*y' = 0", Method::FirstExact);
        assert_verified(&eq, &sol);
    }

    #[test]
    fn test_bernoulli_and_homogeneous() {
        let (eq, sol) = solve("y' = (x**2 + y**2)/(x*y)", Method::Bernoulli);
        assert_eq!(sol.branches().len(), 2);
        assert_verified(&eq, &sol);
        let (eq, sol) = solve("y' = (x + y)/x", Method::FirstHomogeneousCoeff);
        assert_verified(&eq, &sol);
        let (eq, sol) = solve("y' = (x**2 + y**2)/(x*y)", Method::FirstHomogeneousCoeff);
        assert_verified(&eq, &sol);
    }

    #[test]
    fn test_hint_not_applicable() {
        let eq = equation("y' + 2*y = x");
        assert_eq!(
            BuiltinSolver.dsolve(&eq, Some(Method::Bernoulli)),
            Err(SolveError::NotApplicable(Method::Bernoulli))
        );
    }
}
