//! Recognition of the structural patterns that have a closed-form solution method.
//!
//! Classification works on the plain form of the residual `F(x, y, y', ...) = lhs - rhs`, where the
//! unknown and its derivatives are ordinary symbols and ordinary partial derivatives apply.
//!
//! First order: `F` must be linear in `y'`, `F = A(x, y)*y' + B(x, y)`, which gives both the
//! explicit form `y' = f(x, y) = -B/A` and the differential form `M dx + N dy = 0` with `M = B`,
//! `N = A`. Higher order: `F` must be linear in `y, y', ..., y^(n)` with constant coefficients.
//!
//! The returned list is in solver preference order, the order of [`Method`]'s variants.

use log::{debug, warn};
use strum_macros::{Display, EnumIter, EnumString};

use crate::ode::builder::SymbolicEquation;
use crate::ode::solvers::constant_coeff::forcing_families;
use crate::symbolic::symbolic_engine::{Constant, Expr, plain_name};
use crate::symbolic::symbolic_simplify::Term;

/// Tag of a solution method. The string form is the tag name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
pub enum Method {
    #[strum(to_string = "separable")]
    Separable,
    #[strum(to_string = "1st_exact")]
    FirstExact,
    #[strum(to_string = "1st_linear")]
    FirstLinear,
    #[strum(to_string = "Bernoulli")]
    Bernoulli,
    #[strum(to_string = "1st_homogeneous_coeff_best")]
    FirstHomogeneousCoeff,
    #[strum(to_string = "nth_linear_constant_coeff_homogeneous")]
    ConstCoeffHomogeneous,
    #[strum(to_string = "nth_linear_constant_coeff_undetermined_coefficients")]
    UndeterminedCoefficients,
    #[strum(to_string = "nth_linear_constant_coeff_variation_of_parameters")]
    VariationOfParameters,
}

impl Method {
    /// Human readable name.
    pub fn title(&self) -> &'static str {
        match self {
            Method::Separable => "Separable",
            Method::FirstExact => "First-order exact",
            Method::FirstLinear => "First-order linear",
            Method::Bernoulli => "Bernoulli",
            Method::FirstHomogeneousCoeff => "First-order homogeneous coefficients",
            Method::ConstCoeffHomogeneous => "Constant coefficients, homogeneous",
            Method::UndeterminedCoefficients => "Constant coefficients, undetermined coefficients",
            Method::VariationOfParameters => "Constant coefficients, variation of parameters",
        }
    }

    pub fn is_constant_coeff(&self) -> bool {
        matches!(
            self,
            Method::ConstCoeffHomogeneous
                | Method::UndeterminedCoefficients
                | Method::VariationOfParameters
        )
    }
}

/// A recognized pattern together with the data its solver and narrative need.
///
/// Expressions are in plain form: the independent variable `x` and the symbol `y` for the
/// unknown function.
#[derive(Clone, Debug, PartialEq)]
pub enum OdeClass {
    /// `y' = g(x)*h(y)`
    Separable { g: Expr, h: Expr },
    /// `M dx + N dy = 0` with `∂M/∂y = ∂N/∂x`
    FirstExact { m: Expr, n: Expr },
    /// `y' + P(x)*y = Q(x)`
    FirstLinear { p: Expr, q: Expr },
    /// `y' + P(x)*y = Q(x)*y^n`, `n` different from 0 and 1
    Bernoulli { p: Expr, q: Expr, n: f64 },
    /// `y' = f(x, y)` with `f(t*x, t*y) = f(x, y)`
    FirstHomogeneousCoeff { f: Expr },
    /// `Σ coeffs[k]*y^(k) = 0`, `coeffs` ascending, leading coefficient 1
    ConstCoeffHomogeneous { coeffs: Vec<f64> },
    UndeterminedCoefficients { coeffs: Vec<f64>, forcing: Expr },
    VariationOfParameters { coeffs: Vec<f64>, forcing: Expr },
}

impl OdeClass {
    pub fn method(&self) -> Method {
        match self {
            OdeClass::Separable { .. } => Method::Separable,
            OdeClass::FirstExact { .. } => Method::FirstExact,
            OdeClass::FirstLinear { .. } => Method::FirstLinear,
            OdeClass::Bernoulli { .. } => Method::Bernoulli,
            OdeClass::FirstHomogeneousCoeff { .. } => Method::FirstHomogeneousCoeff,
            OdeClass::ConstCoeffHomogeneous { .. } => Method::ConstCoeffHomogeneous,
            OdeClass::UndeterminedCoefficients { .. } => Method::UndeterminedCoefficients,
            OdeClass::VariationOfParameters { .. } => Method::VariationOfParameters,
        }
    }

    /// Tag name, e.g. `1st_linear`.
    pub fn tag(&self) -> String {
        self.method().to_string()
    }
}

/// Name of the scaling symbol of the homogeneity test.
const SCALE: &str = "t_scale";

/// `F = A*y' + B`, `None` when `F` is not linear in `y'` or `A` vanishes.
pub fn first_order_form(residual: &Expr, dep: &str) -> Option<(Expr, Expr)> {
    let p = plain_name(dep, 1);
    let a = residual.diff(&p).simplify();
    if a.contains_variable(&p) || a.is_identically_zero() {
        return None;
    }
    let b = residual.substitute_variable(&p, &Expr::Const(0.0)).simplify();
    Some((a, b))
}

/// Explicit right-hand side `f(x, y)` of `y' = f(x, y)`.
pub fn explicit_first_order(eq: &SymbolicEquation) -> Option<Expr> {
    let (a, b) = first_order_form(&eq.plain_residual(), eq.dependent())?;
    Some((Expr::Const(-1.0) * b / a).simplify())
}

/// Splits `f` into `g(x)*h(y)`.
pub fn separate(f: &Expr, x: &str, y: &str) -> Option<(Expr, Expr)> {
    let f = f.simplify();
    if f.is_free_of(&[y]) {
        return Some((f, Expr::Const(1.0)));
    }
    if f.is_free_of(&[x]) {
        return Some((Expr::Const(1.0), f));
    }
    let terms = f.terms();
    let [term] = terms.as_slice() else {
        return None;
    };
    let mut g = Term::constant(term.coeff);
    let mut h = Term::constant(1.0);
    for (base, exponent) in &term.factors {
        let in_x = base.contains_variable(x) || exponent.contains_variable(x);
        let in_y = base.contains_variable(y) || exponent.contains_variable(y);
        match (in_x, in_y) {
            (_, false) => g.push_factor(base.clone(), exponent.clone()),
            (false, true) => h.push_factor(base.clone(), exponent.clone()),
            (true, true) => {
                // exp(a(x) + b(y)) = exp(a(x))*exp(b(y))
                if *base != Expr::Sym(Constant::E) {
                    return None;
                }
                let (mut in_g, mut in_h) = (Vec::new(), Vec::new());
                for t in exponent.terms() {
                    match (t.contains_variable(x), t.contains_variable(y)) {
                        (true, true) => return None,
                        (_, true) => in_h.push(t),
                        _ => in_g.push(t),
                    }
                }
                g.push_factor(base.clone(), Expr::from_terms(&in_g));
                h.push_factor(base.clone(), Expr::from_terms(&in_h));
            }
        }
    }
    Some((g.to_expr(), h.to_expr()))
}

fn exact(m: &Expr, n: &Expr, x: &str, y: &str) -> bool {
    (m.diff(y) - n.diff(x)).is_identically_zero()
}

/// `f = -P(x)*y + Q(x)`
fn linear(f: &Expr, x: &str, y: &str) -> Option<(Expr, Expr)> {
    let fy = f.diff(y);
    if !fy.diff(y).is_identically_zero() {
        return None;
    }
    let p = (Expr::Const(-1.0) * fy).simplify();
    let q = f.substitute_variable(y, &Expr::Const(0.0)).simplify();
    if !p.is_free_of(&[y]) || !q.is_free_of(&[y]) {
        return None;
    }
    debug!("linear form in {}: P = {}, Q = {}", x, p, q);
    Some((p, q))
}

/// `f = -P(x)*y + Q(x)*y^n`
fn bernoulli(f: &Expr, y: &str) -> Option<(Expr, Expr, f64)> {
    let y_sym = Expr::var(y);
    let mut linear_part = Vec::new();
    let mut power_part = Vec::new();
    let mut power: Option<f64> = None;
    for term in f.expanded_terms() {
        let mut k = 0.0;
        let mut rest = Term::constant(term.coeff);
        for (base, exponent) in &term.factors {
            if *base == y_sym {
                k += exponent.as_const()?;
            } else if base.contains_variable(y) || exponent.contains_variable(y) {
                return None;
            } else {
                rest.push_factor(base.clone(), exponent.clone());
            }
        }
        if k == 1.0 {
            linear_part.push(rest);
        } else if k == 0.0 {
            return None;
        } else {
            match power {
                Some(n) if (n - k).abs() > 1e-12 => return None,
                _ => power = Some(k),
            }
            power_part.push(rest);
        }
    }
    let n = power?;
    let p = (Expr::Const(-1.0) * Expr::from_terms(&linear_part)).simplify();
    let q = Expr::from_terms(&power_part).simplify();
    Some((p, q, n))
}

fn homogeneous_coefficients(f: &Expr, x: &str, y: &str) -> bool {
    if f.is_free_of(&[y]) || f.is_free_of(&[x]) {
        return false;
    }
    // f(t*x, t*y) = f(x, y) for t > 0
    let t = Expr::var(SCALE).pow(Expr::Const(2.0));
    let scaled = f
        .substitute_variable(x, &(t.clone() * Expr::var(x)))
        .substitute_variable(y, &(t * Expr::var(y)));
    (scaled - f.clone()).is_identically_zero()
}

fn classify_first_order(eq: &SymbolicEquation) -> Vec<OdeClass> {
    let (x, y) = (eq.independent(), eq.dependent());
    let Some((a, b)) = first_order_form(&eq.plain_residual(), y) else {
        warn!("{} is not linear in the first derivative, no pattern applies", eq);
        return Vec::new();
    };
    let f = (Expr::Const(-1.0) * b.clone() / a.clone()).simplify();
    let mut classes = Vec::new();
    if let Some((g, h)) = separate(&f, x, y) {
        classes.push(OdeClass::Separable { g, h });
    }
    if exact(&b, &a, x, y) {
        classes.push(OdeClass::FirstExact { m: b, n: a });
    }
    if let Some((p, q)) = linear(&f, x, y) {
        classes.push(OdeClass::FirstLinear { p, q });
    }
    if let Some((p, q, n)) = bernoulli(&f, y) {
        classes.push(OdeClass::Bernoulli { p, q, n });
    }
    if homogeneous_coefficients(&f, x, y) {
        classes.push(OdeClass::FirstHomogeneousCoeff { f });
    }
    classes
}

/// Constant coefficients `a_0..a_n` normalized by `a_n`, and the forcing term `g(x)` of
/// `Σ a_k*y^(k) = g(x)`.
pub fn linear_constant_coefficients(eq: &SymbolicEquation) -> Option<(Vec<f64>, Expr)> {
    let x = eq.independent();
    let residual = eq.plain_residual();
    let names = eq.plain_unknowns();
    let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
    let mut coeffs = Vec::with_capacity(names.len());
    for name in &names {
        let a = residual.diff(name).simplify();
        if !a.is_free_of(&refs) {
            return None;
        }
        coeffs.push(a.numeric_constant_in(x)?);
    }
    let lead = *coeffs.last()?;
    if lead.abs() < 1e-14 {
        return None;
    }
    let mut rest = residual;
    for name in &names {
        rest = rest.substitute_variable(name, &Expr::Const(0.0));
    }
    let forcing = (Expr::Const(-1.0 / lead) * rest).simplify();
    Some((coeffs.iter().map(|c| c / lead).collect(), forcing))
}

fn classify_higher_order(eq: &SymbolicEquation) -> Vec<OdeClass> {
    let Some((coeffs, forcing)) = linear_constant_coefficients(eq) else {
        warn!("{} is not linear with constant coefficients, no pattern applies", eq);
        return Vec::new();
    };
    if forcing.is_identically_zero() {
        return vec![OdeClass::ConstCoeffHomogeneous { coeffs }];
    }
    let mut classes = Vec::new();
    if forcing_families(&forcing, eq.independent()).is_some() {
        classes.push(OdeClass::UndeterminedCoefficients {
            coeffs: coeffs.clone(),
            forcing: forcing.clone(),
        });
    }
    classes.push(OdeClass::VariationOfParameters { coeffs, forcing });
    classes
}

/// Patterns the equation matches, in solver preference order. Never fails: an equation outside
/// every pattern gives an empty list.
pub fn classify(eq: &SymbolicEquation) -> Vec<OdeClass> {
    let classes = match eq.order() {
        0 => Vec::new(),
        1 => classify_first_order(eq),
        _ => classify_higher_order(eq),
    };
    debug!(
        "classification of {}: [{}]",
        eq,
        classes.iter().map(|c| c.tag()).collect::<Vec<_>>().join(", ")
    );
    classes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ode::builder::build;
    use crate::ode::normalizer::normalize;
    use crate::symbolic::symbol_table::VariableBinding;
    use std::str::FromStr;

    fn methods(raw: &str) -> Vec<Method> {
        let bindings = VariableBinding::default();
        let eq = build(&normalize(raw, &bindings), &bindings).unwrap();
        classify(&eq).iter().map(|c| c.method()).collect()
    }

    #[test]
    fn test_method_names() {
        assert_eq!(Method::FirstLinear.to_string(), "1st_linear");
        assert_eq!(Method::from_str("Bernoulli").unwrap(), Method::Bernoulli);
        assert_eq!(
            Method::from_str("nth_linear_constant_coeff_homogeneous").unwrap(),
            Method::ConstCoeffHomogeneous
        );
        assert!(Method::UndeterminedCoefficients.is_constant_coeff());
        assert!(!Method::FirstHomogeneousCoeff.is_constant_coeff());
    }

    #[test]
    fn test_separable() {
        assert_eq!(methods("y' = x*y")[0], Method::Separable);
        assert_eq!(methods("y' = x/y")[0], Method::Separable);
        assert_eq!(methods("y' = (1 + y**2)*cos(x)")[0], Method::Separable);
        assert_eq!(methods("y' = exp(x + y)")[0], Method::Separable);
    }

    #[test]
    fn test_separable_split() {
        let x = Expr::var("x");
        let y = Expr::var("y");
        let f = x.clone() * y.clone().pow(Expr::Const(2.0));
        let (g, h) = separate(&f, "x", "y").unwrap();
        assert_eq!(g, x);
        assert_eq!(h, y.pow(Expr::Const(2.0)));
        assert!(separate(&(Expr::var("x") + Expr::var("y")), "x", "y").is_none());
    }

    #[test]
    fn test_linear() {
        let tags = methods("y' + 2*y = x");
        assert_eq!(tags, vec![Method::FirstLinear]);
        assert_eq!(methods("y' + y/x = x**2")[0], Method::FirstLinear);
        assert_eq!(methods("y' - 3*y = exp(x)"), vec![Method::FirstLinear]);
    }

    #[test]
    fn test_exact_and_homogeneous() {
        let tags = methods("(2*x + y) + (x + 2*y)*y' = 0");
        assert_eq!(tags[0], Method::FirstExact);
        assert!(tags.contains(&Method::FirstHomogeneousCoeff));
        assert_eq!(methods("(2*x*y + 1) + (x**2 + 2*y)*y' = 0")[0], Method::FirstExact);
    }

    #[test]
    fn test_homogeneous_and_bernoulli() {
        let tags = methods("y' = (x + y)/x");
        assert!(tags.contains(&Method::FirstLinear));
        assert!(tags.contains(&Method::FirstHomogeneousCoeff));
        let tags = methods("y' = (x**2 + y**2)/(x*y)");
        assert!(tags.contains(&Method::Bernoulli));
        assert!(tags.contains(&Method::FirstHomogeneousCoeff));
        assert!(!tags.contains(&Method::FirstLinear));
        let tags = methods("y' = (x**2 + y**2)**0.5/x");
        assert!(tags.contains(&Method::FirstHomogeneousCoeff));
    }

    #[test]
    fn test_bernoulli_data() {
        let f = Expr::parse_expression("y/x + x*y**3").unwrap().to_plain();
        let (p, q, n) = bernoulli(&f, "y").unwrap();
        assert_eq!(n, 3.0);
        assert_eq!(q, Expr::var("x"));
        assert!((p + Expr::var("x").pow(Expr::Const(-1.0))).is_identically_zero());
    }

    #[test]
    fn test_constant_coefficients() {
        assert_eq!(methods("y'' + 4*y = 0"), vec![Method::ConstCoeffHomogeneous]);
        assert_eq!(
            methods("y'' - 5*y' + 6*y = 0"),
            vec![Method::ConstCoeffHomogeneous]
        );
        assert_eq!(
            methods("y'' + y = sin(x)"),
            vec![Method::UndeterminedCoefficients, Method::VariationOfParameters]
        );
        assert_eq!(
            methods("y'' - y = x**2"),
            vec![Method::UndeterminedCoefficients, Method::VariationOfParameters]
        );
        assert_eq!(methods("y'' + y = tan(x)"), vec![Method::VariationOfParameters]);
    }

    #[test]
    fn test_coefficients_are_normalized() {
        let bindings = VariableBinding::default();
        let eq = build(&normalize("2*y'' + 4*y' - 6*y = 2*exp(x)", &bindings), &bindings).unwrap();
        let (coeffs, forcing) = linear_constant_coefficients(&eq).unwrap();
        assert_eq!(coeffs, vec![-3.0, 2.0, 1.0]);
        assert_eq!(forcing, Expr::var("x").exp());
    }

    #[test]
    fn test_unclassified() {
        assert!(methods("y'**2 = x").is_empty());
        assert!(methods("y'' = y**2").is_empty());
        assert!(methods("y'' + x*y = 0").is_empty());
    }
}
