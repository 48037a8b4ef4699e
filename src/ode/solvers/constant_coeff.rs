//! Linear equations with constant coefficients `Σ a_k*y^(k) = g(x)`, `a_n = 1`.
//!
//! The homogeneous part is solved through the roots of the characteristic polynomial
//! `Σ a_k*r^k`. Each root `a ± b*i` of multiplicity `m` contributes the basis functions
//! `x^j*exp(a*x)*sin(b*x)` and `x^j*exp(a*x)*cos(b*x)`, `j < m` (only the exponential ones for a
//! real root).
//!
//! A particular solution is found either by undetermined coefficients, when `g` is a sum of
//! `x^k*exp(a*x)*sin/cos(b*x)` terms, or by variation of parameters.

use std::collections::HashMap;

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::ode::builder::SymbolicEquation;
use crate::ode::classifier::Method;
use crate::ode::error::SolveError;
use crate::ode::solvers::{SolutionEq, SolutionExpression, constant, integral, tidy};
use crate::symbolic::polynomial::Poly;
use crate::symbolic::symbolic_engine::{Constant, Expr, Func};
use crate::symbolic::utils::nice_number;

const ROOT_TOLERANCE: f64 = 1e-6;

fn negligible(v: f64) -> bool {
    v.abs() < 1e-9
}

/// A root `rate + freq*i` of the characteristic polynomial, `freq >= 0`. The conjugate root is
/// implied when `freq > 0`.
#[derive(Clone, Debug, PartialEq)]
pub struct Family {
    pub rate: f64,
    pub freq: f64,
    pub multiplicity: usize,
}

impl Family {
    fn oscillations(&self) -> Vec<Option<Func>> {
        if negligible(self.freq) {
            vec![None]
        } else {
            vec![Some(Func::sin), Some(Func::cos)]
        }
    }

    /// Basis functions in the order their constants are numbered.
    pub fn basis(&self, x: &str) -> Vec<Expr> {
        let mut out = Vec::new();
        for trig in self.oscillations() {
            for j in 0..self.multiplicity {
                out.push(basis_function(j, self.rate, trig.map(|f| (f, self.freq)), x));
            }
        }
        out
    }
}

/// `x^power*exp(rate*x)*f(freq*x)`
fn basis_function(power: usize, rate: f64, trig: Option<(Func, f64)>, x: &str) -> Expr {
    let var = Expr::var(x);
    let mut factors: Vec<Expr> = Vec::new();
    match power {
        0 => {}
        1 => factors.push(var.clone()),
        k => factors.push(var.clone().pow(Expr::Const(k as f64))),
    }
    if !negligible(rate) {
        factors.push((nice_number(rate) * var.clone()).exp());
    }
    if let Some((f, freq)) = trig {
        factors.push(Expr::func(f, nice_number(freq) * var));
    }
    factors
        .into_iter()
        .reduce(|a, b| a * b)
        .unwrap_or(Expr::Const(1.0))
        .simplify()
}

/// `Σ a_k*r^k` in the symbol `var`.
pub fn characteristic_polynomial(coeffs: &[f64], var: &str) -> Expr {
    Poly::new(coeffs.to_vec()).to_expr(var)
}

/// Roots of the characteristic polynomial grouped into families, ordered by real part.
pub fn characteristic_families(coeffs: &[f64]) -> Vec<Family> {
    Poly::new(coeffs.to_vec())
        .roots()
        .into_iter()
        .filter(|r| r.value.im >= -1e-9)
        .map(|r| Family {
            rate: if negligible(r.value.re) { 0.0 } else { r.value.re },
            freq: if negligible(r.value.im) { 0.0 } else { r.value.im },
            multiplicity: r.multiplicity,
        })
        .collect()
}

fn fundamental_system(coeffs: &[f64], x: &str) -> Result<(Vec<Family>, Vec<Expr>), SolveError> {
    let families = characteristic_families(coeffs);
    let basis: Vec<Expr> = families.iter().flat_map(|f| f.basis(x)).collect();
    let order = coeffs.len().saturating_sub(1);
    if basis.len() != order {
        return Err(SolveError::NotImplemented(format!(
            "found {} basis solutions for an equation of order {}",
            basis.len(),
            order
        )));
    }
    Ok((families, basis))
}

/// `Σ C_k*φ_k` with the terms of one root grouped: `(C1 + C2*x)*exp(2*x)`.
fn general_solution(families: &[Family], x: &str) -> Expr {
    let var = Expr::var(x);
    let mut k = 1;
    let mut acc: Option<Expr> = None;
    for family in families {
        for trig in family.oscillations() {
            let mut poly: Option<Expr> = None;
            for j in 0..family.multiplicity {
                let c = match j {
                    0 => constant(k),
                    1 => constant(k) * var.clone(),
                    _ => constant(k) * var.clone().pow(Expr::Const(j as f64)),
                };
                k += 1;
                poly = Some(match poly {
                    None => c,
                    Some(p) => p + c,
                });
            }
            let shape = basis_function(0, family.rate, trig.map(|f| (f, family.freq)), x);
            let Some(poly) = poly else { continue };
            let part = if shape.is_one() { poly } else { poly * shape };
            acc = Some(match acc {
                None => part,
                Some(a) => a + part,
            });
        }
    }
    acc.unwrap_or(Expr::Const(0.0)).simplify()
}

/// `Σ a_k*d^k e/dx^k`
pub fn apply_operator(coeffs: &[f64], e: &Expr, x: &str) -> Expr {
    let mut acc = Expr::Const(0.0);
    for (k, c) in coeffs.iter().enumerate() {
        if *c != 0.0 {
            acc = acc + Expr::Const(*c) * e.n_th_derivative1D(x, k);
        }
    }
    acc.simplify()
}

/// `y'' + a*y' + b*y = 0`: `y = Σ C_k*φ_k`
pub fn homogeneous(eq: &SymbolicEquation, coeffs: &[f64]) -> Result<SolutionExpression, SolveError> {
    let (x, y) = (eq.independent(), eq.dependent());
    let (families, _) = fundamental_system(coeffs, x)?;
    debug!("characteristic roots of {}: {:?}", eq, families);
    Ok(SolutionExpression::Single(SolutionEq::explicit(
        y,
        x,
        general_solution(&families, x),
    )))
}

/// One `x^degree*exp(rate*x)*sin/cos(freq*x)` family of a forcing term; `freq = 0` means no
/// oscillation.
#[derive(Clone, Debug, PartialEq)]
pub struct Forcing {
    pub rate: f64,
    pub freq: f64,
    pub degree: usize,
}

fn linear_coefficients(e: &Expr, x: &str) -> Option<(f64, f64)> {
    let poly = Poly::from_expr(e, x)?;
    match poly.degree() {
        0 => Some((poly.coeffs[0], 0.0)),
        1 => Some((poly.coeffs[0], poly.coeffs[1])),
        _ => None,
    }
}

/// Families of a forcing term, `None` when some summand is not of the form
/// `c*x^k*exp(a*x + a0)*sin/cos(b*x + b0)`.
pub fn forcing_families(forcing: &Expr, x: &str) -> Option<Vec<Forcing>> {
    let mut families: Vec<Forcing> = Vec::new();
    for term in forcing.expanded_terms() {
        let mut family = Forcing {
            rate: 0.0,
            freq: 0.0,
            degree: 0,
        };
        let mut oscillating = false;
        for (base, exponent) in &term.factors {
            if !base.contains_variable(x) && !exponent.contains_variable(x) {
                continue;
            }
            match base {
                Expr::Var(name) if name == x => {
                    let k = exponent.as_const()?;
                    if k < 0.0 || k.fract() != 0.0 {
                        return None;
                    }
                    family.degree += k as usize;
                }
                Expr::Sym(Constant::E) => family.rate += linear_coefficients(exponent, x)?.1,
                Expr::Fun(Func::sin | Func::cos, arg) if exponent.is_one() && !oscillating => {
                    let (_, freq) = linear_coefficients(arg, x)?;
                    if negligible(freq) {
                        return None;
                    }
                    family.freq = freq.abs();
                    oscillating = true;
                }
                _ => return None,
            }
        }
        match families.iter_mut().find(|f| {
            (f.rate - family.rate).abs() < 1e-9 && (f.freq - family.freq).abs() < 1e-9
        }) {
            Some(existing) => existing.degree = existing.degree.max(family.degree),
            None => families.push(family),
        }
    }
    Some(families)
}

fn resonance(families: &[Family], rate: f64, freq: f64) -> usize {
    families
        .iter()
        .find(|f| (f.rate - rate).abs() < ROOT_TOLERANCE && (f.freq - freq).abs() < ROOT_TOLERANCE)
        .map_or(0, |f| f.multiplicity)
}

fn eval_at(e: &Expr, x: &str, value: f64) -> Result<f64, SolveError> {
    let env = HashMap::from([(x.to_string(), value)]);
    match e.eval_expression(&env) {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(v) => Err(SolveError::NotImplemented(format!("{} is {} at {} = {}", e, v, x, value))),
        Err(msg) => Err(SolveError::NotImplemented(msg)),
    }
}

/// Trial functions `x^(s+j)*exp(a*x)*sin/cos(b*x)`, `s` the multiplicity of `a + b*i` as a
/// characteristic root.
fn trial_functions(families: &[Family], forcing: &[Forcing], x: &str) -> Vec<Expr> {
    let mut trials: Vec<Expr> = Vec::new();
    for f in forcing {
        let s = resonance(families, f.rate, f.freq);
        let oscillations = if negligible(f.freq) {
            vec![None]
        } else {
            vec![Some((Func::sin, f.freq)), Some((Func::cos, f.freq))]
        };
        for trig in oscillations {
            for j in 0..=f.degree {
                let t = basis_function(s + j, f.rate, trig, x);
                if !trials.contains(&t) {
                    trials.push(t);
                }
            }
        }
    }
    trials
}

/// Fits `Σ c_i*L[t_i] = g` by least squares at sample points and rounds the coefficients.
fn fit_coefficients(
    coeffs: &[f64],
    trials: &[Expr],
    forcing: &Expr,
    x: &str,
) -> Result<Vec<f64>, SolveError> {
    let images: Vec<Expr> = trials.iter().map(|t| apply_operator(coeffs, t, x)).collect();
    let count = 2 * trials.len() + 6;
    let points: Vec<f64> = (0..count)
        .map(|i| -1.2 + 2.4 * i as f64 / (count - 1) as f64)
        .collect();
    let mut a = DMatrix::<f64>::zeros(count, trials.len());
    let mut b = DVector::<f64>::zeros(count);
    for (i, p) in points.iter().enumerate() {
        for (j, image) in images.iter().enumerate() {
            a[(i, j)] = eval_at(image, x, *p)?;
        }
        b[i] = eval_at(forcing, x, *p)?;
    }
    let solution = a
        .svd(true, true)
        .solve(&b, 1e-12)
        .map_err(|msg| SolveError::NotImplemented(msg.to_string()))?;
    Ok(solution.iter().copied().collect())
}

/// Particular solution by undetermined coefficients added to the homogeneous solution.
pub fn undetermined_coefficients(
    eq: &SymbolicEquation,
    coeffs: &[f64],
    forcing: &Expr,
) -> Result<SolutionExpression, SolveError> {
    let (x, y) = (eq.independent(), eq.dependent());
    let (families, _) = fundamental_system(coeffs, x)?;
    let forcing_terms = forcing_families(forcing, x)
        .ok_or(SolveError::NotApplicable(Method::UndeterminedCoefficients))?;
    let trials = trial_functions(&families, &forcing_terms, x);
    let fitted = fit_coefficients(coeffs, &trials, forcing, x)?;
    let mut particular = Expr::Const(0.0);
    for (c, t) in fitted.iter().zip(&trials) {
        if c.abs() > 1e-10 {
            particular = particular + nice_number(*c) * t.clone();
        }
    }
    let particular = particular.simplify();
    if !(apply_operator(coeffs, &particular, x) - forcing.clone()).is_identically_zero() {
        return Err(SolveError::NotImplemented(format!(
            "no combination of {} trial functions reproduces {}",
            trials.len(),
            forcing
        )));
    }
    debug!("particular solution by undetermined coefficients: {}", particular);
    let rhs = tidy(&(general_solution(&families, x) + particular));
    Ok(SolutionExpression::Single(SolutionEq::explicit(y, x, rhs)))
}

fn minor(m: &[Vec<Expr>], row: usize, col: usize) -> Vec<Vec<Expr>> {
    m.iter()
        .enumerate()
        .filter(|(i, _)| *i != row)
        .map(|(_, r)| {
            r.iter()
                .enumerate()
                .filter(|(j, _)| *j != col)
                .map(|(_, e)| e.clone())
                .collect()
        })
        .collect()
}

/// Laplace expansion along the first row.
fn determinant(m: &[Vec<Expr>]) -> Expr {
    match m.len() {
        0 => Expr::Const(1.0),
        1 => m[0][0].clone(),
        _ => {
            let mut acc = Expr::Const(0.0);
            for (j, e) in m[0].iter().enumerate() {
                let sign = if j % 2 == 0 { 1.0 } else { -1.0 };
                acc = acc + Expr::Const(sign) * e.clone() * determinant(&minor(m, 0, j));
            }
            acc.simplify()
        }
    }
}

/// `u_i' = W_i/W` for the basis `φ_i`, `W` from Abel's formula `W(0)*exp(-a_(n-1)*x)`.
pub fn variation_of_parameters(
    eq: &SymbolicEquation,
    coeffs: &[f64],
    forcing: &Expr,
) -> Result<SolutionExpression, SolveError> {
    let (x, y) = (eq.independent(), eq.dependent());
    let (families, basis) = fundamental_system(coeffs, x)?;
    let n = basis.len();
    let rows: Vec<Vec<Expr>> = (0..n)
        .map(|k| basis.iter().map(|phi| phi.n_th_derivative1D(x, k)).collect())
        .collect();
    let mut at_zero = DMatrix::<f64>::zeros(n, n);
    for (i, row) in rows.iter().enumerate() {
        for (j, e) in row.iter().enumerate() {
            at_zero[(i, j)] = eval_at(e, x, 0.0)?;
        }
    }
    let w0 = at_zero.determinant();
    if w0.abs() < 1e-12 {
        return Err(SolveError::NotImplemented(
            "the Wronskian of the basis vanishes".to_string(),
        ));
    }
    let damping = n.checked_sub(1).and_then(|k| coeffs.get(k)).copied().unwrap_or(0.0);
    let wronskian = if negligible(damping) {
        nice_number(w0)
    } else {
        nice_number(w0) * (nice_number(-damping) * Expr::var(x)).exp()
    };
    debug!("Wronskian of {}: {}", eq, wronskian);
    let mut particular = Expr::Const(0.0);
    for (i, phi) in basis.iter().enumerate() {
        let sign = if (n - 1 + i) % 2 == 0 { 1.0 } else { -1.0 };
        let cofactor = Expr::Const(sign) * determinant(&minor(&rows, n - 1, i));
        let du = tidy(&(cofactor * forcing.clone() / wronskian.clone()));
        let u = integral(&du, x)?;
        particular = particular + phi.clone() * u;
    }
    let rhs = tidy(&(general_solution(&families, x) + particular));
    Ok(SolutionExpression::Single(SolutionEq::explicit(y, x, rhs)))
}
