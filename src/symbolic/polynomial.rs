//! Univariate polynomials with numeric coefficients.
//!
//! Used for characteristic equations of constant-coefficient ODEs and for partial fractions in the
//! integrator. Roots are found exactly where possible (rational root search, closed forms up to
//! degree 2) and with the Durand-Kerner iteration otherwise.

use num_complex::Complex64;

use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::nice_number;

/// Coefficients in ascending order: `coeffs[k]` multiplies `x^k`.
#[derive(Clone, Debug, PartialEq)]
pub struct Poly {
    pub coeffs: Vec<f64>,
}

/// Root of a polynomial together with its multiplicity.
#[derive(Clone, Debug, PartialEq)]
pub struct Root {
    pub value: Complex64,
    pub multiplicity: usize,
}

impl Poly {
    pub fn new(coeffs: Vec<f64>) -> Poly {
        let mut p = Poly { coeffs };
        p.trim();
        p
    }

    pub fn constant(c: f64) -> Poly {
        Poly::new(vec![c])
    }

    /// `x`
    pub fn monomial(k: usize) -> Poly {
        let mut coeffs = vec![0.0; k + 1];
        coeffs[k] = 1.0;
        Poly::new(coeffs)
    }

    fn trim(&mut self) {
        while self.coeffs.len() > 1 && self.coeffs.last().is_some_and(|c| c.abs() < 1e-14) {
            self.coeffs.pop();
        }
        if self.coeffs.is_empty() {
            self.coeffs.push(0.0);
        }
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|c| *c == 0.0)
    }

    pub fn leading(&self) -> f64 {
        self.coeffs[self.degree()]
    }

    /// Reads a polynomial in `var` out of an expression; `None` if some summand is not
    /// `number * var^k`.
    pub fn from_expr(e: &Expr, var: &str) -> Option<Poly> {
        let mut coeffs: Vec<f64> = vec![0.0];
        for term in e.expanded_terms() {
            let degree = match term.factors.as_slice() {
                [] => 0,
                [(Expr::Var(name), Expr::Const(k))] if name == var && k.fract() == 0.0 && *k > 0.0 => {
                    *k as usize
                }
                _ => return None,
            };
            if degree > 64 {
                return None;
            }
            if coeffs.len() <= degree {
                coeffs.resize(degree + 1, 0.0);
            }
            coeffs[degree] += term.coeff;
        }
        Some(Poly::new(coeffs))
    }

    pub fn to_expr(&self, var: &str) -> Expr {
        let mut acc: Option<Expr> = None;
        for (k, c) in self.coeffs.iter().enumerate().rev() {
            if *c == 0.0 {
                continue;
            }
            let power = match k {
                0 => None,
                1 => Some(Expr::var(var)),
                _ => Some(Expr::var(var).pow(Expr::Const(k as f64))),
            };
            let term = match power {
                None => nice_number(*c),
                Some(p) => nice_number(*c) * p,
            };
            acc = Some(match acc {
                None => term,
                Some(a) => a + term,
            });
        }
        acc.unwrap_or(Expr::Const(0.0)).simplify()
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }

    pub fn eval_complex(&self, z: Complex64) -> Complex64 {
        self.coeffs
            .iter()
            .rev()
            .fold(Complex64::new(0.0, 0.0), |acc, c| acc * z + c)
    }

    pub fn derivative(&self) -> Poly {
        if self.degree() == 0 {
            return Poly::constant(0.0);
        }
        Poly::new(
            self.coeffs
                .iter()
                .enumerate()
                .skip(1)
                .map(|(k, c)| c * k as f64)
                .collect(),
        )
    }

    /// Antiderivative with zero constant term.
    pub fn integral(&self) -> Poly {
        let mut coeffs = vec![0.0];
        coeffs.extend(self.coeffs.iter().enumerate().map(|(k, c)| c / (k as f64 + 1.0)));
        Poly::new(coeffs)
    }

    pub fn add(&self, other: &Poly) -> Poly {
        let len = self.coeffs.len().max(other.coeffs.len());
        Poly::new(
            (0..len)
                .map(|k| self.coeffs.get(k).unwrap_or(&0.0) + other.coeffs.get(k).unwrap_or(&0.0))
                .collect(),
        )
    }

    pub fn mul(&self, other: &Poly) -> Poly {
        let mut coeffs = vec![0.0; self.coeffs.len() + other.coeffs.len() - 1];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in other.coeffs.iter().enumerate() {
                coeffs[i + j] += a * b;
            }
        }
        Poly::new(coeffs)
    }

    pub fn powi(&self, n: usize) -> Poly {
        (0..n).fold(Poly::constant(1.0), |acc, _| acc.mul(self))
    }

    pub fn scale(&self, s: f64) -> Poly {
        Poly::new(self.coeffs.iter().map(|c| c * s).collect())
    }

    /// Long division: `self = q*divisor + r`, `deg r < deg divisor`.
    pub fn div_rem(&self, divisor: &Poly) -> (Poly, Poly) {
        let mut rem = self.coeffs.clone();
        let d = divisor.degree();
        let lead = divisor.leading();
        if self.degree() < d {
            return (Poly::constant(0.0), self.clone());
        }
        let mut quot = vec![0.0; self.degree() - d + 1];
        for k in (0..quot.len()).rev() {
            let c = rem[k + d] / lead;
            quot[k] = c;
            for (j, dc) in divisor.coeffs.iter().enumerate() {
                rem[k + j] -= c * dc;
            }
        }
        rem.truncate(d.max(1));
        (Poly::new(quot), Poly::new(rem))
    }

    /// Exact rational roots `p/q` with small numerators and denominators.
    fn rational_roots(&self) -> Vec<f64> {
        let scale: f64 = self.coeffs.iter().map(|c| c.abs()).fold(0.0, f64::max);
        let mut candidates = vec![0.0];
        for q in 1..=12 {
            for p in 1..=60 {
                let r = p as f64 / q as f64;
                candidates.push(r);
                candidates.push(-r);
            }
        }
        let mut found: Vec<f64> = candidates
            .into_iter()
            .filter(|r| self.eval(*r).abs() <= 1e-11 * scale.max(1.0) * r.abs().max(1.0).powi(self.degree() as i32))
            .collect();
        found.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        found.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
        found
    }

    /// Divides out `(x - r)` by synthetic division.
    fn deflate(&self, r: f64) -> Poly {
        let n = self.degree();
        let mut out = vec![0.0; n];
        let mut acc = 0.0;
        for k in (1..=n).rev() {
            acc = acc * r + self.coeffs[k];
            out[k - 1] = acc;
        }
        Poly::new(out)
    }

    fn durand_kerner(&self) -> Vec<Complex64> {
        let n = self.degree();
        let lead = self.leading();
        let monic: Vec<Complex64> = self.coeffs.iter().map(|c| Complex64::new(c / lead, 0.0)).collect();
        let eval = |z: Complex64| monic.iter().rev().fold(Complex64::new(0.0, 0.0), |acc, c| acc * z + c);
        let seed = Complex64::new(0.4, 0.9);
        let mut roots: Vec<Complex64> = (0..n).map(|k| seed.powu(k as u32)).collect();
        for _ in 0..2000 {
            let mut delta: f64 = 0.0;
            for i in 0..n {
                let mut denom = Complex64::new(1.0, 0.0);
                for j in 0..n {
                    if i != j {
                        denom *= roots[i] - roots[j];
                    }
                }
                let step = eval(roots[i]) / denom;
                roots[i] -= step;
                delta = delta.max(step.norm());
            }
            if delta < 1e-15 {
                break;
            }
        }
        roots
    }

    /// All complex roots, repeated roots grouped.
    pub fn roots(&self) -> Vec<Root> {
        let mut values: Vec<Complex64> = Vec::new();
        let mut p = self.clone();
        while p.degree() > 0 {
            let rational = p.rational_roots();
            let degree_before = p.degree();
            for r in rational {
                while p.degree() > 0 && p.eval(r).abs() <= 1e-9 * p.coeffs.iter().map(|c| c.abs()).sum::<f64>() {
                    values.push(Complex64::new(r, 0.0));
                    p = p.deflate(r);
                }
            }
            if p.degree() == degree_before {
                break;
            }
        }
        match p.degree() {
            0 => {}
            1 => values.push(Complex64::new(-p.coeffs[0] / p.coeffs[1], 0.0)),
            2 => {
                let (a, b, c) = (p.coeffs[2], p.coeffs[1], p.coeffs[0]);
                let disc = b * b - 4.0 * a * c;
                if disc.abs() < 1e-12 * (b * b).max(1e-300) {
                    values.push(Complex64::new(-b / (2.0 * a), 0.0));
                    values.push(Complex64::new(-b / (2.0 * a), 0.0));
                } else if disc > 0.0 {
                    let s = disc.sqrt();
                    values.push(Complex64::new((-b - s) / (2.0 * a), 0.0));
                    values.push(Complex64::new((-b + s) / (2.0 * a), 0.0));
                } else {
                    let s = (-disc).sqrt();
                    values.push(Complex64::new(-b / (2.0 * a), -s / (2.0 * a)));
                    values.push(Complex64::new(-b / (2.0 * a), s / (2.0 * a)));
                }
            }
            _ => values.extend(p.durand_kerner().into_iter().map(|z| {
                if z.im.abs() < 1e-9 { Complex64::new(z.re, 0.0) } else { z }
            })),
        }
        group_roots(values)
    }
}

/// `e` as `numerator/denominator` of polynomials in `var`; `None` unless `e` is a rational
/// function of `var` with numeric coefficients.
pub fn rational_parts(e: &Expr, var: &str) -> Option<(Poly, Poly)> {
    let one = Poly::constant(1.0);
    match e {
        Expr::Const(c) => Some((Poly::constant(*c), one)),
        Expr::Var(name) if name == var => Some((Poly::monomial(1), one)),
        Expr::Add(lhs, rhs) | Expr::Sub(lhs, rhs) => {
            let (n1, d1) = rational_parts(lhs, var)?;
            let (n2, d2) = rational_parts(rhs, var)?;
            let right = n2.mul(&d1);
            let right = if matches!(e, Expr::Sub(..)) { right.scale(-1.0) } else { right };
            Some((n1.mul(&d2).add(&right), d1.mul(&d2)))
        }
        Expr::Mul(lhs, rhs) => {
            let (n1, d1) = rational_parts(lhs, var)?;
            let (n2, d2) = rational_parts(rhs, var)?;
            Some((n1.mul(&n2), d1.mul(&d2)))
        }
        Expr::Div(lhs, rhs) => {
            let (n1, d1) = rational_parts(lhs, var)?;
            let (n2, d2) = rational_parts(rhs, var)?;
            if n2.is_zero() {
                return None;
            }
            Some((n1.mul(&d2), d1.mul(&n2)))
        }
        Expr::Pow(base, exponent) => {
            let k = exponent.as_const()?;
            if k.fract() != 0.0 || k.abs() > 16.0 {
                return None;
            }
            let (n, d) = rational_parts(base, var)?;
            if k < 0.0 {
                if n.is_zero() {
                    return None;
                }
                Some((d.powi(-k as usize), n.powi(-k as usize)))
            } else {
                Some((n.powi(k as usize), d.powi(k as usize)))
            }
        }
        _ => None,
    }
}

fn group_roots(values: Vec<Complex64>) -> Vec<Root> {
    let mut roots: Vec<Root> = Vec::new();
    for v in values {
        if let Some(existing) = roots.iter_mut().find(|r| (r.value - v).norm() < 1e-6) {
            existing.multiplicity += 1;
        } else {
            roots.push(Root {
                value: v,
                multiplicity: 1,
            });
        }
    }
    roots.sort_by(|a, b| {
        a.value
            .re
            .partial_cmp(&b.value.re)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.value.im.partial_cmp(&b.value.im).unwrap_or(std::cmp::Ordering::Equal))
    });
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_expr_and_back() {
        let x = Expr::var("x");
        let e = (x.clone() + Expr::Const(1.0)).pow(Expr::Const(2.0));
        let p = Poly::from_expr(&e, "x").unwrap();
        assert_eq!(p.coeffs, vec![1.0, 2.0, 1.0]);
        assert_eq!(p.to_expr("x").to_string(), "x**2 + 2*x + 1");
        assert!(Poly::from_expr(&x.clone().exp(), "x").is_none());
        assert!(Poly::from_expr(&(x / Expr::var("y")), "x").is_none());
    }

    #[test]
    fn test_div_rem() {
        // (x^3 - 1) / (x - 1) = x^2 + x + 1
        let p = Poly::new(vec![-1.0, 0.0, 0.0, 1.0]);
        let (q, r) = p.div_rem(&Poly::new(vec![-1.0, 1.0]));
        assert_eq!(q.coeffs, vec![1.0, 1.0, 1.0]);
        assert!(r.is_zero());
    }

    #[test]
    fn test_roots_distinct_real() {
        // r^2 - 5r + 6
        let roots = Poly::new(vec![6.0, -5.0, 1.0]).roots();
        assert_eq!(roots.len(), 2);
        assert_relative_eq!(roots[0].value.re, 2.0, epsilon = 1e-12);
        assert_relative_eq!(roots[1].value.re, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_roots_repeated_and_complex() {
        // (r - 2)^2
        let roots = Poly::new(vec![4.0, -4.0, 1.0]).roots();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].multiplicity, 2);
        // r^2 + 4
        let roots = Poly::new(vec![4.0, 0.0, 1.0]).roots();
        assert_eq!(roots.len(), 2);
        assert_relative_eq!(roots[1].value.im, 2.0, epsilon = 1e-12);
        // (r - 1)^3
        let roots = Poly::new(vec![-1.0, 3.0, -3.0, 1.0]).roots();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].multiplicity, 3);
    }

    #[test]
    fn test_roots_higher_degree_numeric() {
        // r^4 + 1 has no rational roots
        let p = Poly::new(vec![1.0, 0.0, 0.0, 0.0, 1.0]);
        let roots = p.roots();
        assert_eq!(roots.len(), 4);
        for r in roots {
            assert!(p.eval_complex(r.value).norm() < 1e-9);
        }
    }

    #[test]
    fn test_rational_parts_combines_fractions() {
        // (1 + v^2)/v - v = 1/v
        let v = Expr::var("v");
        let e = (Expr::Const(1.0) + v.clone().pow(Expr::Const(2.0))) / v.clone() - v.clone();
        let (n, d) = rational_parts(&e, "v").unwrap();
        assert_eq!(n.coeffs, vec![1.0]);
        assert_eq!(d.coeffs, vec![0.0, 1.0]);
        assert!(rational_parts(&v.clone().exp(), "v").is_none());
        assert!(rational_parts(&(v / Expr::var("w")), "v").is_none());
    }

    #[test]
    fn test_integral_and_derivative() {
        let p = Poly::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(p.derivative().coeffs, vec![2.0, 6.0]);
        assert_eq!(p.integral().coeffs, vec![0.0, 1.0, 1.0, 1.0]);
    }
}
