// the collection of utility functions: bracket checks, number formatting, natural ordering of
// constant names and sample points for numeric identity checks
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::symbolic::symbolic_engine::Expr;

/// `true` when every '(' / '[' has a matching closing bracket of the same kind.
pub fn brackets_balanced(s: &str) -> bool {
    let mut stack = Vec::new();
    for c in s.chars() {
        match c {
            '(' | '[' => stack.push(c),
            ')' => {
                if stack.pop() != Some('(') {
                    return false;
                }
            }
            ']' => {
                if stack.pop() != Some('[') {
                    return false;
                }
            }
            _ => {}
        }
    }
    stack.is_empty()
}

fn near_integer(v: f64, tol: f64) -> Option<i64> {
    let r = v.round();
    if (v - r).abs() <= tol * v.abs().max(1.0) && r.abs() < 1e15 {
        Some(r as i64)
    } else {
        None
    }
}

/// `p/q` representation with a small denominator (2..=12).
pub fn as_fraction(v: f64) -> Option<(i64, i64)> {
    if !v.is_finite() || near_integer(v, 1e-10).is_some() {
        return None;
    }
    for q in 2..=12i64 {
        if let Some(p) = near_integer(v * q as f64, 1e-9) {
            return Some((p, q));
        }
    }
    None
}

/// Integers print without a decimal point, small-denominator rationals as `p/q`.
pub fn format_number(v: f64) -> String {
    if !v.is_finite() {
        return format!("{}", v);
    }
    if let Some(n) = near_integer(v, 1e-10) {
        return n.to_string();
    }
    if let Some((p, q)) = as_fraction(v) {
        return format!("{}/{}", p, q);
    }
    let s = format!("{:.10}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

/// Rounds a numerically obtained value to the simplest exact-looking expression: integer, small
/// fraction or a rational multiple of a square root.
pub fn nice_number(v: f64) -> Expr {
    if let Some(n) = near_integer(v, 1e-9) {
        return Expr::Const(n as f64);
    }
    if let Some((p, q)) = as_fraction(v) {
        return Expr::Const(p as f64 / q as f64);
    }
    for q in 1..=12i64 {
        let scaled = v * q as f64;
        let square = scaled * scaled;
        if let Some(n) = near_integer(square, 1e-9) {
            let root = (n as f64).sqrt();
            if n > 1 && n <= 1000 && root.fract() != 0.0 {
                let sqrt = Expr::Const(n as f64).sqrt();
                let signed = if v < 0.0 { -sqrt } else { sqrt };
                return if q == 1 {
                    signed
                } else {
                    Expr::Div(signed.boxed(), Expr::Const(q as f64).boxed())
                };
            }
        }
    }
    let rounded = (v * 1e10).round() / 1e10;
    Expr::Const(rounded)
}

/// Natural ordering: `C2 < C10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    fn chunks(s: &str) -> Vec<(String, Option<u64>)> {
        let mut out = Vec::new();
        let mut current = String::new();
        let mut digits = false;
        for c in s.chars() {
            if c.is_ascii_digit() != digits && !current.is_empty() {
                let num = if digits { current.parse().ok() } else { None };
                out.push((std::mem::take(&mut current), num));
            }
            digits = c.is_ascii_digit();
            current.push(c);
        }
        if !current.is_empty() {
            let num = if digits { current.parse().ok() } else { None };
            out.push((current, num));
        }
        out
    }
    let (ca, cb) = (chunks(a), chunks(b));
    for (x, y) in ca.iter().zip(cb.iter()) {
        let ord = match (x.1, y.1) {
            (Some(n), Some(m)) => n.cmp(&m),
            _ => x.0.cmp(&y.0),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ca.len().cmp(&cb.len())
}

/// Deterministic, well-spread sample points for the given symbols: `count` points with positive
/// coordinates, followed by `count` points where the signs of the coordinates alternate.
pub fn sample_points(vars: &[String], count: usize) -> Vec<HashMap<String, f64>> {
    let positive = (0..count).map(|i| {
        vars.iter()
            .enumerate()
            .map(|(j, v)| {
                let k = (i * 7 + j * 3 + 1) % 11;
                (v.clone(), 0.31 + 0.173 * k as f64 + 0.011 * j as f64)
            })
            .collect()
    });
    let mixed = (0..count).map(|i| {
        vars.iter()
            .enumerate()
            .map(|(j, v)| {
                let k = (i * 5 + j * 2 + 3) % 13;
                let magnitude = 0.27 + 0.23 * k as f64 + 0.013 * j as f64;
                let sign = if (i + j) % 2 == 0 { -1.0 } else { 1.0 };
                (v.clone(), sign * magnitude)
            })
            .collect()
    });
    positive.chain(mixed).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brackets_balanced() {
        assert!(brackets_balanced("sin(x)*[x+1]"));
        assert!(!brackets_balanced("(x+1"));
        assert!(!brackets_balanced("(x+1]"));
        assert!(!brackets_balanced(")("));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.5), "-1/2");
        assert_eq!(format_number(0.25), "1/4");
        assert_eq!(format_number(1.0 / 3.0), "1/3");
        assert_eq!(format_number(0.1 + 0.2), "3/10");
        assert_eq!(format_number(std::f64::consts::PI), "3.1415926536");
    }

    #[test]
    fn test_nice_number() {
        assert_eq!(nice_number(1.9999999999), Expr::Const(2.0));
        assert_eq!(nice_number(-0.2500000001), Expr::Const(-0.25));
        assert_eq!(nice_number(3f64.sqrt() / 2.0).to_string(), "sqrt(3)/2");
        assert_eq!(nice_number(-(2f64.sqrt())).to_string(), "-sqrt(2)");
    }

    #[test]
    fn test_natural_cmp() {
        let mut names = vec!["C10", "C2", "C1"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["C1", "C2", "C10"]);
    }

    #[test]
    fn test_sample_points_distinct() {
        let vars = vec!["x".to_string(), "y".to_string()];
        let pts = sample_points(&vars, 5);
        assert_eq!(pts.len(), 10);
        assert!(pts[..5].iter().all(|p| p["x"] > 0.0 && p["y"] > 0.0));
        assert_ne!(pts[0]["x"], pts[1]["x"]);
        assert!(pts[5..].iter().any(|p| p["x"] < -1.0));
        assert!(pts[5..].iter().any(|p| p["y"] < 0.0));
    }
}
