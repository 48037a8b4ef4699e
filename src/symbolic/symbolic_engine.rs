//! # Symbolic Engine Module
//!
//! Core expression tree of the ODE calculator. Everything the parser builds, the classifier
//! inspects and the solvers return is an [`Expr`].
//!
//! ## Main Structures
//!
//! ### `Expr` Enum
//! - **Variables**: `Var(String)` - plain symbols like "x", "C1"
//! - **Constants**: `Const(f64)` - numbers, `Sym(Constant)` - named constants E, pi, I
//! - **Unknown function**: `Unknown { name, arg, order }` - the dependent function `y(x)` and its
//!   derivatives `d^n y/dx^n`. It is an atom of its own so that a bare `y` can never be mistaken for a
//!   scalar symbol
//! - **Operations**: `Add`, `Sub`, `Mul`, `Div`, `Pow`
//! - **Functions**: `Fun(Func, arg)` - sin, cos, tan, cot, sec, csc, their inverses, hyperbolic
//!   functions, exp, log, abs
//!
//! ### Key Methods
//! - `diff(var)` - analytical differentiation (module `symbolic_engine_derivatives`)
//! - `simplify()`, `expand()` - algebraic simplification (module `symbolic_simplify`)
//! - `integrate(var)` - indefinite integration (module `symbolic_integration`)
//! - `eval_expression(env)` - numeric evaluation
//! - `to_plain()` / `from_plain()` - switch between `y(x)`-atoms and plain symbols `y`, `y'`, `y''`
//!   (the classifier works with partial derivatives with respect to those plain symbols)
//!
//! ## Display
//! `Display` is precedence aware and prints `**` for powers, so that a printed expression can be fed
//! back into the parser.

#![allow(non_camel_case_types)]

use std::collections::{BTreeSet, HashMap};
use std::f64::consts::{E, PI};
use std::fmt;

use strum_macros::{Display, EnumIter, EnumString};

use crate::symbolic::utils::format_number;

/// Named elementary functions of one argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter, EnumString)]
pub enum Func {
    #[strum(to_string = "sin")]
    sin,
    #[strum(to_string = "cos")]
    cos,
    #[strum(to_string = "tan", serialize = "tg")]
    tan,
    #[strum(to_string = "cot", serialize = "ctg")]
    cot,
    #[strum(to_string = "sec")]
    sec,
    #[strum(to_string = "csc")]
    csc,
    #[strum(to_string = "asin", serialize = "arcsin")]
    arcsin,
    #[strum(to_string = "acos", serialize = "arccos")]
    arccos,
    #[strum(to_string = "atan", serialize = "arctan", serialize = "arctg")]
    arctan,
    #[strum(to_string = "sinh")]
    sinh,
    #[strum(to_string = "cosh")]
    cosh,
    #[strum(to_string = "tanh")]
    tanh,
    #[strum(to_string = "exp")]
    exp,
    #[strum(to_string = "log", serialize = "ln")]
    ln,
    #[strum(to_string = "abs")]
    abs,
}

impl Func {
    pub fn apply(self, v: f64) -> f64 {
        match self {
            Func::sin => v.sin(),
            Func::cos => v.cos(),
            Func::tan => v.tan(),
            Func::cot => 1.0 / v.tan(),
            Func::sec => 1.0 / v.cos(),
            Func::csc => 1.0 / v.sin(),
            Func::arcsin => v.asin(),
            Func::arccos => v.acos(),
            Func::arctan => v.atan(),
            Func::sinh => v.sinh(),
            Func::cosh => v.cosh(),
            Func::tanh => v.tanh(),
            Func::exp => v.exp(),
            Func::ln => v.ln(),
            Func::abs => v.abs(),
        }
    }
}

/// Named mathematical constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
pub enum Constant {
    #[strum(to_string = "E", serialize = "e")]
    E,
    #[strum(to_string = "pi", serialize = "PI")]
    Pi,
    #[strum(to_string = "I", serialize = "i")]
    I,
}

impl Constant {
    /// Numeric value; the imaginary unit has no real value.
    pub fn value(self) -> Option<f64> {
        match self {
            Constant::E => Some(E),
            Constant::Pi => Some(PI),
            Constant::I => None,
        }
    }
}

/// Symbolic expression tree.
///
/// # Examples
/// ```rust, ignore
/// use RustedODE::symbolic::symbolic_engine::Expr;
/// let y = Expr::unknown("y", "x", 0);
/// let rhs = Expr::Var("x".to_string()) * y;
/// println!("{}", rhs); // x*y(x)
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Plain symbol
    Var(String),
    /// Numerical constant value
    Const(f64),
    /// Named constant
    Sym(Constant),
    /// `order`-th derivative of the unknown function `name` of the variable `arg`
    Unknown {
        name: String,
        arg: String,
        order: usize,
    },
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Fun(Func, Box<Expr>),
}

/// Name of the plain symbol standing for the `order`-th derivative of `name`: `y`, `y'`, `y''`, ...
pub fn plain_name(name: &str, order: usize) -> String {
    format!("{}{}", name, "'".repeat(order))
}

const PREC_SUM: u8 = 1;
const PREC_PRODUCT: u8 = 2;
const PREC_POWER: u8 = 4;
const PREC_ATOM: u8 = 5;

fn wrap(s: String, parens: bool) -> String {
    if parens { format!("({})", s) } else { s }
}

impl Expr {
    /// Renders the expression together with its binding strength.
    fn render(&self) -> (String, u8) {
        match self {
            Expr::Var(name) => (name.clone(), PREC_ATOM),
            Expr::Sym(c) => (c.to_string(), PREC_ATOM),
            Expr::Const(v) => {
                let s = format_number(*v);
                let prec = if s.starts_with('-') || s.contains('/') {
                    PREC_PRODUCT
                } else {
                    PREC_ATOM
                };
                (s, prec)
            }
            Expr::Unknown { name, arg, order } => {
                let applied = format!("{}({})", name, arg);
                let s = match order {
                    0 => applied,
                    1 => format!("Derivative({}, {})", applied, arg),
                    n => format!("Derivative({}, {}, {})", applied, arg, n),
                };
                (s, PREC_ATOM)
            }
            Expr::Fun(f, arg) => (format!("{}({})", f, arg.render().0), PREC_ATOM),
            Expr::Add(lhs, rhs) => {
                let left = lhs.render().0;
                if rhs.is_negative_looking() {
                    let (r, p) = rhs.negated().render();
                    (format!("{} - {}", left, wrap(r, p <= PREC_SUM)), PREC_SUM)
                } else {
                    (format!("{} + {}", left, rhs.render().0), PREC_SUM)
                }
            }
            Expr::Sub(lhs, rhs) => {
                let (r, p) = rhs.render();
                let parens = p <= PREC_SUM || r.starts_with('-');
                (format!("{} - {}", lhs.render().0, wrap(r, parens)), PREC_SUM)
            }
            Expr::Mul(lhs, rhs) => {
                if let Expr::Const(c) = lhs.as_ref() {
                    if *c == -1.0 {
                        let (r, p) = rhs.render();
                        let parens = p < PREC_PRODUCT || r.starts_with('-');
                        return (format!("-{}", wrap(r, parens)), PREC_PRODUCT);
                    }
                }
                let (l, lp) = lhs.render();
                let (r, rp) = rhs.render();
                let left = wrap(l, lp < PREC_PRODUCT);
                let right = wrap(r.clone(), rp < PREC_PRODUCT || r.starts_with('-'));
                (format!("{}*{}", left, right), PREC_PRODUCT)
            }
            Expr::Div(lhs, rhs) => {
                let (l, lp) = lhs.render();
                let (r, rp) = rhs.render();
                let left = wrap(l, lp < PREC_PRODUCT);
                let right = wrap(r.clone(), rp <= PREC_PRODUCT || r.starts_with('-'));
                (format!("{}/{}", left, right), PREC_PRODUCT)
            }
            Expr::Pow(base, exp) => {
                if let Expr::Const(e) = exp.as_ref() {
                    if *e == 0.5 {
                        return (format!("sqrt({})", base.render().0), PREC_ATOM);
                    }
                }
                let (b, bp) = base.render();
                let (e, ep) = exp.render();
                let base_s = wrap(b.clone(), bp < PREC_ATOM || b.starts_with('-'));
                let exp_s = wrap(e.clone(), ep < PREC_ATOM || e.starts_with('-'));
                (format!("{}**{}", base_s, exp_s), PREC_POWER)
            }
        }
    }

    /// `true` for expressions printed with a leading minus sign: negative numbers and products
    /// whose leading coefficient is negative.
    pub fn is_negative_looking(&self) -> bool {
        match self {
            Expr::Const(v) => *v < 0.0,
            Expr::Mul(lhs, _) | Expr::Div(lhs, _) => lhs.is_negative_looking(),
            _ => false,
        }
    }

    /// Flips the sign of a negative-looking expression without adding a new node.
    pub fn negated(&self) -> Expr {
        match self {
            Expr::Const(v) => Expr::Const(-v),
            Expr::Mul(lhs, rhs) => {
                if let Expr::Const(c) = lhs.as_ref() {
                    if *c == -1.0 {
                        return rhs.as_ref().clone();
                    }
                }
                Expr::Mul(Box::new(lhs.negated()), rhs.clone())
            }
            Expr::Div(lhs, rhs) => Expr::Div(Box::new(lhs.negated()), rhs.clone()),
            _ => Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(self.clone())),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.render().0)
    }
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(self.boxed(), rhs.boxed())
    }
}

impl std::ops::AddAssign for Expr {
    fn add_assign(&mut self, rhs: Self) {
        *self = Expr::Add(Box::new(self.clone()), Box::new(rhs));
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(self))
    }
}

impl Expr {
    /// BASIC FEATURES

    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    pub fn unknown(name: &str, arg: &str, order: usize) -> Expr {
        Expr::Unknown {
            name: name.to_string(),
            arg: arg.to_string(),
            order,
        }
    }

    pub fn func(f: Func, arg: Expr) -> Expr {
        Expr::Fun(f, arg.boxed())
    }

    pub fn exp(self) -> Expr {
        Expr::Fun(Func::exp, self.boxed())
    }

    pub fn ln(self) -> Expr {
        Expr::Fun(Func::ln, self.boxed())
    }

    pub fn pow(self, rhs: Expr) -> Expr {
        Expr::Pow(self.boxed(), rhs.boxed())
    }

    pub fn sqrt(self) -> Expr {
        Expr::Pow(self.boxed(), Expr::Const(0.5).boxed())
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(v) if *v == 0.0)
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Expr::Const(v) if *v == 1.0)
    }

    pub fn as_const(&self) -> Option<f64> {
        match self {
            Expr::Const(v) => Some(*v),
            _ => None,
        }
    }

    /// Rebuilds the node with `f` applied to every direct child.
    pub fn map_children(&self, f: &dyn Fn(&Expr) -> Expr) -> Expr {
        match self {
            Expr::Add(lhs, rhs) => Expr::Add(f(lhs).boxed(), f(rhs).boxed()),
            Expr::Sub(lhs, rhs) => Expr::Sub(f(lhs).boxed(), f(rhs).boxed()),
            Expr::Mul(lhs, rhs) => Expr::Mul(f(lhs).boxed(), f(rhs).boxed()),
            Expr::Div(lhs, rhs) => Expr::Div(f(lhs).boxed(), f(rhs).boxed()),
            Expr::Pow(base, exp) => Expr::Pow(f(base).boxed(), f(exp).boxed()),
            Expr::Fun(func, arg) => Expr::Fun(*func, f(arg).boxed()),
            _ => self.clone(),
        }
    }

    /// Substitutes a variable with a constant value throughout the expression.
    pub fn set_variable(&self, var: &str, value: f64) -> Expr {
        match self {
            Expr::Var(name) if name == var => Expr::Const(value),
            _ => self.map_children(&|e| e.set_variable(var, value)),
        }
    }

    /// Substitutes multiple variables with constant values.
    pub fn set_variable_from_map(&self, var_map: &HashMap<String, f64>) -> Expr {
        match self {
            Expr::Var(name) if var_map.contains_key(name) => Expr::Const(var_map[name]),
            _ => self.map_children(&|e| e.set_variable_from_map(var_map)),
        }
    }

    /// Replaces every occurrence of the symbol `var` by `expr`.
    pub fn substitute_variable(&self, var: &str, expr: &Expr) -> Expr {
        match self {
            Expr::Var(name) if name == var => expr.clone(),
            _ => self.map_children(&|e| e.substitute_variable(var, expr)),
        }
    }

    pub fn rename_variable(&self, old_var: &str, new_var: &str) -> Expr {
        match self {
            Expr::Var(name) if name == old_var => Expr::Var(new_var.to_string()),
            _ => self.map_children(&|e| e.rename_variable(old_var, new_var)),
        }
    }

    /// Replaces the unknown function and its derivatives: `Unknown { order: k }` becomes
    /// `derivatives[k]`. Orders beyond the supplied list are left untouched.
    pub fn substitute_unknown(&self, name: &str, derivatives: &[Expr]) -> Expr {
        match self {
            Expr::Unknown { name: n, order, .. } if n == name && *order < derivatives.len() => {
                derivatives[*order].clone()
            }
            _ => self.map_children(&|e| e.substitute_unknown(name, derivatives)),
        }
    }

    pub fn contains_variable(&self, var_name: &str) -> bool {
        match self {
            Expr::Var(name) => name == var_name,
            Expr::Const(_) | Expr::Sym(_) => false,
            Expr::Unknown { arg, .. } => arg == var_name,
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => lhs.contains_variable(var_name) || rhs.contains_variable(var_name),
            Expr::Fun(_, arg) => arg.contains_variable(var_name),
        }
    }

    /// `true` if any derivative (order >= 1) of the unknown function `name` occurs.
    pub fn contains_derivative(&self, name: &str) -> bool {
        self.max_order(name).is_some_and(|order| order >= 1)
    }

    /// Highest derivative order of the unknown `name`, `None` if the unknown does not occur.
    pub fn max_order(&self, name: &str) -> Option<usize> {
        match self {
            Expr::Unknown { name: n, order, .. } if n == name => Some(*order),
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => match (lhs.max_order(name), rhs.max_order(name)) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            },
            Expr::Fun(_, arg) => arg.max_order(name),
            _ => None,
        }
    }

    /// Sorted names of all plain symbols.
    pub fn extract_variables(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        self.collect_variables(&mut names);
        names.into_iter().collect()
    }

    fn collect_variables(&self, names: &mut BTreeSet<String>) {
        match self {
            Expr::Var(name) => {
                names.insert(name.clone());
            }
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => {
                lhs.collect_variables(names);
                rhs.collect_variables(names);
            }
            Expr::Fun(_, arg) => arg.collect_variables(names),
            _ => {}
        }
    }

    /// Replaces `y(x)` atoms by plain symbols `y`, `y'`, `y''`, ...
    pub fn to_plain(&self) -> Expr {
        match self {
            Expr::Unknown { name, order, .. } => Expr::Var(plain_name(name, *order)),
            _ => self.map_children(&|e| e.to_plain()),
        }
    }

    /// Inverse of [`Expr::to_plain`] for the unknown `dep` of the variable `indep`.
    pub fn from_plain(&self, dep: &str, indep: &str) -> Expr {
        match self {
            Expr::Var(name) if name.starts_with(dep) => {
                let tail = &name[dep.len()..];
                if tail.chars().all(|c| c == '\'') {
                    Expr::unknown(dep, indep, tail.len())
                } else {
                    self.clone()
                }
            }
            _ => self.map_children(&|e| e.from_plain(dep, indep)),
        }
    }

    /// Numeric value of the expression. Symbols are looked up in `env`, unknown-function atoms
    /// under their plain names.
    pub fn eval_expression(&self, env: &HashMap<String, f64>) -> Result<f64, String> {
        let value = match self {
            Expr::Var(name) => *env
                .get(name)
                .ok_or_else(|| format!("no value for symbol {}", name))?,
            Expr::Const(v) => *v,
            Expr::Sym(c) => c
                .value()
                .ok_or_else(|| format!("{} has no real value", c))?,
            Expr::Unknown { name, order, .. } => {
                let key = plain_name(name, *order);
                *env.get(&key).ok_or_else(|| format!("no value for {}", key))?
            }
            Expr::Add(lhs, rhs) => lhs.eval_expression(env)? + rhs.eval_expression(env)?,
            Expr::Sub(lhs, rhs) => lhs.eval_expression(env)? - rhs.eval_expression(env)?,
            Expr::Mul(lhs, rhs) => lhs.eval_expression(env)? * rhs.eval_expression(env)?,
            Expr::Div(lhs, rhs) => lhs.eval_expression(env)? / rhs.eval_expression(env)?,
            Expr::Pow(base, exp) => {
                let b = base.eval_expression(env)?;
                let e = exp.eval_expression(env)?;
                if b < 0.0 && e.fract() != 0.0 {
                    // odd roots of negative numbers stay real
                    let recip = 1.0 / e;
                    if (recip - recip.round()).abs() < 1e-12 && (recip.round() as i64) % 2 != 0 {
                        -(-b).powf(e)
                    } else {
                        f64::NAN
                    }
                } else {
                    b.powf(e)
                }
            }
            Expr::Fun(f, arg) => f.apply(arg.eval_expression(env)?),
        };
        Ok(value)
    }

    /// Evaluates an expression without free symbols.
    pub fn eval_constant(&self) -> Option<f64> {
        self.eval_expression(&HashMap::new()).ok()
    }

    /// Number of nodes, used to pick the simplest of equivalent forms.
    pub fn size(&self) -> usize {
        match self {
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => 1 + lhs.size() + rhs.size(),
            Expr::Fun(_, arg) => 1 + arg.size(),
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::str::FromStr;

    fn x() -> Expr {
        Expr::var("x")
    }

    #[test]
    fn test_display_precedence() {
        let e = (x() + Expr::Const(1.0)) * x();
        assert_eq!(e.to_string(), "(x + 1)*x");
        let e = x().pow(Expr::Const(2.0)) + Expr::Const(-3.0) * x();
        assert_eq!(e.to_string(), "x**2 - 3*x");
        let e = x() / (Expr::Const(2.0) * Expr::var("y"));
        assert_eq!(e.to_string(), "x/(2*y)");
        let e = x() - (Expr::var("y") - Expr::Const(1.0));
        assert_eq!(e.to_string(), "x - (y - 1)");
        let e = Expr::Const(-1.0) * Expr::Fun(Func::sin, x().boxed());
        assert_eq!(e.to_string(), "-sin(x)");
    }

    #[test]
    fn test_display_unknown_and_roots() {
        assert_eq!(Expr::unknown("y", "x", 0).to_string(), "y(x)");
        assert_eq!(Expr::unknown("y", "x", 1).to_string(), "Derivative(y(x), x)");
        assert_eq!(Expr::unknown("y", "x", 3).to_string(), "Derivative(y(x), x, 3)");
        assert_eq!(x().sqrt().to_string(), "sqrt(x)");
        assert_eq!(x().pow(Expr::Const(-0.5)).to_string(), "x**(-1/2)");
        assert_eq!(Expr::Mul(Expr::Const(0.5).boxed(), x().boxed()).to_string(), "1/2*x");
    }

    #[test]
    fn test_func_names() {
        assert_eq!(Func::from_str("tg").unwrap(), Func::tan);
        assert_eq!(Func::from_str("arctg").unwrap(), Func::arctan);
        assert_eq!(Func::from_str("ln").unwrap(), Func::ln);
        assert_eq!(Func::ln.to_string(), "log");
        assert!(Func::from_str("sqrt").is_err());
    }

    #[test]
    fn test_plain_round_trip() {
        let e = Expr::unknown("y", "x", 2) + x() * Expr::unknown("y", "x", 0);
        let plain = e.to_plain();
        assert_eq!(plain.extract_variables(), vec!["x", "y", "y''"]);
        assert_eq!(plain.from_plain("y", "x"), e);
        assert_eq!(e.max_order("y"), Some(2));
        assert!(e.contains_derivative("y"));
        assert!(!Expr::unknown("y", "x", 0).contains_derivative("y"));
    }

    #[test]
    fn test_eval_expression() {
        let mut env = HashMap::new();
        env.insert("x".to_string(), 2.0);
        env.insert("y'".to_string(), 3.0);
        let e = Expr::unknown("y", "x", 1) * x().exp();
        assert_relative_eq!(e.eval_expression(&env).unwrap(), 3.0 * 2f64.exp(), epsilon = 1e-12);
        let cube_root = Expr::Const(-8.0).pow(Expr::Const(1.0 / 3.0));
        assert_relative_eq!(cube_root.eval_constant().unwrap(), -2.0, epsilon = 1e-12);
        assert!(Expr::Sym(Constant::I).eval_constant().is_none());
        assert!(Expr::var("z").eval_expression(&env).is_err());
    }

    #[test]
    fn test_substitute_unknown() {
        let e = Expr::unknown("y", "x", 1) - x() * Expr::unknown("y", "x", 0);
        let sol = x().exp();
        let replaced = e.substitute_unknown("y", &[sol.clone(), sol.clone()]);
        assert!(!replaced.contains_derivative("y"));
        assert_eq!(replaced.max_order("y"), None);
    }
}
