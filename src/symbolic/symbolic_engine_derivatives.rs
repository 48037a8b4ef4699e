//! # Symbolic Engine Derivatives Module
//!
//! Analytical differentiation of [`Expr`].
//!
//! `diff(var)` is a partial derivative with respect to a plain symbol and, at the same time, the
//! total derivative with respect to the argument of the unknown function: `y(x)` differentiates to
//! `Derivative(y(x), x)`, which is what the parser needs for `Derivative(...)` calls and what the
//! solution check needs when a candidate solution is substituted back into the equation.
//!
//! ## Key Methods
//! - `diff(var: &str)` - analytical derivative
//! - `n_th_derivative1D()` - higher-order derivatives, simplified after each step
//! - `diff_multi_args()` - all partial derivatives at once

use crate::symbolic::symbolic_engine::{Expr, Func};

impl Expr {
    /// DIFFERENTIATION

    /// Computes the analytical derivative of the expression with respect to a variable.
    ///
    /// Implements the standard differentiation rules:
    /// - Power rule: d/dx(x^n) = n*x^(n-1), and d/dx(f^g) = f^g*(g'*ln(f) + g*f'/f) for variable
    ///   exponents
    /// - Product rule: d/dx(f*g) = f'*g + f*g'
    /// - Quotient rule: d/dx(f/g) = (f'*g - f*g')/g^2
    /// - Chain rule: d/dx(f(g(x))) = f'(g(x))*g'(x)
    ///
    /// # Examples
    /// ```rust, ignore
    /// let x = Expr::Var("x".to_string());
    /// let f = x.clone().pow(Expr::Const(2.0)); // x^2
    /// let df_dx = f.diff("x").simplify(); // 2*x
    /// ```
    pub fn diff(&self, var: &str) -> Expr {
        match self {
            Expr::Var(name) => {
                if name == var {
                    Expr::Const(1.0)
                } else {
                    Expr::Const(0.0)
                }
            }
            Expr::Const(_) | Expr::Sym(_) => Expr::Const(0.0),
            Expr::Unknown { name, arg, order } => {
                if arg == var {
                    Expr::unknown(name, arg, order + 1)
                } else {
                    Expr::Const(0.0)
                }
            }
            Expr::Add(lhs, rhs) => Expr::Add(Box::new(lhs.diff(var)), Box::new(rhs.diff(var))),
            Expr::Sub(lhs, rhs) => Expr::Sub(Box::new(lhs.diff(var)), Box::new(rhs.diff(var))),
            Expr::Mul(lhs, rhs) => Expr::Add(
                Box::new(Expr::Mul(Box::new(lhs.diff(var)), rhs.clone())),
                Box::new(Expr::Mul(lhs.clone(), Box::new(rhs.diff(var)))),
            ),
            Expr::Div(lhs, rhs) => Expr::Div(
                Box::new(Expr::Sub(
                    Box::new(Expr::Mul(Box::new(lhs.diff(var)), rhs.clone())),
                    Box::new(Expr::Mul(Box::new(rhs.diff(var)), lhs.clone())),
                )),
                Box::new(Expr::Pow(rhs.clone(), Box::new(Expr::Const(2.0)))),
            ),
            Expr::Pow(base, exp) => {
                if exp.contains_variable(var) || exp.max_order_any() {
                    // f^g * (g' ln f + g f'/f)
                    let log_part = Expr::Mul(Box::new(exp.diff(var)), Box::new(base.as_ref().clone().ln()));
                    let power_part = Expr::Div(
                        Box::new(Expr::Mul(exp.clone(), Box::new(base.diff(var)))),
                        base.clone(),
                    );
                    Expr::Mul(
                        Box::new(self.clone()),
                        Box::new(Expr::Add(Box::new(log_part), Box::new(power_part))),
                    )
                } else {
                    Expr::Mul(
                        Box::new(Expr::Mul(
                            exp.clone(),
                            Box::new(Expr::Pow(
                                base.clone(),
                                Box::new(Expr::Sub(exp.clone(), Box::new(Expr::Const(1.0)))),
                            )),
                        )),
                        Box::new(base.diff(var)),
                    )
                }
            }
            Expr::Fun(f, arg) => {
                let inner = arg.diff(var);
                if inner.is_zero() {
                    return Expr::Const(0.0);
                }
                let a = arg.as_ref().clone();
                let two = || Expr::Const(2.0);
                let outer = match f {
                    Func::sin => Expr::func(Func::cos, a),
                    Func::cos => -Expr::func(Func::sin, a),
                    Func::tan => Expr::Const(1.0) / Expr::func(Func::cos, a).pow(two()),
                    Func::cot => Expr::Const(-1.0) / Expr::func(Func::sin, a).pow(two()),
                    Func::sec => Expr::func(Func::sec, a.clone()) * Expr::func(Func::tan, a),
                    Func::csc => -(Expr::func(Func::csc, a.clone()) * Expr::func(Func::cot, a)),
                    Func::arcsin => (Expr::Const(1.0) - a.pow(two())).pow(Expr::Const(-0.5)),
                    Func::arccos => -(Expr::Const(1.0) - a.pow(two())).pow(Expr::Const(-0.5)),
                    Func::arctan => Expr::Const(1.0) / (Expr::Const(1.0) + a.pow(two())),
                    Func::sinh => Expr::func(Func::cosh, a),
                    Func::cosh => Expr::func(Func::sinh, a),
                    Func::tanh => Expr::Const(1.0) / Expr::func(Func::cosh, a).pow(two()),
                    Func::exp => a.exp(),
                    Func::ln => Expr::Const(1.0) / a,
                    Func::abs => a.clone() / Expr::func(Func::abs, a),
                };
                Expr::Mul(Box::new(outer), Box::new(inner))
            }
        }
    } // end of diff

    /// `true` if the expression contains any unknown-function atom.
    fn max_order_any(&self) -> bool {
        match self {
            Expr::Unknown { .. } => true,
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => lhs.max_order_any() || rhs.max_order_any(),
            Expr::Fun(_, arg) => arg.max_order_any(),
            _ => false,
        }
    }

    /// n-th derivative, simplified after every step.
    pub fn n_th_derivative1D(&self, var_name: &str, n: usize) -> Expr {
        let mut expr = self.simplify();
        for _ in 0..n {
            expr = expr.diff(var_name).simplify();
        }
        expr
    }

    /// Partial derivatives with respect to each of `all_vars`.
    pub fn diff_multi_args(&self, all_vars: &[&str]) -> Vec<Expr> {
        all_vars.iter().map(|var| self.diff(var).simplify()).collect()
    }
}
