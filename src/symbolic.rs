#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// a module turns a String expression into a symbolic expression
///
///# Example
/// ```
/// use RustedODE::symbolic::symbolic_engine::Expr;
/// let input = "x^2*exp(x) + y";
/// let parsed_expression = Expr::parse_expression(input).unwrap();
/// println!(" parsed_expression {}", parsed_expression);
///  ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
/// names the parser resolves: bound variables, elementary functions and constants
pub mod symbol_table;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// a module
/// 1) holds the expression tree, including the unknown function y(x) and its derivatives
/// 2) differentiates, simplifies and integrates expressions
/// 3) evaluates expressions numerically
///# Example#
/// ```
/// use RustedODE::symbolic::symbolic_engine::Expr;
/// let f = Expr::parse_expression("x*ln(x)").unwrap();
/// // differentiate with respect to x
/// let df_dx = f.diff("x").simplify();
/// println!("df_dx = {}", df_dx);
/// // and integrate back
/// let F = df_dx.integrate("x").unwrap();
/// println!("F = {}", F);
/// ```
/// ________________________________________________________________________________________________________________________________________________
pub mod symbolic_engine;
pub mod symbolic_engine_derivatives;
#[cfg(test)]
mod symbolic_engine_tests;
/// term algebra: simplification, expansion and zero tests
pub mod symbolic_simplify;
/// antiderivatives of the integrands met when solving ODEs
pub mod symbolic_integration;
/// univariate polynomials with real coefficients and their complex roots
pub mod polynomial;
///______________________________________________________________________________________________________________________________________________
/// the collection of utility functions for bracket checking and number formatting
/// _____________________________________________________________________________________________________________________________________________
pub mod utils;
