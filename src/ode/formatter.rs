//! Human-readable rendering of expressions, equations and solutions.
//!
//! Derivatives of the unknown print as `y'`, `y''`, `y'''`, `y⁽⁴⁾`, powers as `^` and products
//! as `·`. Rendering is cosmetic; whenever the rewritten text looks damaged the default
//! `Display` string is returned instead.

use crate::ode::builder::SymbolicEquation;
use crate::ode::solvers::{SolutionEq, SolutionExpression};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::brackets_balanced;

const SUPERSCRIPTS: [char; 10] = ['⁰', '¹', '²', '³', '⁴', '⁵', '⁶', '⁷', '⁸', '⁹'];

/// `y`, `y'`, `y''`, `y'''`, `y⁽⁴⁾`, ...
pub fn derivative_name(name: &str, order: usize) -> String {
    match order {
        0..=3 => format!("{}{}", name, "'".repeat(order)),
        n => {
            let digits: String = n
                .to_string()
                .chars()
                .filter_map(|c| c.to_digit(10).map(|d| SUPERSCRIPTS[d as usize]))
                .collect();
            format!("{}⁽{}⁾", name, digits)
        }
    }
}

fn pretty_unknowns(e: &Expr) -> Expr {
    match e {
        Expr::Unknown { name, order, .. } => Expr::Var(derivative_name(name, *order)),
        _ => e.map_children(&pretty_unknowns),
    }
}

fn prettify(text: &str) -> String {
    text.replace("**", "^").replace('*', "·")
}

pub fn format_expr(e: &Expr) -> String {
    let fallback = e.to_string();
    let rendered = prettify(&pretty_unknowns(e).to_string());
    if rendered.is_empty() || !brackets_balanced(&rendered) {
        return fallback;
    }
    rendered
}

pub fn format_equation(eq: &SymbolicEquation) -> String {
    format!("{} = {}", format_expr(&eq.lhs), format_expr(&eq.rhs))
}

/// `y(x) = ...` keeps the function notation on the left.
pub fn format_solution_eq(eq: &SolutionEq) -> String {
    let lhs = match &eq.lhs {
        Expr::Unknown { order: 0, .. } => eq.lhs.to_string(),
        other => format_expr(other),
    };
    format!("{} = {}", lhs, format_expr(&eq.rhs))
}

/// One line per branch; several branches are numbered.
pub fn format_solution(solution: &SolutionExpression) -> String {
    match solution {
        SolutionExpression::Single(eq) => format_solution_eq(eq),
        SolutionExpression::Branches(eqs) => eqs
            .iter()
            .enumerate()
            .map(|(i, eq)| format!("Solution {}: {}", i + 1, format_solution_eq(eq)))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ode::builder::build;
    use crate::ode::normalizer::normalize;
    use crate::symbolic::symbol_table::VariableBinding;

    fn equation(raw: &str) -> SymbolicEquation {
        let bindings = VariableBinding::default();
        build(&normalize(raw, &bindings), &bindings).unwrap()
    }

    #[test]
    fn test_derivative_names() {
        assert_eq!(derivative_name("y", 0), "y");
        assert_eq!(derivative_name("y", 2), "y''");
        assert_eq!(derivative_name("y", 4), "y⁽⁴⁾");
        assert_eq!(derivative_name("u", 12), "u⁽¹²⁾");
    }

    #[test]
    fn test_format_equation() {
        let eq = equation("y' = x*y");
        assert_eq!(format_equation(&eq), "y' = x·y");
        let eq = equation("y'''' = x^2");
        assert_eq!(format_equation(&eq), "y⁽⁴⁾ = x^2");
    }

    #[test]
    fn test_format_solution_branches() {
        let x = Expr::var("x");
        let a = SolutionEq::explicit("y", "x", x.clone().pow(Expr::Const(2.0)));
        let b = SolutionEq::explicit("y", "x", Expr::Const(2.0) * x);
        assert_eq!(format_solution(&SolutionExpression::Single(a.clone())), "y(x) = x^2");
        let both = format_solution(&SolutionExpression::Branches(vec![a, b]));
        assert_eq!(both, "Solution 1: y(x) = x^2\nSolution 2: y(x) = 2·x");
    }
}
