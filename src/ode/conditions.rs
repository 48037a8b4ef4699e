//! Initial conditions and particular solutions.
//!
//! A condition `y(x0) = v` or `y'(x0) = v`, `y''(x0) = v`, ... fixes one integration constant.
//! Since a general solution of a linear equation depends linearly on its constants, the
//! conditions form a linear system that is solved with an LU decomposition.

use std::collections::HashMap;

use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char},
    combinator::recognize,
    multi::{many0, many0_count},
    sequence::pair,
};

use crate::ode::builder::SymbolicEquation;
use crate::ode::error::OdeError;
use crate::ode::solvers::{SolutionEq, SolutionExpression, tidy};
use crate::symbolic::parse_expr::parse_with_table;
use crate::symbolic::symbol_table::{SymbolTable, VariableBinding};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::{format_number, nice_number};

/// `y^(order)(point) = value`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InitialCondition {
    pub order: usize,
    pub point: f64,
    pub value: f64,
}

impl std::fmt::Display for InitialCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "y{}({}) = {}",
            "'".repeat(self.order),
            format_number(self.point),
            format_number(self.value)
        )
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(alpha1, many0(alt((alphanumeric1, tag("_")))))).parse(input)
}

/// `name` and the number of primes, followed by the parenthesized point.
fn condition_lhs(input: &str) -> IResult<&str, (&str, usize)> {
    (identifier, many0_count(char('\''))).parse(input)
}

fn numeric(text: &str, table: &SymbolTable, condition: &str) -> Result<f64, OdeError> {
    let e = parse_with_table(text.trim(), table)
        .map_err(|e| OdeError::Conditions(format!("'{}': {}", condition, e)))?;
    e.simplify()
        .eval_constant()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            OdeError::Conditions(format!("'{}': '{}' is not a number", condition, text.trim()))
        })
}

/// Parses one condition like `y'(0) = 1` or `y(pi/2)=sqrt(2)`.
pub fn parse_condition(text: &str, bindings: &VariableBinding) -> Result<InitialCondition, OdeError> {
    let invalid = || OdeError::Conditions(format!("'{}' is not of the form y(x0)=v", text));
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let (lhs, rhs) = compact.split_once('=').ok_or_else(invalid)?;
    let (rest, (name, order)) = condition_lhs(lhs).map_err(|_| invalid())?;
    let point = rest
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .ok_or_else(invalid)?;
    if name != bindings.dependent {
        return Err(OdeError::Conditions(format!(
            "'{}' refers to '{}', the unknown function is '{}'",
            text, name, bindings.dependent
        )));
    }
    let table = SymbolTable::new(bindings);
    Ok(InitialCondition {
        order,
        point: numeric(point, &table, text)?,
        value: numeric(rhs, &table, text)?,
    })
}

pub fn parse_conditions(
    conditions: &[String],
    bindings: &VariableBinding,
) -> Result<Vec<InitialCondition>, OdeError> {
    conditions.iter().map(|c| parse_condition(c, bindings)).collect()
}

fn evaluate(e: &Expr, x: &str, point: f64, constants: &[String], values: &[f64]) -> Option<f64> {
    let mut env: HashMap<String, f64> = constants
        .iter()
        .cloned()
        .zip(values.iter().copied())
        .collect();
    env.insert(x.to_string(), point);
    e.eval_expression(&env).ok().filter(|v| v.is_finite())
}

/// Values of the constants for one explicit branch. `Ok(None)` when the conditions cannot be met.
fn solve_branch(
    eq: &SymbolicEquation,
    rhs: &Expr,
    constants: &[String],
    conditions: &[InitialCondition],
) -> Result<Option<Vec<f64>>, OdeError> {
    let x = eq.independent();
    let n = constants.len();
    let mut a = DMatrix::<f64>::zeros(n, n);
    let mut b = DVector::<f64>::zeros(n);
    let trial: Vec<f64> = (0..n).map(|j| 1.7 - 0.9 * j as f64).collect();
    for (i, condition) in conditions.iter().enumerate() {
        let derivative = rhs.n_th_derivative1D(x, condition.order).simplify();
        let zeros = vec![0.0; n];
        let Some(offset) = evaluate(&derivative, x, condition.point, constants, &zeros) else {
            debug!("{} is not defined at {} = {}", derivative, x, condition.point);
            return Ok(None);
        };
        for j in 0..n {
            let mut unit = zeros.clone();
            unit[j] = 1.0;
            let Some(value) = evaluate(&derivative, x, condition.point, constants, &unit) else {
                return Ok(None);
            };
            a[(i, j)] = value - offset;
        }
        let predicted = offset + (0..n).map(|j| a[(i, j)] * trial[j]).sum::<f64>();
        let actual = evaluate(&derivative, x, condition.point, constants, &trial);
        if actual.is_none_or(|v| (v - predicted).abs() > 1e-8 * (1.0 + v.abs())) {
            return Err(OdeError::Conditions(
                "the solution depends nonlinearly on its integration constants".to_string(),
            ));
        }
        b[i] = condition.value - offset;
    }
    Ok(a.lu().solve(&b).map(|c| c.iter().copied().collect()))
}

/// Fixes the integration constants of `solution` from `conditions`. Branches that cannot satisfy
/// the conditions are dropped.
pub fn apply_conditions(
    eq: &SymbolicEquation,
    solution: &SolutionExpression,
    conditions: &[InitialCondition],
) -> Result<SolutionExpression, OdeError> {
    if conditions.is_empty() {
        return Ok(solution.clone());
    }
    let constants = solution.constants(&eq.bindings);
    if conditions.len() != constants.len() {
        return Err(OdeError::Conditions(format!(
            "{} condition(s) given, the solution has {} integration constant(s)",
            conditions.len(),
            constants.len()
        )));
    }
    let dep = eq.dependent();
    let mut particular = Vec::new();
    for branch in solution.branches() {
        if !branch.is_explicit(dep) {
            return Err(OdeError::Conditions(
                "conditions can only be applied to explicit solutions".to_string(),
            ));
        }
        let Some(values) = solve_branch(eq, &branch.rhs, &constants, conditions)? else {
            debug!("branch {} cannot satisfy the conditions", branch);
            continue;
        };
        let mut rhs = branch.rhs.clone();
        for (name, value) in constants.iter().zip(values) {
            rhs = rhs.substitute_variable(name, &nice_number(value));
        }
        particular.push(SolutionEq {
            lhs: branch.lhs.clone(),
            rhs: tidy(&rhs),
        });
    }
    if particular.is_empty() {
        return Err(OdeError::Conditions(
            "no branch of the solution satisfies the conditions".to_string(),
        ));
    }
    info!("particular solution with {} branch(es)", particular.len());
    Ok(SolutionExpression::from_branches(particular))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    use crate::ode::builder::build;
    use crate::ode::dispatcher::solve;
    use crate::ode::normalizer::normalize;

    fn equation(raw: &str) -> SymbolicEquation {
        let bindings = VariableBinding::default();
        build(&normalize(raw, &bindings), &bindings).unwrap()
    }

    fn value_at(solution: &SolutionExpression, x: f64) -> f64 {
        let env = HashMap::from([("x".to_string(), x)]);
        solution.branches()[0].rhs.eval_expression(&env).unwrap()
    }

    #[test]
    fn test_parse_condition() {
        let bindings = VariableBinding::default();
        assert_eq!(
            parse_condition("y(0)=2", &bindings).unwrap(),
            InitialCondition { order: 0, point: 0.0, value: 2.0 }
        );
        let c = parse_condition(" y''(1) = -3/2 ", &bindings).unwrap();
        assert_eq!((c.order, c.point, c.value), (2, 1.0, -1.5));
        let c = parse_condition("y(pi/2)=sqrt(4)", &bindings).unwrap();
        assert_relative_eq!(c.point, std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(c.value, 2.0);
        assert!(parse_condition("y(0)", &bindings).is_err());
        assert!(parse_condition("z(0)=1", &bindings).is_err());
        assert!(parse_condition("y(x)=1", &bindings).is_err());
        let custom = VariableBinding::new("t", "u");
        assert_eq!(parse_condition("u'(0)=1", &custom).unwrap().order, 1);
    }

    #[test]
    fn test_first_order_particular_solution() {
        let eq = equation("y' = x*y");
        let (general, _) = solve(&eq, None).unwrap();
        let ics = parse_conditions(&["y(0)=2".to_string()], &eq.bindings).unwrap();
        let particular = apply_conditions(&eq, &general, &ics).unwrap();
        assert!(particular.constants(&eq.bindings).is_empty());
        for x in [0.0, 0.5, 1.2] {
            assert_relative_eq!(value_at(&particular, x), 2.0 * (x * x / 2.0).exp(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_second_order_particular_solution() {
        let eq = equation("y'' + y = 0");
        let (general, _) = solve(&eq, None).unwrap();
        let ics = parse_conditions(&["y(0)=1".to_string(), "y'(0)=0".to_string()], &eq.bindings).unwrap();
        let particular = apply_conditions(&eq, &general, &ics).unwrap();
        for x in [0.3, 1.1] {
            assert_relative_eq!(value_at(&particular, x), f64::cos(x), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_condition_count_mismatch() {
        let eq = equation("y'' + y = 0");
        let (general, _) = solve(&eq, None).unwrap();
        let ics = parse_conditions(&["y(0)=1".to_string()], &eq.bindings).unwrap();
        assert!(matches!(
            apply_conditions(&eq, &general, &ics),
            Err(OdeError::Conditions(_))
        ));
        assert_eq!(apply_conditions(&eq, &general, &[]).unwrap(), general);
    }
}
