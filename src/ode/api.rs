//! Request/response boundary for embedding the calculator in a service.
//!
//! A [`SolveRequest`] carries the raw equation text and the initial conditions; the answer is a
//! [`SolveResponse`] that is either the rendered solution or an error with guidance.

use log::{info, warn};

use crate::ode::error::OdeError;
use crate::ode::formatter::format_solution;
use crate::ode::normalizer::normalize;
use crate::ode::pipeline::{OdeRequest, solve_request};
use crate::ode::validation::{validate_conditions, validate_equation};
use crate::symbolic::symbol_table::VariableBinding;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolveRequest {
    pub equation: String,
    pub initial_conditions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SolveResponse {
    Success {
        /// normalized equation text
        equation: String,
        conditions: Vec<String>,
        solution: String,
    },
    Failure {
        error: String,
        /// syntax guidance, empty for errors unrelated to the input text
        details: Vec<String>,
    },
}

impl SolveResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, SolveResponse::Success { .. })
    }

    fn failure(e: &OdeError) -> SolveResponse {
        let details = match e {
            OdeError::Validation(_) | OdeError::Parse(_) | OdeError::Conditions(_) => {
                OdeError::tips().iter().map(|t| t.to_string()).collect()
            }
            _ => Vec::new(),
        };
        SolveResponse::Failure {
            error: format!("{}: {}", e.kind(), e),
            details,
        }
    }
}

pub fn handle(request: &SolveRequest) -> SolveResponse {
    let bindings = VariableBinding::default();
    let prepared = validate_equation(&request.equation)
        .map_err(OdeError::from)
        .and_then(|text| {
            let conditions = validate_conditions(&request.initial_conditions)?;
            Ok((normalize(text, &bindings), conditions))
        });
    let (equation, conditions) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            warn!("rejected request: {}", e);
            return SolveResponse::failure(&e);
        }
    };
    let mut ode_request = OdeRequest::new(&request.equation);
    ode_request.initial_conditions = conditions.clone();
    ode_request.show_steps = false;
    ode_request.verify = false;
    match solve_request(&ode_request) {
        Ok(report) => {
            info!("request solved with {}", report.method);
            let solution = report.particular.as_ref().unwrap_or(&report.general);
            SolveResponse::Success {
                equation,
                conditions,
                solution: format_solution(solution),
            }
        }
        Err(e) => {
            warn!("request failed: {}", e);
            SolveResponse::failure(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        let request = SolveRequest {
            equation: " y' = x*y ".to_string(),
            initial_conditions: vec![" y(0)=2".to_string()],
        };
        match handle(&request) {
            SolveResponse::Success {
                equation,
                conditions,
                solution,
            } => {
                assert!(equation.contains("Derivative(y(x), x)"));
                assert_eq!(conditions, vec!["y(0)=2"]);
                assert!(solution.starts_with("y(x) = "));
                assert!(!solution.contains("C1"));
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[test]
    fn test_failures_are_distinct() {
        let empty = handle(&SolveRequest::default());
        let SolveResponse::Failure { error, details } = empty else {
            panic!("expected a failure");
        };
        assert!(error.starts_with("validation error"));
        assert_eq!(details.len(), OdeError::tips().len());

        let parse = handle(&SolveRequest {
            equation: "y' = z*y".to_string(),
            initial_conditions: Vec::new(),
        });
        let SolveResponse::Failure { error, .. } = parse else {
            panic!("expected a failure");
        };
        assert!(error.starts_with("parse error"));

        let long = handle(&SolveRequest {
            equation: "y' = y".to_string(),
            initial_conditions: vec![format!("y(0)={}", "1".repeat(60))],
        });
        assert!(!long.is_success());
    }
}
