//! Error taxonomy of the calculator.
//!
//! `ValidationError` rejects input before any symbolic work, `ParseError` covers text that could not
//! be turned into an equation, `OdeError` is what the pipeline reports to its callers. Engine-level
//! failures of a single method attempt are `SolveError`s and never leave the dispatcher.

use thiserror::Error;

use crate::ode::classifier::Method;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("the equation is empty")]
    Empty,
    #[error("the equation is too long: {len} characters, at most {max} are allowed")]
    TooLong { len: usize, max: usize },
    #[error("the equation contains characters that are not allowed: {chars}")]
    DisallowedCharacters { chars: String },
    #[error("the condition '{0}' is not valid, expected a form like y(0)=2")]
    ConditionWithoutEquals(String),
    #[error("the condition '{condition}' is too long: at most {max} characters are allowed")]
    ConditionTooLong { condition: String, max: usize },
    #[error("invalid variable name '{name}': {reason}")]
    InvalidVariable { name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("unrecognized variable or function '{0}'")]
    UnboundName(String),
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("unbalanced parentheses")]
    UnbalancedParentheses,
    #[error("the equation contains no derivative of {0}, it is not a differential equation")]
    NotDifferential(String),
}

/// Failure of one solver attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("method {0} is not applicable to this equation")]
    NotApplicable(Method),
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OdeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("equation too complex for the selected method ({method}); retry with automatic selection")]
    MethodNotApplicable { method: String, cause: String },
    #[error("no closed-form solution was found: {cause}")]
    Unsolvable { cause: String },
    #[error("initial conditions could not be applied: {0}")]
    Conditions(String),
    #[error("the solver did not finish within {0} s")]
    Timeout(u64),
}

const TIPS: [&str; 5] = [
    "Use 'exp(x)' or 'e^x' for the exponential function",
    "Use '*' for multiplication: '2*x' (implicit '2x' is accepted too)",
    "Use '^' or '**' for powers: 'x^2' or 'x**2'",
    "Write derivatives as y', y'', y''' or dy/dx, d2y/dx2",
    "Check that all parentheses are balanced",
];

impl OdeError {
    /// Syntax guidance shown next to validation and parse failures.
    pub fn tips() -> &'static [&'static str] {
        &TIPS
    }

    /// Short label of the error family.
    pub fn kind(&self) -> &'static str {
        match self {
            OdeError::Validation(_) => "validation error",
            OdeError::Parse(_) => "parse error",
            OdeError::MethodNotApplicable { .. } => "method not applicable",
            OdeError::Unsolvable { .. } => "unsolvable",
            OdeError::Conditions(_) => "initial conditions error",
            OdeError::Timeout(_) => "timeout",
        }
    }

    /// `true` for errors the user fixes by editing the input text.
    pub fn is_input_error(&self) -> bool {
        matches!(self, OdeError::Validation(_) | OdeError::Parse(_))
    }
}
