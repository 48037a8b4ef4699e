//! # Solve pipeline
//!
//! One request runs through
//! validation → normalization → equation building → classification → method dispatch →
//! initial conditions → verification → narration, and yields an [`OdeReport`] whose
//! [`OdeReport::render`] produces the text block shown to the user.
//!
//! The pipeline is synchronous. [`solve_with_timeout`] runs it on a worker thread and stops
//! waiting after a wall-clock budget; the worker itself cannot be interrupted and finishes in
//! the background.

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};
use tabled::{builder::Builder, settings::Style};

use crate::ode::builder::{SymbolicEquation, build};
use crate::ode::classifier::OdeClass;
use crate::ode::conditions::{InitialCondition, apply_conditions, parse_conditions};
use crate::ode::dispatcher::{MethodChoice, dispatch};
use crate::ode::error::OdeError;
use crate::ode::formatter::{format_equation, format_solution};
use crate::ode::narrator::narrate;
use crate::ode::normalizer::normalize;
use crate::ode::solvers::{BuiltinSolver, SolutionExpression, SolveCapability};
use crate::ode::validation::{validate_bindings, validate_conditions, validate_equation};
use crate::ode::verification::{Verification, verify};
use crate::symbolic::symbol_table::VariableBinding;

const WIDTH: usize = 78;

#[derive(Clone, Debug, PartialEq)]
pub struct OdeRequest {
    pub equation: String,
    /// Method name; `None` selects automatically.
    pub method: Option<String>,
    pub bindings: VariableBinding,
    pub initial_conditions: Vec<String>,
    pub show_steps: bool,
    pub verify: bool,
    /// Number of classification tags listed in the report.
    pub max_tags: usize,
}

impl OdeRequest {
    pub fn new(equation: &str) -> Self {
        OdeRequest {
            equation: equation.to_string(),
            method: None,
            bindings: VariableBinding::default(),
            initial_conditions: Vec::new(),
            show_steps: true,
            verify: true,
            max_tags: 3,
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    pub fn with_bindings(mut self, bindings: VariableBinding) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn with_condition(mut self, condition: &str) -> Self {
        self.initial_conditions.push(condition.to_string());
        self
    }
}

#[derive(Clone, Debug)]
pub struct OdeReport {
    pub equation: SymbolicEquation,
    pub classes: Vec<OdeClass>,
    /// Method that produced the general solution.
    pub method: String,
    pub general: SolutionExpression,
    pub conditions: Vec<InitialCondition>,
    pub particular: Option<SolutionExpression>,
    pub steps: Option<String>,
    pub verification: Option<Verification>,
    pub max_tags: usize,
}

fn banner(title: &str) -> String {
    let pad = WIDTH.saturating_sub(title.chars().count());
    let left = pad / 2;
    format!(
        "╔{}╗\n║{}{}{}║\n╚{}╝\n",
        "═".repeat(WIDTH),
        " ".repeat(left),
        title,
        " ".repeat(pad - left),
        "═".repeat(WIDTH)
    )
}

fn rule(title: &str) -> String {
    format!("{}\n{}\n{}\n", "═".repeat(WIDTH + 2), title, "═".repeat(WIDTH + 2))
}

impl OdeReport {
    /// Classification tags shown in the report, in priority order.
    pub fn tags(&self) -> Vec<String> {
        self.classes.iter().take(self.max_tags).map(|c| c.tag()).collect()
    }

    fn classification_table(&self) -> String {
        if self.classes.is_empty() {
            return "  No standard pattern was recognized.\n".to_string();
        }
        let mut builder = Builder::default();
        builder.push_record(["#", "Tag", "Method"]);
        for (i, class) in self.classes.iter().take(self.max_tags).enumerate() {
            let method = class.method();
            builder.push_record([(i + 1).to_string(), method.to_string(), method.title().to_string()]);
        }
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        format!("{}\n", table)
    }

    pub fn render(&self) -> String {
        let mut out = banner("ANALYSIS OF THE EQUATION");
        out.push('\n');
        out.push_str("Entered equation:\n\n");
        out.push_str(&format!("  {}\n\n", format_equation(&self.equation)));
        out.push_str("Classification:\n");
        out.push_str(&self.classification_table());
        out.push('\n');
        out.push_str(&rule("GENERAL SOLUTION"));
        out.push_str(&format!("{}\n", format_solution(&self.general)));
        out.push_str(&format!("Method: {}\n\n", self.method));
        if let Some(particular) = &self.particular {
            out.push_str(&rule("PARTICULAR SOLUTION"));
            let conditions: Vec<String> = self.conditions.iter().map(|c| c.to_string()).collect();
            out.push_str(&format!("Conditions: {}\n", conditions.join(", ")));
            out.push_str(&format!("{}\n\n", format_solution(particular)));
        }
        if let Some(steps) = &self.steps {
            out.push_str(&rule("STEP-BY-STEP SOLUTION"));
            out.push_str(steps);
            out.push('\n');
        }
        if let Some(verification) = self.verification {
            out.push_str(&rule("VERIFICATION"));
            let mark = if verification.is_verified() { "✓" } else { "✗" };
            out.push_str(&format!(
                "{} The solution was {} by substitution into the equation.\n",
                mark, verification
            ));
        }
        out
    }
}

/// Runs the whole pipeline with the built-in solving capability.
pub fn solve_request(request: &OdeRequest) -> Result<OdeReport, OdeError> {
    solve_request_with(&BuiltinSolver, request)
}

pub fn solve_request_with<S: SolveCapability + ?Sized>(
    capability: &S,
    request: &OdeRequest,
) -> Result<OdeReport, OdeError> {
    let started = Instant::now();
    let text = validate_equation(&request.equation)?;
    validate_bindings(&request.bindings)?;
    let raw_conditions = validate_conditions(&request.initial_conditions)?;
    let conditions = parse_conditions(&raw_conditions, &request.bindings)?;

    let normalized = normalize(text, &request.bindings);
    info!("normalized equation: {}", normalized);
    let equation = build(&normalized, &request.bindings)?;
    let classes = capability.classify(&equation);
    info!(
        "classified as [{}]",
        classes.iter().map(|c| c.tag()).collect::<Vec<_>>().join(", ")
    );

    let choice = request
        .method
        .as_deref()
        .map_or(MethodChoice::Automatic, MethodChoice::from_name);
    let (general, method) = dispatch(capability, &equation, &classes, choice)?;

    let particular = if conditions.is_empty() {
        None
    } else {
        Some(apply_conditions(&equation, &general, &conditions)?)
    };
    let verification = request.verify.then(|| {
        let checked = particular.as_ref().unwrap_or(&general);
        verify(&equation, checked)
    });
    let steps = request
        .show_steps
        .then(|| narrate(&equation, &general, &classes, &request.bindings));
    info!("solved in {:?} with {}", started.elapsed(), method);
    Ok(OdeReport {
        equation,
        classes,
        method,
        general,
        conditions,
        particular,
        steps,
        verification,
        max_tags: request.max_tags,
    })
}

/// [`solve_request`] on a worker thread. Gives up with [`OdeError::Timeout`] after `timeout`.
pub fn solve_with_timeout(request: OdeRequest, timeout: Duration) -> Result<OdeReport, OdeError> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let result = solve_request(&request);
        // the receiver is gone once the caller has timed out
        let _ = sender.send(result);
    });
    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!("solver did not finish within {:?}", timeout);
            Err(OdeError::Timeout(timeout.as_secs()))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(OdeError::Unsolvable {
            cause: "the solver thread terminated unexpectedly".to_string(),
        }),
    }
}
