//! # Ordinary differential equations
//!
//! From informal equation text to a narrated closed-form solution:
//!
//! - `validation`: request-boundary checks of equation, conditions and variable names
//! - `normalizer`: rewriting of `y'`, `dy/dx`, `√`, `e^x` into canonical text
//! - `builder`: parsing of the canonical text into a [`builder::SymbolicEquation`]
//! - `classifier`: recognition of the standard solution patterns
//! - `solvers`: the closed-form methods behind the `SolveCapability` seam
//! - `dispatcher`: method choice with fallback tiers
//! - `conditions`: initial conditions and particular solutions
//! - `verification`: substitution of a solution back into the equation
//! - `narrator`, `formatter`: step-by-step derivation and readable output
//! - `pipeline`, `api`: the whole run for one request and its service boundary
//!
//! # Example
//! ```
//! use RustedODE::ode::pipeline::{OdeRequest, solve_request};
//! let report = solve_request(&OdeRequest::new("y'' - 5*y' + 6*y = 0")).unwrap();
//! println!("{}", report.render());
//! ```
pub mod api;
pub mod builder;
pub mod classifier;
pub mod conditions;
pub mod dispatcher;
pub mod error;
pub mod formatter;
pub mod narrator;
pub mod normalizer;
pub mod pipeline;
pub mod solvers;
pub mod validation;
pub mod verification;
