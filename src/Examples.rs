//! examples of usage of RustedODE
/// catalogue of differential equations grouped by solution method
pub mod ode_examples;
