//! different utility modules used throughout the project
/// settings file of the calculator
pub mod config;
/// terminal and file logging
pub mod logger;
