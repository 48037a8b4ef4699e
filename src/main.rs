#![allow(non_snake_case)]
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::info;

use RustedODE::Examples::ode_examples::catalogue_text;
use RustedODE::Utils::config::CalculatorConfig;
use RustedODE::Utils::logger::init_logger;
use RustedODE::ode::error::OdeError;
use RustedODE::ode::pipeline::solve_with_timeout;

#[derive(Parser, Debug)]
#[command(
    name = "odesolve",
    version = env!("CARGO_PKG_VERSION"),
    about = "Solve ordinary differential equations symbolically and explain the steps",
    long_about = r#"
Solve ordinary differential equations written in informal notation and print the
classification, the general solution, the derivation step by step and a check of
the result.

Examples:
  odesolve "y' = x*y"
  odesolve "y'' - 5*y' + 6*y = 0" --ic "y(0)=1" --ic "y'(0)=0"
  odesolve "dy/dx + 2y = x" --method linear --no-steps
  odesolve "u' = t*u" --indep t --dep u
  odesolve --examples
"#
)]
struct Cli {
    /// The differential equation, e.g. "y'' + y = sin(x)"
    equation: Option<String>,

    /// Solution method: automatic, separable, linear, exact, bernoulli, homogeneous,
    /// "constant coefficients", "undetermined coefficients" or "variation of parameters"
    #[arg(short, long)]
    method: Option<String>,

    /// Name of the independent variable
    #[arg(long)]
    indep: Option<String>,

    /// Name of the unknown function
    #[arg(long)]
    dep: Option<String>,

    /// Initial condition such as "y(0)=2" or "y'(0)=1"; repeat for several
    #[arg(long = "ic")]
    initial_conditions: Vec<String>,

    /// Do not print the step-by-step derivation
    #[arg(long)]
    no_steps: bool,

    /// Do not verify the solution
    #[arg(long)]
    no_verify: bool,

    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// debug, info, warn, error or off
    #[arg(long)]
    log_level: Option<String>,

    /// Wall-clock limit of the solver in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// List example equations and exit
    #[arg(long)]
    examples: bool,
}

fn settings(cli: &Cli) -> Result<CalculatorConfig, String> {
    let mut config = match &cli.config {
        Some(path) => CalculatorConfig::load(path)?,
        None => CalculatorConfig::default(),
    };
    if let Some(method) = &cli.method {
        config.solver.method = method.clone();
    }
    if let Some(indep) = &cli.indep {
        config.variables.independent = indep.clone();
    }
    if let Some(dep) = &cli.dep {
        config.variables.dependent = dep.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.solver.timeout_secs = timeout;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    config.output.show_steps &= !cli.no_steps;
    config.output.verify &= !cli.no_verify;
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.examples {
        println!("{}", catalogue_text());
        return ExitCode::SUCCESS;
    }
    let Some(equation) = cli.equation.as_deref() else {
        eprintln!("no equation given, see odesolve --help or odesolve --examples");
        return ExitCode::FAILURE;
    };
    let config = match settings(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logger(&config.logging.level, config.logging.file.as_deref()) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }
    let mut request = config.request(equation);
    request.initial_conditions = cli.initial_conditions.clone();
    info!("solving {}", equation);
    match solve_with_timeout(request, Duration::from_secs(config.solver.timeout_secs)) {
        Ok(report) => {
            println!("{}", report.render());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error ({}): {}", e.kind(), e);
            if e.is_input_error() {
                eprintln!("\nTips:");
                for tip in OdeError::tips() {
                    eprintln!("  • {}", tip);
                }
            }
            ExitCode::FAILURE
        }
    }
}
