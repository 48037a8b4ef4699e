//! Method selection with fallback tiers.
//!
//! An explicitly chosen method gets exactly one attempt and never falls back. Automatic selection
//! tries, when any constant-coefficient pattern was recognized, the homogeneous method, then
//! undetermined coefficients, then the unhinted general solve; otherwise only the general solve.

use log::{debug, info, warn};
use strum::IntoEnumIterator;

use crate::ode::builder::SymbolicEquation;
use crate::ode::classifier::{Method, OdeClass};
use crate::ode::error::{OdeError, SolveError};
use crate::ode::solvers::{BuiltinSolver, SolutionExpression, SolveCapability};

/// What the caller asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodChoice {
    Automatic,
    Hint(Method),
    /// Homogeneous first, then undetermined coefficients.
    ConstantCoefficients,
}

impl MethodChoice {
    /// Case-insensitive lookup of a tag (`1st_linear`), a method title (`First-order linear`) or
    /// a short name (`linear`). Unknown names select automatic solving.
    pub fn from_name(name: &str) -> MethodChoice {
        let key = name.trim().to_lowercase();
        let choice = match key.as_str() {
            "" | "auto" | "automatic" => Some(MethodChoice::Automatic),
            "separable" => Some(MethodChoice::Hint(Method::Separable)),
            "linear" => Some(MethodChoice::Hint(Method::FirstLinear)),
            "exact" => Some(MethodChoice::Hint(Method::FirstExact)),
            "bernoulli" => Some(MethodChoice::Hint(Method::Bernoulli)),
            "homogeneous" => Some(MethodChoice::Hint(Method::FirstHomogeneousCoeff)),
            "constant coefficients" => Some(MethodChoice::ConstantCoefficients),
            "undetermined coefficients" => Some(MethodChoice::Hint(Method::UndeterminedCoefficients)),
            "variation of parameters" => Some(MethodChoice::Hint(Method::VariationOfParameters)),
            _ => Method::iter()
                .find(|m| m.to_string().to_lowercase() == key || m.title().to_lowercase() == key)
                .map(MethodChoice::Hint),
        };
        choice.unwrap_or_else(|| {
            warn!("unknown method '{}', falling back to automatic selection", name);
            MethodChoice::Automatic
        })
    }
}

fn method_not_applicable(method: &str, cause: &SolveError) -> OdeError {
    OdeError::MethodNotApplicable {
        method: method.to_string(),
        cause: cause.to_string(),
    }
}

/// Runs the tiers for `choice` against `capability`. Returns the solution and the name of the
/// method that produced it.
pub fn dispatch<S: SolveCapability + ?Sized>(
    capability: &S,
    eq: &SymbolicEquation,
    classes: &[OdeClass],
    choice: MethodChoice,
) -> Result<(SolutionExpression, String), OdeError> {
    match choice {
        MethodChoice::Hint(method) => {
            let solved = capability
                .dsolve(eq, Some(method))
                .map_err(|e| method_not_applicable(&method.to_string(), &e))?;
            Ok((solved.solution, method.to_string()))
        }
        MethodChoice::ConstantCoefficients => {
            let mut last = SolveError::NotApplicable(Method::ConstCoeffHomogeneous);
            for method in [Method::ConstCoeffHomogeneous, Method::UndeterminedCoefficients] {
                match capability.dsolve(eq, Some(method)) {
                    Ok(solved) => return Ok((solved.solution, method.to_string())),
                    Err(e) => {
                        debug!("tier {} failed: {}", method, e);
                        last = e;
                    }
                }
            }
            Err(method_not_applicable("constant coefficients", &last))
        }
        MethodChoice::Automatic => {
            let mut tiers: Vec<Option<Method>> = Vec::new();
            if classes.iter().any(|c| c.method().is_constant_coeff()) {
                tiers.push(Some(Method::ConstCoeffHomogeneous));
                tiers.push(Some(Method::UndeterminedCoefficients));
            }
            tiers.push(None);
            let mut cause = format!("no solution method matches {}", eq);
            for hint in tiers {
                match capability.dsolve(eq, hint) {
                    Ok(solved) => {
                        let used = match hint {
                            Some(method) => method.to_string(),
                            None => format!("automatic ({})", solved.method),
                        };
                        info!("solved with {}", used);
                        return Ok((solved.solution, used));
                    }
                    Err(e) => {
                        debug!("tier {:?} failed: {}", hint, e);
                        cause = e.to_string();
                    }
                }
            }
            Err(OdeError::Unsolvable { cause })
        }
    }
}

/// Classifies and solves with the built-in methods.
pub fn solve(
    eq: &SymbolicEquation,
    method: Option<&str>,
) -> Result<(SolutionExpression, String), OdeError> {
    let choice = method.map_or(MethodChoice::Automatic, MethodChoice::from_name);
    let classes = BuiltinSolver.classify(eq);
    dispatch(&BuiltinSolver, eq, &classes, choice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::ode::builder::build;
    use crate::ode::normalizer::normalize;
    use crate::ode::solvers::{SolutionEq, Solved};
    use crate::symbolic::symbol_table::VariableBinding;
    use crate::symbolic::symbolic_engine::Expr;

    fn equation(raw: &str) -> SymbolicEquation {
        let bindings = VariableBinding::default();
        build(&normalize(raw, &bindings), &bindings).unwrap()
    }

    /// Records every attempt; succeeds only for the methods in `accepts`.
    struct Recorder {
        accepts: Vec<Option<Method>>,
        calls: RefCell<Vec<Option<Method>>>,
    }

    impl Recorder {
        fn new(accepts: Vec<Option<Method>>) -> Self {
            Recorder {
                accepts,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl SolveCapability for Recorder {
        fn classify(&self, _eq: &SymbolicEquation) -> Vec<OdeClass> {
            Vec::new()
        }

        fn dsolve(&self, _eq: &SymbolicEquation, hint: Option<Method>) -> Result<Solved, SolveError> {
            self.calls.borrow_mut().push(hint);
            if self.accepts.contains(&hint) {
                Ok(Solved {
                    solution: SolutionExpression::Single(SolutionEq::explicit("y", "x", Expr::var("C1"))),
                    method: hint.unwrap_or(Method::VariationOfParameters),
                })
            } else {
                Err(SolveError::NotImplemented("mock".to_string()))
            }
        }
    }

    fn constant_coeff_classes() -> Vec<OdeClass> {
        vec![OdeClass::ConstCoeffHomogeneous {
            coeffs: vec![6.0, -5.0, 1.0],
        }]
    }

    #[test]
    fn test_method_names() {
        assert_eq!(MethodChoice::from_name("auto"), MethodChoice::Automatic);
        assert_eq!(MethodChoice::from_name(""), MethodChoice::Automatic);
        assert_eq!(MethodChoice::from_name("LINEAR"), MethodChoice::Hint(Method::FirstLinear));
        assert_eq!(MethodChoice::from_name("1st_exact"), MethodChoice::Hint(Method::FirstExact));
        assert_eq!(MethodChoice::from_name("bernoulli"), MethodChoice::Hint(Method::Bernoulli));
        assert_eq!(
            MethodChoice::from_name("Constant Coefficients"),
            MethodChoice::ConstantCoefficients
        );
        assert_eq!(
            MethodChoice::from_name("variation of parameters"),
            MethodChoice::Hint(Method::VariationOfParameters)
        );
        assert_eq!(MethodChoice::from_name("frobenius"), MethodChoice::Automatic);
    }

    #[test]
    fn test_automatic_tier_order_with_constant_coefficients() {
        let eq = equation("y'' - 5*y' + 6*y = 0");
        let mock = Recorder::new(vec![None]);
        let (_, used) = dispatch(&mock, &eq, &constant_coeff_classes(), MethodChoice::Automatic).unwrap();
        assert_eq!(
            *mock.calls.borrow(),
            vec![
                Some(Method::ConstCoeffHomogeneous),
                Some(Method::UndeterminedCoefficients),
                None
            ]
        );
        assert_eq!(used, "automatic (nth_linear_constant_coeff_variation_of_parameters)");
    }

    #[test]
    fn test_automatic_without_constant_coefficients_is_one_attempt() {
        let eq = equation("y' = x*y");
        let mock = Recorder::new(Vec::new());
        let err = dispatch(&mock, &eq, &[], MethodChoice::Automatic).unwrap_err();
        assert_eq!(*mock.calls.borrow(), vec![None]);
        assert!(matches!(err, OdeError::Unsolvable { .. }));
    }

    #[test]
    fn test_explicit_hint_never_falls_back() {
        let eq = equation("y' = x*y");
        let mock = Recorder::new(vec![None]);
        let err = dispatch(&mock, &eq, &[], MethodChoice::Hint(Method::Bernoulli)).unwrap_err();
        assert_eq!(*mock.calls.borrow(), vec![Some(Method::Bernoulli)]);
        match err {
            OdeError::MethodNotApplicable { method, .. } => assert_eq!(method, "Bernoulli"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_constant_coefficients_choice() {
        let eq = equation("y'' + y = x");
        let mock = Recorder::new(vec![Some(Method::UndeterminedCoefficients)]);
        let (_, used) = dispatch(&mock, &eq, &[], MethodChoice::ConstantCoefficients).unwrap();
        assert_eq!(used, "nth_linear_constant_coeff_undetermined_coefficients");
        assert_eq!(mock.calls.borrow().len(), 2);
    }

    #[test]
    fn test_solve_with_builtin_methods() {
        let eq = equation("y' = x*y");
        let (sol, used) = solve(&eq, None).unwrap();
        assert_eq!(used, "automatic (separable)");
        assert_eq!(sol.constants(&eq.bindings), vec!["C1"]);
        let eq = equation("y'' - 5*y' + 6*y = 0");
        let (_, used) = solve(&eq, Some("automatic")).unwrap();
        assert_eq!(used, "nth_linear_constant_coeff_homogeneous");
        let eq = equation("y' + 2*y = x");
        assert!(matches!(
            solve(&eq, Some("Bernoulli")),
            Err(OdeError::MethodNotApplicable { .. })
        ));
    }
}
