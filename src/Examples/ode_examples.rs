use crate::ode::classifier::Method;
use crate::ode::pipeline::{OdeRequest, solve_request};

pub struct OdeExample {
    pub equation: &'static str,
    pub description: &'static str,
    /// method the example illustrates
    pub method: Method,
}

pub struct ExampleCategory {
    pub title: &'static str,
    pub examples: &'static [OdeExample],
}

const fn example(equation: &'static str, description: &'static str, method: Method) -> OdeExample {
    OdeExample {
        equation,
        description,
        method,
    }
}

pub static CATALOGUE: [ExampleCategory; 6] = [
    ExampleCategory {
        title: "Separable equations",
        examples: &[
            example("y' = x*y", "basic separable form", Method::Separable),
            example("y' = x/y", "separable with a quotient", Method::Separable),
            example("y' = (1 + y**2)*cos(x)", "with trigonometric functions", Method::Separable),
        ],
    },
    ExampleCategory {
        title: "First-order linear equations",
        examples: &[
            example("y' + 2*y = x", "simple linear", Method::FirstLinear),
            example("y' + y/x = x**2", "variable coefficient", Method::FirstLinear),
            example("y' - 3*y = exp(x)", "exponential forcing", Method::FirstLinear),
        ],
    },
    ExampleCategory {
        title: "Exact equations",
        examples: &[
            example("(2*x + y) + (x + 2*y)*y' = 0", "basic exact", Method::FirstExact),
            example(
                "(2*x*y + 1) + (x**2 + 2*y)*y' = 0",
                "exact with quadratic terms",
                Method::FirstExact,
            ),
        ],
    },
    ExampleCategory {
        title: "Homogeneous equations",
        examples: &[
            example("y' = (x + y)/x", "simple homogeneous", Method::FirstHomogeneousCoeff),
            example(
                "y' = (x**2 + y**2)/(x*y)",
                "homogeneous with squares",
                Method::FirstHomogeneousCoeff,
            ),
        ],
    },
    ExampleCategory {
        title: "Second order, constant coefficients",
        examples: &[
            example("y'' + 4*y = 0", "imaginary roots", Method::ConstCoeffHomogeneous),
            example("y'' - 5*y' + 6*y = 0", "distinct real roots", Method::ConstCoeffHomogeneous),
            example("y'' - 4*y' + 4*y = 0", "repeated roots", Method::ConstCoeffHomogeneous),
        ],
    },
    ExampleCategory {
        title: "Second order, nonhomogeneous",
        examples: &[
            example("y'' + y = sin(x)", "sinusoidal forcing", Method::UndeterminedCoefficients),
            example("y'' + 4*y = exp(x)", "exponential forcing", Method::UndeterminedCoefficients),
            example("y'' - y = x**2", "polynomial forcing", Method::UndeterminedCoefficients),
        ],
    },
];

/// Equations that take long or may not be solved in closed form.
pub static SLOW_EQUATIONS: [(&str, &str); 3] = [
    ("y' = x**2 + y**2", "Riccati equation, may take long or have no closed form"),
    ("y' = (x**2 + y**2)/(x*y)", "can take noticeably longer than the other examples"),
    ("(2*x*y + 1) + (x**2 + 2*y)*y' = 0", "exact equation with an implicit solution"),
];

/// All examples in catalogue order.
pub fn all_examples() -> Vec<&'static OdeExample> {
    CATALOGUE.iter().flat_map(|c| c.examples.iter()).collect()
}

pub fn catalogue_text() -> String {
    let mut out = String::new();
    let mut n = 0;
    for category in CATALOGUE.iter() {
        out.push_str(&format!("{}\n{}\n{}\n", "═".repeat(70), category.title, "═".repeat(70)));
        for ex in category.examples {
            n += 1;
            out.push_str(&format!("  {:>2}. {:<40} {}\n", n, ex.equation, ex.description));
        }
    }
    out.push_str("\nEQUATIONS THAT CAN BE SLOW:\n");
    for (equation, note) in SLOW_EQUATIONS.iter() {
        out.push_str(&format!("  • {} ({})\n", equation, note));
    }
    out
}

/// Solves the `example`-th catalogue entry (counting from 0) and prints the report.
pub fn ode_examples(example: usize) {
    let Some(ex) = all_examples().get(example).copied() else {
        println!("there are only {} examples", all_examples().len());
        return;
    };
    println!("{} ({})", ex.equation, ex.description);
    match solve_request(&OdeRequest::new(ex.equation)) {
        Ok(report) => println!("{}", report.render()),
        Err(e) => println!("{}: {}", e.kind(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ode::builder::build;
    use crate::ode::classifier::classify;
    use crate::ode::normalizer::normalize;
    use crate::ode::verification::Verification;
    use crate::symbolic::symbol_table::VariableBinding;

    #[test]
    fn test_catalogue_shape() {
        assert_eq!(all_examples().len(), 16);
        let text = catalogue_text();
        assert!(text.contains("16. y'' - y = x**2"));
        assert!(text.contains("EQUATIONS THAT CAN BE SLOW"));
    }

    #[test]
    fn test_examples_are_classified_by_their_method() {
        let bindings = VariableBinding::default();
        for ex in all_examples() {
            let eq = build(&normalize(ex.equation, &bindings), &bindings).unwrap();
            let methods: Vec<Method> = classify(&eq).iter().map(|c| c.method()).collect();
            assert!(methods.contains(&ex.method), "{} -> {:?}", ex.equation, methods);
        }
    }

    #[test]
    fn test_solved_examples_verify() {
        for ex in all_examples() {
            let mut request = OdeRequest::new(ex.equation);
            request.show_steps = false;
            if let Ok(report) = solve_request(&request) {
                assert_ne!(report.verification, Some(Verification::Failed), "{}", ex.equation);
            }
        }
        for ex in CATALOGUE[4].examples.iter().chain(CATALOGUE[5].examples) {
            assert!(solve_request(&OdeRequest::new(ex.equation)).is_ok(), "{}", ex.equation);
        }
    }
}
