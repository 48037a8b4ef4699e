use crate::symbolic::symbolic_engine::Expr;
use std::collections::HashMap;
//___________________________________TESTS____________________________________

fn env(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn eval_at(e: &Expr, x: f64) -> f64 {
    e.eval_expression(&env(&[("x", x)])).unwrap()
}

mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_diff_eval() {
        let f = Expr::parse_expression("x^2*exp(x)").unwrap();
        let df = f.diff("x").simplify();
        for x in [0.0, 0.7, -1.3] {
            assert_relative_eq!(eval_at(&df, x), (2.0 * x + x * x) * x.exp(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_implicit_multiplication_and_functions() {
        let f = Expr::parse_expression("2x sin(x) + 3cos(2x)").unwrap();
        let x: f64 = 0.4;
        assert_relative_eq!(
            eval_at(&f, x),
            2.0 * x * x.sin() + 3.0 * (2.0 * x).cos(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_n_th_derivative() {
        let f = Expr::parse_expression("sin(2*x)").unwrap();
        let third = f.n_th_derivative1D("x", 3);
        for x in [0.1, 1.0] {
            assert_relative_eq!(eval_at(&third, x), -8.0 * (2.0 * x).cos(), epsilon = 1e-12);
        }
        assert_eq!(f.n_th_derivative1D("x", 0), f.simplify());
    }

    #[test]
    fn test_partial_derivatives() {
        let x = Expr::var("x");
        let a = Expr::var("a");
        let f = x.clone() * a.clone().pow(Expr::Const(2.0)) + a.exp();
        let grads = f.diff_multi_args(&["x", "a"]);
        let point = env(&[("x", 1.5), ("a", 0.5)]);
        assert_relative_eq!(grads[0].eval_expression(&point).unwrap(), 0.25, epsilon = 1e-12);
        assert_relative_eq!(
            grads[1].eval_expression(&point).unwrap(),
            2.0 * 1.5 * 0.5 + 0.5f64.exp(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_integrate_parsed_expressions() {
        for input in ["x*exp(x)", "1/(x^2 + 1)", "x*sin(x)", "ln(x)", "exp(-x)*cos(x)"] {
            let f = Expr::parse_expression(input).unwrap();
            let big_f = f.integrate("x").unwrap();
            assert!(
                (big_f.diff("x") - f).is_identically_zero(),
                "wrong antiderivative of {}",
                input
            );
        }
    }

    #[test]
    fn test_simplify_keeps_value() {
        let f = Expr::parse_expression("(x + 1)^2 - (x - 1)^2 - 4*x").unwrap();
        assert!(f.expand().is_zero());
        let g = Expr::parse_expression("exp(x)*exp(2*x)/exp(3*x)").unwrap();
        assert_relative_eq!(eval_at(&g.simplify(), 0.8), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unknown_function_in_plain_form() {
        let e = Expr::parse_expression("y + x*Derivative(y(x), x)").unwrap();
        let plain = e.to_plain();
        let vars = plain.extract_variables();
        assert!(vars.contains(&"y".to_string()) && vars.contains(&"y'".to_string()));
        assert_eq!(plain.from_plain("y", "x"), e);
    }
}
