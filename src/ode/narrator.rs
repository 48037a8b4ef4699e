//! Step-by-step narrative of a solved equation.
//!
//! Five sections: the classification (first three patterns), the standard form, the method, the
//! general solution and the integration constants. The method section is chosen from the primary
//! pattern and filled with its data (`P(x)`, `Q(x)`, `n`, `M`, `N`, `F(v)`, the characteristic
//! polynomial and its roots, the forcing term).

use std::fmt::Write;

use crate::ode::builder::SymbolicEquation;
use crate::ode::classifier::{OdeClass, explicit_first_order, linear_constant_coefficients};
use crate::ode::formatter::{derivative_name, format_equation, format_expr, format_solution};
use crate::ode::solvers::SolutionExpression;
use crate::ode::solvers::constant_coeff::{Family, characteristic_families};
use crate::symbolic::symbol_table::VariableBinding;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::format_number;

const RULE: &str = "────────────────────────────────────────────────────────────";

fn section(out: &mut String, title: &str) {
    out.push_str(title);
    out.push('\n');
    out.push_str(RULE);
    out.push('\n');
}

/// `a_n·t_n + ... + a_0·t_0` with the signs pulled out; `term(k)` is `None` for a bare number.
fn signed_sum(coeffs: &[f64], term: impl Fn(usize) -> Option<String>) -> String {
    let mut out = String::new();
    for (k, c) in coeffs.iter().enumerate().rev() {
        if c.abs() < 1e-12 {
            continue;
        }
        let magnitude = c.abs();
        let body = match term(k) {
            None => format_number(magnitude),
            Some(t) if (magnitude - 1.0).abs() < 1e-12 => t,
            Some(t) => format!("{}·{}", format_number(magnitude), t),
        };
        match (out.is_empty(), *c < 0.0) {
            (true, true) => out.push('-'),
            (true, false) => {}
            (false, true) => out.push_str(" - "),
            (false, false) => out.push_str(" + "),
        }
        out.push_str(&body);
    }
    if out.is_empty() { "0".to_string() } else { out }
}

fn characteristic_text(coeffs: &[f64]) -> String {
    signed_sum(coeffs, |k| match k {
        0 => None,
        1 => Some("r".to_string()),
        k => Some(format!("r^{}", k)),
    })
}

fn root_text(family: &Family) -> String {
    let value = if family.freq == 0.0 {
        format!("r = {}", format_number(family.rate))
    } else {
        format!(
            "r = {} ± {}·i",
            format_number(family.rate),
            format_number(family.freq)
        )
    };
    if family.multiplicity > 1 {
        format!("{} (multiplicity {})", value, family.multiplicity)
    } else {
        value
    }
}

/// `y' = f(x, y)` for first order, `Σ a_k·y^(k) = g(x)` for constant coefficients, the equation
/// itself otherwise.
fn standard_form(eq: &SymbolicEquation) -> String {
    let (x, y) = (eq.independent(), eq.dependent());
    if eq.order() == 1 {
        if let Some(f) = explicit_first_order(eq) {
            return format!("{} = {}", derivative_name(y, 1), format_expr(&f));
        }
    }
    if let Some((coeffs, forcing)) = linear_constant_coefficients(eq) {
        let lhs = signed_sum(&coeffs, |k| Some(derivative_name(y, k)));
        return format!("{} = {}", lhs, format_expr(&forcing.from_plain(y, x)));
    }
    format_equation(eq)
}

fn method_lines(class: Option<&OdeClass>, x: &str, y: &str) -> Vec<String> {
    let f = |e: &Expr| format_expr(e);
    match class {
        Some(OdeClass::Separable { g, h }) => vec![
            "Method: separation of variables".to_string(),
            format!("The equation has the form d{y}/d{x} = g({x})·h({y}) with"),
            format!("  g({x}) = {}", f(g)),
            format!("  h({y}) = {}", f(h)),
            "Steps:".to_string(),
            format!("  1. Separate the variables: d{y}/h({y}) = g({x}) d{x}"),
            format!("  2. Integrate both sides: ∫ d{y}/h({y}) = ∫ g({x}) d{x} + C"),
            format!("  3. Solve for {y} where possible"),
        ],
        Some(OdeClass::FirstLinear { p, q }) => vec![
            "Method: first-order linear equation".to_string(),
            format!("Standard form: d{y}/d{x} + P({x})·{y} = Q({x}) with"),
            format!("  P({x}) = {}", f(p)),
            format!("  Q({x}) = {}", f(q)),
            "Steps:".to_string(),
            format!("  1. Integrating factor: μ({x}) = exp(∫ P({x}) d{x})"),
            format!("  2. Multiply the equation by μ({x}): d/d{x}[μ({x})·{y}] = μ({x})·Q({x})"),
            format!("  3. Integrate: μ({x})·{y} = ∫ μ({x})·Q({x}) d{x} + C"),
            format!("  4. Solve for {y}: {y} = [∫ μ({x})·Q({x}) d{x} + C]/μ({x})"),
        ],
        Some(OdeClass::Bernoulli { p, q, n }) => {
            let k = format_number(1.0 - n);
            vec![
                "Method: Bernoulli equation".to_string(),
                format!("Form: d{y}/d{x} + P({x})·{y} = Q({x})·{y}^n with"),
                format!("  P({x}) = {}", f(p)),
                format!("  Q({x}) = {}", f(q)),
                format!("  n = {}", format_number(*n)),
                "Steps:".to_string(),
                format!("  1. Divide by {y}^n and substitute v = {y}^(1-n) = {y}^({k})"),
                format!("  2. Differentiate: dv/d{x} = (1-n)·{y}^(-n)·d{y}/d{x}"),
                format!("  3. Linear equation in v: dv/d{x} + ({k})·P({x})·v = ({k})·Q({x})"),
                "  4. Solve for v with an integrating factor".to_string(),
                format!("  5. Return to {y}: {y} = v^(1/({k}))"),
            ]
        }
        Some(OdeClass::FirstExact { m, n }) => vec![
            "Method: exact equation".to_string(),
            format!("Form: M({x},{y}) d{x} + N({x},{y}) d{y} = 0 with"),
            format!("  M = {}", f(m)),
            format!("  N = {}", f(n)),
            "Steps:".to_string(),
            format!("  1. Exactness: ∂M/∂{y} = {} = ∂N/∂{x}", f(&m.diff(y).simplify())),
            format!("  2. Find F({x},{y}) with ∂F/∂{x} = M and ∂F/∂{y} = N"),
            format!("  3. Integrate: F = ∫ M d{x} + g({y})"),
            format!("  4. Differentiate with respect to {y} and compare with N to find g({y})"),
            format!("  5. Implicit solution: F({x},{y}) = C"),
        ],
        Some(OdeClass::FirstHomogeneousCoeff { f: rhs }) => vec![
            "Method: homogeneous coefficients".to_string(),
            format!("The equation has the form d{y}/d{x} = F({y}/{x}) with"),
            format!("  F = {}", f(rhs)),
            "Steps:".to_string(),
            format!("  1. Substitute v = {y}/{x}, so {y} = v·{x}"),
            format!("  2. Differentiate: d{y}/d{x} = v + {x}·dv/d{x}"),
            format!("  3. Separate: dv/(F(v) - v) = d{x}/{x}"),
            "  4. Integrate both sides".to_string(),
            format!("  5. Return to {y}: {y} = v·{x}"),
        ],
        Some(
            OdeClass::ConstCoeffHomogeneous { coeffs }
            | OdeClass::UndeterminedCoefficients { coeffs, .. }
            | OdeClass::VariationOfParameters { coeffs, .. },
        ) => constant_coefficient_lines(class, coeffs, x),
        None => vec![
            "Method: automatic".to_string(),
            "The equation was solved by the general method of the solver.".to_string(),
        ],
    }
}

fn constant_coefficient_lines(class: Option<&OdeClass>, coeffs: &[f64], x: &str) -> Vec<String> {
    let families = characteristic_families(coeffs);
    let mut lines = vec![
        "Method: linear equation with constant coefficients".to_string(),
        "Steps:".to_string(),
        format!("  1. Characteristic equation: {} = 0", characteristic_text(coeffs)),
        "  2. Roots:".to_string(),
    ];
    lines.extend(families.iter().map(|fam| format!("       {}", root_text(fam))));
    lines.push("  3. Build the solution from the kind of roots:".to_string());
    if families.iter().all(|fam| fam.freq == 0.0 && fam.multiplicity == 1) {
        lines.push(format!("     • distinct real roots: y = Σ C_i·e^(r_i·{x})"));
    }
    if families.iter().any(|fam| fam.multiplicity > 1) {
        lines.push(format!(
            "     • root repeated m times: y = (C_1 + C_2·{x} + ... + C_m·{x}^(m-1))·e^(r·{x})"
        ));
    }
    if families.iter().any(|fam| fam.freq != 0.0) {
        lines.push(format!(
            "     • complex roots α ± β·i: y = e^(α·{x})·[C_1·sin(β·{x}) + C_2·cos(β·{x})]"
        ));
    }
    match class {
        Some(OdeClass::UndeterminedCoefficients { forcing, .. }) => {
            lines.push(format!("  4. Forcing term g({x}) = {}", format_expr(forcing)));
            lines.push(
                "     Particular solution by undetermined coefficients: a trial function of the form of g, \
                 multiplied by a power of the variable where it resonates with a root"
                    .to_string(),
            );
            lines.push("  5. General solution = homogeneous solution + particular solution".to_string());
        }
        Some(OdeClass::VariationOfParameters { forcing, .. }) => {
            lines.push(format!("  4. Forcing term g({x}) = {}", format_expr(forcing)));
            lines.push(
                "     Particular solution by variation of parameters: y_p = Σ u_i·φ_i with u_i' = W_i/W"
                    .to_string(),
            );
            lines.push("  5. General solution = homogeneous solution + particular solution".to_string());
        }
        _ => {}
    }
    lines
}

/// Narrative of `solution`. Never fails: missing pieces are skipped.
pub fn narrate(
    eq: &SymbolicEquation,
    solution: &SolutionExpression,
    classes: &[OdeClass],
    bindings: &VariableBinding,
) -> String {
    let (x, y) = (bindings.independent.as_str(), bindings.dependent.as_str());
    let mut out = String::new();

    section(&mut out, "STEP 1: Classification of the equation");
    if classes.is_empty() {
        out.push_str("No standard pattern was recognized.\n");
    } else {
        out.push_str("This equation can be solved as:\n");
        for (i, class) in classes.iter().take(3).enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, class.method().title());
        }
    }
    out.push('\n');

    section(&mut out, "STEP 2: Standard form");
    let _ = writeln!(out, "{}\n", standard_form(eq));

    section(&mut out, "STEP 3: Method");
    for line in method_lines(classes.first(), x, y) {
        out.push_str(&line);
        out.push('\n');
    }
    out.push('\n');

    section(&mut out, "STEP 4: General solution");
    let _ = writeln!(out, "{}\n", format_solution(solution));

    section(&mut out, "STEP 5: Integration constants");
    let constants = solution.constants(bindings);
    if constants.is_empty() {
        out.push_str("This is a particular solution (no arbitrary constants).\n");
    } else {
        let _ = writeln!(
            out,
            "The solution contains {} integration constant(s): {}",
            constants.len(),
            constants.join(", ")
        );
        for c in &constants {
            let _ = writeln!(out, "  • {}: determined by initial conditions", c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ode::builder::build;
    use crate::ode::classifier::classify;
    use crate::ode::normalizer::normalize;
    use crate::ode::solvers::SolutionEq;

    fn narrate_raw(raw: &str, solution: Expr) -> String {
        let bindings = VariableBinding::default();
        let eq = build(&normalize(raw, &bindings), &bindings).unwrap();
        let classes = classify(&eq);
        let solution = SolutionExpression::Single(SolutionEq::explicit("y", "x", solution));
        narrate(&eq, &solution, &classes, &bindings)
    }

    #[test]
    fn test_sections_in_order() {
        let text = narrate_raw("y' = x*y", Expr::var("C1") * Expr::var("x").exp());
        let positions: Vec<usize> = ["STEP 1", "STEP 2", "STEP 3", "STEP 4", "STEP 5"]
            .iter()
            .map(|s| text.find(s).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(text.contains("Method: separation of variables"));
        assert!(text.contains("1 integration constant(s): C1"));
    }

    #[test]
    fn test_linear_template_shows_p_and_q() {
        let text = narrate_raw("y' + 2*y = x", Expr::var("C1"));
        assert!(text.contains("Method: first-order linear equation"));
        assert!(text.contains("P(x) = 2"));
        assert!(text.contains("Q(x) = x"));
    }

    #[test]
    fn test_constant_coefficients_template() {
        let text = narrate_raw("y'' - 5*y' + 6*y = 0", Expr::var("C1") + Expr::var("C2"));
        assert!(text.contains("Characteristic equation: r^2 - 5·r + 6 = 0"));
        assert!(text.contains("r = 2"));
        assert!(text.contains("r = 3"));
        assert!(text.contains("distinct real roots"));
        assert!(text.contains("y'' - 5·y' + 6·y = 0"));
        let text = narrate_raw("y'' + 4*y = 0", Expr::var("C1"));
        assert!(text.contains("r = 0 ± 2·i"));
        assert!(text.contains("complex roots"));
    }

    #[test]
    fn test_particular_solution_statement() {
        let text = narrate_raw("y' = x*y", Expr::Const(2.0) * Expr::var("x").exp());
        assert!(text.contains("This is a particular solution (no arbitrary constants)."));
    }

    #[test]
    fn test_unclassified_equation_gets_generic_method() {
        let text = narrate_raw("y'' + y*y' = 0", Expr::var("C1"));
        assert!(text.contains("No standard pattern was recognized."));
        assert!(text.contains("Method: automatic"));
    }
}
