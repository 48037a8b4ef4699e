//! String-level rewriting of informal notation into the canonical form the parser reads.
//!
//! Rules, applied in this order:
//! 1. whitespace runs collapse to one space
//! 2. the root glyph becomes `sqrt`; `√x` gets its parentheses synthesized
//! 3. primes on the dependent variable (`y'''`, `y''`, `y'`) become `Derivative(y(x), x, n)`
//! 4. Leibniz forms (`dy/dx`, `d2y/dx2`, `d²y/dx²`, `d3y/dx3`, `d³y/dx³`) become the same markers
//! 5. `e^(...)`, `e^u`, `e**(...)`, `e**u` become `exp(...)` unless a bound variable is called `e`,
//!    then `^` becomes `**`
//!
//! A bare `y` is left alone: the parser binds it to `y(x)`.
//! The function never fails and is idempotent.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::symbolic::symbol_table::VariableBinding;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static E_PAREN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\be\s*(\*\*|\^)\s*\(").unwrap());
static E_IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\be\s*(\*\*|\^)\s*([A-Za-z0-9_.]+)").unwrap());

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `Derivative(y(x), x)` or `Derivative(y(x), x, n)`
pub fn derivative_marker(dep: &str, indep: &str, order: usize) -> String {
    if order == 1 {
        format!("Derivative({}({}), {})", dep, indep, indep)
    } else {
        format!("Derivative({}({}), {}, {})", dep, indep, indep, order)
    }
}

pub fn normalize(raw: &str, bindings: &VariableBinding) -> String {
    let dep = bindings.dependent.as_str();
    let indep = bindings.independent.as_str();
    let s = WHITESPACE.replace_all(raw, " ").trim().to_string();
    let s = replace_root_glyph(&s);
    let s = replace_primes(&s, dep, indep);
    let s = replace_leibniz(&s, dep, indep);
    replace_powers(&s, bindings)
}

fn replace_root_glyph(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '√' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        out.push_str("sqrt");
        i += 1;
        let mut j = i;
        while j < chars.len() && chars[j] == ' ' {
            j += 1;
        }
        if j < chars.len() && (is_ident_char(chars[j]) || chars[j] == '.') {
            let start = j;
            while j < chars.len() && (is_ident_char(chars[j]) || chars[j] == '.') {
                j += 1;
            }
            out.push('(');
            out.extend(&chars[start..j]);
            out.push(')');
            i = j;
        }
    }
    out
}

/// Identifier-run scanner: only whole identifiers equal to the dependent variable take primes.
fn replace_primes(s: &str, dep: &str, indep: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_digit() || chars[i] == '.' {
            // number literal, a following identifier is an implicit factor
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                out.push(chars[i]);
                i += 1;
            }
            continue;
        }
        if !is_ident_char(chars[i]) {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && is_ident_char(chars[i]) {
            i += 1;
        }
        let ident: String = chars[start..i].iter().collect();
        let mut primes = 0;
        while i + primes < chars.len() && chars[i + primes] == '\'' {
            primes += 1;
        }
        if ident != dep || primes == 0 {
            out.push_str(&ident);
            continue;
        }
        i += primes;
        // y'(x) is the same as y'
        let applied: Vec<char> = format!("({})", indep).chars().collect();
        if chars.len() >= i + applied.len() && chars[i..i + applied.len()] == applied[..] {
            i += applied.len();
        }
        out.push_str(&derivative_marker(dep, indep, primes));
    }
    out
}

fn leibniz_order(token: &str) -> Option<usize> {
    match token.trim_start_matches('^') {
        "" => Some(1),
        "²" => Some(2),
        "³" => Some(3),
        digits => digits.parse().ok().filter(|n| *n >= 1),
    }
}

fn replace_leibniz(s: &str, dep: &str, indep: &str) -> String {
    let pattern = format!(
        r"d(\^?[1-9²³]?){}\s*/\s*d\s*{}(\^?[1-9²³]?)",
        regex::escape(dep),
        regex::escape(indep)
    );
    let Ok(re) = Regex::new(&pattern) else {
        return s.to_string();
    };
    re.replace_all(s, |caps: &Captures| {
        let whole = &caps[0];
        let (start, end) = caps.get(0).map_or((0, 0), |m| (m.start(), m.end()));
        let before_ok = !s[..start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let after_ok = !s[end..].chars().next().is_some_and(is_ident_char);
        match (leibniz_order(&caps[1]), leibniz_order(&caps[2])) {
            (Some(n), Some(m)) if n == m && before_ok && after_ok => derivative_marker(dep, indep, n),
            _ => whole.to_string(),
        }
    })
    .into_owned()
}

fn replace_powers(s: &str, bindings: &VariableBinding) -> String {
    let e_is_bound = bindings.dependent == "e" || bindings.independent == "e";
    let s = if e_is_bound {
        s.to_string()
    } else {
        let s = E_PAREN.replace_all(s, "exp(");
        E_IDENT.replace_all(&s, "exp($2)").into_owned()
    };
    s.replace('^', "**")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> String {
        normalize(s, &VariableBinding::default())
    }

    #[test]
    fn test_primes_longest_first() {
        let third = norm("y'''");
        assert!(!third.contains('\''));
        assert_eq!(third, "Derivative(y(x), x, 3)");
        assert_ne!(third, norm("y''"));
        assert_ne!(third, norm("y'"));
        assert_eq!(norm("y'' + y = 0"), "Derivative(y(x), x, 2) + y = 0");
        assert_eq!(norm("y'(x) = y"), "Derivative(y(x), x) = y");
    }

    #[test]
    fn test_identifiers_containing_the_letter_untouched() {
        assert_eq!(norm("exp(y)"), "exp(y)");
        assert_eq!(norm("yy' = 1"), "yy' = 1");
        assert_eq!(norm("3y' = y"), "3Derivative(y(x), x) = y");
    }

    #[test]
    fn test_leibniz_forms() {
        assert_eq!(norm("dy/dx = x*y"), "Derivative(y(x), x) = x*y");
        assert_eq!(norm("d2y/dx2 + y = 0"), "Derivative(y(x), x, 2) + y = 0");
        assert_eq!(norm("d²y/dx² + y = 0"), "Derivative(y(x), x, 2) + y = 0");
        assert_eq!(norm("d³y/dx³ = 0"), "Derivative(y(x), x, 3) = 0");
        assert_eq!(norm("d3y/dx3 = 0"), "Derivative(y(x), x, 3) = 0");
        assert_eq!(norm("d2y/dx3"), "d2y/dx3");
    }

    #[test]
    fn test_whitespace_and_root() {
        assert_eq!(norm("  y'  =   x  "), "Derivative(y(x), x) = x");
        assert_eq!(norm("√x + √(x+1)"), "sqrt(x) + sqrt(x+1)");
        assert_eq!(norm("√ 2"), "sqrt(2)");
    }

    #[test]
    fn test_euler_and_caret() {
        assert_eq!(norm("e^(2x) + e^x"), "exp(2x) + exp(x)");
        assert_eq!(norm("e**x"), "exp(x)");
        assert_eq!(norm("x^2"), "x**2");
        assert_eq!(norm("e^-x"), "e**-x");
        let bound = VariableBinding::new("t", "e");
        assert_eq!(normalize("e' = e^2", &bound), "Derivative(e(t), t) = e**2");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "y''' - 3y'' + 3y' - y = 0",
            "dy/dx = e^(x) * √x",
            "d²y/dx² + 4*y = sin(x)^2",
            "y' + y/x = x^2",
            "exp(y) = y'",
            "(2*x + y) + (x + 2*y)*y' = 0",
        ];
        for s in inputs {
            let once = norm(s);
            assert_eq!(norm(&once), once, "not idempotent for {}", s);
        }
    }
}
