//! Checks at the request boundary, before any symbolic work.

use std::sync::LazyLock;

use regex::Regex;

use crate::ode::error::ValidationError;
use crate::symbolic::symbol_table::{VariableBinding, is_reserved};

pub const MAX_EQUATION_LEN: usize = 350;
pub const MAX_CONDITION_LEN: usize = 60;
const MAX_VARIABLE_LEN: usize = 16;

static ALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-zA-Z+\-*/^=().,\s\[\]√']+$").unwrap());
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap());

/// Trimmed, non-empty, at most 350 characters from the allowed set.
pub fn validate_equation(raw: &str) -> Result<&str, ValidationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ValidationError::Empty);
    }
    let len = text.chars().count();
    if len > MAX_EQUATION_LEN {
        return Err(ValidationError::TooLong {
            len,
            max: MAX_EQUATION_LEN,
        });
    }
    if !ALLOWED.is_match(text) {
        let mut chars: Vec<char> = text
            .chars()
            .filter(|c| !ALLOWED.is_match(&c.to_string()))
            .collect();
        chars.dedup();
        return Err(ValidationError::DisallowedCharacters {
            chars: chars.into_iter().collect(),
        });
    }
    Ok(text)
}

/// Every condition trimmed, containing `=` and at most 60 characters long.
pub fn validate_conditions(conditions: &[String]) -> Result<Vec<String>, ValidationError> {
    conditions
        .iter()
        .map(|c| {
            let c = c.trim();
            if !c.contains('=') {
                return Err(ValidationError::ConditionWithoutEquals(c.to_string()));
            }
            if c.chars().count() > MAX_CONDITION_LEN {
                return Err(ValidationError::ConditionTooLong {
                    condition: c.to_string(),
                    max: MAX_CONDITION_LEN,
                });
            }
            Ok(c.to_string())
        })
        .collect()
}

fn validate_variable(name: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidVariable {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if !IDENTIFIER.is_match(name) {
        return Err(invalid("must start with a letter and contain only letters, digits and '_'"));
    }
    if name.len() > MAX_VARIABLE_LEN {
        return Err(invalid("longer than 16 characters"));
    }
    if is_reserved(name) {
        return Err(invalid("it is the name of a built-in function"));
    }
    Ok(())
}

/// Both names are identifiers, differ from each other and from the built-in function names.
pub fn validate_bindings(bindings: &VariableBinding) -> Result<(), ValidationError> {
    validate_variable(&bindings.independent)?;
    validate_variable(&bindings.dependent)?;
    if bindings.independent == bindings.dependent {
        return Err(ValidationError::InvalidVariable {
            name: bindings.dependent.clone(),
            reason: "the dependent and independent variables must differ".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equation_length_boundary() {
        let ok = format!("y' = {}", "x".repeat(MAX_EQUATION_LEN - 5));
        assert_eq!(ok.chars().count(), 350);
        assert!(validate_equation(&ok).is_ok());
        let long = format!("{}x", ok);
        assert_eq!(
            validate_equation(&long),
            Err(ValidationError::TooLong { len: 351, max: 350 })
        );
    }

    #[test]
    fn test_equation_rules() {
        assert_eq!(validate_equation("   "), Err(ValidationError::Empty));
        assert_eq!(validate_equation("  y' = √x  "), Ok("y' = √x"));
        assert_eq!(
            validate_equation("y' = x; rm"),
            Err(ValidationError::DisallowedCharacters { chars: ";".to_string() })
        );
        assert!(validate_equation("d²y/dx² = 0").is_err());
    }

    #[test]
    fn test_conditions() {
        let ok = vec![" y(0)=2 ".to_string(), "y'(0) = 1".to_string()];
        assert_eq!(validate_conditions(&ok).unwrap(), vec!["y(0)=2", "y'(0) = 1"]);
        assert_eq!(
            validate_conditions(&["y(0)".to_string()]),
            Err(ValidationError::ConditionWithoutEquals("y(0)".to_string()))
        );
        let sixty = format!("y(0)={}", "1".repeat(55));
        assert_eq!(sixty.len(), 60);
        assert!(validate_conditions(&[sixty.clone()]).is_ok());
        assert!(matches!(
            validate_conditions(&[format!("{}1", sixty)]),
            Err(ValidationError::ConditionTooLong { .. })
        ));
    }

    #[test]
    fn test_bindings() {
        assert!(validate_bindings(&VariableBinding::default()).is_ok());
        assert!(validate_bindings(&VariableBinding::new("t", "u")).is_ok());
        assert!(validate_bindings(&VariableBinding::new("x", "x")).is_err());
        assert!(validate_bindings(&VariableBinding::new("sin", "y")).is_err());
        assert!(validate_bindings(&VariableBinding::new("1x", "y")).is_err());
    }
}
