//! Calculator settings read from a TOML file.
//!
//! ```toml
//! [variables]
//! independent = "t"
//! dependent = "u"
//!
//! [solver]
//! method = "automatic"
//! timeout_secs = 30
//!
//! [output]
//! show_steps = true
//! verify = true
//! max_tags = 3
//!
//! [logging]
//! level = "info"
//! file = "odesolve.log"
//! ```
//! Every key is optional.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ode::pipeline::OdeRequest;
use crate::symbolic::symbol_table::VariableBinding;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariablesSection {
    pub independent: String,
    pub dependent: String,
}

impl Default for VariablesSection {
    fn default() -> Self {
        let bindings = VariableBinding::default();
        VariablesSection {
            independent: bindings.independent,
            dependent: bindings.dependent,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSection {
    pub method: String,
    pub timeout_secs: u64,
}

impl Default for SolverSection {
    fn default() -> Self {
        SolverSection {
            method: "automatic".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub show_steps: bool,
    pub verify: bool,
    pub max_tags: usize,
}

impl Default for OutputSection {
    fn default() -> Self {
        OutputSection {
            show_steps: true,
            verify: true,
            max_tags: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    /// no file logging when absent
    pub file: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        LoggingSection {
            level: "warn".to_string(),
            file: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalculatorConfig {
    pub variables: VariablesSection,
    pub solver: SolverSection,
    pub output: OutputSection,
    pub logging: LoggingSection,
}

impl CalculatorConfig {
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("invalid configuration: {}", e))
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        Self::from_toml(&content)
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, content).map_err(|e| format!("cannot write {}: {}", path.display(), e))
    }

    pub fn bindings(&self) -> VariableBinding {
        VariableBinding::new(&self.variables.independent, &self.variables.dependent)
    }

    /// Request for `equation` with these settings.
    pub fn request(&self, equation: &str) -> OdeRequest {
        let mut request = OdeRequest::new(equation).with_bindings(self.bindings());
        if !self.solver.method.trim().is_empty() {
            request.method = Some(self.solver.method.clone());
        }
        request.show_steps = self.output.show_steps;
        request.verify = self.output.verify;
        request.max_tags = self.output.max_tags;
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_keys_take_defaults() {
        let config = CalculatorConfig::from_toml("[variables]\nindependent = \"t\"\n").unwrap();
        assert_eq!(config.variables.independent, "t");
        assert_eq!(config.variables.dependent, "y");
        assert_eq!(config.solver, SolverSection::default());
        assert_eq!(CalculatorConfig::from_toml("").unwrap(), CalculatorConfig::default());
    }

    #[test]
    fn test_wrong_type_is_reported() {
        let err = CalculatorConfig::from_toml("[output]\nmax_tags = \"three\"\n").unwrap_err();
        assert!(err.starts_with("invalid configuration"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[solver]\nmethod = \"separable\"\ntimeout_secs = 5\n\n[output]\nshow_steps = false"
        )
        .unwrap();
        let config = CalculatorConfig::load(file.path()).unwrap();
        assert_eq!(config.solver.timeout_secs, 5);
        let request = config.request("y' = x*y");
        assert_eq!(request.method.as_deref(), Some("separable"));
        assert!(!request.show_steps);
        assert!(request.verify);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odesolve.toml");
        let mut config = CalculatorConfig::default();
        config.variables.dependent = "u".to_string();
        config.logging.file = Some("run.log".to_string());
        config.save(&path).unwrap();
        assert_eq!(CalculatorConfig::load(&path).unwrap(), config);
        assert!(CalculatorConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
