use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::{OptionKind, SuccessRule};

/// A value in an engine option table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl OptionValue {
    /// Returns the kind of this value.
    #[must_use]
    pub fn kind(&self) -> OptionKind {
        match self {
            Self::Bool(_) => OptionKind::Bool,
            Self::Int(_) => OptionKind::Int,
            Self::Float(_) => OptionKind::Float,
            Self::Str(_) => OptionKind::Str,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Bool(_) | Self::Str(_) => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

/// User-facing configuration for a [`Driver`](crate::Driver).
///
/// Every field has a default, so a config file only needs the fields it
/// changes:
///
/// ```toml
/// optimizer = "IPOPT"
/// title = "Wing sizing"
///
/// [options]
/// max_iter = 200
/// tol = 1e-8
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Name of the engine to run; see [`EngineKind`](crate::EngineKind).
    pub optimizer: String,

    /// Title of the run, passed to the engine.
    pub title: String,

    /// Log the engine's solution when it returns.
    pub print_results: bool,

    /// Let the engine finite-difference the functions itself instead of
    /// calling the gradient callback.
    pub engine_finite_difference: bool,

    /// Engine-specific options, validated against the engine's recognized keys.
    pub options: BTreeMap<String, OptionValue>,

    /// Overrides the engine's default exit-status table.
    pub success_codes: Option<SuccessRule>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            optimizer: "SNOPT".into(),
            title: "Optimization using an external engine".into(),
            print_results: true,
            engine_finite_difference: false,
            options: BTreeMap::new(),
            success_codes: None,
        }
    }
}

impl DriverConfig {
    /// Creates the default config for the named engine.
    #[must_use]
    pub fn for_optimizer(name: impl Into<String>) -> Self {
        Self {
            optimizer: name.into(),
            ..Self::default()
        }
    }

    /// Sets the run title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets one engine option.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Lets the engine approximate gradients by finite differences.
    #[must_use]
    pub fn engine_finite_difference(mut self, enabled: bool) -> Self {
        self.engine_finite_difference = enabled;
        self
    }

    /// Enables or disables logging of the final solution.
    #[must_use]
    pub fn print_results(mut self, enabled: bool) -> Self {
        self.print_results = enabled;
        self
    }

    /// Overrides the exit-status table.
    #[must_use]
    pub fn success_codes(mut self, rule: SuccessRule) -> Self {
        self.success_codes = Some(rule);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_snopt_with_callback_gradients() {
        let config = DriverConfig::default();

        assert_eq!(config.optimizer, "SNOPT");
        assert!(config.print_results);
        assert!(!config.engine_finite_difference);
        assert!(config.options.is_empty());
    }

    #[test]
    fn loads_partial_toml() {
        let text = r#"
            optimizer = "IPOPT"
            title = "Wing sizing"
            success_codes = { one_of = [0, 1, 6] }

            [options]
            max_iter = 200
            tol = 1e-8
            mu_strategy = "adaptive"
        "#;

        let config: DriverConfig = toml::from_str(text).expect("config should parse");

        assert_eq!(config.optimizer, "IPOPT");
        assert_eq!(config.title, "Wing sizing");
        assert!(config.print_results);
        assert_eq!(config.options["max_iter"], OptionValue::Int(200));
        assert_eq!(config.options["tol"], OptionValue::Float(1e-8));
        assert_eq!(config.options["mu_strategy"], OptionValue::from("adaptive"));
        assert_eq!(config.success_codes, Some(SuccessRule::OneOf(vec![0, 1, 6])));
    }

    #[test]
    fn builder_sets_options() {
        let config = DriverConfig::for_optimizer("SLSQP")
            .title("demo")
            .option("MAXIT", 50_i64)
            .option("ACC", 1e-9)
            .print_results(false);

        assert_eq!(config.options.len(), 2);
        assert_eq!(config.options["ACC"].as_f64(), Some(1e-9));
        assert!(!config.print_results);
    }
}
