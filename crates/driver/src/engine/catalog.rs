use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::OptionValue;
use crate::error::Error;

/// The engines a driver knows how to configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EngineKind {
    Snopt,
    Ipopt,
    Slsqp,
    Conmin,
}

/// Type expected by an engine option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    Int,
    Float,
    Str,
}

impl OptionKind {
    /// Returns `true` if a value of this kind is acceptable.
    ///
    /// Float options also take integers.
    #[must_use]
    pub fn accepts(self, value: &OptionValue) -> bool {
        match (self, value.kind()) {
            (Self::Float, OptionKind::Int) => true,
            (expected, actual) => expected == actual,
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bool => "boolean",
            Self::Int => "integer",
            Self::Float => "float",
            Self::Str => "string",
        })
    }
}

/// Which engine inform codes count as a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessRule {
    /// Codes up to and including this value succeed.
    AtMost(i64),

    /// Only these codes succeed.
    OneOf(Vec<i64>),
}

impl SuccessRule {
    /// Returns `true` if `inform` denotes success.
    #[must_use]
    pub fn is_success(&self, inform: i64) -> bool {
        match self {
            Self::AtMost(max) => inform <= *max,
            Self::OneOf(codes) => codes.contains(&inform),
        }
    }
}

const SNOPT_OPTIONS: &[(&str, OptionKind)] = &[
    ("Major iterations limit", OptionKind::Int),
    ("Minor iterations limit", OptionKind::Int),
    ("Iterations limit", OptionKind::Int),
    ("Major optimality tolerance", OptionKind::Float),
    ("Major feasibility tolerance", OptionKind::Float),
    ("Minor feasibility tolerance", OptionKind::Float),
    ("Major step limit", OptionKind::Float),
    ("Function precision", OptionKind::Float),
    ("Verify level", OptionKind::Int),
    ("Print file", OptionKind::Str),
    ("Summary file", OptionKind::Str),
];

const IPOPT_OPTIONS: &[(&str, OptionKind)] = &[
    ("max_iter", OptionKind::Int),
    ("tol", OptionKind::Float),
    ("acceptable_tol", OptionKind::Float),
    ("constr_viol_tol", OptionKind::Float),
    ("mu_strategy", OptionKind::Str),
    ("linear_solver", OptionKind::Str),
    ("print_level", OptionKind::Int),
    ("output_file", OptionKind::Str),
    ("derivative_test", OptionKind::Str),
];

const SLSQP_OPTIONS: &[(&str, OptionKind)] = &[
    ("ACC", OptionKind::Float),
    ("MAXIT", OptionKind::Int),
    ("IPRINT", OptionKind::Int),
    ("IFILE", OptionKind::Str),
];

const CONMIN_OPTIONS: &[(&str, OptionKind)] = &[
    ("ITMAX", OptionKind::Int),
    ("DELFUN", OptionKind::Float),
    ("DABFUN", OptionKind::Float),
    ("ITRM", OptionKind::Int),
    ("NFEASCT", OptionKind::Int),
    ("IPRINT", OptionKind::Int),
    ("IFILE", OptionKind::Str),
];

impl EngineKind {
    /// Every supported engine.
    pub const ALL: [Self; 4] = [Self::Snopt, Self::Ipopt, Self::Slsqp, Self::Conmin];

    /// Returns the canonical engine name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Snopt => "SNOPT",
            Self::Ipopt => "IPOPT",
            Self::Slsqp => "SLSQP",
            Self::Conmin => "CONMIN",
        }
    }

    /// Returns the option keys this engine recognizes and their types.
    #[must_use]
    pub fn recognized_options(self) -> &'static [(&'static str, OptionKind)] {
        match self {
            Self::Snopt => SNOPT_OPTIONS,
            Self::Ipopt => IPOPT_OPTIONS,
            Self::Slsqp => SLSQP_OPTIONS,
            Self::Conmin => CONMIN_OPTIONS,
        }
    }

    /// Returns the default table of successful inform codes.
    ///
    /// SNOPT reports success with codes 0 through 2 (optimal, feasible point,
    /// requested accuracy not achievable). IPOPT counts a solve to acceptable
    /// level as success.
    #[must_use]
    pub fn success_rule(self) -> SuccessRule {
        match self {
            Self::Snopt => SuccessRule::AtMost(2),
            Self::Ipopt => SuccessRule::OneOf(vec![0, 1]),
            Self::Slsqp | Self::Conmin => SuccessRule::OneOf(vec![0]),
        }
    }

    /// Checks user options against this engine's table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownOption`] for an unrecognized key and
    /// [`Error::InvalidOption`] for a value of the wrong type.
    pub fn validate_options(
        self,
        options: &BTreeMap<String, OptionValue>,
    ) -> Result<EngineOptions, Error> {
        for (key, value) in options {
            let Some(&(_, expected)) = self
                .recognized_options()
                .iter()
                .find(|(name, _)| *name == key.as_str())
            else {
                return Err(Error::UnknownOption {
                    engine: self,
                    key: key.clone(),
                });
            };

            if !expected.accepts(value) {
                return Err(Error::InvalidOption {
                    engine: self,
                    key: key.clone(),
                    expected,
                });
            }
        }

        Ok(EngineOptions(options.clone()))
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnsupportedOptimizer { name: s.to_owned() })
    }
}

/// Engine options that passed validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineOptions(BTreeMap<String, OptionValue>);

impl EngineOptions {
    /// Returns the value for `key`, if set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    /// Iterates over the options in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!("snopt".parse::<EngineKind>().unwrap(), EngineKind::Snopt);
        assert_eq!("Ipopt".parse::<EngineKind>().unwrap(), EngineKind::Ipopt);
        assert_eq!(" SLSQP ".parse::<EngineKind>().unwrap(), EngineKind::Slsqp);

        let err = "NSGA2".parse::<EngineKind>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedOptimizer { name } if name == "NSGA2"));
    }

    #[test]
    fn success_tables_differ_per_engine() {
        let snopt = EngineKind::Snopt.success_rule();
        assert!(snopt.is_success(0));
        assert!(snopt.is_success(2));
        assert!(!snopt.is_success(3));

        let ipopt = EngineKind::Ipopt.success_rule();
        assert!(ipopt.is_success(1));
        assert!(!ipopt.is_success(2));
        assert!(!ipopt.is_success(-1));

        assert!(!EngineKind::Slsqp.success_rule().is_success(1));
    }

    #[test]
    fn float_options_accept_integers() {
        let options = BTreeMap::from([
            ("tol".to_owned(), OptionValue::Int(0)),
            ("max_iter".to_owned(), OptionValue::Int(100)),
        ]);

        let validated = EngineKind::Ipopt.validate_options(&options).unwrap();

        assert_eq!(validated.len(), 2);
        assert_eq!(validated.get("max_iter"), Some(&OptionValue::Int(100)));
    }

    #[test]
    fn bad_options_are_rejected() {
        let unknown = BTreeMap::from([("max_iter".to_owned(), OptionValue::Int(5))]);
        let err = EngineKind::Snopt.validate_options(&unknown).unwrap_err();
        assert!(matches!(err, Error::UnknownOption { key, .. } if key == "max_iter"));

        let mistyped = BTreeMap::from([("MAXIT".to_owned(), OptionValue::Float(5.5))]);
        let err = EngineKind::Slsqp.validate_options(&mistyped).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidOption {
                expected: OptionKind::Int,
                ..
            }
        ));
    }
}
