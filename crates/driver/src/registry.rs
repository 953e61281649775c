use std::collections::{BTreeMap, BTreeSet};

use braid_core::{
    ConstraintFilter, ConstraintKind, Linearity, Mode, Response, SensitivityDict, System,
};
use ndarray::{Array1, Array2};
use thiserror::Error;

use crate::error::Error;

/// Errors raised while building an [`OptimizerSpec`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("`{0}` is registered more than once")]
    DuplicateName(String),

    #[error("`{name}` has {actual} entries but is declared with size {expected}")]
    SizeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("`{wrt}` is not a registered design variable of `{of}`")]
    UnknownDesignVar { of: String, wrt: String },

    #[error("the system returned no Jacobian block of linear constraint `{of}` with respect to `{wrt}`")]
    MissingLinearJacobian { of: String, wrt: String },

    #[error("objective `{0}` is declared linear, but only constraints carry a fixed Jacobian")]
    LinearObjective(String),
}

/// Design-variable type as an engine understands it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VarType {
    #[default]
    Continuous,
}

/// A design-variable group handed to an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct VarGroup {
    pub name: String,
    pub size: usize,
    pub kind: VarType,

    /// Initial value.
    pub value: Array1<f64>,
    pub lower: Array1<f64>,
    pub upper: Array1<f64>,
}

/// A constraint group handed to an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ConGroup {
    pub name: String,
    pub size: usize,
    pub kind: ConstraintKind,

    /// Lower bound, equal to `upper` for equality constraints.
    pub lower: Option<Array1<f64>>,

    /// Upper bound, equal to `lower` for equality constraints.
    pub upper: Option<Array1<f64>>,
    pub linear: bool,

    /// The design variables this constraint depends on, in registration order.
    pub wrt: Vec<String>,

    /// Fixed Jacobian blocks keyed by design variable, present only for
    /// linear constraints.
    ///
    /// The blocks are taken from one Jacobian over all registered design
    /// variables, then restricted to `wrt`. An engine reads a constraint's
    /// Jacobian through its sparsity pattern, so blocks outside `wrt` are
    /// structural zeros it never asks for.
    pub jac: Option<BTreeMap<String, Array2<f64>>>,
}

/// The declarative problem an engine is asked to solve.
///
/// Design variables keep the system's declaration order. Constraints are
/// registered equality first, then inequality, each in declaration order.
/// Every objective and constraint carries a sparsity pattern: the design
/// variables it is relevant to, restricted to those registered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimizerSpec {
    pub title: String,
    var_groups: Vec<VarGroup>,
    objectives: Vec<String>,
    con_groups: Vec<ConGroup>,
    sparsity: BTreeMap<String, Vec<String>>,
}

impl OptimizerSpec {
    /// Creates an empty problem.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Builds the problem from a system's declarations and current values.
    ///
    /// The Jacobian of every linear constraint is computed here, once, with
    /// respect to all registered design variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the system cannot report a value or Jacobian, or
    /// if its declarations are inconsistent. A linear objective is rejected
    /// with [`RegistryError::LinearObjective`].
    pub fn build<S: System>(system: &mut S, title: &str) -> Result<Self, Error> {
        let mut spec = Self::new(title);

        for dv in system.design_vars() {
            let value = system.param_value(dv.name()).map_err(Error::model)?;
            spec.add_var_group(VarGroup {
                name: dv.name().to_owned(),
                size: dv.size(),
                kind: VarType::Continuous,
                value,
                lower: dv.lower().clone(),
                upper: dv.upper().clone(),
            })?;
        }

        let objectives: Vec<(String, Vec<String>)> = {
            let system: &S = system;
            let mut objectives = Vec::new();
            for obj in system.objectives() {
                if obj.is_linear() {
                    return Err(RegistryError::LinearObjective(obj.name().to_owned()).into());
                }
                objectives.push((obj.name().to_owned(), spec.restrict(system, obj.name())));
            }
            objectives
        };
        for (name, wrt) in objectives {
            spec.add_objective(name, wrt)?;
        }

        let linear = spec.linear_jacobians(system)?;

        let ordered: Vec<Response> = {
            let system: &S = system;
            [ConstraintKind::Equality, ConstraintKind::Inequality]
                .into_iter()
                .flat_map(|kind| system.constraints(ConstraintFilter::all().kind(kind)))
                .cloned()
                .collect()
        };

        for con in ordered {
            let wrt = spec.restrict(&*system, con.name());
            let jac = if con.is_linear() {
                let blocks = linear.get(con.name());
                let mut fixed = BTreeMap::new();
                for name in &wrt {
                    let block = blocks.and_then(|row| row.get(name)).ok_or_else(|| {
                        RegistryError::MissingLinearJacobian {
                            of: con.name().to_owned(),
                            wrt: name.clone(),
                        }
                    })?;
                    fixed.insert(name.clone(), block.clone());
                }
                Some(fixed)
            } else {
                None
            };

            let (lower, upper) = con.bounds();
            spec.add_con_group(ConGroup {
                name: con.name().to_owned(),
                size: con.size(),
                kind: con
                    .constraint_kind()
                    .unwrap_or(ConstraintKind::Inequality),
                lower: lower.cloned(),
                upper: upper.cloned(),
                linear: con.is_linear(),
                wrt,
                jac,
            })?;
        }

        Ok(spec)
    }

    /// Registers a design-variable group.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or an array has the wrong size.
    pub fn add_var_group(&mut self, group: VarGroup) -> Result<(), RegistryError> {
        self.check_unique(&group.name)?;
        for array in [&group.value, &group.lower, &group.upper] {
            check_size(&group.name, group.size, array.len())?;
        }
        self.var_groups.push(group);
        Ok(())
    }

    /// Registers an objective depending on the `wrt` design variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or `wrt` names an unregistered
    /// design variable.
    pub fn add_objective(
        &mut self,
        name: impl Into<String>,
        wrt: Vec<String>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        self.check_unique(&name)?;
        self.check_wrt(&name, &wrt)?;
        self.sparsity.insert(name.clone(), wrt);
        self.objectives.push(name);
        Ok(())
    }

    /// Registers a constraint group.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken, `wrt` names an unregistered
    /// design variable, or a bound or Jacobian block has the wrong size.
    pub fn add_con_group(&mut self, group: ConGroup) -> Result<(), RegistryError> {
        self.check_unique(&group.name)?;
        self.check_wrt(&group.name, &group.wrt)?;
        for bound in [&group.lower, &group.upper].into_iter().flatten() {
            check_size(&group.name, group.size, bound.len())?;
        }
        if let Some(jac) = &group.jac {
            for (wrt, block) in jac {
                let cols = self.var_group(wrt).map_or(0, |g| g.size);
                if block.dim() != (group.size, cols) {
                    return Err(RegistryError::SizeMismatch {
                        name: format!("{}/{}", group.name, wrt),
                        expected: group.size * cols,
                        actual: block.len(),
                    });
                }
            }
        }
        self.sparsity.insert(group.name.clone(), group.wrt.clone());
        self.con_groups.push(group);
        Ok(())
    }

    #[must_use]
    pub fn var_groups(&self) -> &[VarGroup] {
        &self.var_groups
    }

    #[must_use]
    pub fn objectives(&self) -> &[String] {
        &self.objectives
    }

    #[must_use]
    pub fn con_groups(&self) -> &[ConGroup] {
        &self.con_groups
    }

    /// Returns the design-variable group with this name.
    #[must_use]
    pub fn var_group(&self, name: &str) -> Option<&VarGroup> {
        self.var_groups.iter().find(|g| g.name == name)
    }

    /// Returns the constraint group with this name.
    #[must_use]
    pub fn con_group(&self, name: &str) -> Option<&ConGroup> {
        self.con_groups.iter().find(|g| g.name == name)
    }

    /// Iterates over design-variable names in registration order.
    pub fn design_var_names(&self) -> impl Iterator<Item = &str> {
        self.var_groups.iter().map(|g| g.name.as_str())
    }

    /// Iterates over every objective and constraint name.
    pub fn response_names(&self) -> impl Iterator<Item = &str> {
        self.objectives
            .iter()
            .map(String::as_str)
            .chain(self.con_groups.iter().map(|g| g.name.as_str()))
    }

    /// Iterates over the responses the gradient callback differentiates:
    /// objectives and nonlinear constraints.
    pub fn quantities(&self) -> impl Iterator<Item = &str> {
        self.objectives.iter().map(String::as_str).chain(
            self.con_groups
                .iter()
                .filter(|g| !g.linear)
                .map(|g| g.name.as_str()),
        )
    }

    /// Returns the design variables a response depends on.
    #[must_use]
    pub fn wrt(&self, response: &str) -> Option<&[String]> {
        self.sparsity.get(response).map(Vec::as_slice)
    }

    /// Returns `true` if `response` is a registered linear constraint.
    #[must_use]
    pub fn is_linear(&self, response: &str) -> bool {
        self.con_group(response).is_some_and(|g| g.linear)
    }

    /// Returns the registered design variables relevant to `response`, in
    /// registration order.
    fn restrict<S: System>(&self, system: &S, response: &str) -> Vec<String> {
        let relevant: BTreeSet<String> = system.relevant(response);
        self.design_var_names()
            .filter(|name| relevant.contains(*name))
            .map(str::to_owned)
            .collect()
    }

    /// Differentiates every linear constraint with respect to every
    /// registered design variable in a single request.
    fn linear_jacobians<S: System>(
        &self,
        system: &mut S,
    ) -> Result<SensitivityDict, Error> {
        let of: Vec<String> = system
            .constraints(ConstraintFilter::all().linearity(Linearity::Linear))
            .into_iter()
            .map(|r| r.name().to_owned())
            .collect();
        if of.is_empty() || self.var_groups.is_empty() {
            return Ok(SensitivityDict::new());
        }

        let of: Vec<&str> = of.iter().map(String::as_str).collect();
        let wrt: Vec<&str> = self.design_var_names().collect();
        system
            .calc_gradient(&wrt, &of, Mode::Auto)
            .map_err(Error::model)
    }

    fn check_unique(&self, name: &str) -> Result<(), RegistryError> {
        let taken = self.var_group(name).is_some()
            || self.objectives.iter().any(|o| o == name)
            || self.con_group(name).is_some();
        if taken {
            Err(RegistryError::DuplicateName(name.to_owned()))
        } else {
            Ok(())
        }
    }

    fn check_wrt(&self, of: &str, wrt: &[String]) -> Result<(), RegistryError> {
        match wrt.iter().find(|name| self.var_group(name).is_none()) {
            Some(name) => Err(RegistryError::UnknownDesignVar {
                of: of.to_owned(),
                wrt: name.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn check_size(name: &str, expected: usize, actual: usize) -> Result<(), RegistryError> {
    if expected == actual {
        Ok(())
    } else {
        Err(RegistryError::SizeMismatch {
            name: name.to_owned(),
            expected,
            actual,
        })
    }
}
