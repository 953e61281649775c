use std::collections::{BTreeMap, BTreeSet};

use ndarray::Array1;
use thiserror::Error;

use crate::complex_step::{ComplexStepComponent, ComponentError, Vars};
use crate::{DesignVar, Metadata, Model, Response, SensitivityDict, Snapshot};

use super::{Mode, System};

/// Errors raised by a [`ComponentSystem`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SystemError {
    #[error("`{0}` is not a design variable")]
    UnknownDesignVar(String),

    #[error("`{0}` is not a response")]
    UnknownResponse(String),

    #[error("`{name}` is declared with size {declared} but the component uses {actual}")]
    SizeMismatch {
        name: String,
        declared: usize,
        actual: usize,
    },

    #[error("the system has not been solved")]
    NotSolved,

    #[error(transparent)]
    Component(#[from] ComponentError),
}

/// A [`System`] made of a single [`ComplexStepComponent`].
///
/// Selected component inputs become design variables and selected outputs
/// become responses. The nonlinear solve is one evaluation of the component,
/// and gradients come straight from its complex-step Jacobian.
///
/// Every response is assumed to depend on every design variable unless
/// [`relevant_to`](Self::relevant_to) narrows it.
#[derive(Debug)]
pub struct ComponentSystem {
    component: ComplexStepComponent<f64>,
    values: Vars<f64>,
    design_vars: Vec<DesignVar>,
    responses: Vec<Response>,
    relevance: BTreeMap<String, BTreeSet<String>>,
    solved: Option<Snapshot<Vars<f64>, Vars<f64>>>,
}

impl ComponentSystem {
    /// Wraps a component, starting from its default input values.
    #[must_use]
    pub fn new(component: ComplexStepComponent<f64>) -> Self {
        let values = component.inputs().clone();
        Self {
            component,
            values,
            design_vars: Vec::new(),
            responses: Vec::new(),
            relevance: BTreeMap::new(),
            solved: None,
        }
    }

    /// Exposes a component input as a design variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the component has no such input or its size differs.
    pub fn design_var(mut self, design_var: DesignVar) -> Result<Self, SystemError> {
        let Some(value) = self.values.get(design_var.name()) else {
            return Err(SystemError::UnknownDesignVar(design_var.name().to_owned()));
        };
        check_size(design_var.name(), design_var.size(), value.len())?;
        self.design_vars.push(design_var);
        Ok(self)
    }

    /// Exposes a component output as an objective or constraint.
    ///
    /// # Errors
    ///
    /// Returns an error if the component has no such output or its size differs.
    pub fn response(mut self, response: Response) -> Result<Self, SystemError> {
        let Some((_, size)) = self
            .component
            .outputs()
            .find(|(name, _)| *name == response.name())
        else {
            return Err(SystemError::UnknownResponse(response.name().to_owned()));
        };
        check_size(response.name(), response.size(), size)?;
        self.responses.push(response);
        Ok(self)
    }

    /// Declares the only design variables `response` can depend on.
    #[must_use]
    pub fn relevant_to<'a>(
        mut self,
        response: &str,
        design_vars: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        self.relevance.insert(
            response.to_owned(),
            design_vars.into_iter().map(str::to_owned).collect(),
        );
        self
    }

    /// Returns the inputs and outputs of the last solve.
    #[must_use]
    pub fn solved(&self) -> Option<&Snapshot<Vars<f64>, Vars<f64>>> {
        self.solved.as_ref()
    }

    fn find_design_var(&self, name: &str) -> Result<&DesignVar, SystemError> {
        self.design_vars
            .iter()
            .find(|dv| dv.name() == name)
            .ok_or_else(|| SystemError::UnknownDesignVar(name.to_owned()))
    }

    fn find_response(&self, name: &str) -> Result<&Response, SystemError> {
        self.responses
            .iter()
            .find(|r| r.name() == name)
            .ok_or_else(|| SystemError::UnknownResponse(name.to_owned()))
    }
}

impl System for ComponentSystem {
    type Error = SystemError;

    fn design_vars(&self) -> &[DesignVar] {
        &self.design_vars
    }

    fn responses(&self) -> &[Response] {
        &self.responses
    }

    fn param_value(&self, name: &str) -> Result<Array1<f64>, SystemError> {
        self.find_design_var(name)?;
        Ok(self.values[name].clone())
    }

    fn set_param(&mut self, name: &str, value: &Array1<f64>) -> Result<(), SystemError> {
        let size = self.find_design_var(name)?.size();
        check_size(name, size, value.len())?;
        self.values.insert(name, value.clone());
        Ok(())
    }

    fn response_value(&self, name: &str) -> Result<Array1<f64>, SystemError> {
        self.find_response(name)?;
        let solved = self.solved.as_ref().ok_or(SystemError::NotSolved)?;
        Ok(solved.output[name].clone())
    }

    fn relevant(&self, response: &str) -> BTreeSet<String> {
        self.relevance.get(response).cloned().unwrap_or_else(|| {
            self.design_vars
                .iter()
                .map(|dv| dv.name().to_owned())
                .collect()
        })
    }

    fn solve_nonlinear(&mut self, _metadata: &Metadata) -> Result<(), SystemError> {
        let output = self.component.call(&self.values)?;
        self.solved = Some(Snapshot::new(self.values.clone(), output));
        Ok(())
    }

    fn calc_gradient(
        &mut self,
        wrt: &[&str],
        of: &[&str],
        _mode: Mode,
    ) -> Result<SensitivityDict, SystemError> {
        for name in wrt {
            self.find_design_var(name)?;
        }
        for name in of {
            self.find_response(name)?;
        }

        let solved = self.solved.as_ref().ok_or(SystemError::NotSolved)?;
        let jacobian = self.component.linearize(&solved.input)?;

        let mut sens = SensitivityDict::new();
        for &response in of {
            let row = sens.entry(response.to_owned()).or_default();
            for &design_var in wrt {
                if let Some(block) = jacobian.get(response, design_var) {
                    row.insert(design_var.to_owned(), block.clone());
                }
            }
        }
        Ok(sens)
    }
}

fn check_size(name: &str, declared: usize, actual: usize) -> Result<(), SystemError> {
    if declared == actual {
        Ok(())
    } else {
        Err(SystemError::SizeMismatch {
            name: name.to_owned(),
            declared,
            actual,
        })
    }
}
