mod catalog;

use std::fmt;

use braid_core::{FunctionDict, Point, SensitivityDict};

use crate::error::BoxError;
use crate::registry::OptimizerSpec;

pub use catalog::{EngineKind, EngineOptions, OptionKind, SuccessRule};

/// Callback status reported to an engine in place of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailFlag {
    Success = 0,
    Failure = 1,
}

impl FailFlag {
    /// Returns the integer an engine expects.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn is_failure(self) -> bool {
        self == Self::Failure
    }
}

/// Outcome of a run, classified from the engine's inform code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitFlag {
    Failed = 0,
    Ok = 1,
}

impl ExitFlag {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Where an engine gets its gradients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sensitivity {
    /// Call [`Callbacks::gradient`].
    Callback,

    /// Finite-difference the evaluation callback with the given step.
    FiniteDifference { step: f64 },
}

/// The two functions an engine calls back into during a run.
///
/// Neither method can fail in the Rust sense. Problems are reported through
/// the returned [`FailFlag`], and the engine is expected to treat the point
/// as invalid and may keep calling afterwards.
pub trait Callbacks {
    /// Evaluates every objective and constraint at `point`.
    ///
    /// On failure the returned dictionary holds whatever was collected
    /// before the failure and must not be trusted.
    fn evaluate(&mut self, point: &Point) -> (FunctionDict, FailFlag);

    /// Differentiates the responses named in `functions` with respect to the
    /// design variables named in `point`.
    ///
    /// Linear constraints are never differentiated here; their Jacobians are
    /// fixed in the [`OptimizerSpec`].
    fn gradient(&mut self, point: &Point, functions: &FunctionDict) -> (SensitivityDict, FailFlag);
}

/// An external nonlinear-programming engine.
///
/// The engine owns the search. It reads the problem from `spec`, calls
/// `callbacks` as often as it likes, and reports the optimum it settled on.
pub trait Engine {
    /// Runs the engine to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine itself cannot run. Callback failures
    /// are not errors.
    fn optimize(
        &mut self,
        spec: &OptimizerSpec,
        options: &EngineOptions,
        callbacks: &mut dyn Callbacks,
        sensitivity: Sensitivity,
    ) -> Result<EngineSolution, BoxError>;
}

/// What an engine reports when it returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSolution {
    /// The optimum design-variable values.
    pub design_vars: Point,

    /// Engine-specific status code, if the engine reports one.
    pub inform: Option<i64>,

    /// Human-readable status text.
    pub message: Option<String>,
}

impl EngineSolution {
    /// Creates a solution at `design_vars` with no status information.
    #[must_use]
    pub fn new(design_vars: Point) -> Self {
        Self {
            design_vars,
            inform: None,
            message: None,
        }
    }

    /// Sets the inform code.
    #[must_use]
    pub fn with_inform(mut self, inform: i64) -> Self {
        self.inform = Some(inform);
        self
    }

    /// Sets the status message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl fmt::Display for EngineSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.inform, &self.message) {
            (Some(code), Some(msg)) => writeln!(f, "inform {code}: {msg}")?,
            (Some(code), None) => writeln!(f, "inform {code}")?,
            (None, Some(msg)) => writeln!(f, "{msg}")?,
            (None, None) => writeln!(f, "no inform code")?,
        }
        for (name, value) in &self.design_vars {
            writeln!(f, "  {name} = {value}")?;
        }
        Ok(())
    }
}
