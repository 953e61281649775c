use braid_core::{FunctionDict, Metadata, Point, SensitivityDict};

use crate::error::CallbackError;

/// Events emitted by the driver's callbacks.
///
/// Events are only emitted on the coordinating process, and an evaluation is
/// only reported after every response value has been collected.
#[derive(Debug)]
pub enum Event<'a> {
    /// The system was solved and every response collected.
    Evaluated {
        metadata: &'a Metadata,
        point: &'a Point,
        values: &'a FunctionDict,
    },

    /// A function evaluation failed. The engine will receive a failure flag.
    EvaluationFailed {
        metadata: &'a Metadata,
        point: &'a Point,
        error: &'a CallbackError,
    },

    /// Gradients were computed for the requested pairs.
    GradientEvaluated {
        metadata: &'a Metadata,
        point: &'a Point,
        sensitivities: &'a SensitivityDict,
    },

    /// A gradient evaluation failed. The engine will receive a failure flag.
    GradientFailed {
        metadata: &'a Metadata,
        point: &'a Point,
        error: &'a CallbackError,
    },
}

impl Event<'_> {
    /// Returns the metadata of the evaluation this event belongs to.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        match self {
            Self::Evaluated { metadata, .. }
            | Self::EvaluationFailed { metadata, .. }
            | Self::GradientEvaluated { metadata, .. }
            | Self::GradientFailed { metadata, .. } => metadata,
        }
    }

    /// Returns the point the engine asked about.
    #[must_use]
    pub fn point(&self) -> &Point {
        match self {
            Self::Evaluated { point, .. }
            | Self::EvaluationFailed { point, .. }
            | Self::GradientEvaluated { point, .. }
            | Self::GradientFailed { point, .. } => point,
        }
    }

    /// Returns `true` for failure events.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::EvaluationFailed { .. } | Self::GradientFailed { .. }
        )
    }
}

/// Actions an observer can take in response to an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Report the current callback to the engine as failed.
    ///
    /// The values already collected are still returned, but the engine is
    /// told not to trust them. Use this to steer an engine away from regions
    /// the model technically solves but that are known to be invalid.
    Reject,
}
