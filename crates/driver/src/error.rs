use std::error::Error as StdError;

use thiserror::Error;

use crate::engine::{EngineKind, OptionKind};
use crate::registry::RegistryError;

/// A boxed error from a system or engine.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Errors that end a [`Driver::run`](crate::Driver::run).
///
/// Failures inside engine callbacks never appear here. They are reported to
/// the engine as a [`FailFlag`](crate::FailFlag) and logged instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("optimizer `{name}` is not supported")]
    UnsupportedOptimizer { name: String },

    #[error("no engine is installed for {engine}")]
    EngineNotInstalled { engine: EngineKind },

    #[error("{engine} does not recognize option `{key}`")]
    UnknownOption { engine: EngineKind, key: String },

    #[error("{engine} option `{key}` expects a {expected} value")]
    InvalidOption {
        engine: EngineKind,
        key: String,
        expected: OptionKind,
    },

    #[error("model error: {0}")]
    Model(#[source] BoxError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("engine error: {0}")]
    Engine(#[source] BoxError),

    #[error("engine returned no optimum for design variable `{name}`")]
    MissingOptimum { name: String },
}

impl Error {
    pub(crate) fn model(error: impl StdError + Send + Sync + 'static) -> Self {
        Self::Model(Box::new(error))
    }
}

/// A failed engine callback, as logged before returning a failure flag.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("function evaluation failed at iteration {iteration}")]
    Evaluation {
        iteration: usize,
        #[source]
        cause: FailureCause,
    },

    #[error("gradient evaluation failed at iteration {iteration}")]
    Gradient {
        iteration: usize,
        #[source]
        cause: FailureCause,
    },
}

impl CallbackError {
    /// Returns the underlying cause.
    #[must_use]
    pub fn cause(&self) -> &FailureCause {
        match self {
            Self::Evaluation { cause, .. } | Self::Gradient { cause, .. } => cause,
        }
    }
}

/// Why a callback failed.
#[derive(Debug, Error)]
pub enum FailureCause {
    #[error(transparent)]
    Model(BoxError),

    #[error("the engine supplied no value for design variable `{0}`")]
    MissingDesignVariable(String),

    #[error("callback panicked: {0}")]
    Panicked(String),
}

impl FailureCause {
    pub(crate) fn model(error: impl StdError + Send + Sync + 'static) -> Self {
        Self::Model(Box::new(error))
    }

    /// Builds a cause from a caught panic payload.
    pub(crate) fn panicked(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        Self::Panicked(message)
    }
}

/// Formats an error and every error in its `source` chain, one per line.
///
/// ```
/// use braid_driver::{CallbackError, FailureCause, error_chain};
///
/// let err = CallbackError::Evaluation {
///     iteration: 4,
///     cause: FailureCause::MissingDesignVariable("x".into()),
/// };
///
/// assert_eq!(
///     error_chain(&err),
///     "function evaluation failed at iteration 4\n  → the engine supplied no value for design variable `x`",
/// );
/// ```
#[must_use]
pub fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut chain = vec![error.to_string()];
    let mut source = error.source();

    while let Some(err) = source {
        chain.push(format!("  → {err}"));
        source = err.source();
    }

    chain.join("\n")
}
