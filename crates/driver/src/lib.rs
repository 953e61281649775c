//! Optimization coordination for Braid systems.
//!
//! A [`Driver`] connects a [`System`] to an external nonlinear-programming
//! engine. The engine owns the search; the driver owns everything around it:
//!
//! 1. Solve the system once at its initial point.
//! 2. Build an [`OptimizerSpec`] describing design-variable groups, objectives,
//!    and constraint groups, including per-constraint sparsity and the fixed
//!    Jacobians of linear constraints.
//! 3. Hand the engine a [`Callbacks`] implementation that evaluates the system
//!    and its gradients. Callbacks never propagate failures; they return a
//!    [`FailFlag`] and log a full diagnostic instead.
//! 4. Re-apply the engine's reported optimum, solve once more, and classify
//!    the engine's exit status with the per-engine table in [`EngineKind`].
//!
//! Engines are injected with [`Driver::with_engine`]; this crate does not
//! implement any search algorithm.
//!
//! [`System`]: braid_core::System

mod config;
mod driver;
mod engine;
mod error;
mod event;
mod logger;
mod registry;
mod session;

pub use config::{DriverConfig, OptionValue};
pub use driver::{Driver, Phase, RunSummary};
pub use engine::{
    Callbacks, Engine, EngineKind, EngineOptions, EngineSolution, ExitFlag, FailFlag, OptionKind,
    Sensitivity, SuccessRule,
};
pub use error::{BoxError, CallbackError, Error, FailureCause, error_chain};
pub use event::{Action, Event};
pub use logger::{init_logger, init_logger_with_level};
pub use registry::{ConGroup, OptimizerSpec, RegistryError, VarGroup, VarType};
