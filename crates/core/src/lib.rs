//! Core traits and types for the Braid framework.
//!
//! This crate defines the shared abstractions that the optimization driver,
//! observers, and models build on:
//!
//! - [`Model`]: a callable that maps a typed input to a typed output
//! - [`Snapshot`]: a captured input/output pair from a model call
//! - [`Observer`]: receives driver events and optionally returns control actions
//! - [`System`]: the analysis model an optimizer drives: design variables,
//!   responses, nonlinear solve, and gradient computation
//! - [`complex_step`]: exact partial derivatives of complex-analytic
//!   expressions, and [`ComponentSystem`] which exposes one such component
//!   as a [`System`]

mod dict;
mod metadata;
mod model;
mod observer;
mod response;
mod system;
mod variable;

pub mod complex_step;

pub use dict::{FunctionDict, Point, SensitivityDict};
pub use metadata::Metadata;
pub use observer::Observer;
pub use response::{ConstraintKind, Linearity, Response, ResponseKind};
pub use system::{ComponentSystem, ConstraintFilter, Mode, System, SystemError};
pub use variable::DesignVar;
pub use {model::Model, model::Snapshot};
