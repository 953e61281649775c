use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};

use braid_core::{FunctionDict, Metadata, Mode, Observer, Point, SensitivityDict, System};
use tracing::{debug, error};

use crate::engine::{Callbacks, FailFlag};
use crate::error::{CallbackError, FailureCause, error_chain};
use crate::event::{Action, Event};
use crate::registry::OptimizerSpec;

/// The callbacks of one run.
///
/// Borrows everything a callback mutates from the driver, so no state lives
/// outside the run that owns it.
pub(crate) struct Session<'a, S, Obs> {
    system: &'a mut S,
    spec: &'a OptimizerSpec,
    metadata: &'a mut Metadata,
    iterations: &'a mut usize,
    observer: &'a mut Obs,
}

impl<'a, S, Obs> Session<'a, S, Obs>
where
    S: System,
    Obs: for<'e> Observer<Event<'e>, Action>,
{
    pub(crate) fn new(
        system: &'a mut S,
        spec: &'a OptimizerSpec,
        metadata: &'a mut Metadata,
        iterations: &'a mut usize,
        observer: &'a mut Obs,
    ) -> Self {
        Self {
            system,
            spec,
            metadata,
            iterations,
            observer,
        }
    }

    /// Applies the point, solves, and collects every response.
    fn try_evaluate(&mut self, point: &Point, values: &mut FunctionDict) -> Result<(), FailureCause> {
        let spec = self.spec;

        for name in spec.design_var_names() {
            let value = point
                .get(name)
                .ok_or_else(|| FailureCause::MissingDesignVariable(name.to_owned()))?;
            self.system
                .set_param(name, value)
                .map_err(FailureCause::model)?;
        }

        *self.iterations += 1;
        self.metadata.update(*self.iterations);
        debug!(meta = %self.metadata, "solving");

        self.system
            .solve_nonlinear(self.metadata)
            .map_err(FailureCause::model)?;

        for name in spec.response_names() {
            let value = self
                .system
                .response_value(name)
                .map_err(FailureCause::model)?;
            values.insert(name.to_owned(), value);
        }

        Ok(())
    }

    /// Differentiates the requested responses and filters each row to the
    /// response's registered sparsity.
    fn try_gradient(
        &mut self,
        point: &Point,
        functions: &FunctionDict,
        sensitivities: &mut SensitivityDict,
    ) -> Result<(), FailureCause> {
        let spec = self.spec;

        let wrt: Vec<&str> = spec
            .design_var_names()
            .filter(|name| point.contains_key(*name))
            .collect();
        let of: Vec<&str> = spec
            .quantities()
            .filter(|name| functions.contains_key(*name))
            .collect();

        if wrt.is_empty() || of.is_empty() {
            return Ok(());
        }

        debug!(meta = %self.metadata, ?of, ?wrt, "computing gradient");
        let raw = self
            .system
            .calc_gradient(&wrt, &of, Mode::Auto)
            .map_err(FailureCause::model)?;

        for (response, row) in raw {
            let Some(allowed) = spec.wrt(&response) else {
                continue;
            };
            let row = row
                .into_iter()
                .filter(|(design_var, _)| allowed.contains(design_var))
                .collect();
            sensitivities.insert(response, row);
        }

        Ok(())
    }

    /// Logs a failure with its full diagnostic and tells the observer.
    fn report_failure(&mut self, point: &Point, failure: &CallbackError) {
        let backtrace = Backtrace::force_capture();
        error!(
            meta = %self.metadata,
            "{}\nbacktrace:\n{backtrace}",
            error_chain(failure)
        );

        if self.system.is_coordinator() {
            let event = match failure {
                CallbackError::Evaluation { .. } => Event::EvaluationFailed {
                    metadata: self.metadata,
                    point,
                    error: failure,
                },
                CallbackError::Gradient { .. } => Event::GradientFailed {
                    metadata: self.metadata,
                    point,
                    error: failure,
                },
            };
            if let Err(cause) = notify(&mut *self.observer, &event) {
                error!(meta = %self.metadata, "observer failed on a failure event: {cause}");
            }
        }
    }
}

/// Shows an event to the observer.
///
/// A panicking observer is reported as a failure cause so it never unwinds
/// into the engine.
fn notify<Obs>(observer: &mut Obs, event: &Event<'_>) -> Result<Option<Action>, FailureCause>
where
    Obs: for<'e> Observer<Event<'e>, Action>,
{
    panic::catch_unwind(AssertUnwindSafe(|| observer.observe(event)))
        .map_err(|payload| FailureCause::panicked(payload.as_ref()))
}

impl<S, Obs> Callbacks for Session<'_, S, Obs>
where
    S: System,
    Obs: for<'e> Observer<Event<'e>, Action>,
{
    fn evaluate(&mut self, point: &Point) -> (FunctionDict, FailFlag) {
        let mut values = FunctionDict::new();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.try_evaluate(point, &mut values)
        }))
        .unwrap_or_else(|payload| Err(FailureCause::panicked(payload.as_ref())));

        let cause = match outcome {
            Ok(()) if !self.system.is_coordinator() => return (values, FailFlag::Success),
            Ok(()) => {
                let event = Event::Evaluated {
                    metadata: self.metadata,
                    point,
                    values: &values,
                };
                match notify(&mut *self.observer, &event) {
                    Ok(None) => return (values, FailFlag::Success),
                    Ok(Some(Action::Reject)) => {
                        debug!(meta = %self.metadata, "evaluation rejected by observer");
                        return (values, FailFlag::Failure);
                    }
                    Err(cause) => cause,
                }
            }
            Err(cause) => cause,
        };

        let failure = CallbackError::Evaluation {
            iteration: *self.iterations,
            cause,
        };
        self.report_failure(point, &failure);
        (values, FailFlag::Failure)
    }

    fn gradient(&mut self, point: &Point, functions: &FunctionDict) -> (SensitivityDict, FailFlag) {
        let mut sensitivities = SensitivityDict::new();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.try_gradient(point, functions, &mut sensitivities)
        }))
        .unwrap_or_else(|payload| Err(FailureCause::panicked(payload.as_ref())));

        let cause = match outcome {
            Ok(()) if !self.system.is_coordinator() => return (sensitivities, FailFlag::Success),
            Ok(()) => {
                let event = Event::GradientEvaluated {
                    metadata: self.metadata,
                    point,
                    sensitivities: &sensitivities,
                };
                match notify(&mut *self.observer, &event) {
                    Ok(None) => return (sensitivities, FailFlag::Success),
                    Ok(Some(Action::Reject)) => return (sensitivities, FailFlag::Failure),
                    Err(cause) => cause,
                }
            }
            Err(cause) => cause,
        };

        let failure = CallbackError::Gradient {
            iteration: *self.iterations,
            cause,
        };
        self.report_failure(point, &failure);
        (sensitivities, FailFlag::Failure)
    }
}

#[cfg(test)]
mod tests;
