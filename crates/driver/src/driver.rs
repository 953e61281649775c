use std::collections::BTreeMap;
use std::fmt;

use braid_core::{Metadata, Observer, System};
use tracing::{info, info_span, warn};

use crate::config::DriverConfig;
use crate::engine::{Engine, EngineKind, EngineSolution, ExitFlag, Sensitivity, SuccessRule};
use crate::error::Error;
use crate::event::{Action, Event};
use crate::registry::OptimizerSpec;
use crate::session::Session;

/// Where a driver is in its run lifecycle.
///
/// A run that fails stays in the phase it failed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Configuring,
    Solving,
    Finalizing,
    Done,
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub exit_flag: ExitFlag,

    /// Number of evaluation callbacks the engine made.
    pub iterations: usize,

    /// What the engine reported.
    pub solution: EngineSolution,
}

/// Runs a [`System`] through an external optimization engine.
///
/// # Example
///
/// ```
/// use braid_core::complex_step::ComplexStepComponent;
/// use braid_core::{ComponentSystem, DesignVar, Point, Response};
/// use braid_driver::{
///     BoxError, Callbacks, Driver, DriverConfig, Engine, EngineKind, EngineOptions,
///     EngineSolution, ExitFlag, OptimizerSpec, Sensitivity,
/// };
///
/// /// Reports the initial point as optimal after one evaluation.
/// struct Idle;
///
/// impl Engine for Idle {
///     fn optimize(
///         &mut self,
///         spec: &OptimizerSpec,
///         _options: &EngineOptions,
///         callbacks: &mut dyn Callbacks,
///         _sensitivity: Sensitivity,
///     ) -> Result<EngineSolution, BoxError> {
///         let point: Point = spec
///             .var_groups()
///             .iter()
///             .map(|g| (g.name.clone(), g.value.clone()))
///             .collect();
///         callbacks.evaluate(&point);
///         Ok(EngineSolution::new(point).with_inform(0))
///     }
/// }
///
/// let comp = ComplexStepComponent::<f64>::new(|i, o| {
///     let x = i["x"][0];
///     o["y"][0] = x * x + x * 2.0;
/// })
/// .scalar_input("x", 1.0)
/// .output("y", 1);
///
/// let mut system = ComponentSystem::new(comp)
///     .design_var(DesignVar::scalar("x").bounded(-10.0, 10.0))?
///     .response(Response::objective("y"))?;
///
/// let mut driver =
///     Driver::new(DriverConfig::for_optimizer("SLSQP")).with_engine(EngineKind::Slsqp, Idle);
/// let summary = driver.run_unobserved(&mut system)?;
///
/// assert_eq!(summary.exit_flag, ExitFlag::Ok);
/// assert_eq!(summary.iterations, 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Driver {
    config: DriverConfig,
    engines: BTreeMap<EngineKind, Box<dyn Engine>>,
    phase: Phase,
    metadata: Option<Metadata>,
    iterations: usize,
    spec: Option<OptimizerSpec>,
    solution: Option<EngineSolution>,
    exit_flag: ExitFlag,
}

impl Driver {
    /// Creates a driver with no engines installed.
    #[must_use]
    pub fn new(config: DriverConfig) -> Self {
        Self {
            config,
            engines: BTreeMap::new(),
            phase: Phase::Idle,
            metadata: None,
            iterations: 0,
            spec: None,
            solution: None,
            exit_flag: ExitFlag::Failed,
        }
    }

    /// Installs the engine used when the config selects `kind`.
    #[must_use]
    pub fn with_engine(mut self, kind: EngineKind, engine: impl Engine + 'static) -> Self {
        self.engines.insert(kind, Box::new(engine));
        self
    }

    #[must_use]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the classification of the last run, `Failed` until one finishes.
    #[must_use]
    pub fn exit_flag(&self) -> ExitFlag {
        self.exit_flag
    }

    #[must_use]
    pub fn solution(&self) -> Option<&EngineSolution> {
        self.solution.as_ref()
    }

    /// Returns the number of evaluation callbacks in the last run.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    #[must_use]
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Returns the problem handed to the engine in the last run.
    #[must_use]
    pub fn registry(&self) -> Option<&OptimizerSpec> {
        self.spec.as_ref()
    }

    /// Runs the configured engine on `system`.
    ///
    /// The system is solved once before the engine starts and once more at
    /// the engine's reported optimum, so it is left in the optimum's state
    /// regardless of which point the engine probed last.
    ///
    /// # Errors
    ///
    /// Configuration errors are returned before the system is touched.
    /// Errors from the initial solve, registry construction, the engine
    /// itself, or the final solve also end the run. Failures inside callbacks
    /// do not; they are reported to the engine and to `observer`.
    pub fn run<S, Obs>(&mut self, system: &mut S, mut observer: Obs) -> Result<RunSummary, Error>
    where
        S: System,
        Obs: for<'e> Observer<Event<'e>, Action>,
    {
        let span = info_span!(
            "optimize",
            engine = %self.config.optimizer,
            title = %self.config.title,
        );
        let _enter = span.enter();

        self.reset();
        self.phase = Phase::Configuring;

        let kind: EngineKind = self.config.optimizer.parse()?;
        let options = kind.validate_options(&self.config.options)?;
        let rule = self
            .config
            .success_codes
            .clone()
            .unwrap_or_else(|| kind.success_rule());
        let engine = self
            .engines
            .get_mut(&kind)
            .ok_or(Error::EngineNotInstalled { engine: kind })?;

        let metadata = self.metadata.insert(Metadata::new(kind.name()));
        system.solve_nonlinear(metadata).map_err(Error::model)?;
        let spec = self.spec.insert(OptimizerSpec::build(system, &self.config.title)?);
        info!(
            design_vars = spec.var_groups().len(),
            objectives = spec.objectives().len(),
            constraints = spec.con_groups().len(),
            "registered problem"
        );

        let sensitivity = if self.config.engine_finite_difference {
            Sensitivity::FiniteDifference {
                step: system.fd_step_size(),
            }
        } else {
            Sensitivity::Callback
        };

        self.phase = Phase::Solving;
        info!(?sensitivity, "handing control to {kind}");
        let solution = {
            let mut session = Session::new(
                system,
                spec,
                metadata,
                &mut self.iterations,
                &mut observer,
            );
            engine
                .optimize(spec, &options, &mut session, sensitivity)
                .map_err(Error::Engine)?
        };

        if self.config.print_results {
            info!("{kind} finished after {} evaluations\n{solution}", self.iterations);
        }

        self.phase = Phase::Finalizing;
        for group in spec.var_groups() {
            let value = solution
                .design_vars
                .get(&group.name)
                .ok_or_else(|| Error::MissingOptimum {
                    name: group.name.clone(),
                })?;
            system.set_param(&group.name, value).map_err(Error::model)?;
        }
        system.solve_nonlinear(metadata).map_err(Error::model)?;

        self.exit_flag = classify(kind, &rule, solution.inform);
        self.phase = Phase::Done;
        info!(exit_flag = self.exit_flag.as_i32(), "optimization complete");

        let summary = RunSummary {
            exit_flag: self.exit_flag,
            iterations: self.iterations,
            solution: solution.clone(),
        };
        self.solution = Some(solution);
        Ok(summary)
    }

    /// Runs without an observer.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_unobserved<S: System>(&mut self, system: &mut S) -> Result<RunSummary, Error> {
        self.run(system, ())
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.metadata = None;
        self.iterations = 0;
        self.spec = None;
        self.solution = None;
        self.exit_flag = ExitFlag::Failed;
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("config", &self.config)
            .field("engines", &self.engines.keys().collect::<Vec<_>>())
            .field("phase", &self.phase)
            .field("iterations", &self.iterations)
            .field("exit_flag", &self.exit_flag)
            .finish_non_exhaustive()
    }
}

/// Maps an engine inform code to an exit flag.
fn classify(kind: EngineKind, rule: &SuccessRule, inform: Option<i64>) -> ExitFlag {
    match inform {
        Some(code) if rule.is_success(code) => ExitFlag::Ok,
        Some(code) => {
            info!(inform = code, "{kind} did not report success");
            ExitFlag::Failed
        }
        None => {
            warn!("{kind} reported no inform code; classifying the run as failed");
            ExitFlag::Failed
        }
    }
}
