use std::collections::BTreeSet;

use approx::assert_relative_eq;
use braid_core::complex_step::ComplexStepComponent;
use braid_core::{ComponentSystem, DesignVar, Response, SystemError};
use ndarray::{Array1, array};
use thiserror::Error;

use super::*;

#[derive(Debug, Error)]
enum RigError {
    #[error("solve diverged at x = {0}")]
    Diverged(f64),

    #[error(transparent)]
    System(#[from] SystemError),
}

/// Wraps a [`ComponentSystem`] and records or sabotages what the driver asks.
///
/// - `y = x² + 2x` (objective, relevant to `x`)
/// - `c = x + z` (linear inequality)
/// - `q = x·z` (nonlinear inequality)
struct Rig {
    inner: ComponentSystem,
    diverge_above: f64,
    panic_below: f64,
    coordinator: bool,
    gradient_requests: Vec<(Vec<String>, Vec<String>)>,
}

impl Rig {
    fn new() -> Self {
        let comp = ComplexStepComponent::<f64>::new(|i, o| {
            let x = i["x"][0];
            let z = i["z"][0];
            o["y"][0] = x * x + x * 2.0;
            o["c"][0] = x + z;
            o["q"][0] = x * z;
        })
        .scalar_input("x", 0.0)
        .scalar_input("z", 1.0)
        .output("y", 1)
        .output("c", 1)
        .output("q", 1);

        let inner = ComponentSystem::new(comp)
            .design_var(DesignVar::scalar("x").bounded(-10.0, 10.0))
            .and_then(|s| s.design_var(DesignVar::scalar("z")))
            .and_then(|s| s.response(Response::objective("y")))
            .and_then(|s| s.response(Response::inequality("c", 1, None, Some(5.0)).linear()))
            .and_then(|s| s.response(Response::inequality("q", 1, Some(0.0), None)))
            .map(|s| s.relevant_to("y", ["x"]))
            .expect("rig should build");

        Self {
            inner,
            diverge_above: f64::INFINITY,
            panic_below: f64::NEG_INFINITY,
            coordinator: true,
            gradient_requests: Vec::new(),
        }
    }

    fn x(&self) -> f64 {
        self.inner.param_value("x").map_or(f64::NAN, |v| v[0])
    }
}

impl System for Rig {
    type Error = RigError;

    fn design_vars(&self) -> &[DesignVar] {
        self.inner.design_vars()
    }

    fn responses(&self) -> &[Response] {
        self.inner.responses()
    }

    fn param_value(&self, name: &str) -> Result<Array1<f64>, RigError> {
        Ok(self.inner.param_value(name)?)
    }

    fn set_param(&mut self, name: &str, value: &Array1<f64>) -> Result<(), RigError> {
        Ok(self.inner.set_param(name, value)?)
    }

    fn response_value(&self, name: &str) -> Result<Array1<f64>, RigError> {
        Ok(self.inner.response_value(name)?)
    }

    fn relevant(&self, response: &str) -> BTreeSet<String> {
        self.inner.relevant(response)
    }

    fn solve_nonlinear(&mut self, metadata: &Metadata) -> Result<(), RigError> {
        let x = self.x();
        if x > self.diverge_above {
            return Err(RigError::Diverged(x));
        }
        assert!(x >= self.panic_below, "x below the panic threshold");
        Ok(self.inner.solve_nonlinear(metadata)?)
    }

    fn calc_gradient(
        &mut self,
        wrt: &[&str],
        of: &[&str],
        mode: Mode,
    ) -> Result<SensitivityDict, RigError> {
        self.gradient_requests.push((
            wrt.iter().map(|s| (*s).to_owned()).collect(),
            of.iter().map(|s| (*s).to_owned()).collect(),
        ));
        Ok(self.inner.calc_gradient(wrt, of, mode)?)
    }

    fn is_coordinator(&self) -> bool {
        self.coordinator
    }
}

fn point(x: f64, z: f64) -> Point {
    Point::from([("x".to_owned(), array![x]), ("z".to_owned(), array![z])])
}

/// Solves the rig, builds its spec, and clears the registration-time
/// gradient request.
fn prepare(rig: &mut Rig) -> OptimizerSpec {
    rig.solve_nonlinear(&Metadata::new("test")).unwrap();
    let spec = OptimizerSpec::build(rig, "test").unwrap();
    rig.gradient_requests.clear();
    spec
}

#[test]
fn evaluate_collects_every_response() {
    let mut rig = Rig::new();
    let spec = prepare(&mut rig);
    let mut metadata = Metadata::new("SNOPT");
    let mut iterations = 0;
    let mut observer = ();
    let mut session = Session::new(&mut rig, &spec, &mut metadata, &mut iterations, &mut observer);

    let (values, flag) = session.evaluate(&point(2.0, 3.0));

    assert_eq!(flag, FailFlag::Success);
    assert_relative_eq!(values["y"][0], 8.0);
    assert_relative_eq!(values["c"][0], 5.0);
    assert_relative_eq!(values["q"][0], 6.0);
    assert_eq!(iterations, 1);
    assert_eq!(metadata.to_string(), "SNOPT|1");
}

#[test]
fn gradient_requests_only_nonlinear_quantities() {
    let mut rig = Rig::new();
    let spec = prepare(&mut rig);
    let mut metadata = Metadata::new("SNOPT");
    let mut iterations = 0;
    let mut observer = ();
    let mut session = Session::new(&mut rig, &spec, &mut metadata, &mut iterations, &mut observer);

    let at = point(2.0, 3.0);
    let (values, _) = session.evaluate(&at);
    let (sens, flag) = session.gradient(&at, &values);

    assert_eq!(flag, FailFlag::Success);
    assert!(!sens.contains_key("c"));
    assert_relative_eq!(sens["y"]["x"][[0, 0]], 6.0, epsilon = 1e-12);
    assert_relative_eq!(sens["q"]["x"][[0, 0]], 3.0, epsilon = 1e-12);
    assert_relative_eq!(sens["q"]["z"][[0, 0]], 2.0, epsilon = 1e-12);

    let (wrt, of) = &rig.gradient_requests[0];
    assert_eq!(wrt, &["x", "z"]);
    assert_eq!(of, &["y", "q"]);
}

#[test]
fn gradient_drops_entries_outside_the_relevant_set() {
    let mut rig = Rig::new();
    let spec = prepare(&mut rig);
    let mut metadata = Metadata::new("SNOPT");
    let mut iterations = 0;
    let mut observer = ();
    let mut session = Session::new(&mut rig, &spec, &mut metadata, &mut iterations, &mut observer);

    let at = point(2.0, 3.0);
    let (values, _) = session.evaluate(&at);
    let (sens, _) = session.gradient(&at, &values);

    // The system computed ∂y/∂z but `y` is only relevant to `x`.
    let keys: Vec<_> = sens["y"].keys().map(String::as_str).collect();
    assert_eq!(keys, ["x"]);
}

#[test]
fn failed_solve_sets_the_flag_and_the_run_continues() {
    let mut rig = Rig::new();
    let spec = prepare(&mut rig);
    rig.diverge_above = 5.0;

    let mut metadata = Metadata::new("SNOPT");
    let mut iterations = 0;
    let mut failures = 0;
    let mut observer = |event: &Event<'_>| {
        if event.is_failure() {
            failures += 1;
        }
        None
    };
    let mut session = Session::new(&mut rig, &spec, &mut metadata, &mut iterations, &mut observer);

    let (values, flag) = session.evaluate(&point(7.0, 1.0));
    assert_eq!(flag, FailFlag::Failure);
    assert!(values.is_empty());

    let (values, flag) = session.evaluate(&point(1.0, 1.0));
    assert_eq!(flag, FailFlag::Success);
    assert_relative_eq!(values["y"][0], 3.0);

    assert_eq!(iterations, 2);
    assert_eq!(failures, 1);
}

#[test]
fn panics_are_caught() {
    let mut rig = Rig::new();
    let spec = prepare(&mut rig);
    rig.panic_below = 0.0;

    let mut metadata = Metadata::new("IPOPT");
    let mut iterations = 0;
    let mut observer = ();
    let mut session = Session::new(&mut rig, &spec, &mut metadata, &mut iterations, &mut observer);

    let (_, flag) = session.evaluate(&point(-1.0, 1.0));
    assert_eq!(flag, FailFlag::Failure);

    let (_, flag) = session.evaluate(&point(1.0, 1.0));
    assert_eq!(flag, FailFlag::Success);
}

#[test]
fn missing_design_variable_fails_without_solving() {
    let mut rig = Rig::new();
    let spec = prepare(&mut rig);
    let mut metadata = Metadata::new("SNOPT");
    let mut iterations = 0;
    let mut observer = ();
    let mut session = Session::new(&mut rig, &spec, &mut metadata, &mut iterations, &mut observer);

    let partial = Point::from([("x".to_owned(), array![1.0])]);
    let (values, flag) = session.evaluate(&partial);

    assert_eq!(flag, FailFlag::Failure);
    assert!(values.is_empty());
    assert_eq!(iterations, 0);
}

#[test]
fn observer_can_reject_a_solved_point() {
    let mut rig = Rig::new();
    let spec = prepare(&mut rig);
    let mut metadata = Metadata::new("SNOPT");
    let mut iterations = 0;
    let mut seen = Vec::new();
    let mut observer = |event: &Event<'_>| match event {
        Event::Evaluated { values, .. } => {
            seen.push(values["y"][0]);
            (values["q"][0] < 0.0).then_some(Action::Reject)
        }
        _ => None,
    };
    let mut session = Session::new(&mut rig, &spec, &mut metadata, &mut iterations, &mut observer);

    let (_, flag) = session.evaluate(&point(1.0, -1.0));
    assert_eq!(flag, FailFlag::Failure);

    let (_, flag) = session.evaluate(&point(1.0, 1.0));
    assert_eq!(flag, FailFlag::Success);

    assert_eq!(seen, [3.0, 3.0]);
}

#[test]
fn only_the_coordinator_notifies_observers() {
    let mut rig = Rig::new();
    let spec = prepare(&mut rig);
    rig.coordinator = false;

    let mut metadata = Metadata::new("SNOPT");
    let mut iterations = 0;
    let mut events = 0;
    let mut observer = |_: &Event<'_>| {
        events += 1;
        Some(Action::Reject)
    };
    let mut session = Session::new(&mut rig, &spec, &mut metadata, &mut iterations, &mut observer);

    let at = point(2.0, 3.0);
    let (values, flag) = session.evaluate(&at);
    assert_eq!(flag, FailFlag::Success);

    let (_, flag) = session.gradient(&at, &values);
    assert_eq!(flag, FailFlag::Success);

    assert_eq!(events, 0);
}

#[test]
fn panicking_observer_fails_the_callback_instead_of_unwinding() {
    let mut rig = Rig::new();
    let spec = prepare(&mut rig);
    let mut metadata = Metadata::new("SNOPT");
    let mut iterations = 0;
    let mut observer = |event: &Event<'_>| {
        assert!(event.point()["z"][0] >= 0.0, "negative z");
        None
    };
    let mut session = Session::new(&mut rig, &spec, &mut metadata, &mut iterations, &mut observer);

    // The evaluation fails on the missing `z`, then the observer panics on
    // the failure event.
    let partial = Point::from([("x".to_owned(), array![1.0])]);
    let (_, flag) = session.evaluate(&partial);
    assert_eq!(flag, FailFlag::Failure);

    // The solve succeeds but the observer panics on the result.
    let at = point(1.0, -1.0);
    let (values, flag) = session.evaluate(&at);
    assert_eq!(flag, FailFlag::Failure);
    assert_relative_eq!(values["y"][0], 3.0);

    let (sens, flag) = session.gradient(&at, &values);
    assert_eq!(flag, FailFlag::Failure);
    assert!(sens.contains_key("y"));

    let (_, flag) = session.evaluate(&point(1.0, 1.0));
    assert_eq!(flag, FailFlag::Success);
    assert_eq!(iterations, 2);
}
