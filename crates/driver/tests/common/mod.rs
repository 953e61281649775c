#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use braid_core::complex_step::ComplexStepComponent;
use braid_core::{
    ComponentSystem, DesignVar, FunctionDict, Point, Response, SensitivityDict,
};
use braid_driver::{
    BoxError, Callbacks, Engine, EngineOptions, EngineSolution, FailFlag, OptimizerSpec,
    Sensitivity,
};
use ndarray::array;

/// One call a [`Scripted`] engine makes.
#[derive(Debug, Clone)]
pub enum Step {
    /// Evaluate at this `x`.
    Evaluate(f64),

    /// Differentiate at this `x`, reusing the most recent function values.
    Gradient(f64),
}

/// Everything a [`Scripted`] engine saw and received.
#[derive(Debug, Default)]
pub struct Transcript {
    pub spec: Option<OptimizerSpec>,
    pub options: Option<EngineOptions>,
    pub sensitivity: Option<Sensitivity>,
    pub evaluations: Vec<(FunctionDict, FailFlag)>,
    pub gradients: Vec<(SensitivityDict, FailFlag)>,
}

/// An engine that replays a fixed call sequence and reports a fixed optimum.
pub struct Scripted {
    pub steps: Vec<Step>,
    pub optimum: Point,
    pub inform: Option<i64>,
    pub transcript: Rc<RefCell<Transcript>>,
}

impl Scripted {
    pub fn new(steps: Vec<Step>, optimum: f64) -> (Self, Rc<RefCell<Transcript>>) {
        let transcript = Rc::new(RefCell::new(Transcript::default()));
        let engine = Self {
            steps,
            optimum: point(optimum),
            inform: Some(0),
            transcript: Rc::clone(&transcript),
        };
        (engine, transcript)
    }

    #[must_use]
    pub fn inform(mut self, inform: Option<i64>) -> Self {
        self.inform = inform;
        self
    }
}

impl Engine for Scripted {
    fn optimize(
        &mut self,
        spec: &OptimizerSpec,
        options: &EngineOptions,
        callbacks: &mut dyn Callbacks,
        sensitivity: Sensitivity,
    ) -> Result<EngineSolution, BoxError> {
        let mut transcript = self.transcript.borrow_mut();
        transcript.spec = Some(spec.clone());
        transcript.options = Some(options.clone());
        transcript.sensitivity = Some(sensitivity);

        let mut last = FunctionDict::new();
        for step in &self.steps {
            match *step {
                Step::Evaluate(x) => {
                    let (values, flag) = callbacks.evaluate(&point(x));
                    last.clone_from(&values);
                    transcript.evaluations.push((values, flag));
                }
                Step::Gradient(x) => {
                    let result = callbacks.gradient(&point(x), &last);
                    transcript.gradients.push(result);
                }
            }
        }

        let mut solution = EngineSolution::new(self.optimum.clone());
        solution.inform = self.inform;
        Ok(solution)
    }
}

pub fn point(x: f64) -> Point {
    Point::from([("x".to_owned(), array![x])])
}

/// `y = x² + 2x` with `x ∈ [-10, 10]` and a linear constraint `c = 3x`.
///
/// The expression panics for `x > 8` to stand in for a model that blows up.
pub fn quadratic() -> ComponentSystem {
    let comp = ComplexStepComponent::<f64>::new(|i, o| {
        let x = i["x"][0];
        assert!(x.re <= 8.0, "model blew up at x = {}", x.re);
        o["y"][0] = x * x + x * 2.0;
        o["c"][0] = x * 3.0;
    })
    .scalar_input("x", 1.0)
    .output("y", 1)
    .output("c", 1);

    ComponentSystem::new(comp)
        .design_var(DesignVar::scalar("x").bounded(-10.0, 10.0))
        .and_then(|s| s.response(Response::objective("y")))
        .and_then(|s| s.response(Response::inequality("c", 1, None, Some(6.0)).linear()))
        .expect("quadratic should build")
}
