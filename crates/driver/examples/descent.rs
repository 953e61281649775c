//! Minimizes a two-variable paraboloid with a toy projected steepest-descent
//! engine, logging the run.
//!
//! ```sh
//! RUST_LOG=debug cargo run -p braid-driver --example descent
//! ```

use braid_core::complex_step::ComplexStepComponent;
use braid_core::{ComponentSystem, DesignVar, Point, Response, System};
use braid_driver::{
    BoxError, Callbacks, Driver, DriverConfig, Engine, EngineKind, EngineOptions,
    EngineSolution, OptimizerSpec, Sensitivity, init_logger,
};
use ndarray::Array1;
use tracing::info;

/// Fixed-step steepest descent on the first objective, clamped to bounds.
///
/// Ignores constraints. Reports inform 0 when the step falls below `ACC`
/// and 9 when `MAXIT` runs out.
struct Descent {
    step: f64,
}

impl Engine for Descent {
    fn optimize(
        &mut self,
        spec: &OptimizerSpec,
        options: &EngineOptions,
        callbacks: &mut dyn Callbacks,
        _sensitivity: Sensitivity,
    ) -> Result<EngineSolution, BoxError> {
        let max_iter = options.get("MAXIT").and_then(|v| v.as_i64()).unwrap_or(100);
        let tol = options.get("ACC").and_then(|v| v.as_f64()).unwrap_or(1e-8);
        let objective = spec.objectives().first().ok_or("no objective")?;

        let mut point: Point = spec
            .var_groups()
            .iter()
            .map(|g| (g.name.clone(), g.value.clone()))
            .collect();

        for _ in 0..max_iter {
            let (values, flag) = callbacks.evaluate(&point);
            if flag.is_failure() {
                return Ok(EngineSolution::new(point)
                    .with_inform(41)
                    .with_message("evaluation failed"));
            }

            let (sens, flag) = callbacks.gradient(&point, &values);
            if flag.is_failure() {
                return Ok(EngineSolution::new(point)
                    .with_inform(42)
                    .with_message("gradient failed"));
            }

            let mut moved = 0.0_f64;
            for group in spec.var_groups() {
                let Some(block) = sens.get(objective).and_then(|row| row.get(&group.name)) else {
                    continue;
                };
                let current = &point[&group.name];
                let next: Array1<f64> = current - &(block.row(0).to_owned() * self.step);
                let next = ndarray::Zip::from(&next)
                    .and(&group.lower)
                    .and(&group.upper)
                    .map_collect(|x, lo, hi| x.clamp(*lo, *hi));
                moved = moved.max((&next - current).mapv(f64::abs).sum());
                point.insert(group.name.clone(), next);
            }

            if moved < tol {
                return Ok(EngineSolution::new(point)
                    .with_inform(0)
                    .with_message("step below tolerance"));
            }
        }

        Ok(EngineSolution::new(point)
            .with_inform(9)
            .with_message("iteration limit reached"))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();

    let comp = ComplexStepComponent::<f64>::new(|i, o| {
        let x = i["x"][0];
        let y = i["y"][0];
        o["f"][0] = (x - 3.0) * (x - 3.0) + x * y + (y + 4.0) * (y + 4.0) - 3.0;
    })
    .scalar_input("x", 0.0)
    .scalar_input("y", 0.0)
    .output("f", 1);

    let mut system = ComponentSystem::new(comp)
        .design_var(DesignVar::scalar("x").bounded(-50.0, 50.0))?
        .design_var(DesignVar::scalar("y").bounded(-50.0, 50.0))?
        .response(Response::objective("f"))?;

    let config = DriverConfig::for_optimizer("SLSQP")
        .title("Paraboloid")
        .option("MAXIT", 500_i64)
        .option("ACC", 1e-10);
    let mut driver = Driver::new(config).with_engine(EngineKind::Slsqp, Descent { step: 0.2 });

    let summary = driver.run_unobserved(&mut system)?;

    info!(
        exit_flag = summary.exit_flag.as_i32(),
        iterations = summary.iterations,
        x = system.param_value("x")?[0],
        y = system.param_value("y")?[0],
        f = system.response_value("f")?[0],
        "done"
    );

    Ok(())
}
