use ndarray::Array2;

use super::{ComplexStepComponent, ComponentError, StepSize, Vars};

/// Comparison of one complex-step Jacobian block against finite differences.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialCheck<T> {
    pub of: String,
    pub wrt: String,
    pub complex_step: Array2<T>,
    pub finite_difference: Array2<T>,

    /// Frobenius norm of the difference.
    pub abs_error: T,

    /// `abs_error` relative to the finite-difference norm, or `abs_error`
    /// itself when that norm is zero.
    pub rel_error: T,
}

/// Checks every partial derivative of a component against a forward
/// finite difference with step `fd_step`.
///
/// Useful for catching expressions that are not complex-analytic: those
/// produce complex-step derivatives that disagree with the finite difference
/// by far more than `fd_step`.
///
/// # Errors
///
/// Returns an error if the component cannot be evaluated at `inputs`.
pub fn check_partials<T: StepSize + 'static>(
    component: &ComplexStepComponent<T>,
    inputs: &Vars<T>,
    fd_step: T,
) -> Result<Vec<PartialCheck<T>>, ComponentError> {
    let base = component.resolve(inputs)?;
    let nominal = component.compute(&base)?;
    let jacobian = component.linearize(&base)?;

    let mut checks = Vec::with_capacity(jacobian.len());
    for ((of, wrt), cs) in jacobian.iter() {
        let mut fd = Array2::from_elem(cs.dim(), T::zero());

        for k in 0..base[wrt].len() {
            let mut perturbed = base.clone();
            perturbed[wrt][k] = perturbed[wrt][k] + fd_step;
            let y = component.compute(&perturbed)?;
            for (i, (hi, lo)) in y[of].iter().zip(nominal[of].iter()).enumerate() {
                fd[[i, k]] = (*hi - *lo) / fd_step;
            }
        }

        let abs_error = frobenius(&(cs - &fd));
        let fd_norm = frobenius(&fd);
        let rel_error = if fd_norm > T::zero() {
            abs_error / fd_norm
        } else {
            abs_error
        };

        checks.push(PartialCheck {
            of: of.to_owned(),
            wrt: wrt.to_owned(),
            complex_step: cs.clone(),
            finite_difference: fd,
            abs_error,
            rel_error,
        });
    }

    Ok(checks)
}

fn frobenius<T: StepSize>(m: &Array2<T>) -> T {
    m.iter().fold(T::zero(), |acc, &v| acc + v * v).sqrt()
}
