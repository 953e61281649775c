//! Complex-step derivatives of real-valued expressions.
//!
//! # Method
//!
//! For a real function `f` that extends analytically to complex arguments,
//!
//! ```text
//! f(x + ih) = f(x) + ih f'(x) - h²/2 f''(x) + O(h³)
//! ```
//!
//! so `Im(f(x + ih)) / h` approximates `f'(x)` with error `O(h²)` and no
//! subtractive cancellation. The step can therefore be made tiny (see
//! [`StepSize`]) and the result is exact to the precision of the type.
//!
//! Inputs are perturbed one scalar entry at a time: a Jacobian with `n`
//! columns costs `n` complex evaluations. The real part of each perturbed
//! evaluation is discarded.
//!
//! # Limitations
//!
//! Expressions that are not complex-analytic near the evaluation point give
//! wrong derivatives without any error. This includes `abs`, `min`/`max`, and
//! comparisons that branch on the real part. Nothing here detects that.
//!
//! # Entry points
//!
//! - [`derivative`]: scalar functions of one variable
//! - [`jacobian`]: vector functions over a flat input slice
//! - [`ComplexStepComponent`]: named vector inputs and outputs with a
//!   per-pair [`Jacobian`], plus [`check_partials`] to compare it against
//!   finite differences

mod check;
mod component;
mod step;
mod vars;


pub use check::{PartialCheck, check_partials};
pub use component::{ComplexStepComponent, ComponentError, Jacobian};
pub use step::StepSize;
pub use vars::Vars;

use ndarray::Array2;
use num_complex::Complex;
use num_traits::Float;

/// Returns `f'(x)` computed with an imaginary step of size `h`.
pub fn derivative<T, F>(f: F, x: T, h: T) -> T
where
    T: Float,
    F: Fn(Complex<T>) -> Complex<T>,
{
    f(Complex::new(x, h)).im / h
}

/// Returns the Jacobian of `f` at `x`, with one row per output entry and one
/// column per input entry.
///
/// `f` must return the same number of outputs on every call.
pub fn jacobian<T, F>(f: F, x: &[T], h: T) -> Array2<T>
where
    T: Float,
    F: Fn(&[Complex<T>]) -> Vec<Complex<T>>,
{
    let mut z: Vec<Complex<T>> = x.iter().map(|&v| Complex::new(v, T::zero())).collect();

    let mut columns = Vec::with_capacity(x.len());
    for j in 0..x.len() {
        z[j].im = h;
        let y = f(&z);
        z[j].im = T::zero();
        columns.push(y.iter().map(|v| v.im / h).collect::<Vec<_>>());
    }

    let rows = columns.first().map_or_else(|| f(&z).len(), Vec::len);
    debug_assert!(columns.iter().all(|c| c.len() == rows));

    Array2::from_shape_fn((rows, x.len()), |(i, j)| columns[j][i])
}
