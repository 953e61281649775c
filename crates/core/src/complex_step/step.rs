use num_traits::Float;

/// A floating-point type with a default complex-step size.
///
/// The step only has to keep `x + ih` representable while making the `O(h²)`
/// truncation error vanish, so it sits far below the type's epsilon and
/// comfortably above its smallest normal value.
pub trait StepSize: Float {
    /// Returns the default imaginary step.
    fn default_step() -> Self;
}

impl StepSize for f64 {
    fn default_step() -> Self {
        1.0e-40
    }
}

impl StepSize for f32 {
    fn default_step() -> Self {
        1.0e-30
    }
}
