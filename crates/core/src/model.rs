/// A pure analysis step: typed inputs in, typed outputs or an error out.
///
/// A [`ComplexStepComponent`](crate::complex_step::ComplexStepComponent) is a
/// model from named input vectors to named output vectors. The complex-step
/// Jacobian calls it once per perturbed entry and reads each result against
/// the same nominal call, so a model must give the same outputs for the same
/// inputs.
pub trait Model {
    type Input;
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns the model's own error when the inputs cannot be evaluated.
    fn call(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// The inputs of one model call together with the outputs they produced.
///
/// [`ComponentSystem`](crate::ComponentSystem) keeps the snapshot of its most
/// recent solve, which is where response values are read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<I, O> {
    pub input: I,
    pub output: O,
}

impl<I, O> Snapshot<I, O> {
    pub fn new(input: I, output: O) -> Self {
        Self { input, output }
    }
}
