use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use num_complex::Complex;
use thiserror::Error;

use crate::Model;

use super::{StepSize, Vars};

type Expression<T> = dyn Fn(&Vars<Complex<T>>, &mut Vars<Complex<T>>) + Send + Sync;

/// Errors raised when evaluating a [`ComplexStepComponent`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComponentError {
    #[error("unknown input `{0}`")]
    UnknownInput(String),

    #[error("input `{name}` has {actual} entries, expected {expected}")]
    InputSize {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("expression resized output `{name}` to {actual} entries, expected {expected}")]
    OutputSize {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Partial derivatives keyed by `(output, input)`.
///
/// Each block has shape `(output size, input size)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Jacobian<T> {
    blocks: BTreeMap<(String, String), Array2<T>>,
}

impl<T> Jacobian<T> {
    /// Returns the block `∂of/∂wrt`, if both names were declared.
    #[must_use]
    pub fn get(&self, of: &str, wrt: &str) -> Option<&Array2<T>> {
        self.blocks.get(&(of.to_owned(), wrt.to_owned()))
    }

    /// Iterates over `((output, input), block)` in name order.
    pub fn iter(&self) -> impl Iterator<Item = ((&str, &str), &Array2<T>)> {
        self.blocks
            .iter()
            .map(|((of, wrt), block)| ((of.as_str(), wrt.as_str()), block))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// A component whose outputs are complex-analytic expressions of its inputs.
///
/// The expression is written once over complex numbers. Nominal outputs come
/// from evaluating it with zero imaginary parts; partial derivatives come from
/// the complex step (see the [module docs](super)).
///
/// # Example
///
/// ```
/// use braid_core::complex_step::ComplexStepComponent;
/// use braid_core::complex_step::Vars;
/// use ndarray::array;
///
/// let comp = ComplexStepComponent::<f64>::new(|i, o| {
///     let x = i["x"][0];
///     o["y"][0] = x * x + x * 2.0;
/// })
/// .scalar_input("x", 0.0)
/// .output("y", 1);
///
/// let inputs = Vars::new().with("x", array![2.0]);
/// let jac = comp.linearize(&inputs).unwrap();
/// assert!((jac.get("y", "x").unwrap()[[0, 0]] - 6.0).abs() < 1e-12);
/// ```
pub struct ComplexStepComponent<T = f64> {
    inputs: Vars<T>,
    outputs: Vec<(String, usize)>,
    step: T,
    expression: Box<Expression<T>>,
}

impl<T: StepSize + 'static> ComplexStepComponent<T> {
    /// Creates a component around an expression.
    ///
    /// The expression reads inputs by name and writes into pre-sized,
    /// zero-initialized outputs.
    pub fn new<F>(expression: F) -> Self
    where
        F: Fn(&Vars<Complex<T>>, &mut Vars<Complex<T>>) + Send + Sync + 'static,
    {
        Self {
            inputs: Vars::new(),
            outputs: Vec::new(),
            step: T::default_step(),
            expression: Box::new(expression),
        }
    }

    /// Declares a vector input and its default value.
    #[must_use]
    pub fn input(mut self, name: impl Into<String>, default: Array1<T>) -> Self {
        self.inputs.insert(name, default);
        self
    }

    /// Declares a scalar input and its default value.
    #[must_use]
    pub fn scalar_input(self, name: impl Into<String>, default: T) -> Self {
        self.input(name, Array1::from_elem(1, default))
    }

    /// Declares an output of the given size.
    #[must_use]
    pub fn output(mut self, name: impl Into<String>, size: usize) -> Self {
        let name = name.into();
        match self.outputs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = size,
            None => self.outputs.push((name, size)),
        }
        self
    }

    /// Overrides the imaginary step.
    #[must_use]
    pub fn with_step(mut self, step: T) -> Self {
        self.step = step;
        self
    }

    /// Returns the declared inputs with their default values.
    #[must_use]
    pub fn inputs(&self) -> &Vars<T> {
        &self.inputs
    }

    /// Iterates over declared outputs as `(name, size)`.
    pub fn outputs(&self) -> impl Iterator<Item = (&str, usize)> {
        self.outputs.iter().map(|(n, s)| (n.as_str(), *s))
    }

    #[must_use]
    pub fn step(&self) -> T {
        self.step
    }

    /// Merges `given` over the declared defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `given` names an undeclared input or has a
    /// mismatched size.
    pub fn resolve(&self, given: &Vars<T>) -> Result<Vars<T>, ComponentError> {
        let mut resolved = self.inputs.clone();
        for (name, value) in given.iter() {
            let Some(slot) = resolved.get_mut(name) else {
                return Err(ComponentError::UnknownInput(name.to_owned()));
            };
            if slot.len() != value.len() {
                return Err(ComponentError::InputSize {
                    name: name.to_owned(),
                    expected: slot.len(),
                    actual: value.len(),
                });
            }
            slot.assign(value);
        }
        Ok(resolved)
    }

    /// Evaluates the nominal outputs.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs do not resolve or the expression
    /// resizes an output.
    pub fn compute(&self, inputs: &Vars<T>) -> Result<Vars<T>, ComponentError> {
        let z = lift(&self.resolve(inputs)?);
        let y = self.evaluate(&z)?;
        Ok(y.map(|v| v.re))
    }

    /// Computes every partial derivative by complex step.
    ///
    /// Each scalar input entry is perturbed on its own, so the cost is one
    /// evaluation per input entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the inputs do not resolve or the expression
    /// resizes an output.
    pub fn linearize(&self, inputs: &Vars<T>) -> Result<Jacobian<T>, ComponentError> {
        let resolved = self.resolve(inputs)?;
        let mut z = lift(&resolved);
        let h = self.step;

        let mut blocks = BTreeMap::new();
        for (wrt, value) in resolved.iter() {
            for (of, size) in &self.outputs {
                blocks.insert(
                    (of.clone(), wrt.to_owned()),
                    Array2::from_elem((*size, value.len()), T::zero()),
                );
            }
        }

        for (wrt, value) in resolved.iter() {
            for k in 0..value.len() {
                z[wrt][k].im = h;
                let y = self.evaluate(&z);
                z[wrt][k].im = T::zero();
                let y = y?;

                for (of, out) in y.iter() {
                    if let Some(block) = blocks.get_mut(&(of.to_owned(), wrt.to_owned())) {
                        for (i, v) in out.iter().enumerate() {
                            block[[i, k]] = v.im / h;
                        }
                    }
                }
            }
        }

        Ok(Jacobian { blocks })
    }

    fn evaluate(&self, z: &Vars<Complex<T>>) -> Result<Vars<Complex<T>>, ComponentError> {
        let mut y: Vars<Complex<T>> = self
            .outputs
            .iter()
            .map(|(name, size)| {
                let zeros = Array1::from_elem(*size, Complex::new(T::zero(), T::zero()));
                (name.clone(), zeros)
            })
            .collect();

        (self.expression)(z, &mut y);

        for (name, size) in &self.outputs {
            let actual = y.get(name).map_or(0, Array1::len);
            if actual != *size {
                return Err(ComponentError::OutputSize {
                    name: name.clone(),
                    expected: *size,
                    actual,
                });
            }
        }
        Ok(y)
    }
}

impl<T: StepSize + 'static> Model for ComplexStepComponent<T> {
    type Input = Vars<T>;
    type Output = Vars<T>;
    type Error = ComponentError;

    fn call(&self, input: &Vars<T>) -> Result<Vars<T>, ComponentError> {
        self.compute(input)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ComplexStepComponent<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplexStepComponent")
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("step", &self.step)
            .finish_non_exhaustive()
    }
}

fn lift<T: StepSize>(vars: &Vars<T>) -> Vars<Complex<T>> {
    vars.map(|&v| Complex::new(v, T::zero()))
}
