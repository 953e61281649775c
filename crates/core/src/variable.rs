use ndarray::Array1;

/// Bound magnitude used when a design variable is left unbounded.
const OPEN_BOUND: f64 = 1.0e99;

/// A design variable: a free parameter the optimizer may adjust.
///
/// The identity (name and size) is fixed once declared. The current value
/// lives in the [`System`](crate::System) and is read with
/// [`System::param_value`](crate::System::param_value).
#[derive(Debug, Clone, PartialEq)]
pub struct DesignVar {
    name: String,
    size: usize,
    lower: Array1<f64>,
    upper: Array1<f64>,
}

impl DesignVar {
    /// Declares an unbounded design variable of the given size.
    #[must_use]
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
            lower: Array1::from_elem(size, -OPEN_BOUND),
            upper: Array1::from_elem(size, OPEN_BOUND),
        }
    }

    /// Declares an unbounded scalar design variable.
    #[must_use]
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, 1)
    }

    /// Applies the same lower and upper bound to every entry.
    #[must_use]
    pub fn bounded(mut self, lower: f64, upper: f64) -> Self {
        self.lower.fill(lower);
        self.upper.fill(upper);
        self
    }

    /// Applies per-entry bounds.
    ///
    /// # Panics
    ///
    /// Panics if either array length differs from the variable size.
    #[must_use]
    pub fn bounded_by(mut self, lower: Array1<f64>, upper: Array1<f64>) -> Self {
        assert_eq!(lower.len(), self.size, "lower bound length for `{}`", self.name);
        assert_eq!(upper.len(), self.size, "upper bound length for `{}`", self.name);
        self.lower = lower;
        self.upper = upper;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn lower(&self) -> &Array1<f64> {
        &self.lower
    }

    #[must_use]
    pub fn upper(&self) -> &Array1<f64> {
        &self.upper
    }
}
