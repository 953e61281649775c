use ndarray::Array1;

/// What a response is and how it is bounded.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseKind {
    /// A quantity the optimizer minimizes.
    Objective,

    /// A constraint held at a target value.
    Equality { equals: Array1<f64> },

    /// A constraint bounded from below, above, or both.
    ///
    /// `None` leaves that side open.
    Inequality {
        lower: Option<Array1<f64>>,
        upper: Option<Array1<f64>>,
    },
}

/// The constraint half of [`ResponseKind`], used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Equality,
    Inequality,
}

/// Whether a response is linear in the design variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linearity {
    Linear,
    Nonlinear,
}

/// An objective or constraint declared by a [`System`](crate::System).
///
/// A linear response has a constant Jacobian. Drivers compute it once and
/// never ask for it again.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    name: String,
    size: usize,
    kind: ResponseKind,
    linear: bool,
}

impl Response {
    /// Declares a scalar objective.
    #[must_use]
    pub fn objective(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 1,
            kind: ResponseKind::Objective,
            linear: false,
        }
    }

    /// Declares an equality constraint where every entry equals `target`.
    #[must_use]
    pub fn equality(name: impl Into<String>, size: usize, target: f64) -> Self {
        Self {
            name: name.into(),
            size,
            kind: ResponseKind::Equality {
                equals: Array1::from_elem(size, target),
            },
            linear: false,
        }
    }

    /// Declares an inequality constraint with optional scalar bounds.
    #[must_use]
    pub fn inequality(
        name: impl Into<String>,
        size: usize,
        lower: Option<f64>,
        upper: Option<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            kind: ResponseKind::Inequality {
                lower: lower.map(|v| Array1::from_elem(size, v)),
                upper: upper.map(|v| Array1::from_elem(size, v)),
            },
            linear: false,
        }
    }

    /// Marks the response as linear in the design variables.
    #[must_use]
    pub fn linear(mut self) -> Self {
        self.linear = true;
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
    pub fn kind(&self) -> &ResponseKind {
        &self.kind
    }

    #[must_use]
    pub fn is_linear(&self) -> bool {
        self.linear
    }

    #[must_use]
    pub fn linearity(&self) -> Linearity {
        if self.linear {
            Linearity::Linear
        } else {
            Linearity::Nonlinear
        }
    }

    #[must_use]
    pub fn is_objective(&self) -> bool {
        matches!(self.kind, ResponseKind::Objective)
    }

    /// Returns the constraint kind, or `None` for objectives.
    #[must_use]
    pub fn constraint_kind(&self) -> Option<ConstraintKind> {
        match self.kind {
            ResponseKind::Objective => None,
            ResponseKind::Equality { .. } => Some(ConstraintKind::Equality),
            ResponseKind::Inequality { .. } => Some(ConstraintKind::Inequality),
        }
    }

    /// Returns the `(lower, upper)` bounds an optimizer should enforce.
    ///
    /// Equality constraints report the target on both sides.
    /// Objectives are unbounded.
    #[must_use]
    pub fn bounds(&self) -> (Option<&Array1<f64>>, Option<&Array1<f64>>) {
        match &self.kind {
            ResponseKind::Objective => (None, None),
            ResponseKind::Equality { equals } => (Some(equals), Some(equals)),
            ResponseKind::Inequality { lower, upper } => (lower.as_ref(), upper.as_ref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;

    #[test]
    fn equality_reports_target_on_both_sides() {
        let con = Response::equality("c", 2, 1.5);
        let (lower, upper) = con.bounds();

        assert_eq!(lower, Some(&array![1.5, 1.5]));
        assert_eq!(upper, Some(&array![1.5, 1.5]));
        assert_eq!(con.constraint_kind(), Some(ConstraintKind::Equality));
    }

    #[test]
    fn two_sided_inequality_keeps_both_bounds() {
        let con = Response::inequality("g", 1, Some(-1.0), Some(4.0)).linear();
        let (lower, upper) = con.bounds();

        assert_eq!(lower, Some(&array![-1.0]));
        assert_eq!(upper, Some(&array![4.0]));
        assert_eq!(con.linearity(), Linearity::Linear);
    }

    #[test]
    fn one_sided_inequality_leaves_other_side_open() {
        let con = Response::inequality("g", 1, None, Some(0.0));
        assert_eq!(con.bounds().0, None);
    }

    #[test]
    fn objective_is_not_a_constraint() {
        let obj = Response::objective("f");
        assert!(obj.is_objective());
        assert_eq!(obj.constraint_kind(), None);
    }
}
