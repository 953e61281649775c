mod component;

use std::collections::BTreeSet;

use ndarray::Array1;

use crate::{ConstraintKind, DesignVar, Linearity, Metadata, Response, SensitivityDict};

pub use component::{ComponentSystem, SystemError};

/// Direction of derivative propagation for [`System::calc_gradient`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// One linear solve per design-variable entry.
    Forward,

    /// One linear solve per response entry.
    Reverse,

    /// Let the system choose based on the request's shape.
    #[default]
    Auto,
}

/// Selects constraints by kind and linearity.
///
/// A `None` field matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstraintFilter {
    pub kind: Option<ConstraintKind>,
    pub linearity: Option<Linearity>,
}

impl ConstraintFilter {
    /// Matches every constraint.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts the filter to one constraint kind.
    #[must_use]
    pub fn kind(mut self, kind: ConstraintKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restricts the filter to one linearity.
    #[must_use]
    pub fn linearity(mut self, linearity: Linearity) -> Self {
        self.linearity = Some(linearity);
        self
    }

    /// Returns `true` if the response is a constraint matching this filter.
    #[must_use]
    pub fn matches(&self, response: &Response) -> bool {
        let Some(kind) = response.constraint_kind() else {
            return false;
        };
        self.kind.is_none_or(|k| k == kind)
            && self.linearity.is_none_or(|l| l == response.linearity())
    }
}

/// An analysis model driven by an optimizer.
///
/// A system owns the current values of its design variables, converges its
/// own nonlinear equations, and differentiates its responses. How it does so
/// (model hierarchy, solvers, relevance analysis) is its own business; a
/// driver only relies on the methods below.
///
/// If the system is distributed over several processes, every process must
/// receive the same sequence of calls. Only the process for which
/// [`is_coordinator`](System::is_coordinator) returns `true` reports results.
pub trait System {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the declared design variables in declaration order.
    fn design_vars(&self) -> &[DesignVar];

    /// Returns the declared objectives and constraints in declaration order.
    fn responses(&self) -> &[Response];

    /// Returns the current value of a design variable.
    ///
    /// # Errors
    ///
    /// Returns an error if no design variable has this name.
    fn param_value(&self, name: &str) -> Result<Array1<f64>, Self::Error>;

    /// Sets the value of a design variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is unknown or the value has the wrong size.
    fn set_param(&mut self, name: &str, value: &Array1<f64>) -> Result<(), Self::Error>;

    /// Returns the value of a response as of the last nonlinear solve.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is unknown or the system has not been solved.
    fn response_value(&self, name: &str) -> Result<Array1<f64>, Self::Error>;

    /// Returns the design variables a response can depend on.
    fn relevant(&self, response: &str) -> BTreeSet<String>;

    /// Converges the system at the current design-variable values.
    ///
    /// # Errors
    ///
    /// Returns an error if the solve fails, including divergence.
    fn solve_nonlinear(&mut self, metadata: &Metadata) -> Result<(), Self::Error>;

    /// Computes total derivatives of the `of` responses with respect to the
    /// `wrt` design variables at the last solved point.
    ///
    /// # Errors
    ///
    /// Returns an error if any name is unknown or differentiation fails.
    fn calc_gradient(
        &mut self,
        wrt: &[&str],
        of: &[&str],
        mode: Mode,
    ) -> Result<SensitivityDict, Self::Error>;

    /// Returns the declared objectives.
    fn objectives(&self) -> Vec<&Response> {
        self.responses()
            .iter()
            .filter(|r| r.is_objective())
            .collect()
    }

    /// Returns the declared constraints matching `filter`.
    fn constraints(&self, filter: ConstraintFilter) -> Vec<&Response> {
        self.responses()
            .iter()
            .filter(|r| filter.matches(r))
            .collect()
    }

    /// Returns `true` on the process that reports values to the optimizer.
    fn is_coordinator(&self) -> bool {
        true
    }

    /// Step size for an optimizer's own finite differencing.
    fn fd_step_size(&self) -> f64 {
        1.0e-6
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_selects_by_kind_and_linearity() {
        let responses = [
            Response::objective("f"),
            Response::equality("h", 1, 0.0),
            Response::inequality("g", 1, None, Some(0.0)).linear(),
            Response::inequality("k", 1, Some(1.0), None),
        ];

        let names = |filter: ConstraintFilter| -> Vec<&str> {
            responses
                .iter()
                .filter(|r| filter.matches(r))
                .map(Response::name)
                .collect()
        };

        assert_eq!(names(ConstraintFilter::all()), ["h", "g", "k"]);
        assert_eq!(
            names(ConstraintFilter::all().kind(ConstraintKind::Inequality)),
            ["g", "k"]
        );
        assert_eq!(
            names(ConstraintFilter::all().linearity(Linearity::Nonlinear)),
            ["h", "k"]
        );
        assert_eq!(
            names(
                ConstraintFilter::all()
                    .kind(ConstraintKind::Inequality)
                    .linearity(Linearity::Linear)
            ),
            ["g"]
        );
    }
}
