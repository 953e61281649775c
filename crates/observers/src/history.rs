use braid_core::Observer;
use braid_driver::{Action, Event};

use crate::Record;

/// Keeps every evaluated point of a run in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    records: Vec<Record>,
    gradients: usize,
    evaluation_failures: usize,
    gradient_failures: usize,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the evaluated points in evaluation order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }

    /// Returns the record with the smallest value of `objective`.
    #[must_use]
    pub fn best(&self, objective: &str) -> Option<&Record> {
        self.records
            .iter()
            .filter_map(|r| r.value(objective).map(|v| (r, v)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(r, _)| r)
    }

    /// Returns the number of successful gradient evaluations.
    #[must_use]
    pub fn gradients(&self) -> usize {
        self.gradients
    }

    #[must_use]
    pub fn evaluation_failures(&self) -> usize {
        self.evaluation_failures
    }

    #[must_use]
    pub fn gradient_failures(&self) -> usize {
        self.gradient_failures
    }
}

impl<'e> Observer<Event<'e>, Action> for History {
    fn observe(&mut self, event: &Event<'e>) -> Option<Action> {
        match event {
            Event::Evaluated { .. } => self.records.extend(Record::from_event(event)),
            Event::EvaluationFailed { .. } => self.evaluation_failures += 1,
            Event::GradientEvaluated { .. } => self.gradients += 1,
            Event::GradientFailed { .. } => self.gradient_failures += 1,
        }
        None
    }
}
