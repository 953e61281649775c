use std::collections::BTreeMap;

use braid_driver::Event;
use serde::{Deserialize, Serialize};

/// One successfully evaluated point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub iteration: usize,

    /// Record-keeping token, e.g. `SNOPT|3`.
    pub coord: String,
    pub point: BTreeMap<String, Vec<f64>>,
    pub values: BTreeMap<String, Vec<f64>>,
}

impl Record {
    /// Builds a record from an [`Event::Evaluated`], or `None` for any other event.
    #[must_use]
    pub fn from_event(event: &Event<'_>) -> Option<Self> {
        let Event::Evaluated {
            metadata,
            point,
            values,
        } = event
        else {
            return None;
        };

        Some(Self {
            iteration: metadata.iteration(),
            coord: metadata.to_string(),
            point: point
                .iter()
                .map(|(name, value)| (name.clone(), value.to_vec()))
                .collect(),
            values: values
                .iter()
                .map(|(name, value)| (name.clone(), value.to_vec()))
                .collect(),
        })
    }

    /// Returns the first entry of a response value.
    #[must_use]
    pub fn value(&self, response: &str) -> Option<f64> {
        self.values.get(response).and_then(|v| v.first().copied())
    }
}
