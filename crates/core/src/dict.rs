use std::collections::BTreeMap;

use ndarray::{Array1, Array2};

/// Design-variable values keyed by design-variable name.
///
/// Supplied by the optimizer engine for every callback.
pub type Point = BTreeMap<String, Array1<f64>>;

/// Response values keyed by response name, rebuilt on every evaluation.
pub type FunctionDict = BTreeMap<String, Array1<f64>>;

/// Jacobian blocks keyed by response name, then by design-variable name.
///
/// Each block has shape `(response size, design variable size)`.
pub type SensitivityDict = BTreeMap<String, BTreeMap<String, Array2<f64>>>;
