use std::fmt;

/// Iteration metadata passed through every nonlinear solve.
///
/// The `name` identifies the driver (usually the optimizer engine) and the
/// `coord` locates the solve within the run. A driver creates one instance per
/// run and updates it once per function evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    name: String,
    coord: Vec<usize>,
}

impl Metadata {
    /// Creates metadata at iteration zero.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coord: vec![0],
        }
    }

    /// Moves the metadata to the given iteration.
    pub fn update(&mut self, iteration: usize) {
        self.coord.clear();
        self.coord.push(iteration);
    }

    /// Returns the driver name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the iteration coordinate.
    #[must_use]
    pub fn coord(&self) -> &[usize] {
        &self.coord
    }

    /// Returns the current iteration number.
    #[must_use]
    pub fn iteration(&self) -> usize {
        self.coord.first().copied().unwrap_or_default()
    }
}

/// Formats the record-keeping token, e.g. `SNOPT|3`.
impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|", self.name)?;
        for (i, c) in self.coord.iter().enumerate() {
            if i > 0 {
                write!(f, "-")?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_iteration_zero() {
        let meta = Metadata::new("SNOPT");
        assert_eq!(meta.iteration(), 0);
        assert_eq!(meta.to_string(), "SNOPT|0");
    }

    #[test]
    fn update_replaces_the_coordinate() {
        let mut meta = Metadata::new("IPOPT");
        meta.update(3);
        meta.update(4);

        assert_eq!(meta.coord(), &[4]);
        assert_eq!(meta.to_string(), "IPOPT|4");
    }
}
