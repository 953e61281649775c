use std::ops::{Index, IndexMut};

use ndarray::Array1;

/// Named vector variables in declaration order.
///
/// Expressions index by name: `inputs["x"][0]`. Indexing an undeclared name
/// panics, like indexing a map.
#[derive(Debug, Clone, PartialEq)]
pub struct Vars<T> {
    entries: Vec<(String, Array1<T>)>,
}

impl<T> Vars<T> {
    /// Creates an empty set of variables.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds a variable, returning `self` for chaining.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Array1<T>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inserts or replaces a variable, returning the previous value.
    ///
    /// Replacing keeps the variable's original position.
    pub fn insert(&mut self, name: impl Into<String>, value: Array1<T>) -> Option<Array1<T>> {
        let name = name.into();
        match self.get_mut(&name) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Array1<T>> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Array1<T>> {
        self.entries
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Array1<T>)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies `f` to every entry, keeping names and order.
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Vars<U> {
        Vars {
            entries: self
                .entries
                .iter()
                .map(|(n, v)| (n.clone(), v.map(&f)))
                .collect(),
        }
    }
}

impl<T> Default for Vars<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<&str> for Vars<T> {
    type Output = Array1<T>;

    fn index(&self, name: &str) -> &Array1<T> {
        self.get(name)
            .unwrap_or_else(|| panic!("no variable named `{name}`"))
    }
}

impl<T> IndexMut<&str> for Vars<T> {
    fn index_mut(&mut self, name: &str) -> &mut Array1<T> {
        self.get_mut(name)
            .unwrap_or_else(|| panic!("no variable named `{name}`"))
    }
}

impl<T, S: Into<String>> FromIterator<(S, Array1<T>)> for Vars<T> {
    fn from_iter<I: IntoIterator<Item = (S, Array1<T>)>>(iter: I) -> Self {
        let mut vars = Self::new();
        for (name, value) in iter {
            vars.insert(name, value);
        }
        vars
    }
}
