//! Append-only variable store.
//!
//! A [`VariableStore`] is created fresh for every tick, seeded with built-in
//! and user-provided variables, and grows as requests extract values from
//! their responses. Entries are never modified or removed; when two
//! variables share a name the one appended last wins on lookup.

use serde::Serialize;

/// Where a variable's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VariableOrigin {
    /// Built in, or supplied by the monitor configuration.
    Provided,
    /// Pulled out of a response by an extraction rule.
    ExtractedFromResponse,
}

/// A named string value available for substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Variable {
    name: String,
    origin: VariableOrigin,
    value: String,
}

impl Variable {
    pub fn provided(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: VariableOrigin::Provided,
            value: value.into(),
        }
    }

    pub fn extracted(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: VariableOrigin::ExtractedFromResponse,
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> VariableOrigin {
        self.origin
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Ordered sequence of variables for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableStore {
    variables: Vec<Variable>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, variable: Variable) {
        self.variables.push(variable);
    }

    /// Looks up a variable's value. Later entries shadow earlier ones.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables
            .iter()
            .rev()
            .find(|v| v.name == name)
            .map(|v| v.value.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Variable> {
        self.variables.iter()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Copy of the store as it is now. Later pushes to either copy are not
    /// seen by the other.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Number of variables that were extracted from responses.
    pub fn extracted_count(&self) -> usize {
        self.variables
            .iter()
            .filter(|v| v.origin == VariableOrigin::ExtractedFromResponse)
            .count()
    }
}

impl Extend<Variable> for VariableStore {
    fn extend<T: IntoIterator<Item = Variable>>(&mut self, iter: T) {
        self.variables.extend(iter);
    }
}

impl FromIterator<Variable> for VariableStore {
    fn from_iter<T: IntoIterator<Item = Variable>>(iter: T) -> Self {
        Self {
            variables: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a VariableStore {
    type Item = &'a Variable;
    type IntoIter = std::slice::Iter<'a, Variable>;

    fn into_iter(self) -> Self::IntoIter {
        self.variables.iter()
    }
}
