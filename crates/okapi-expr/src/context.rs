//! Variable context capability used during evaluation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Read access to named variables.
pub trait VariableSource {
    /// Look up a variable by name.
    fn variable(&self, name: &str) -> Option<Value>;
}

/// Write access to named variables.
pub trait VariableSink {
    /// Create or overwrite a variable.
    fn set_variable(&mut self, name: &str, value: Value);
}

/// A plain map of variables. The default context for conditions and assignments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variables {
    values: HashMap<String, Value>,
}

impl Variables {
    /// Create an empty variable map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`VariableSink::set_variable`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set_variable(name, value.into());
        self
    }

    /// Borrow a variable without cloning it.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Remove a variable, returning its last value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    /// Number of defined variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no variable is defined.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Variables sorted by name.
    pub fn sorted(&self) -> Vec<(&str, &Value)> {
        let mut entries: Vec<_> = self.values.iter().map(|(k, v)| (k.as_str(), v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl VariableSource for Variables {
    fn variable(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }
}

impl VariableSink for Variables {
    fn set_variable(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }
}
