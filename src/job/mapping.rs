//! Path mappings
//!
//! Ordered `(from, to)` substring replacements that translate workstation
//! paths into paths the render farm can see.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Ordered path replacements applied at submission time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMappings {
    mappings: Vec<(String, String)>,
}

impl PathMappings {
    /// No mappings
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mapping. An empty `from` is ignored.
    pub fn add(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let from = from.into();
        if from.is_empty() {
            return;
        }
        self.mappings.push((from, to.into()));
    }

    /// Append several mappings in order
    pub fn extend<I, F, T>(&mut self, mappings: I)
    where
        I: IntoIterator<Item = (F, T)>,
        F: Into<String>,
        T: Into<String>,
    {
        for (from, to) in mappings {
            self.add(from, to);
        }
    }

    /// Apply every mapping in insertion order, each to the output of the last.
    pub fn apply(&self, input: &str) -> String {
        self.mappings
            .iter()
            .fold(input.to_string(), |acc, (from, to)| acc.replace(from.as_str(), to))
    }

    /// Rewrite every top-level string value; other values are left alone.
    pub fn apply_to_params(&self, params: &mut BTreeMap<String, Value>) {
        if self.mappings.is_empty() {
            return;
        }
        for value in params.values_mut() {
            if let Value::String(s) = value {
                *s = self.apply(s);
            }
        }
    }

    /// Mappings in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.mappings.iter().map(|(f, t)| (f.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
