//! Per-handle key/value context store.
//!
//! Plugin adapters use this to remember plugin-assigned state across
//! events, e.g. the participant id handed out by a `joined` event. The
//! typed accessors never fail: a missing or incompatible value yields
//! the zero value of the requested type after a best-effort textual
//! coercion.

use std::collections::BTreeMap;

use serde_json::Value;

/// Ordered key/value overlay on a handle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandleContext {
    values: BTreeMap<String, Value>,
}

impl HandleContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value under the given key, replacing any previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns the raw value for a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Removes a key, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Returns the value as a string.
    ///
    /// Non-string scalars are rendered textually; objects and arrays are
    /// rendered as JSON. Absent keys yield the empty string.
    pub fn get_str(&self, key: &str) -> String {
        match self.values.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(v @ (Value::Object(_) | Value::Array(_))) => v.to_string(),
            Some(Value::Null) | None => String::new(),
        }
    }

    /// Returns the value as an integer, parsing textual numbers.
    /// Absent or incompatible values yield zero.
    pub fn get_i64(&self, key: &str) -> i64 {
        match self.values.get(key) {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
            Some(Value::String(s)) => s.parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// Returns the value as a boolean, coercing the strings `"true"`
    /// and `"false"`. Absent or incompatible values yield false.
    pub fn get_bool(&self, key: &str) -> bool {
        match self.values.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "true",
            _ => false,
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
