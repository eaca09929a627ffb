//! Story variables.
//!
//! Playback only ever resets the variable system; everything else is up to
//! passage content, which reaches the store through [`crate::Story::variables`].

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Variable system consumed by the story.
pub trait VariableStore: fmt::Debug {
    /// Reads a variable.
    fn get(&self, name: &str) -> Option<&JsonValue>;

    /// Writes a variable, returning the previous value.
    fn set(&mut self, name: &str, value: JsonValue) -> Option<JsonValue>;

    /// Restores the initial state. Called by [`crate::Story::reset`].
    fn reset(&mut self);
}

/// Map-backed variables with optional initial values.
///
/// # Examples
///
/// ```
/// use quill_story::{Variables, VariableStore};
/// use serde_json::json;
///
/// let mut vars = Variables::new().with_default("gold", json!(10));
/// vars.set("gold", json!(25));
/// vars.reset();
/// assert_eq!(vars.get("gold"), Some(&json!(10)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables {
    defaults: BTreeMap<String, JsonValue>,
    values: BTreeMap<String, JsonValue>,
}

impl Variables {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method adding a value restored on every reset.
    pub fn with_default(mut self, name: impl Into<String>, value: JsonValue) -> Self {
        let name = name.into();
        self.values.insert(name.clone(), value.clone());
        self.defaults.insert(name, value);
        self
    }

    /// Removes a variable.
    pub fn remove(&mut self, name: &str) -> Option<JsonValue> {
        self.values.remove(name)
    }

    /// True if the variable is set.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of variables set.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no variable is set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl VariableStore for Variables {
    fn get(&self, name: &str) -> Option<&JsonValue> {
        self.values.get(name)
    }

    fn set(&mut self, name: &str, value: JsonValue) -> Option<JsonValue> {
        self.values.insert(name.to_string(), value)
    }

    fn reset(&mut self) {
        debug!(defaults = self.defaults.len(), "Resetting variables");
        self.values = self.defaults.clone();
    }
}
