//! Styles and the nested style-scope stack.

use crate::OutputId;
use quill_error::{StoryError, StoryErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::debug;

/// A set of style properties applied to emitted output.
///
/// Values are arbitrary JSON so derived styles (numbers, nested objects,
/// expressions evaluated by the host) travel unchanged to the renderer.
///
/// # Examples
///
/// ```
/// use quill_core::Style;
/// use serde_json::json;
///
/// let parent = Style::pair("color", json!("red")).with("weight", json!("bold"));
/// let own = Style::pair("color", json!("blue"));
///
/// let combined = parent.combine(&own);
/// assert_eq!(combined.get("color"), Some(&json!("blue")));
/// assert_eq!(combined.get("weight"), Some(&json!("bold")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Style(BTreeMap<String, JsonValue>);

impl Style {
    /// Creates an empty style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a style holding a single key/value pair.
    pub fn pair(key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::new().with(key, value)
    }

    /// Builder method adding a property.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets a property, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Gets a property.
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Removes a property.
    pub fn remove(&mut self, key: &str) -> Option<JsonValue> {
        self.0.remove(key)
    }

    /// True when no property is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Combines `own` over `self`; properties of `own` take precedence.
    pub fn combine(&self, own: &Style) -> Style {
        let mut combined = self.clone();
        for (key, value) in &own.0 {
            combined.0.insert(key.clone(), value.clone());
        }
        combined
    }
}

impl<K: Into<String>, V: Into<JsonValue>> FromIterator<(K, V)> for Style {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A style applied to everything emitted while its scope is open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct StyleGroup {
    /// The group's own style
    style: Style,
}

impl StyleGroup {
    /// Wraps a style.
    pub fn new(style: Style) -> Self {
        Self { style }
    }

    /// The group's style combined over its parent's effective style.
    pub fn combined(&self, parent: &Style) -> Style {
        parent.combine(&self.style)
    }
}

/// Handle identifying one open style scope.
///
/// The handle carries the id of the `StyleGroup` output that opened the scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
#[display("scope {}", _0)]
pub struct StyleScope(OutputId);

impl StyleScope {
    /// Creates a handle for the group output with the given id.
    pub fn new(id: OutputId) -> Self {
        Self(id)
    }

    /// Id of the style group output.
    pub fn id(&self) -> OutputId {
        self.0
    }
}

/// Stack of open style scopes.
///
/// Scopes must be closed in reverse order of opening.
#[derive(Debug, Clone, Default)]
pub struct StyleStack {
    entries: Vec<(StyleScope, StyleGroup)>,
}

impl StyleStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a group and returns its scope handle.
    pub fn push(&mut self, scope: StyleScope, group: StyleGroup) -> StyleScope {
        debug!(%scope, depth = self.entries.len() + 1, "Opening style scope");
        self.entries.push((scope, group));
        scope
    }

    /// Pops the top group, which must belong to `scope`.
    ///
    /// # Errors
    ///
    /// Returns `StyleScopeOutOfOrder` if `scope` is not on top of the stack.
    pub fn pop(&mut self, scope: StyleScope) -> Result<StyleGroup, StoryError> {
        match self.entries.last() {
            Some((top, _)) if *top == scope => {
                debug!(%scope, depth = self.entries.len(), "Closing style scope");
                Ok(self.entries.pop().map(|(_, group)| group).unwrap_or_default())
            }
            Some((top, _)) => Err(StoryError::new(StoryErrorKind::StyleScopeOutOfOrder {
                expected: top.to_string(),
                found: scope.to_string(),
            })),
            None => Err(StoryError::new(StoryErrorKind::StyleScopeOutOfOrder {
                expected: "none".to_string(),
                found: scope.to_string(),
            })),
        }
    }

    /// Effective style: every open group combined bottom to top.
    pub fn current(&self) -> Style {
        self.entries
            .iter()
            .fold(Style::new(), |parent, (_, group)| group.combined(&parent))
    }

    /// True if the scope is open anywhere in the stack.
    pub fn contains(&self, scope: StyleScope) -> bool {
        self.entries.iter().any(|(open, _)| *open == scope)
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// True when no scope is open.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every open scope.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
