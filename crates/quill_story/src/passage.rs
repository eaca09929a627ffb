//! Passages and the name-keyed passage registry.

use crate::BoxedThread;
use quill_error::{StoryError, StoryErrorKind};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

/// Factory producing a passage's main thread from its parameters.
pub type PassageFactory = Rc<dyn Fn(&[JsonValue]) -> BoxedThread>;

/// A named unit of narrative content.
///
/// # Examples
///
/// ```
/// use quill_story::{Passage, Sequence};
///
/// let start = Passage::new("Start", |_| Sequence::new().text("Hi").boxed())
///     .with_tags(["intro", "Chapter1"]);
///
/// assert_eq!(start.name(), "Start");
/// assert!(start.has_tag("chapter1"));
/// ```
#[derive(Clone, derive_getters::Getters)]
pub struct Passage {
    /// Unique passage name
    name: String,
    /// Author-assigned tags
    tags: Vec<String>,
    #[getter(skip)]
    main: PassageFactory,
}

impl Passage {
    /// Creates a passage from its content factory.
    pub fn new(
        name: impl Into<String>,
        main: impl Fn(&[JsonValue]) -> BoxedThread + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            tags: Vec::new(),
            main: Rc::new(main),
        }
    }

    /// Builder method setting the tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Case-insensitive tag check, folding the full Unicode range.
    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == wanted)
    }

    /// Produces a fresh main thread.
    pub fn main_thread(&self, parameters: &[JsonValue]) -> BoxedThread {
        (self.main)(parameters)
    }
}

impl fmt::Debug for Passage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Passage")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// Every passage of a story, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct PassageRegistry {
    passages: BTreeMap<String, Passage>,
}

impl PassageRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a passage, replacing any passage with the same name.
    pub fn register(&mut self, passage: Passage) -> &mut Self {
        debug!(passage = %passage.name(), "Registering passage");
        if let Some(previous) = self.passages.insert(passage.name().clone(), passage) {
            warn!(passage = %previous.name(), "Replaced an existing passage");
        }
        self
    }

    /// Builder method registering a passage.
    pub fn with(mut self, passage: Passage) -> Self {
        self.register(passage);
        self
    }

    /// Looks up a passage.
    ///
    /// # Errors
    ///
    /// Returns `PassageNotFound` carrying the missing name.
    pub fn get(&self, name: &str) -> Result<&Passage, StoryError> {
        self.passages
            .get(name)
            .ok_or_else(|| StoryError::new(StoryErrorKind::PassageNotFound(name.to_string())))
    }

    /// True if a passage is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.passages.contains_key(name)
    }

    /// Names of passages carrying `tag` (case-insensitive), ordered by name.
    pub fn passages_with_tag(&self, tag: &str) -> Vec<String> {
        self.passages
            .values()
            .filter(|passage| passage.has_tag(tag))
            .map(|passage| passage.name().clone())
            .collect()
    }

    /// All passage names, ordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.passages.keys().map(String::as_str)
    }

    /// Number of passages.
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// True when no passage is registered.
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

impl FromIterator<Passage> for PassageRegistry {
    fn from_iter<I: IntoIterator<Item = Passage>>(iter: I) -> Self {
        let mut registry = Self::new();
        for passage in iter {
            registry.register(passage);
        }
        registry
    }
}
