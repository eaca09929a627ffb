//! Story configuration failures.

use std::path::Path;

/// Source name used for configuration parsed from in-memory text.
pub const INLINE_ORIGIN: &str = "<inline>";

/// A story configuration that could not be loaded.
///
/// `origin` names where the settings came from (a file path, or
/// [`INLINE_ORIGIN`] for text), so a failure can be traced back to the file
/// an author needs to edit.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("Story config {}: {} [{}:{}]", origin, message, file, line)]
pub struct ConfigError {
    /// Where the configuration was read from
    pub origin: String,
    /// What went wrong
    pub message: String,
    /// Line of the code that raised the error
    pub line: u32,
    /// Source file of the code that raised the error
    pub file: &'static str,
}

impl ConfigError {
    /// A failure loading the configuration file at `path`.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill_error::ConfigError;
    ///
    /// let err = ConfigError::at("stories/intro.toml", "start_passage must not be empty");
    /// assert_eq!(err.origin, "stories/intro.toml");
    /// assert!(err.to_string().starts_with("Story config stories/intro.toml: start_passage"));
    /// ```
    #[track_caller]
    pub fn at(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::raised(path.as_ref().display().to_string(), message.into())
    }

    /// A failure in configuration given as text rather than a file.
    #[track_caller]
    pub fn inline(message: impl Into<String>) -> Self {
        Self::raised(INLINE_ORIGIN.to_string(), message.into())
    }

    #[track_caller]
    fn raised(origin: String, message: String) -> Self {
        let location = std::panic::Location::caller();
        Self {
            origin,
            message,
            line: location.line(),
            file: location.file(),
        }
    }

    /// True when the configuration came from text, not a file.
    pub fn is_inline(&self) -> bool {
        self.origin == INLINE_ORIGIN
    }
}
