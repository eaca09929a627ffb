//! Top-level error wrapper types.

use crate::{ConfigError, StoryError};

/// Every error condition the Quill workspace can report.
///
/// # Examples
///
/// ```
/// use quill_error::{QuillError, ConfigError};
///
/// let err: QuillError = ConfigError::inline("bad value").into();
/// assert!(format!("{}", err).contains("Story config <inline>: bad value"));
/// assert!(err.config_error().is_some_and(ConfigError::is_inline));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum QuillErrorKind {
    /// Story playback error
    #[from(StoryError)]
    Story(StoryError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
}

/// Quill error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Quill Error: {}", _0)]
pub struct QuillError(Box<QuillErrorKind>);

impl QuillError {
    /// Create a new error from a kind.
    pub fn new(kind: QuillErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &QuillErrorKind {
        &self.0
    }

    /// The story error kind, if this is a playback error.
    pub fn story_kind(&self) -> Option<&crate::StoryErrorKind> {
        match self.kind() {
            QuillErrorKind::Story(err) => Some(err.kind()),
            QuillErrorKind::Config(_) => None,
        }
    }

    /// The configuration failure, if this is one.
    pub fn config_error(&self) -> Option<&ConfigError> {
        match self.kind() {
            QuillErrorKind::Config(err) => Some(err),
            QuillErrorKind::Story(_) => None,
        }
    }
}

impl<T> From<T> for QuillError
where
    T: Into<QuillErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Quill operations.
pub type QuillResult<T> = std::result::Result<T, QuillError>;
