//! Error types for the Quill narrative runtime.
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - Constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use quill_error::{QuillResult, StoryError, StoryErrorKind};
//!
//! fn enter(name: &str) -> QuillResult<()> {
//!     Err(StoryError::new(StoryErrorKind::PassageNotFound(name.to_string())))?
//! }
//!
//! let err = enter("Nowhere").unwrap_err();
//! assert!(err.story_kind().is_some_and(|kind| kind.is_not_found()));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod story;

pub use config::{ConfigError, INLINE_ORIGIN};
pub use error::{QuillError, QuillErrorKind, QuillResult};
pub use story::{StoryError, StoryErrorKind};
