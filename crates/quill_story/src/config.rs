//! Story playback configuration.
//!
//! Loaded from TOML through the `config` crate; every field is optional and
//! falls back to its default.
//!
//! ```toml
//! start_passage = "Prologue"
//! auto_play = false
//! max_embed_depth = 16
//! link_cue_separator = "_"
//! ```

use config::{Config, File, FileFormat};
use quill_error::{ConfigError, QuillResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, instrument};

/// Playback settings.
///
/// # Examples
///
/// ```
/// use quill_story::StoryConfig;
///
/// let config = StoryConfig::default().with_start_passage("Prologue".to_string());
/// assert_eq!(config.start_passage(), "Prologue");
/// assert!(*config.auto_play());
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct StoryConfig {
    /// Passage entered by `begin`
    #[serde(default = "default_start_passage")]
    start_passage: String,

    /// Whether the first `tick` on a fresh story begins playback
    #[serde(default = "default_auto_play")]
    auto_play: bool,

    /// Deepest allowed nesting of embedded passages and fragments
    #[serde(default = "default_max_embed_depth")]
    max_embed_depth: usize,

    /// Joins passage and link names into a link's cue context
    #[serde(default = "default_link_cue_separator")]
    link_cue_separator: String,
}

fn default_start_passage() -> String {
    "Start".to_string()
}

fn default_auto_play() -> bool {
    true
}

fn default_max_embed_depth() -> usize {
    64
}

fn default_link_cue_separator() -> String {
    "_".to_string()
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            start_passage: default_start_passage(),
            auto_play: default_auto_play(),
            max_embed_depth: default_max_embed_depth(),
            link_cue_separator: default_link_cue_separator(),
        }
    }
}

impl StoryConfig {
    /// Starts a builder.
    pub fn builder() -> StoryConfigBuilder {
        StoryConfigBuilder::default()
    }

    /// Loads configuration from a file; the format follows the extension.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or parsed.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> QuillResult<Self> {
        debug!("Loading story configuration from file");
        let path = path.as_ref();
        Config::builder()
            .add_source(File::from(path))
            .build()
            .map_err(|e| ConfigError::at(path, format!("Failed to read configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| ConfigError::at(path, format!("Failed to parse configuration: {}", e)).into())
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the text is not valid TOML or has wrongly typed fields.
    #[instrument(skip_all)]
    pub fn from_toml_str(text: &str) -> QuillResult<Self> {
        Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()
            .map_err(|e| ConfigError::inline(format!("Failed to build configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| ConfigError::inline(format!("Failed to parse configuration: {}", e)).into())
    }
}
