//! Quill - branching-narrative playback
//!
//! Quill plays interactive stories made of passages. Each passage lazily
//! produces text, links, embedded passages and style scopes; the [`Story`]
//! flattens them into one output stream and runs every lifecycle
//! notification through a pausable callback sequence, so hosts can pause
//! playback from any listener or cue and resume it later.
//!
//! # Quick Start
//!
//! ```
//! use quill::{Link, Passage, PassageRegistry, Sequence, Story};
//!
//! let passages = PassageRegistry::new()
//!     .with(Passage::new("Start", |_| {
//!         Sequence::new()
//!             .text("A fork in the road.")
//!             .link("Left", Link::to("Forest"))
//!             .boxed()
//!     }))
//!     .with(Passage::new("Forest", |_| Sequence::new().text("Trees.").boxed()));
//!
//! let mut story = Story::new(passages);
//! story.begin()?;
//! story.do_link("Left")?;
//! assert_eq!(story.current_text(), "Trees.");
//! # Ok::<(), quill::QuillError>(())
//! ```
//!
//! # Cargo Features
//!
//! - `observability` - OpenTelemetry span export through `tracing`
//!
//! # Architecture
//!
//! - `quill_error` - Error types
//! - `quill_core` - Output list, styles and ids
//! - `quill_story` - Passages, threads, cues and the playback engine
//!
//! This crate (`quill`) re-exports everything for convenience and adds a
//! console player and a demo story used by the `quill` binary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod console;
pub mod demo;

#[cfg(feature = "observability")]
mod observability;

#[cfg(feature = "observability")]
pub use observability::{
    ObservabilityConfig, init_observability, init_observability_with_config,
    shutdown_observability,
};

pub use quill_core::*;
pub use quill_error::*;
pub use quill_story::{
    Abort, BoundCue, CollapsedThread, Cue, CueArgs, CueEvent, CueHandler, CueRegistry,
    CueResolver, EmbedFragment, EmbedPassage, GuardPhase, InsertAt, Link, LinkSelector, Listener,
    ListenerId, NoCues, OutputKind, Passage, PassageClock, PassageFactory, PassageRegistry,
    PhaseToken, Sequence, StateChangeLock, Step, Story, StoryConfig, StoryConfigBuilder,
    StoryConfigBuilderError, StoryEvent, StoryOutput, StoryState, StoryThread, Styled,
    ThreadAction, VariableStore, Variables,
};
pub use quill_story::{sequence, thread};
