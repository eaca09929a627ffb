//! Playback engine for the Quill narrative runtime.
//!
//! A [`Story`] plays [`Passage`]s: each passage is a factory for a lazily
//! pulled [`StoryThread`] of [`StoryOutput`] items. The story flattens
//! embedded passages and fragments into one stream, records output in an
//! [`OutputList`], applies nested styles, and runs every lifecycle
//! notification through a pausable [`CallbackSequence`] so listeners and cues
//! can pause playback at any point and resume it later exactly where it left off.
//!
//! # Features
//!
//! - **State machine**: `Idle`, `Playing`, `Paused` and `Exiting`, with
//!   precise `InvalidState` errors for illegal calls
//! - **Cues**: handlers resolved per passage or link and lifecycle event
//!   through a [`CueResolver`], cached per story
//! - **Listeners**: synchronous host notifications via [`StoryEvent`]
//! - **Configuration**: [`StoryConfig`] loaded from TOML
//!
//! # Example
//!
//! ```
//! use quill_story::{CueEvent, CueRegistry, Link, Passage, PassageRegistry, Sequence, Story};
//!
//! let passages = PassageRegistry::new()
//!     .with(Passage::new("Start", |_| {
//!         Sequence::new()
//!             .text("A door.")
//!             .link("Open it", Link::to("Hall"))
//!             .boxed()
//!     }))
//!     .with(Passage::new("Hall", |_| Sequence::new().text("A hall.").boxed()));
//!
//! let mut cues = CueRegistry::new();
//! cues.on("Hall", CueEvent::Enter, |story| {
//!     let _ = story.pause();
//! });
//!
//! let mut story = Story::new(passages).with_cue_resolver(cues);
//! story.begin()?;
//! story.do_link("Open it")?;
//!
//! // The Hall enter cue paused before any of its output was produced.
//! assert_eq!(story.current_text(), "");
//! story.resume()?;
//! assert_eq!(story.current_text(), "A hall.");
//! # Ok::<(), quill_story::QuillError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod collapse;
mod config;
mod cue;
mod events;
mod executor;
mod output;
mod passage;
pub mod sequence;
mod state;
mod story;
pub mod thread;
mod variables;

pub use clock::PassageClock;
pub use collapse::CollapsedThread;
pub use config::{StoryConfig, StoryConfigBuilder, StoryConfigBuilderError};
pub use cue::{BoundCue, Cue, CueArgs, CueEvent, CueHandler, CueRegistry, CueResolver, NoCues};
pub use events::{GuardPhase, Listener, ListenerId, PhaseToken, StateChangeLock, StoryEvent};
pub use output::{Abort, EmbedFragment, EmbedPassage, Link, OutputKind, StoryOutput, ThreadAction};
pub use passage::{Passage, PassageFactory, PassageRegistry};
pub use sequence::{Action, CallbackSequence, Invocable, SequenceHost};
pub use state::StoryState;
pub use story::{LinkSelector, Story};
pub use thread::{BoxedThread, InsertAt, Sequence, Step, StoryThread, Styled};
pub use variables::{VariableStore, Variables};

pub use quill_core::{OutputId, OutputList, Style, StyleGroup, StyleScope};
pub use quill_error::{QuillError, QuillResult, StoryError, StoryErrorKind};
