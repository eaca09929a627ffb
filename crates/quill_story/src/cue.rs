//! Cues: handlers invoked at passage and link lifecycle events.
//!
//! The story decides which contexts and events to ask for and in what order;
//! a [`CueResolver`] maps each (context, event) pair to the handlers to run.
//! Resolved lists are cached until [`crate::Story::reset_cue_cache`].

use crate::sequence::Invocable;
use crate::{Story, StoryOutput};
use quill_error::{StoryError, StoryErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::{trace, warn};

/// Lifecycle events cues can be attached to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum CueEvent {
    /// Passage entered, link activated, or passage embedded
    Enter,
    /// Passage being left
    Exit,
    /// Every host tick while a passage is loaded
    Update,
    /// An output was emitted
    Output,
    /// The thread stopped on an abort
    Aborted,
    /// The thread ran to its end
    Done,
}

/// The callable part of a cue.
#[derive(Clone)]
pub enum CueHandler {
    /// Takes no arguments beyond the story
    Plain(Rc<dyn Fn(&mut Story)>),
    /// Takes the output that triggered the event
    WithOutput(Rc<dyn Fn(&mut Story, &StoryOutput)>),
}

/// Arguments an event supplies to its cues.
#[derive(Debug, Clone, Default)]
pub enum CueArgs {
    /// Nothing beyond the story
    #[default]
    None,
    /// The output being dispatched
    Output(StoryOutput),
}

/// A named handler.
#[derive(Clone)]
pub struct Cue {
    name: String,
    handler: CueHandler,
}

impl Cue {
    /// A handler taking only the story.
    pub fn plain(name: impl Into<String>, handler: impl Fn(&mut Story) + 'static) -> Self {
        Self {
            name: name.into(),
            handler: CueHandler::Plain(Rc::new(handler)),
        }
    }

    /// A handler taking the story and the triggering output.
    pub fn with_output(
        name: impl Into<String>,
        handler: impl Fn(&mut Story, &StoryOutput) + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            handler: CueHandler::WithOutput(Rc::new(handler)),
        }
    }

    /// Cue name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handler.
    pub fn handler(&self) -> &CueHandler {
        &self.handler
    }

    /// Invokes the handler with the event's arguments.
    ///
    /// # Errors
    ///
    /// Returns `HandlerShape` when the handler expects arguments the event
    /// does not supply. The handler is not called in that case.
    pub fn invoke(&self, story: &mut Story, event: CueEvent, args: &CueArgs) -> Result<(), StoryError> {
        match (&self.handler, args) {
            (CueHandler::Plain(handler), _) => {
                trace!(cue = %self.name, %event, "Invoking cue");
                handler(story);
                Ok(())
            }
            (CueHandler::WithOutput(handler), CueArgs::Output(output)) => {
                trace!(cue = %self.name, %event, output = %output.id(), "Invoking cue");
                handler(story, output);
                Ok(())
            }
            (CueHandler::WithOutput(_), CueArgs::None) => {
                Err(StoryError::new(StoryErrorKind::HandlerShape {
                    cue: self.name.clone(),
                    event: event.to_string(),
                    reason: "handler expects an output but the event supplies none".to_string(),
                }))
            }
        }
    }

    /// Invokes the handler, logging and skipping it if its shape does not fit.
    pub fn invoke_or_skip(&self, story: &mut Story, event: CueEvent, args: &CueArgs) {
        if let Err(err) = self.invoke(story, event, args) {
            warn!(error = %err, "Skipping malformed cue");
        }
    }
}

impl fmt::Debug for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self.handler {
            CueHandler::Plain(_) => "plain",
            CueHandler::WithOutput(_) => "with_output",
        };
        f.debug_struct("Cue")
            .field("name", &self.name)
            .field("shape", &shape)
            .finish()
    }
}

/// A cue bound to the event and arguments it will be invoked with.
#[derive(Debug, Clone)]
pub struct BoundCue {
    cue: Cue,
    event: CueEvent,
    args: CueArgs,
}

impl BoundCue {
    /// Binds a cue.
    pub fn new(cue: Cue, event: CueEvent, args: CueArgs) -> Self {
        Self { cue, event, args }
    }
}

impl Invocable<Story> for BoundCue {
    fn invoke(self, story: &mut Story) {
        self.cue.invoke_or_skip(story, self.event, &self.args);
    }
}

/// Maps a context (passage name, or passage and link name joined) and an
/// event to the ordered handlers to invoke.
pub trait CueResolver {
    /// Resolves the cues for `context` at `event`; empty when there are none.
    fn resolve(&self, context: &str, event: CueEvent) -> Vec<Cue>;
}

/// A resolver that never finds any cue.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCues;

impl CueResolver for NoCues {
    fn resolve(&self, _context: &str, _event: CueEvent) -> Vec<Cue> {
        Vec::new()
    }
}

/// Explicit cue table filled in at story construction time.
///
/// # Examples
///
/// ```
/// use quill_story::{CueEvent, CueRegistry, CueResolver};
///
/// let mut cues = CueRegistry::new();
/// cues.on("Start", CueEvent::Enter, |_story| println!("entered Start"));
/// cues.on_output("Start", CueEvent::Output, |_story, output| {
///     println!("emitted {:?}", output.text());
/// });
///
/// assert_eq!(cues.resolve("Start", CueEvent::Enter).len(), 1);
/// assert!(cues.resolve("Start", CueEvent::Exit).is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CueRegistry {
    cues: HashMap<(String, CueEvent), Vec<Cue>>,
}

impl CueRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a cue for `context` at `event`, after any already registered.
    pub fn register(&mut self, context: impl Into<String>, event: CueEvent, cue: Cue) -> &mut Self {
        self.cues.entry((context.into(), event)).or_default().push(cue);
        self
    }

    /// Registers a plain handler named after its context and event.
    pub fn on(
        &mut self,
        context: impl Into<String>,
        event: CueEvent,
        handler: impl Fn(&mut Story) + 'static,
    ) -> &mut Self {
        let context = context.into();
        let cue = Cue::plain(format!("{}_{}", context, event), handler);
        self.register(context, event, cue)
    }

    /// Registers a handler taking the triggering output.
    pub fn on_output(
        &mut self,
        context: impl Into<String>,
        event: CueEvent,
        handler: impl Fn(&mut Story, &StoryOutput) + 'static,
    ) -> &mut Self {
        let context = context.into();
        let cue = Cue::with_output(format!("{}_{}", context, event), handler);
        self.register(context, event, cue)
    }

    /// Number of registered cues.
    pub fn len(&self) -> usize {
        self.cues.values().map(Vec::len).sum()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }
}

impl CueResolver for CueRegistry {
    fn resolve(&self, context: &str, event: CueEvent) -> Vec<Cue> {
        self.cues
            .get(&(context.to_string(), event))
            .cloned()
            .unwrap_or_default()
    }
}

/// Per-story cache of resolved cue lists.
#[derive(Debug, Default)]
pub(crate) struct CueCache {
    entries: HashMap<(String, CueEvent), Vec<Cue>>,
}

impl CueCache {
    pub(crate) fn resolve(
        &mut self,
        resolver: &dyn CueResolver,
        context: &str,
        event: CueEvent,
    ) -> Vec<Cue> {
        self.entries
            .entry((context.to_string(), event))
            .or_insert_with(|| resolver.resolve(context, event))
            .clone()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
