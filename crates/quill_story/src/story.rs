//! The story state machine.
//!
//! [`Story`] owns every piece of playback state: the passage registry, the
//! active collapsed thread, the output list with its insertion points, the
//! style stack, the active callback sequence and passage history. All entry
//! points run synchronously to completion or until something pauses the story.

use crate::collapse::CollapsedThread;
use crate::cue::{Cue, CueArgs, CueCache, CueEvent, CueResolver, NoCues};
use crate::executor::Pulled;
use crate::events::{GuardPhase, Listener, ListenerId, Listeners, StateChangeLock};
use crate::sequence::{CallbackSequence, SequenceHost};
use crate::{
    Link, OutputKind, Passage, PassageClock, PassageRegistry, StoryConfig, StoryEvent,
    StoryOutput, StoryState, VariableStore, Variables, thread,
};
use quill_core::{Indexed, OutputId, OutputList, Style, StyleGroup, StyleScope, StyleStack};
use quill_error::{QuillResult, StoryError, StoryErrorKind};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Identifies the link [`Story::do_link`] should follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkSelector {
    /// Link output with this name
    Name(String),
    /// Position among the current links
    Index(usize),
    /// Link output with this id
    Output(OutputId),
}

impl fmt::Display for LinkSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{}", name),
            Self::Index(index) => write!(f, "link #{}", index),
            Self::Output(id) => write!(f, "output {}", id),
        }
    }
}

impl From<&str> for LinkSelector {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for LinkSelector {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for LinkSelector {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&StoryOutput> for LinkSelector {
    fn from(output: &StoryOutput) -> Self {
        Self::Output(output.id())
    }
}

/// A playable story.
///
/// # Examples
///
/// ```
/// use quill_story::{Link, Passage, PassageRegistry, Sequence, Story, StoryState};
///
/// let passages = PassageRegistry::new()
///     .with(Passage::new("Start", |_| {
///         Sequence::new().text("Hi").link("Go", Link::to("Room")).boxed()
///     }))
///     .with(Passage::new("Room", |_| Sequence::new().text("A room.").boxed()));
///
/// let mut story = Story::new(passages);
/// story.begin()?;
/// assert_eq!(story.current_text(), "Hi");
/// assert!(story.has_link("Go"));
///
/// story.do_link("Go")?;
/// assert_eq!(story.current_passage(), Some("Room"));
/// assert_eq!(story.passage_history(), ["Start"]);
/// assert_eq!(story.state(), StoryState::Idle);
/// # Ok::<(), quill_error::QuillError>(())
/// ```
pub struct Story {
    pub(crate) config: StoryConfig,
    pub(crate) passages: PassageRegistry,
    pub(crate) cue_resolver: Rc<dyn CueResolver>,
    pub(crate) cue_cache: CueCache,
    pub(crate) variables: Box<dyn VariableStore>,
    pub(crate) state: StoryState,
    pub(crate) lock: StateChangeLock,
    pub(crate) listeners: Listeners,
    pub(crate) output: OutputList<StoryOutput>,
    pub(crate) styles: StyleStack,
    pub(crate) thread: Option<CollapsedThread>,
    pub(crate) callbacks: Option<CallbackSequence<Story>>,
    pub(crate) running_sequences: Vec<u64>,
    pub(crate) pull_depth: usize,
    pub(crate) held_pull: Option<Pulled>,
    pub(crate) current_passage: Option<String>,
    pub(crate) history: Vec<String>,
    pub(crate) current_link: Option<StoryOutput>,
    pub(crate) links_done: usize,
    pub(crate) update_cues: Vec<Cue>,
    pub(crate) clock: PassageClock,
    pub(crate) begun: bool,
}

impl Story {
    /// Creates an idle story with default configuration, no cues and an
    /// empty [`Variables`] store.
    pub fn new(passages: PassageRegistry) -> Self {
        Self {
            config: StoryConfig::default(),
            passages,
            cue_resolver: Rc::new(NoCues),
            cue_cache: CueCache::default(),
            variables: Box::new(Variables::new()),
            state: StoryState::Idle,
            lock: StateChangeLock::default(),
            listeners: Listeners::default(),
            output: OutputList::new(),
            styles: StyleStack::new(),
            thread: None,
            callbacks: None,
            running_sequences: Vec::new(),
            pull_depth: 0,
            held_pull: None,
            current_passage: None,
            history: Vec::new(),
            current_link: None,
            links_done: 0,
            update_cues: Vec::new(),
            clock: PassageClock::new(),
            begun: false,
        }
    }

    /// Builder method replacing the configuration.
    pub fn with_config(mut self, config: StoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Builder method installing the cue resolver.
    pub fn with_cue_resolver(mut self, resolver: impl CueResolver + 'static) -> Self {
        self.cue_resolver = Rc::new(resolver);
        self.cue_cache.clear();
        self
    }

    /// Builder method installing the variable system.
    pub fn with_variables(mut self, variables: impl VariableStore + 'static) -> Self {
        self.variables = Box::new(variables);
        self
    }

    /// Goes to the configured start passage.
    ///
    /// # Errors
    ///
    /// Same as [`Story::go_to`].
    pub fn begin(&mut self) -> QuillResult<()> {
        let start = self.config.start_passage().clone();
        self.go_to(&start)
    }

    /// Leaves the current passage, if any, and enters `name`.
    ///
    /// Exit notifications run first (listeners, then exit cues with embedded
    /// passages before the passage that embedded them); the departing passage
    /// is then appended to history and `name` is entered and played.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the story is idle, `PassageNotFound` if `name`
    /// is not registered. Errors raised by passage content are propagated.
    #[instrument(skip(self), fields(state = %self.state))]
    pub fn go_to(&mut self, name: &str) -> QuillResult<()> {
        self.require_idle("go to a passage")?;
        self.passages.get(name)?;
        self.begun = true;

        match self.current_passage.clone() {
            None => self.enter(name),
            Some(current) => self.exit_to(current, name.to_string()),
        }
    }

    /// Suspends playback.
    ///
    /// Callable from listeners and cues: the running notification phase or
    /// thread stops after the current action and picks up from there on
    /// [`Story::resume`].
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the story is playing or exiting, or while a
    /// guarded notification (state change, style group, output removal) is
    /// being delivered.
    #[instrument(skip(self), fields(state = %self.state))]
    pub fn pause(&mut self) -> QuillResult<()> {
        if let Some(kind) = self.lock.refusal("pause", self.state) {
            return Err(StoryError::new(kind).into());
        }
        if !self.state.is_active() {
            return Err(StoryError::new(StoryErrorKind::invalid_state(
                "pause",
                self.state.to_string(),
                "must be playing",
            ))
            .into());
        }
        self.clock.pause();
        self.set_state(StoryState::Paused);
        Ok(())
    }

    /// Continues playback from exactly where it was paused.
    ///
    /// When called from inside a running phase (a cue that pauses and
    /// resumes), only the state changes; the running phase carries on.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the story is paused or while a guarded
    /// notification is being delivered. Errors raised by passage content are
    /// propagated.
    #[instrument(skip(self), fields(state = %self.state))]
    pub fn resume(&mut self) -> QuillResult<()> {
        if let Some(kind) = self.lock.refusal("resume", self.state) {
            return Err(StoryError::new(kind).into());
        }
        if self.state != StoryState::Paused {
            return Err(StoryError::new(StoryErrorKind::invalid_state(
                "resume",
                self.state.to_string(),
                "not paused",
            ))
            .into());
        }
        self.clock.resume();
        self.set_state(StoryState::Playing);

        if self.phase_in_progress() {
            debug!("Resumed inside a running phase");
            return Ok(());
        }

        if self
            .callbacks
            .as_ref()
            .is_some_and(CallbackSequence::has_pending)
        {
            self.run_callbacks()?;
        }
        if self.thread.is_some() && self.state == StoryState::Playing {
            self.execute_current_thread()?;
        }
        Ok(())
    }

    /// Clears history, output and the current passage, and resets variables.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the story is idle.
    #[instrument(skip(self))]
    pub fn reset(&mut self) -> QuillResult<()> {
        self.require_idle("reset")?;
        info!(passages_visited = self.history.len(), "Resetting story");
        self.history.clear();
        self.output.clear();
        self.styles.clear();
        self.current_passage = None;
        self.current_link = None;
        self.links_done = 0;
        self.update_cues.clear();
        self.callbacks = None;
        self.held_pull = None;
        self.clock.stop();
        self.begun = false;
        self.variables.reset();
        Ok(())
    }

    /// Follows a link in the current output.
    ///
    /// The link's action runs as its own thread, with link enter cues
    /// (context `passage` + separator + `link`) fired first. When the thread
    /// ends the story moves on to the link's target passage, if it has one.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the story is idle, `LinkNotFound` if no current
    /// link matches. Errors raised by the action's content are propagated.
    #[instrument(skip(self, selector), fields(state = %self.state))]
    pub fn do_link(&mut self, selector: impl Into<LinkSelector>) -> QuillResult<()> {
        let selector = selector.into();
        self.require_idle("follow a link")?;

        let link = self
            .find_link(&selector)
            .cloned()
            .ok_or_else(|| StoryError::new(StoryErrorKind::LinkNotFound(selector.to_string())))?;
        let link_name = link.name().unwrap_or_default().to_string();
        let passage = self.current_passage.clone().unwrap_or_default();
        debug!(link = %link_name, passage = %passage, "Following link");

        let content = link
            .as_link()
            .and_then(Link::action)
            .map_or_else(thread::empty, |action| action());
        self.thread = Some(CollapsedThread::new(content, *self.config.max_embed_depth()));
        self.held_pull = None;
        self.current_link = Some(link);
        self.set_state(StoryState::Playing);

        let context = self.link_context(&link_name);
        let mut sequence = CallbackSequence::new("link enter");
        sequence.add(Box::new(move |story: &mut Story| {
            story.broadcast(StoryEvent::LinkEntered {
                passage,
                link: link_name,
            });
            Ok(())
        }))?;
        sequence.add_all(self.bound_cues(&context, CueEvent::Enter, CueArgs::None))?;
        sequence.on_complete(Box::new(Story::continue_if_playing))?;
        self.start_sequence(sequence)
    }

    /// Runs update cues of the current passage and its embeds. The first tick
    /// of a fresh story begins playback when `auto_play` is set.
    ///
    /// # Errors
    ///
    /// Propagates errors from an automatic [`Story::begin`].
    pub fn tick(&mut self) -> QuillResult<()> {
        if *self.config.auto_play() && !self.begun && self.state == StoryState::Idle {
            debug!("Auto-playing story");
            self.begin()?;
        }
        if self.current_passage.is_some() {
            let cues = self.update_cues.clone();
            for cue in cues {
                cue.invoke_or_skip(self, CueEvent::Update, &CueArgs::None);
            }
        }
        Ok(())
    }

    /// Playback state.
    pub fn state(&self) -> StoryState {
        self.state
    }

    /// Configuration.
    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    /// Name of the loaded passage.
    pub fn current_passage(&self) -> Option<&str> {
        self.current_passage.as_deref()
    }

    /// Names of passages fully exited, oldest first.
    pub fn passage_history(&self) -> &[String] {
        &self.history
    }

    /// True unless the current passage has been exited before.
    pub fn is_first_visit_to_passage(&self) -> bool {
        self.current_passage
            .as_deref()
            .is_none_or(|current| !self.history.iter().any(|name| name == current))
    }

    /// Times `name` has been entered, counting the current visit.
    pub fn visit_count(&self, name: &str) -> usize {
        let exited = self.history.iter().filter(|visited| *visited == name).count();
        exited + usize::from(self.current_passage.as_deref() == Some(name))
    }

    /// Tags of the current passage.
    pub fn tags(&self) -> &[String] {
        self.current_passage
            .as_deref()
            .and_then(|name| self.passages.get(name).ok())
            .map(|passage| passage.tags().as_slice())
            .unwrap_or_default()
    }

    /// Output emitted since the current passage was entered.
    pub fn output(&self) -> &OutputList<StoryOutput> {
        &self.output
    }

    /// Links in the current output, in output order.
    pub fn current_links(&self) -> Vec<&StoryOutput> {
        self.output.iter().filter(|output| output.is_link()).collect()
    }

    /// True if a link named `name` is in the current output.
    pub fn has_link(&self, name: &str) -> bool {
        self.get_link(name).is_some()
    }

    /// The first current link named `name`.
    pub fn get_link(&self, name: &str) -> Option<&StoryOutput> {
        self.output
            .iter()
            .find(|output| output.is_link() && output.name() == Some(name))
    }

    /// Text of the current output: text items joined, line breaks as `\n`.
    pub fn current_text(&self) -> String {
        self.output
            .iter()
            .filter_map(|output| match output.kind() {
                OutputKind::Text => output.text(),
                OutputKind::LineBreak => Some("\n"),
                _ => None,
            })
            .collect()
    }

    /// Link whose action is running.
    pub fn current_link_in_action(&self) -> Option<&StoryOutput> {
        self.current_link.as_ref()
    }

    /// Links completed since the current passage was entered.
    pub fn links_done(&self) -> usize {
        self.links_done
    }

    /// Time spent in the current passage, not counting pauses.
    pub fn passage_time(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Looks up a passage.
    ///
    /// # Errors
    ///
    /// `PassageNotFound` if `name` is not registered.
    pub fn passage(&self, name: &str) -> Result<&Passage, StoryError> {
        self.passages.get(name)
    }

    /// Names of passages tagged `tag`, case-insensitively, ordered by name.
    pub fn passages_with_tag(&self, tag: &str) -> Vec<String> {
        self.passages.passages_with_tag(tag)
    }

    /// Passage registry.
    pub fn passages(&self) -> &PassageRegistry {
        &self.passages
    }

    /// Variable system.
    pub fn variables(&self) -> &dyn VariableStore {
        self.variables.as_ref()
    }

    /// Mutable variable system.
    pub fn variables_mut(&mut self) -> &mut dyn VariableStore {
        self.variables.as_mut()
    }

    /// Style applied to output emitted now.
    pub fn current_style(&self) -> Style {
        self.styles.current()
    }

    /// Opens a style scope: emits a style-group output and applies `style`
    /// to everything emitted until the scope is closed.
    ///
    /// Listeners are notified of the group with pausing disabled.
    ///
    /// # Errors
    ///
    /// Infallible today; fallible to keep room for validation.
    pub fn open_style(&mut self, style: Style) -> QuillResult<StyleScope> {
        let mut group = StoryOutput::style_group(style.clone());
        group.set_style(self.styles.current());
        let scope = StyleScope::new(group.id());

        let position = self.output.add(group.clone());
        group.set_index(Some(position));
        self.styles.push(scope, StyleGroup::new(style));
        debug!(%scope, depth = self.styles.depth(), "Opened style scope");

        self.broadcast_guarded(GuardPhase::StyleSend, StoryEvent::OutputAdded(group));
        Ok(scope)
    }

    /// Closes a style scope.
    ///
    /// # Errors
    ///
    /// `StyleScopeOutOfOrder` if `scope` is not the innermost open scope.
    pub fn close_style(&mut self, scope: StyleScope) -> QuillResult<()> {
        self.styles.pop(scope)?;
        debug!(%scope, depth = self.styles.depth(), "Closed style scope");
        Ok(())
    }

    /// Redirects subsequent output to `index` of the output list.
    ///
    /// # Errors
    ///
    /// `InsertionPointOutOfRange` if `index` is past the end of the output.
    pub fn push_insertion_point(&mut self, index: usize) -> QuillResult<()> {
        self.output.push_insertion_point(index)?;
        Ok(())
    }

    /// Drops the innermost insertion point, returning its final cursor.
    ///
    /// # Errors
    ///
    /// `InsertionStackEmpty` if none is active.
    pub fn pop_insertion_point(&mut self) -> QuillResult<usize> {
        Ok(self.output.pop_insertion_point()?)
    }

    /// Removes an output and notifies listeners, with pausing disabled.
    pub fn remove_output(&mut self, id: OutputId) -> Option<StoryOutput> {
        let removed = self.output.remove(id)?;
        self.broadcast_guarded(
            GuardPhase::OutputRemoval,
            StoryEvent::OutputRemoved(removed.clone()),
        );
        Some(removed)
    }

    /// Registers a host listener; listeners run in registration order.
    pub fn add_listener(&mut self, listener: impl Fn(&mut Story, &StoryEvent) + 'static) -> ListenerId {
        let listener: Listener = Rc::new(listener);
        self.listeners.add(listener)
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Forgets every resolved cue list; they are resolved again on next use.
    pub fn reset_cue_cache(&mut self) {
        debug!("Clearing cue cache");
        self.cue_cache.clear();
        self.refresh_update_cues();
    }

    fn require_idle(&self, operation: &str) -> Result<(), StoryError> {
        if self.state == StoryState::Idle {
            return Ok(());
        }
        Err(StoryError::new(StoryErrorKind::invalid_state(
            operation,
            self.state.to_string(),
            self.state.idle_hint(),
        )))
    }

    fn find_link(&self, selector: &LinkSelector) -> Option<&StoryOutput> {
        match selector {
            LinkSelector::Name(name) => self.get_link(name),
            LinkSelector::Index(index) => self.current_links().get(*index).copied(),
            LinkSelector::Output(id) => self.output.find(*id).filter(|output| output.is_link()),
        }
    }

    fn exit_to(&mut self, current: String, target: String) -> QuillResult<()> {
        debug!(from = %current, to = %target, "Exiting passage");
        self.set_state(StoryState::Exiting);

        let mut sequence = CallbackSequence::new("exit");
        let passage = current.clone();
        sequence.add(Box::new(move |story: &mut Story| {
            story.broadcast(StoryEvent::PassageExited { passage });
            Ok(())
        }))?;
        for context in self.cue_contexts(false) {
            sequence.add_all(self.bound_cues(&context, CueEvent::Exit, CueArgs::None))?;
        }
        sequence.on_complete(Box::new(move |story: &mut Story| {
            story.history.push(current);
            story.enter(&target)
        }))?;
        self.start_sequence(sequence)
    }

    fn enter(&mut self, name: &str) -> QuillResult<()> {
        let passage = self.passages.get(name)?.clone();
        info!(passage = %name, "Entering passage");

        self.output.clear();
        self.styles.clear();
        self.current_link = None;
        self.links_done = 0;
        self.current_passage = Some(name.to_string());
        self.clock.start();
        self.held_pull = None;
        self.thread = Some(CollapsedThread::new(
            passage.main_thread(&[]),
            *self.config.max_embed_depth(),
        ));
        self.set_state(StoryState::Playing);
        self.refresh_update_cues();

        let mut sequence = CallbackSequence::new("enter");
        let entered = name.to_string();
        sequence.add(Box::new(move |story: &mut Story| {
            story.broadcast(StoryEvent::PassageEntered { passage: entered });
            Ok(())
        }))?;
        sequence.add_all(self.bound_cues(name, CueEvent::Enter, CueArgs::None))?;
        sequence.on_complete(Box::new(Story::continue_if_playing))?;
        self.start_sequence(sequence)
    }

    /// True when the phase a resume would continue is still on the call
    /// stack: the installed sequence is mid-invocation, or content is being
    /// pulled. That phase carries on by itself once the state is Playing.
    fn phase_in_progress(&self) -> bool {
        self.pull_depth > 0
            || self
                .callbacks
                .as_ref()
                .is_some_and(|sequence| self.running_sequences.contains(&sequence.serial()))
    }

    pub(crate) fn set_state(&mut self, to: StoryState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        debug!(%from, %to, "Story state changed");
        self.broadcast_guarded(GuardPhase::StateBroadcast, StoryEvent::StateChanged { from, to });
    }

    pub(crate) fn broadcast(&mut self, event: StoryEvent) {
        for listener in self.listeners.snapshot() {
            listener(self, &event);
        }
    }

    pub(crate) fn broadcast_guarded(&mut self, phase: GuardPhase, event: StoryEvent) {
        for listener in self.listeners.snapshot() {
            let token = self.lock.enter(phase);
            listener(self, &event);
            self.lock.exit(token);
        }
    }
}

impl SequenceHost for Story {
    fn sequence_slot(&mut self) -> &mut Option<CallbackSequence<Self>> {
        &mut self.callbacks
    }

    fn is_paused(&self) -> bool {
        self.state == StoryState::Paused
    }
}

impl fmt::Debug for Story {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Story")
            .field("state", &self.state)
            .field("current_passage", &self.current_passage)
            .field("history", &self.history)
            .field("output_len", &self.output.len())
            .field("style_depth", &self.styles.depth())
            .field("has_thread", &self.thread.is_some())
            .field("callbacks", &self.callbacks)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}
