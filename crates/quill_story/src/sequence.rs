//! Pausable, ordered callback sequences.
//!
//! Every multi-step notification phase (exit, enter, output dispatch, done)
//! is a [`CallbackSequence`]: a queue of deferred actions and one optional
//! completion action. [`invoke`] runs the actions in insertion order and
//! checks after each one whether the host has been paused; if so it stops,
//! leaving the remaining actions queued, and a later [`invoke`] continues
//! from exactly that point.
//!
//! An action may install a different sequence in the host (a done cue that
//! redirects the story, say). The running sequence is then superseded: its
//! remaining actions and completion are dropped.

use quill_error::{QuillResult, StoryError, StoryErrorKind};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// A deferred action run against the sequence's host.
pub type Action<C> = Box<dyn FnOnce(&mut C) -> QuillResult<()>>;

/// Something that can be queued as a single action, such as a resolved cue
/// bound to its arguments.
pub trait Invocable<C> {
    /// Runs the item against the host.
    fn invoke(self, host: &mut C);
}

/// The owner of a callback sequence.
pub trait SequenceHost: Sized {
    /// Slot holding the active sequence.
    fn sequence_slot(&mut self) -> &mut Option<CallbackSequence<Self>>;

    /// True once an action has paused the host.
    fn is_paused(&self) -> bool;
}

/// An ordered list of deferred actions plus a completion action.
pub struct CallbackSequence<C> {
    serial: u64,
    label: &'static str,
    actions: VecDeque<Action<C>>,
    completion: Option<Action<C>>,
    started: bool,
    completed: bool,
    invoked: usize,
}

impl<C> CallbackSequence<C> {
    /// Creates an empty sequence; `label` names the phase in logs.
    pub fn new(label: &'static str) -> Self {
        Self {
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
            label,
            actions: VecDeque::new(),
            completion: None,
            started: false,
            completed: false,
            invoked: 0,
        }
    }

    /// Phase label.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Process-unique number identifying this sequence.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Appends an action.
    ///
    /// # Errors
    ///
    /// Returns `SequenceAlreadyStarted` once invocation has begun.
    pub fn add(&mut self, action: Action<C>) -> QuillResult<()> {
        self.ensure_not_started()?;
        self.actions.push_back(action);
        Ok(())
    }

    /// Appends one action per item.
    ///
    /// # Errors
    ///
    /// Returns `SequenceAlreadyStarted` once invocation has begun.
    pub fn add_all<I>(&mut self, items: I) -> QuillResult<()>
    where
        C: 'static,
        I: IntoIterator,
        I::Item: Invocable<C> + 'static,
    {
        self.ensure_not_started()?;
        for item in items {
            self.actions.push_back(Box::new(move |host: &mut C| {
                item.invoke(host);
                Ok(())
            }));
        }
        Ok(())
    }

    /// Sets the action run once after every other action has run.
    ///
    /// # Errors
    ///
    /// Returns `SequenceAlreadyStarted` once invocation has begun.
    pub fn on_complete(&mut self, action: Action<C>) -> QuillResult<()> {
        self.ensure_not_started()?;
        self.completion = Some(action);
        Ok(())
    }

    /// True once invocation has begun.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// True once the completion stage has been reached.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// True while actions or the completion stage remain.
    pub fn has_pending(&self) -> bool {
        !self.completed
    }

    /// Number of actions not yet run.
    pub fn remaining(&self) -> usize {
        self.actions.len()
    }

    /// Number of actions already run.
    pub fn invoked(&self) -> usize {
        self.invoked
    }

    fn ensure_not_started(&self) -> QuillResult<()> {
        if self.started {
            return Err(StoryError::new(StoryErrorKind::SequenceAlreadyStarted).into());
        }
        Ok(())
    }

    fn next_action(&mut self) -> QuillResult<Option<Action<C>>> {
        if self.completed {
            return Err(StoryError::new(StoryErrorKind::SequenceCompleted).into());
        }
        self.started = true;
        let action = self.actions.pop_front();
        if action.is_some() {
            self.invoked += 1;
        }
        Ok(action)
    }

    fn finish(&mut self) -> Option<Action<C>> {
        self.completed = true;
        self.completion.take()
    }
}

impl<C> fmt::Debug for CallbackSequence<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSequence")
            .field("label", &self.label)
            .field("remaining", &self.actions.len())
            .field("invoked", &self.invoked)
            .field("has_completion", &self.completion.is_some())
            .field("started", &self.started)
            .field("completed", &self.completed)
            .finish()
    }
}

/// Runs the host's active sequence until it completes or the host pauses.
///
/// Does nothing when no sequence is installed. The completion action runs
/// at most once; it may install a new sequence in the host's slot. If an
/// ordinary action installs one instead, invocation stops there.
///
/// # Errors
///
/// Propagates the first error returned by an action, leaving the remaining
/// actions queued. Returns `SequenceCompleted` if the installed sequence has
/// already finished.
pub fn invoke<C: SequenceHost>(host: &mut C) -> QuillResult<()> {
    let Some(serial) = host.sequence_slot().as_ref().map(|sequence| sequence.serial) else {
        return Ok(());
    };

    loop {
        let next = match host.sequence_slot().as_mut() {
            Some(sequence) if sequence.serial == serial => sequence.next_action()?,
            _ => {
                debug!("Callback sequence superseded");
                return Ok(());
            }
        };

        match next {
            Some(action) => {
                action(host)?;
                if host.is_paused() {
                    if let Some(sequence) = host.sequence_slot().as_ref() {
                        debug!(
                            phase = sequence.label(),
                            remaining = sequence.remaining(),
                            "Callback sequence paused"
                        );
                    }
                    return Ok(());
                }
            }
            None => {
                let completion = host.sequence_slot().as_mut().and_then(CallbackSequence::finish);
                trace!("Callback sequence completed");
                if let Some(completion) = completion {
                    completion(host)?;
                }
                return Ok(());
            }
        }
    }
}
