//! Host notifications and the state-change guard.

use crate::{Story, StoryOutput, StoryState};
use quill_error::StoryErrorKind;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Notification broadcast to host listeners.
#[derive(Debug, Clone, strum::AsRefStr)]
pub enum StoryEvent {
    /// A passage was entered
    PassageEntered {
        /// Passage name
        passage: String,
    },
    /// A passage is being left
    PassageExited {
        /// Passage name
        passage: String,
    },
    /// The passage thread ran to its end or aborted
    PassageDone {
        /// Passage name
        passage: String,
        /// True if the thread stopped on an abort
        aborted: bool,
    },
    /// The playback state changed
    StateChanged {
        /// Previous state
        from: StoryState,
        /// New state
        to: StoryState,
    },
    /// A link was activated
    LinkEntered {
        /// Passage the link belongs to
        passage: String,
        /// Link name
        link: String,
    },
    /// A link's action ran to its end or aborted
    LinkDone {
        /// Passage the link belongs to
        passage: String,
        /// Link name
        link: String,
        /// True if the action stopped on an abort
        aborted: bool,
    },
    /// An output was added to the output list
    OutputAdded(StoryOutput),
    /// An output was removed from the output list
    OutputRemoved(StoryOutput),
}

impl StoryEvent {
    /// Variant name, for logs and test recorders.
    pub fn name(&self) -> &str {
        self.as_ref()
    }
}

/// Host listener callback.
pub type Listener = Rc<dyn Fn(&mut Story, &StoryEvent)>;

/// Handle returned by [`Story::add_listener`], used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
#[display("listener #{}", _0)]
pub struct ListenerId(pub(crate) u64);

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Listener)>,
}

impl Listeners {
    pub(crate) fn add(&mut self, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Registration-ordered copy, so listeners may add or remove listeners.
    pub(crate) fn snapshot(&self) -> Vec<Listener> {
        self.entries.iter().map(|(_, l)| Rc::clone(l)).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

/// Windows during which `pause` and `resume` are refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum GuardPhase {
    /// Broadcasting a state change
    #[display("broadcasting a state change")]
    StateBroadcast,
    /// Sending a newly opened style group
    #[display("sending a style group")]
    StyleSend,
    /// Notifying listeners of a removed output
    #[display("removing an output")]
    OutputRemoval,
}

/// Proof that a guarded phase is open; hand it back to close the phase.
#[derive(Debug)]
#[must_use = "a guarded phase stays open until its token is returned"]
pub struct PhaseToken {
    phase: GuardPhase,
    depth: usize,
}

impl PhaseToken {
    /// Phase this token belongs to.
    pub fn phase(&self) -> GuardPhase {
        self.phase
    }
}

/// Tracks open guarded phases.
///
/// Phases nest (a style group sent from a state-change listener, say);
/// state changes are allowed only when none is open.
#[derive(Debug, Default)]
pub struct StateChangeLock {
    open: Vec<GuardPhase>,
}

impl StateChangeLock {
    /// Opens a phase.
    pub fn enter(&mut self, phase: GuardPhase) -> PhaseToken {
        self.open.push(phase);
        trace!(%phase, depth = self.open.len(), "Entered guarded phase");
        PhaseToken {
            phase,
            depth: self.open.len(),
        }
    }

    /// Closes the phase the token was issued for, and any phase opened inside it.
    pub fn exit(&mut self, token: PhaseToken) {
        self.open.truncate(token.depth.saturating_sub(1));
        trace!(phase = %token.phase, depth = self.open.len(), "Exited guarded phase");
    }

    /// True when no guarded phase is open.
    pub fn allows_state_changes(&self) -> bool {
        self.open.is_empty()
    }

    /// Innermost open phase.
    pub fn current_phase(&self) -> Option<GuardPhase> {
        self.open.last().copied()
    }

    /// `InvalidState` describing why `operation` is refused right now.
    pub(crate) fn refusal(&self, operation: &str, state: StoryState) -> Option<StoryErrorKind> {
        self.current_phase().map(|phase| {
            StoryErrorKind::invalid_state(
                operation,
                state.to_string(),
                format!("state changes are not allowed while {}", phase),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_phases_release_in_order() {
        let mut lock = StateChangeLock::default();
        assert!(lock.allows_state_changes());

        let outer = lock.enter(GuardPhase::StateBroadcast);
        let inner = lock.enter(GuardPhase::StyleSend);
        assert_eq!(lock.current_phase(), Some(GuardPhase::StyleSend));

        lock.exit(inner);
        assert_eq!(lock.current_phase(), Some(GuardPhase::StateBroadcast));
        assert!(!lock.allows_state_changes());

        lock.exit(outer);
        assert!(lock.allows_state_changes());
    }

    #[test]
    fn test_refusal_names_the_phase() {
        let mut lock = StateChangeLock::default();
        assert!(lock.refusal("pause", StoryState::Playing).is_none());

        let token = lock.enter(GuardPhase::OutputRemoval);
        let kind = lock.refusal("pause", StoryState::Playing).unwrap();
        assert!(kind.to_string().contains("removing an output"));
        lock.exit(token);
    }

    #[test]
    fn test_listener_ids_are_unique_and_removable() {
        let mut listeners = Listeners::default();
        let a = listeners.add(Rc::new(|_, _| {}));
        let b = listeners.add(Rc::new(|_, _| {}));
        assert_ne!(a, b);
        assert!(listeners.remove(a));
        assert!(!listeners.remove(a));
        assert_eq!(listeners.len(), 1);
    }
}
