//! Story playback error types.

/// Specific error conditions raised by story playback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum StoryErrorKind {
    /// Operation is not legal in the story's current state
    #[display("Cannot {} while the story is {}: {}", operation, state, hint)]
    InvalidState {
        /// Operation that was attempted (e.g. "go to a passage")
        operation: String,
        /// State the story was in
        state: String,
        /// What the caller has to do first
        hint: String,
    },
    /// No passage is registered under the requested name
    #[display("Passage '{}' does not exist", _0)]
    PassageNotFound(String),
    /// No link with the requested name or index is in the current output
    #[display("Link '{}' is not in the current output", _0)]
    LinkNotFound(String),
    /// A style scope was closed while another scope was on top of the stack
    #[display("Style scope {} closed out of order (top of stack is {})", found, expected)]
    StyleScopeOutOfOrder {
        /// Scope currently on top of the stack
        expected: String,
        /// Scope the caller tried to close
        found: String,
    },
    /// Insertion point stack was popped while empty
    #[display("Insertion point stack is empty")]
    InsertionStackEmpty,
    /// Insertion point lies beyond the end of the output list
    #[display("Insertion point {} is out of range for {} outputs", index, len)]
    InsertionPointOutOfRange {
        /// Requested position
        index: usize,
        /// Output list length at the time
        len: usize,
    },
    /// Actions were added to a callback sequence after invocation began
    #[display("Callback sequence cannot be modified after invocation has started")]
    SequenceAlreadyStarted,
    /// A callback sequence was invoked again after it completed
    #[display("Callback sequence has already completed")]
    SequenceCompleted,
    /// Embedded content nested deeper than the configured limit
    #[display("Embedding '{}' exceeds the maximum embed depth of {}", passage, depth)]
    EmbedDepthExceeded {
        /// Passage or fragment being embedded
        passage: String,
        /// Configured maximum depth
        depth: usize,
    },
    /// A resolved cue cannot be invoked for the event it was resolved for
    #[display("Cue '{}' cannot handle the {} event: {}", cue, event, reason)]
    HandlerShape {
        /// Cue name
        cue: String,
        /// Lifecycle event the cue was resolved for
        event: String,
        /// Why the handler does not fit
        reason: String,
    },
}

impl StoryErrorKind {
    /// Builds an `InvalidState` kind.
    pub fn invalid_state(
        operation: impl Into<String>,
        state: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            state: state.into(),
            hint: hint.into(),
        }
    }

    /// True for operations rejected by the state machine.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }

    /// True for lookups of unknown passages or links.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PassageNotFound(_) | Self::LinkNotFound(_))
    }

    /// True for programmer or content-author bugs that cannot be recovered from.
    pub fn is_internal_consistency(&self) -> bool {
        matches!(
            self,
            Self::StyleScopeOutOfOrder { .. }
                | Self::InsertionStackEmpty
                | Self::InsertionPointOutOfRange { .. }
                | Self::SequenceAlreadyStarted
                | Self::SequenceCompleted
                | Self::EmbedDepthExceeded { .. }
        )
    }
}

/// Error type for story playback.
///
/// # Examples
///
/// ```
/// use quill_error::{StoryError, StoryErrorKind};
///
/// let err = StoryError::new(StoryErrorKind::PassageNotFound("Cellar".into()));
/// assert!(format!("{}", err).contains("Cellar"));
/// assert!(err.kind.is_not_found());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Story Error: {} at line {} in {}", kind, line, file)]
pub struct StoryError {
    /// The specific error condition
    pub kind: StoryErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl StoryError {
    /// Create a new StoryError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StoryErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &StoryErrorKind {
        &self.kind
    }
}
