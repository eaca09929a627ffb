//! Playback states.

use serde::{Deserialize, Serialize};

/// Overall playback state of a story.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
)]
pub enum StoryState {
    /// No thread running; ready for `go_to`, `do_link` or `reset`
    #[default]
    Idle,
    /// A thread is being pulled or a notification phase is running
    Playing,
    /// Suspended mid-thread or mid-notification phase
    Paused,
    /// Running exit notifications for the passage being left
    Exiting,
}

impl StoryState {
    /// Hint attached to `InvalidState` errors for operations that need `Idle`.
    pub(crate) fn idle_hint(self) -> &'static str {
        match self {
            Self::Paused => "resume first",
            Self::Playing | Self::Exiting => "must be idle",
            Self::Idle => "reset first",
        }
    }

    /// True while a thread or notification phase may still make progress.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Playing | Self::Exiting)
    }
}
