//! Time spent in the current passage.

use std::time::{Duration, Instant};

/// Measures time since passage entry, excluding time spent paused.
#[derive(Debug, Clone, Default)]
pub struct PassageClock {
    entered_at: Option<Instant>,
    paused_at: Option<Instant>,
    paused_total: Duration,
}

impl PassageClock {
    /// Creates a stopped clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restarts the clock for a newly entered passage.
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    /// Stops counting until [`PassageClock::resume`].
    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    /// Resumes counting, adding the paused interval to the excluded total.
    pub fn resume(&mut self) {
        self.resume_at(Instant::now());
    }

    /// Clears the clock.
    pub fn stop(&mut self) {
        *self = Self::default();
    }

    /// Elapsed passage time. Frozen while paused, zero before the first entry.
    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    fn start_at(&mut self, now: Instant) {
        self.entered_at = Some(now);
        self.paused_at = None;
        self.paused_total = Duration::ZERO;
    }

    fn pause_at(&mut self, now: Instant) {
        if self.entered_at.is_some() && self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    fn resume_at(&mut self, now: Instant) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += now.saturating_duration_since(paused_at);
        }
    }

    fn elapsed_at(&self, now: Instant) -> Duration {
        let Some(entered_at) = self.entered_at else {
            return Duration::ZERO;
        };
        let end = self.paused_at.unwrap_or(now);
        end.saturating_duration_since(entered_at)
            .saturating_sub(self.paused_total)
    }
}
