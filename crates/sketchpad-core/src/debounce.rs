//! Coalesces bursts of trigger events into one delayed action.

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Default quiet period before a resize is applied.
pub const DEFAULT_DEBOUNCE_MS: u64 = 130;

/// Trailing-edge debouncer driven by explicit timestamps.
///
/// Every [`Debouncer::trigger`] pushes the deadline out; [`Debouncer::poll`]
/// fires exactly once after the deadline has passed.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a trigger, superseding any pending deadline.
    pub fn trigger(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Returns true once when the quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Time at which the pending action fires.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the pending action is due, zero once it is.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Drop any pending action.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }
}
