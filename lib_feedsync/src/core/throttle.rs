//! # Throttle Policy
//!
//! "At most once per window" rate limiting as a pure scheduling policy. The
//! caller supplies the current instant, so the policy can be tested without
//! sleeping and without a timer.
//!
//! Leading edge only: the first call after the window has elapsed passes and
//! opens a new window; every call inside the window is refused. Nothing is
//! deferred to the trailing edge.

use std::time::{Duration, Instant};

/// Rate limiter for a stream of events.
#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    opened_at: Option<Instant>,
}

impl Throttle {
    /// A throttle admitting one event per `window`.
    pub fn new(window: Duration) -> Self {
        Self { window, opened_at: None }
    }

    /// Whether an event at `now` may proceed. Passing opens a new window.
    pub fn allow(&mut self, now: Instant) -> bool {
        match self.opened_at {
            Some(opened) if now.saturating_duration_since(opened) < self.window => false,
            _ => {
                self.opened_at = Some(now);
                true
            }
        }
    }

    /// Forgets the current window.
    pub fn cancel(&mut self) {
        self.opened_at = None;
    }
}
