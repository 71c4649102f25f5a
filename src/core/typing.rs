//! # Typing Debouncer
//!
//! Collapses a burst of keystrokes into one coarse "composing" flag.
//!
//! ```text
//!            non-empty input                 input (re-arm deadline)
//!   ┌──────┐ ───────────────▶ ┌───────────┐ ◀──────┐
//!   │ idle │                  │ composing │ ───────┘
//!   └──────┘ ◀─────────────── └───────────┘
//!            deadline elapsed, send, cancel
//! ```
//!
//! The debouncer owns its timer as a single `deadline`. Re-arming replaces it,
//! so there is never more than one pending transition. The event loop sleeps
//! until `deadline()` and calls `poll()`; the debouncer itself does no I/O.

use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_TYPING_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct TypingDebouncer {
    timeout: Duration,
    composing: bool,
    last_input: Option<Instant>,
    deadline: Option<Instant>,
}

impl Default for TypingDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_TIMEOUT)
    }
}

impl TypingDebouncer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            composing: false,
            last_input: None,
            deadline: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_composing(&self) -> bool {
        self.composing
    }

    pub fn last_input(&self) -> Option<Instant> {
        self.last_input
    }

    /// When the pending idle transition fires, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Records a local input change. Returns true if this started composing.
    pub fn on_input(&mut self, text: &str, now: Instant) -> bool {
        if !self.composing && text.is_empty() {
            return false;
        }
        let started = !self.composing;
        self.composing = true;
        self.last_input = Some(now);
        self.deadline = Some(now + self.timeout);
        started
    }

    /// Send forces idle immediately. Returns true if the flag changed.
    pub fn on_send(&mut self) -> bool {
        self.go_idle()
    }

    /// Fires the idle transition if the deadline has passed. Returns true if the flag changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => self.go_idle(),
            _ => false,
        }
    }

    /// Drops the pending transition and resets to idle. Used on teardown.
    pub fn cancel(&mut self) {
        self.go_idle();
        self.last_input = None;
    }

    fn go_idle(&mut self) -> bool {
        self.deadline = None;
        std::mem::replace(&mut self.composing, false)
    }
}
