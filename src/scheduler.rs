//! Deferred actions for the owner loop.
//!
//! The link only ever needs one kind of timer: a cancellable one-shot
//! that the owner polls with the current time.  The runtime sleeps until
//! [`OneShot::deadline`], then calls [`OneShot::fire`]; nothing runs on
//! another thread, so cancel and fire never race.
//!
//! ```text
//!   arm(now, delay) ──▶ Armed(deadline) ──fire(now ≥ deadline)──▶ Idle
//!                            │
//!                          cancel()
//!                            ▼
//!                          Idle   (cancel/fire on Idle are no-ops)
//! ```

use embassy_time::{Duration, Instant};

/// Cancellable one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OneShot {
    deadline: Option<Instant>,
}

impl OneShot {
    /// A timer that is not armed.
    pub const fn idle() -> Self {
        Self { deadline: None }
    }

    /// A timer armed to fire `delay` after `now`.
    pub fn armed(now: Instant, delay: Duration) -> Self {
        let mut timer = Self::idle();
        timer.arm(now, delay);
        timer
    }

    /// (Re-)arm the timer.  Saturates instead of overflowing.
    pub fn arm(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now.checked_add(delay).unwrap_or(Instant::MAX));
    }

    /// Disarm.  Returns `true` if the timer was armed.  Idempotent.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Whether the timer is waiting to fire.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// When the timer will fire, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether an armed timer has reached its deadline.
    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|at| now >= at)
    }

    /// Fire the timer if it is due.  Returns `true` exactly once per arming.
    pub fn fire(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.deadline = None;
            true
        } else {
            false
        }
    }
}

/// The deferred "close the channel" step of a graceful disconnect.
///
/// Exists only inside the `Disconnecting` state; dropping the state drops
/// the pending close with it.
pub type PendingDisconnect = OneShot;
