//! Clock and single-purpose timer slots for the cooperative event loop.
//!
//! Every component that needs a delay owns a [`TimerSlot`] per purpose. A slot
//! holds at most one pending deadline; re-arming replaces it and cancelling
//! clears it, so a transition can never leave a stale timer behind.

use std::cell::Cell;
use std::time::{Duration, Instant};

/// Source of monotonic time for the event loop and throughput math.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Deterministic clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// One named timer with at most one pending deadline.
#[derive(Debug, Clone)]
pub struct TimerSlot {
    purpose: &'static str,
    deadline: Option<Instant>,
}

impl TimerSlot {
    pub const fn new(purpose: &'static str) -> Self {
        Self {
            purpose,
            deadline: None,
        }
    }

    pub fn purpose(&self) -> &'static str {
        self.purpose
    }

    /// Arm (or re-arm) the slot to fire `after` from `now`.
    pub fn arm(&mut self, now: Instant, after: Duration) {
        self.deadline = Some(now + after);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true exactly once when the deadline has passed, disarming the slot.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Earliest of a set of optional deadlines.
pub fn earliest<I>(deadlines: I) -> Option<Instant>
where
    I: IntoIterator<Item = Option<Instant>>,
{
    deadlines.into_iter().flatten().min()
}
