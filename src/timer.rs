//! Caller-clocked timers.
//!
//! Nothing here reads the system clock: the event loop passes `now` in, which
//! keeps every timing path deterministic under test.

use std::time::{Duration, Instant};

/// Most periods a late poll will replay; anything older is dropped.
const MAX_CATCH_UP: u32 = 4;

/// A cancellable repeating task. It only fires while started.
#[derive(Clone, Copy, Debug)]
pub struct RepeatingTask {
    period: Duration,
    next_due: Option<Instant>,
}

impl RepeatingTask {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_due: None,
        }
    }

    /// Start (or restart) the task; the first period elapses one `period`
    /// after `now`.
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.period);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// Number of periods that elapsed up to `now`.
    pub fn poll(&mut self, now: Instant) -> u32 {
        let Some(mut due) = self.next_due else {
            return 0;
        };
        let mut fired = 0;
        while due <= now {
            fired += 1;
            due += self.period;
            if fired == MAX_CATCH_UP {
                if due <= now {
                    due = now + self.period;
                }
                break;
            }
        }
        self.next_due = Some(due);
        fired
    }
}

/// A one-shot deadline.
#[derive(Clone, Copy, Debug, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn arm(&mut self, at: Instant) {
        self.at = Some(at);
    }

    pub fn cancel(&mut self) {
        self.at = None;
    }

    pub fn at(&self) -> Option<Instant> {
        self.at
    }

    /// True exactly once, on the first poll at or after the deadline.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.at {
            Some(at) if at <= now => {
                self.at = None;
                true
            }
            _ => false,
        }
    }
}

/// Earliest of a set of optional instants.
pub fn earliest(instants: impl IntoIterator<Item = Option<Instant>>) -> Option<Instant> {
    instants.into_iter().flatten().min()
}
