//! Sequencing for clicks that must land beneath the overlays: make every
//! overlay transparent to input, let the window system settle, inject, then
//! restore hit-testing.

use crate::inject::MouseButton;
use std::time::{Duration, Instant};

pub const CLICK_SETTLE: Duration = Duration::from_millis(20);
pub const CLICK_HOLD: Duration = Duration::from_millis(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickStep {
    /// Inject the click now.
    Inject(MouseButton),
    /// Overlays may capture input again.
    Restore,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Settling {
        button: MouseButton,
        inject_at: Instant,
        restore_at: Instant,
    },
    Holding {
        restore_at: Instant,
    },
}

#[derive(Debug)]
pub struct ClickThrough {
    phase: Phase,
    settle: Duration,
    hold: Duration,
}

impl Default for ClickThrough {
    fn default() -> Self {
        Self::new(CLICK_SETTLE, CLICK_HOLD)
    }
}

impl ClickThrough {
    pub fn new(settle: Duration, hold: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            settle,
            hold: hold.max(settle),
        }
    }

    pub fn in_flight(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Start a click. The caller marks overlays click-through right away.
    /// Returns false if a click is already in flight.
    pub fn begin(&mut self, button: MouseButton, now: Instant) -> bool {
        if self.in_flight() {
            return false;
        }
        self.phase = Phase::Settling {
            button,
            inject_at: now + self.settle,
            restore_at: now + self.hold,
        };
        true
    }

    /// Steps that became due by `now`, in order.
    pub fn poll(&mut self, now: Instant) -> Vec<ClickStep> {
        let mut steps = Vec::new();
        if let Phase::Settling {
            button,
            inject_at,
            restore_at,
        } = self.phase
        {
            if inject_at <= now {
                steps.push(ClickStep::Inject(button));
                self.phase = Phase::Holding { restore_at };
            }
        }
        if let Phase::Holding { restore_at } = self.phase {
            if restore_at <= now {
                steps.push(ClickStep::Restore);
                self.phase = Phase::Idle;
            }
        }
        steps
    }

    /// Abandon an in-flight click. Returns true if overlays need restoring.
    pub fn abort(&mut self) -> bool {
        let was = self.in_flight();
        self.phase = Phase::Idle;
        was
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Idle => None,
            Phase::Settling { inject_at, .. } => Some(inject_at),
            Phase::Holding { restore_at } => Some(restore_at),
        }
    }
}
