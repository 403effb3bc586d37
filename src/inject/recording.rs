//! Backend that records synthetic events instead of delivering them.
//!
//! Used by `--dry-run` and by the test suite. It keeps a simulated cursor so
//! relative moves behave like they would against a real display.

use super::{denormalize, InjectError, InjectionBackend, SyntheticEvent};

#[derive(Clone, Debug)]
pub struct RecordingBackend {
    events: Vec<SyntheticEvent>,
    cursor: (i32, i32),
    screen: (i32, i32),
    reject: bool,
    rejected_batches: usize,
    log_events: bool,
}

impl RecordingBackend {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            events: Vec::new(),
            cursor: (width / 2, height / 2),
            screen: (width, height),
            reject: false,
            rejected_batches: 0,
            log_events: false,
        }
    }

    /// Variant used by `--dry-run`: every batch is also written to the log.
    pub fn logging(width: i32, height: i32) -> Self {
        Self {
            log_events: true,
            ..Self::new(width, height)
        }
    }

    pub fn events(&self) -> &[SyntheticEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<SyntheticEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn cursor(&self) -> (i32, i32) {
        self.cursor
    }

    pub fn set_cursor(&mut self, x: i32, y: i32) {
        self.cursor = (x, y);
    }

    /// Make the simulated OS refuse every batch.
    pub fn set_reject(&mut self, reject: bool) {
        self.reject = reject;
    }

    pub fn rejected_batches(&self) -> usize {
        self.rejected_batches
    }
}

impl InjectionBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn send(&mut self, events: &[SyntheticEvent]) -> Result<usize, InjectError> {
        if self.reject {
            self.rejected_batches += 1;
            return Err(InjectError::Rejected(format!(
                "{} events refused",
                events.len()
            )));
        }
        for event in events {
            if let SyntheticEvent::MoveAbsolute { x, y } = *event {
                self.cursor = (
                    denormalize(x, self.screen.0),
                    denormalize(y, self.screen.1),
                );
            }
            if self.log_events {
                tracing::info!(?event, cursor = ?self.cursor, "dry-run");
            }
        }
        self.events.extend_from_slice(events);
        Ok(events.len())
    }

    fn cursor_position(&self) -> Option<(i32, i32)> {
        Some(self.cursor)
    }

    fn screen_size(&self) -> (i32, i32) {
        self.screen
    }

    fn set_screen_size(&mut self, width: i32, height: i32) {
        self.screen = (width, height);
        self.cursor = (
            self.cursor.0.clamp(0, (width - 1).max(0)),
            self.cursor.1.clamp(0, (height - 1).max(0)),
        );
    }
}
