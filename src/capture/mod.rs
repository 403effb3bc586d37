//! Contact capture: raw touch/pointer samples in, a single tracked contact's
//! DOWN/MOVE/UP lifecycle out.
//!
//! Platform sources deliver whole frames of active contacts (like a HID report
//! or an evdev SYN_REPORT); [`FrameTracker`] turns consecutive frames into
//! per-contact samples, and [`GestureCapture`] narrows those to the one contact
//! a surface is tracking.

#[cfg(target_os = "linux")]
pub mod evdev_backend;
#[cfg(target_os = "linux")]
pub mod multitouch;
#[cfg(target_os = "windows")]
pub mod windows_backend;

use egui::{Pos2, Vec2};
use std::collections::BTreeMap;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub type ContactId = i64;

/// Id used for mouse-pointer capture, which never collides with touch ids.
pub const POINTER_CONTACT_ID: ContactId = -1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContactPhase {
    Down,
    Move,
    Up,
}

/// One raw sample for one contact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContactSample {
    pub id: ContactId,
    pub phase: ContactPhase,
    pub position: Pos2,
}

impl ContactSample {
    pub fn down(id: ContactId, position: Pos2) -> Self {
        Self {
            id,
            phase: ContactPhase::Down,
            position,
        }
    }

    pub fn moved(id: ContactId, position: Pos2) -> Self {
        Self {
            id,
            phase: ContactPhase::Move,
            position,
        }
    }

    pub fn up(id: ContactId, position: Pos2) -> Self {
        Self {
            id,
            phase: ContactPhase::Up,
            position,
        }
    }

    pub fn translated(self, offset: Vec2) -> Self {
        Self {
            position: self.position + offset,
            ..self
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    pub id: ContactId,
    pub origin: Pos2,
    pub last: Pos2,
}

/// Lifecycle events for the tracked contact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ContactEvent {
    Down { id: ContactId, position: Pos2 },
    Move { id: ContactId, position: Pos2, delta: Vec2 },
    Up { id: ContactId, position: Pos2 },
    /// Tracking was dropped without an UP (lost capture, stale contact, mode
    /// switch).
    Cancelled { id: ContactId },
}

/// Single-contact tracker for one surface.
#[derive(Debug, Default)]
pub struct GestureCapture {
    tracked: Option<Contact>,
}

impl GestureCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked(&self) -> Option<&Contact> {
        self.tracked.as_ref()
    }

    pub fn process(&mut self, sample: ContactSample) -> Vec<ContactEvent> {
        match sample.phase {
            ContactPhase::Down => self.on_down(sample.id, sample.position),
            ContactPhase::Move => self.on_move(sample.id, sample.position).into_iter().collect(),
            ContactPhase::Up => self.on_up(sample.id, sample.position).into_iter().collect(),
        }
    }

    /// Start tracking. A DOWN for a different id while another contact is
    /// still tracked means its UP was lost; the stale contact is cancelled.
    pub fn on_down(&mut self, id: ContactId, position: Pos2) -> Vec<ContactEvent> {
        let mut events = Vec::with_capacity(2);
        if let Some(stale) = self.tracked {
            if stale.id == id {
                tracing::debug!(id, "duplicate down for tracked contact");
                return events;
            }
            tracing::debug!(stale = stale.id, id, "force-clearing contact without up");
            events.push(ContactEvent::Cancelled { id: stale.id });
        }
        self.tracked = Some(Contact {
            id,
            origin: position,
            last: position,
        });
        events.push(ContactEvent::Down { id, position });
        events
    }

    pub fn on_move(&mut self, id: ContactId, position: Pos2) -> Option<ContactEvent> {
        let contact = match self.tracked.as_mut() {
            Some(c) if c.id == id => c,
            _ => {
                tracing::trace!(id, "move for untracked contact ignored");
                return None;
            }
        };
        let delta = position - contact.last;
        if delta == Vec2::ZERO {
            return None;
        }
        contact.last = position;
        Some(ContactEvent::Move {
            id,
            position,
            delta,
        })
    }

    pub fn on_up(&mut self, id: ContactId, position: Pos2) -> Option<ContactEvent> {
        match self.tracked {
            Some(c) if c.id == id => {
                self.tracked = None;
                Some(ContactEvent::Up { id, position })
            }
            _ => {
                tracing::trace!(id, "up for untracked contact ignored");
                None
            }
        }
    }

    /// Drop the tracked contact, e.g. when the surface loses capture or the
    /// gesture source is detached.
    pub fn cancel(&mut self) -> Option<ContactEvent> {
        self.tracked
            .take()
            .map(|c| ContactEvent::Cancelled { id: c.id })
    }
}

/// One active contact in a frame, positioned in normalized `[0, 1]` device
/// space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchPoint {
    pub id: ContactId,
    pub x: f32,
    pub y: f32,
}

/// Every contact currently on the device.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TouchFrame {
    pub contacts: Vec<TouchPoint>,
}

/// Turns consecutive [`TouchFrame`]s into per-contact samples in screen
/// coordinates.
#[derive(Debug, Default)]
pub struct FrameTracker {
    active: BTreeMap<ContactId, Pos2>,
}

impl FrameTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, frame: &TouchFrame, screen: Vec2) -> Vec<ContactSample> {
        let mut samples = Vec::new();
        let mut seen = BTreeMap::new();

        for point in &frame.contacts {
            let position = Pos2::new(point.x * screen.x, point.y * screen.y);
            match self.active.get(&point.id) {
                None => samples.push(ContactSample::down(point.id, position)),
                Some(previous) if *previous != position => {
                    samples.push(ContactSample::moved(point.id, position))
                }
                Some(_) => {}
            }
            seen.insert(point.id, position);
        }

        for (id, last) in &self.active {
            if !seen.contains_key(id) {
                samples.push(ContactSample::up(*id, *last));
            }
        }

        self.active = seen;
        samples
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("open failed: {0}")]
    OpenFailed(String),
    #[error("read error: {0}")]
    ReadError(String),
}

/// A platform source of raw touch frames.
pub trait TouchSource: Send + 'static {
    fn name(&self) -> &str;
    fn poll_frame(&mut self) -> Result<Option<TouchFrame>, CaptureError>;
}

/// Run a touch source on its own thread; frames are marshalled back to the UI
/// thread over the returned channel.
pub fn spawn_capture_thread<S: TouchSource>(mut source: S) -> mpsc::Receiver<TouchFrame> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        tracing::info!(source = source.name(), "touch capture started");
        loop {
            match source.poll_frame() {
                Ok(Some(frame)) => {
                    if tx.send(frame).is_err() {
                        break;
                    }
                }
                Ok(None) => thread::sleep(Duration::from_millis(4)),
                Err(e) => {
                    tracing::error!(source = source.name(), error = %e, "touch capture stopped");
                    break;
                }
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Pos2 {
        Pos2::new(x, y)
    }

    #[test]
    fn down_move_up_lifecycle() {
        let mut capture = GestureCapture::new();
        assert_eq!(
            capture.on_down(7, p(10.0, 10.0)),
            vec![ContactEvent::Down { id: 7, position: p(10.0, 10.0) }]
        );
        assert_eq!(
            capture.on_move(7, p(13.0, 6.0)),
            Some(ContactEvent::Move {
                id: 7,
                position: p(13.0, 6.0),
                delta: Vec2::new(3.0, -4.0)
            })
        );
        assert_eq!(capture.tracked().map(|c| c.origin), Some(p(10.0, 10.0)));
        assert_eq!(
            capture.on_up(7, p(13.0, 6.0)),
            Some(ContactEvent::Up { id: 7, position: p(13.0, 6.0) })
        );
        assert!(capture.tracked().is_none());
    }

    #[test]
    fn untracked_ids_are_ignored() {
        let mut capture = GestureCapture::new();
        assert_eq!(capture.on_move(1, p(1.0, 1.0)), None);
        assert_eq!(capture.on_up(1, p(1.0, 1.0)), None);

        capture.on_down(1, p(0.0, 0.0));
        assert_eq!(capture.on_move(2, p(5.0, 5.0)), None);
        assert_eq!(capture.on_up(2, p(5.0, 5.0)), None);
        assert_eq!(capture.tracked().map(|c| c.id), Some(1));
    }

    #[test]
    fn zero_delta_moves_are_dropped() {
        let mut capture = GestureCapture::new();
        capture.on_down(1, p(4.0, 4.0));
        assert_eq!(capture.on_move(1, p(4.0, 4.0)), None);
    }

    #[test]
    fn new_down_force_clears_a_stuck_contact() {
        let mut capture = GestureCapture::new();
        capture.on_down(1, p(0.0, 0.0));
        let events = capture.on_down(2, p(9.0, 9.0));
        assert_eq!(
            events,
            vec![
                ContactEvent::Cancelled { id: 1 },
                ContactEvent::Down { id: 2, position: p(9.0, 9.0) }
            ]
        );
        assert_eq!(capture.on_move(1, p(1.0, 1.0)), None);
    }

    #[test]
    fn cancel_reports_the_dropped_contact() {
        let mut capture = GestureCapture::new();
        assert_eq!(capture.cancel(), None);
        capture.on_down(3, p(0.0, 0.0));
        assert_eq!(capture.cancel(), Some(ContactEvent::Cancelled { id: 3 }));
        assert!(capture.tracked().is_none());
    }

    #[test]
    fn frame_tracker_diffs_frames() {
        let mut tracker = FrameTracker::new();
        let screen = Vec2::new(1000.0, 500.0);

        let first = TouchFrame {
            contacts: vec![TouchPoint { id: 4, x: 0.5, y: 0.5 }],
        };
        assert_eq!(
            tracker.update(&first, screen),
            vec![ContactSample::down(4, p(500.0, 250.0))]
        );
        assert!(tracker.update(&first, screen).is_empty());

        let second = TouchFrame {
            contacts: vec![
                TouchPoint { id: 4, x: 0.6, y: 0.5 },
                TouchPoint { id: 5, x: 0.1, y: 0.1 },
            ],
        };
        assert_eq!(
            tracker.update(&second, screen),
            vec![
                ContactSample::moved(4, p(600.0, 250.0)),
                ContactSample::down(5, p(100.0, 50.0)),
            ]
        );

        assert_eq!(
            tracker.update(&TouchFrame::default(), screen),
            vec![
                ContactSample::up(4, p(600.0, 250.0)),
                ContactSample::up(5, p(100.0, 50.0)),
            ]
        );
    }
}
