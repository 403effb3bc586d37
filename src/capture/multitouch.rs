//! Multitouch protocol B slot tracking for evdev touchscreens.

use super::{TouchFrame, TouchPoint};
use evdev::{AbsoluteAxisType, EventType, InputEvent};

pub const MAX_TOUCH_POINTS: usize = 10;

#[derive(Clone, Copy, Debug, Default)]
struct SlotData {
    used: bool,
    tracking_id: i32,
    position_x: i32,
    position_y: i32,
}

/// Device coordinate range of one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl AxisRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn normalize(&self, value: i32) -> f32 {
        let span = (self.max - self.min).max(1) as f32;
        ((value - self.min) as f32 / span).clamp(0.0, 1.0)
    }
}

#[derive(Debug)]
pub struct MTStateMachine {
    slot: usize,
    slots: [SlotData; MAX_TOUCH_POINTS],
    x_range: AxisRange,
    y_range: AxisRange,
}

impl MTStateMachine {
    pub fn new(x_range: AxisRange, y_range: AxisRange) -> Self {
        Self {
            slot: 0,
            slots: [SlotData::default(); MAX_TOUCH_POINTS],
            x_range,
            y_range,
        }
    }

    /// Feed one event; a SYN_REPORT completes a frame and returns it.
    pub fn process(&mut self, event: &InputEvent) -> Option<TouchFrame> {
        match event.event_type() {
            EventType::ABSOLUTE => {
                let value = event.value();
                match AbsoluteAxisType(event.code()) {
                    AbsoluteAxisType::ABS_MT_SLOT => {
                        if value >= 0 && (value as usize) < MAX_TOUCH_POINTS {
                            self.slot = value as usize;
                        } else {
                            tracing::trace!(value, "slot out of range");
                        }
                    }
                    AbsoluteAxisType::ABS_MT_TRACKING_ID => {
                        let slot = &mut self.slots[self.slot];
                        if value < 0 {
                            slot.used = false;
                        } else {
                            slot.used = true;
                            slot.tracking_id = value;
                        }
                    }
                    AbsoluteAxisType::ABS_MT_POSITION_X => {
                        self.slots[self.slot].position_x = value;
                    }
                    AbsoluteAxisType::ABS_MT_POSITION_Y => {
                        self.slots[self.slot].position_y = value;
                    }
                    _ => {}
                }
                None
            }
            EventType::SYNCHRONIZATION if event.code() == 0 => Some(self.frame()),
            _ => None,
        }
    }

    pub fn frame(&self) -> TouchFrame {
        let contacts = self
            .slots
            .iter()
            .filter(|s| s.used)
            .map(|s| TouchPoint {
                id: s.tracking_id as i64,
                x: self.x_range.normalize(s.position_x),
                y: self.y_range.normalize(s.position_y),
            })
            .collect();
        TouchFrame { contacts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abs(axis: AbsoluteAxisType, value: i32) -> InputEvent {
        InputEvent::new(EventType::ABSOLUTE, axis.0, value)
    }

    fn syn() -> InputEvent {
        InputEvent::new(EventType::SYNCHRONIZATION, 0, 0)
    }

    fn machine() -> MTStateMachine {
        MTStateMachine::new(AxisRange::new(0, 1000), AxisRange::new(0, 500))
    }

    #[test]
    fn slots_become_normalized_contacts() {
        let mut mt = machine();
        assert_eq!(mt.process(&abs(AbsoluteAxisType::ABS_MT_SLOT, 0)), None);
        mt.process(&abs(AbsoluteAxisType::ABS_MT_TRACKING_ID, 12));
        mt.process(&abs(AbsoluteAxisType::ABS_MT_POSITION_X, 500));
        mt.process(&abs(AbsoluteAxisType::ABS_MT_POSITION_Y, 125));
        mt.process(&abs(AbsoluteAxisType::ABS_MT_SLOT, 1));
        mt.process(&abs(AbsoluteAxisType::ABS_MT_TRACKING_ID, 13));
        mt.process(&abs(AbsoluteAxisType::ABS_MT_POSITION_X, 1000));
        mt.process(&abs(AbsoluteAxisType::ABS_MT_POSITION_Y, 500));

        let frame = mt.process(&syn()).expect("frame on SYN_REPORT");
        assert_eq!(
            frame.contacts,
            vec![
                TouchPoint { id: 12, x: 0.5, y: 0.25 },
                TouchPoint { id: 13, x: 1.0, y: 1.0 },
            ]
        );
    }

    #[test]
    fn lift_removes_the_slot() {
        let mut mt = machine();
        mt.process(&abs(AbsoluteAxisType::ABS_MT_TRACKING_ID, 1));
        mt.process(&syn());
        mt.process(&abs(AbsoluteAxisType::ABS_MT_TRACKING_ID, -1));
        let frame = mt.process(&syn()).expect("frame");
        assert!(frame.contacts.is_empty());
    }

    #[test]
    fn axis_range_clamps() {
        let range = AxisRange::new(100, 200);
        assert_eq!(range.normalize(50), 0.0);
        assert_eq!(range.normalize(150), 0.5);
        assert_eq!(range.normalize(300), 1.0);
    }
}
