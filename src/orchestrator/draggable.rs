//! Edit-mode drag/zoom capability shared by every surface.
//!
//! One finger moves the surface by its absolute offset from the gesture
//! start; two fingers zoom by vertical travel of their midpoint. Outside edit
//! mode a long press asks for edit mode.

use crate::capture::{ContactId, ContactPhase, ContactSample};
use crate::timer::Deadline;
use egui::{Pos2, Vec2};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

pub const LONG_PRESS: Duration = Duration::from_millis(3500);
/// Scale change per pixel of two-finger vertical travel.
pub const ZOOM_PER_PIXEL: f32 = 0.005;

/// Local position and surface size in, "this touch is on a control" out.
pub type HitTest = Box<dyn Fn(Pos2, Vec2) -> bool + Send>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragOutput {
    Moved(Pos2),
    Scaled(f32),
}

pub struct DragBehavior {
    scale_bounds: RangeInclusive<f32>,
    on_control: Option<HitTest>,
    touches: BTreeMap<ContactId, Pos2>,
    anchor_touch: Pos2,
    anchor_position: Pos2,
    zoom_start_y: f32,
    scale_at_zoom_start: f32,
    long_press: Deadline,
}

impl std::fmt::Debug for DragBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragBehavior")
            .field("scale_bounds", &self.scale_bounds)
            .field("touches", &self.touches)
            .field("long_press", &self.long_press)
            .finish()
    }
}

impl DragBehavior {
    pub fn new(scale_bounds: RangeInclusive<f32>) -> Self {
        Self {
            scale_bounds,
            on_control: None,
            touches: BTreeMap::new(),
            anchor_touch: Pos2::ZERO,
            anchor_position: Pos2::ZERO,
            zoom_start_y: 0.0,
            scale_at_zoom_start: 1.0,
            long_press: Deadline::default(),
        }
    }

    /// Touches that start on a control are left to the control.
    pub fn with_hit_test(mut self, hit_test: HitTest) -> Self {
        self.on_control = Some(hit_test);
        self
    }

    pub fn is_dragging(&self) -> bool {
        !self.touches.is_empty()
    }

    pub fn clamp_scale(&self, scale: f32) -> f32 {
        scale.clamp(*self.scale_bounds.start(), *self.scale_bounds.end())
    }

    /// Edit-mode gesture handling. `sample` is in screen coordinates;
    /// `origin`/`size` describe the surface at the time of the sample.
    pub fn on_sample(
        &mut self,
        sample: ContactSample,
        origin: Pos2,
        size: Vec2,
        scale: f32,
    ) -> Option<DragOutput> {
        match sample.phase {
            ContactPhase::Down => {
                let local = sample.position - origin.to_vec2();
                if let Some(hit) = &self.on_control {
                    if hit(local, size) {
                        return None;
                    }
                }
                self.touches.insert(sample.id, sample.position);
                match self.touches.len() {
                    1 => {
                        self.anchor_touch = sample.position;
                        self.anchor_position = origin;
                    }
                    2 => {
                        self.zoom_start_y = self.mid_y();
                        self.scale_at_zoom_start = scale;
                    }
                    _ => {}
                }
                None
            }
            ContactPhase::Move => {
                let slot = self.touches.get_mut(&sample.id)?;
                *slot = sample.position;
                match self.touches.len() {
                    1 => {
                        let offset = sample.position - self.anchor_touch;
                        Some(DragOutput::Moved(self.anchor_position + offset))
                    }
                    2 => {
                        // Up the screen zooms in.
                        let travel = self.zoom_start_y - self.mid_y();
                        let target = self.scale_at_zoom_start + travel * ZOOM_PER_PIXEL;
                        Some(DragOutput::Scaled(self.clamp_scale(target)))
                    }
                    _ => None,
                }
            }
            ContactPhase::Up => {
                self.touches.remove(&sample.id)?;
                if let Some((_, remaining)) = self.touches.iter().next() {
                    if self.touches.len() == 1 {
                        self.anchor_touch = *remaining;
                        self.anchor_position = origin;
                    }
                }
                None
            }
        }
    }

    pub fn reset(&mut self) {
        self.touches.clear();
        self.long_press.cancel();
    }

    pub fn arm_long_press(&mut self, now: Instant) {
        self.long_press.arm(now + LONG_PRESS);
    }

    pub fn cancel_long_press(&mut self) {
        self.long_press.cancel();
    }

    pub fn long_press_due(&mut self, now: Instant) -> bool {
        self.long_press.fire(now)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.long_press.at()
    }

    fn mid_y(&self) -> f32 {
        let n = self.touches.len().max(1) as f32;
        self.touches.values().map(|p| p.y).sum::<f32>() / n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: Vec2 = Vec2::new(200.0, 100.0);

    fn p(x: f32, y: f32) -> Pos2 {
        Pos2::new(x, y)
    }

    #[test]
    fn one_finger_drags_by_absolute_offset() {
        let mut drag = DragBehavior::new(0.5..=4.0);
        let origin = p(100.0, 100.0);
        assert_eq!(drag.on_sample(ContactSample::down(1, p(150.0, 120.0)), origin, SIZE, 1.0), None);
        assert_eq!(
            drag.on_sample(ContactSample::moved(1, p(170.0, 110.0)), origin, SIZE, 1.0),
            Some(DragOutput::Moved(p(120.0, 90.0)))
        );
        // The current origin does not feed back into the offset.
        assert_eq!(
            drag.on_sample(ContactSample::moved(1, p(180.0, 110.0)), p(120.0, 90.0), SIZE, 1.0),
            Some(DragOutput::Moved(p(130.0, 90.0)))
        );
    }

    #[test]
    fn two_fingers_zoom_by_vertical_travel() {
        let mut drag = DragBehavior::new(0.5..=4.0);
        let origin = p(0.0, 0.0);
        drag.on_sample(ContactSample::down(1, p(10.0, 300.0)), origin, SIZE, 1.0);
        drag.on_sample(ContactSample::down(2, p(50.0, 300.0)), origin, SIZE, 1.0);
        // Midpoint rises 50 px -> +0.25.
        assert_eq!(
            drag.on_sample(ContactSample::moved(1, p(10.0, 200.0)), origin, SIZE, 1.0),
            Some(DragOutput::Scaled(1.25))
        );
        // Far down clamps to the lower bound.
        assert_eq!(
            drag.on_sample(ContactSample::moved(2, p(50.0, 2000.0)), origin, SIZE, 1.0),
            Some(DragOutput::Scaled(0.5))
        );
    }

    #[test]
    fn lifting_to_one_finger_reanchors() {
        let mut drag = DragBehavior::new(0.5..=4.0);
        let origin = p(0.0, 0.0);
        drag.on_sample(ContactSample::down(1, p(10.0, 10.0)), origin, SIZE, 1.0);
        drag.on_sample(ContactSample::down(2, p(90.0, 10.0)), origin, SIZE, 1.0);
        drag.on_sample(ContactSample::up(1, p(10.0, 10.0)), p(5.0, 5.0), SIZE, 1.0);
        assert_eq!(
            drag.on_sample(ContactSample::moved(2, p(100.0, 20.0)), p(5.0, 5.0), SIZE, 1.0),
            Some(DragOutput::Moved(p(15.0, 15.0)))
        );
    }

    #[test]
    fn touches_on_controls_are_skipped() {
        let mut drag = DragBehavior::new(0.5..=4.0)
            .with_hit_test(Box::new(|local: Pos2, size: Vec2| local.x > size.x - 20.0));
        drag.on_sample(ContactSample::down(1, p(195.0, 5.0)), Pos2::ZERO, SIZE, 1.0);
        assert!(!drag.is_dragging());
        assert_eq!(
            drag.on_sample(ContactSample::moved(1, p(100.0, 5.0)), Pos2::ZERO, SIZE, 1.0),
            None
        );
    }

    #[test]
    fn long_press_fires_once() {
        let t0 = Instant::now();
        let mut drag = DragBehavior::new(0.5..=4.0);
        drag.arm_long_press(t0);
        assert!(!drag.long_press_due(t0 + Duration::from_millis(3499)));
        assert!(drag.long_press_due(t0 + LONG_PRESS));
        assert!(!drag.long_press_due(t0 + LONG_PRESS * 2));

        drag.arm_long_press(t0);
        drag.cancel_long_press();
        assert!(!drag.long_press_due(t0 + LONG_PRESS));
    }
}
