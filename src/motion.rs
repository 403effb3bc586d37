//! Movement models: turn a surface's contact lifecycle into pointer motion.

use crate::capture::ContactEvent;
use crate::timer::RepeatingTask;
use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const TRACKPAD_SENSITIVITY: f32 = 1.5;

pub const TRACKPOINT_TICK: Duration = Duration::from_millis(16);
pub const TRACKPOINT_DEADZONE: f32 = 5.0;
pub const TRACKPOINT_SCALE_DIVISOR: f32 = 5.0;
pub const TRACKPOINT_MAX_SPEED: f32 = 15.0;
/// The stick graphic never travels further than this from the center.
pub const STICK_VISUAL_RADIUS: f32 = 15.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MouseMode {
    Off,
    #[default]
    Trackpoint,
    Trackpad,
}

/// Pointer movement in logical pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MovementVector {
    pub dx: f32,
    pub dy: f32,
}

impl MovementVector {
    pub fn new(dx: f32, dy: f32) -> Self {
        Self { dx, dy }
    }

    pub fn from_vec2(v: Vec2) -> Self {
        Self { dx: v.x, dy: v.y }
    }

    pub fn length(&self) -> f32 {
        self.dx.hypot(self.dy)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StickVisual {
    /// Offset of the stick from the surface center.
    Offset(Vec2),
    ResetToCenter,
}

/// What a model produced for one input or tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Motion {
    pub vectors: Vec<MovementVector>,
    pub stick: Option<StickVisual>,
}

impl Motion {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty() && self.stick.is_none()
    }
}

/// A movement strategy bound to one pointer surface.
///
/// Contact positions are surface-local; `surface` is the surface extent.
pub trait MovementModel {
    fn mode(&self) -> MouseMode;
    fn on_contact(&mut self, event: &ContactEvent, surface: Vec2, now: Instant) -> Motion;
    fn on_tick(&mut self, now: Instant) -> Motion;
    /// When the model next needs `on_tick`, if ever.
    fn next_tick(&self) -> Option<Instant>;
    /// Drop any in-flight contact and stop emitting.
    fn cancel(&mut self) -> Motion;
}

/// Build the model for a mode; `Off` has none.
pub fn model_for(mode: MouseMode) -> Option<Box<dyn MovementModel>> {
    match mode {
        MouseMode::Off => None,
        MouseMode::Trackpoint => Some(Box::new(TrackpointModel::new())),
        MouseMode::Trackpad => Some(Box::new(TrackpadModel::new())),
    }
}

/// Relative model: every move is forwarded scaled, with no timer.
#[derive(Debug)]
pub struct TrackpadModel {
    sensitivity: f32,
}

impl TrackpadModel {
    pub fn new() -> Self {
        Self::with_sensitivity(TRACKPAD_SENSITIVITY)
    }

    pub fn with_sensitivity(sensitivity: f32) -> Self {
        Self { sensitivity }
    }
}

impl Default for TrackpadModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MovementModel for TrackpadModel {
    fn mode(&self) -> MouseMode {
        MouseMode::Trackpad
    }

    fn on_contact(&mut self, event: &ContactEvent, _surface: Vec2, _now: Instant) -> Motion {
        match *event {
            ContactEvent::Move { delta, .. } => Motion {
                vectors: vec![MovementVector::from_vec2(delta * self.sensitivity)],
                stick: None,
            },
            _ => Motion::none(),
        }
    }

    fn on_tick(&mut self, _now: Instant) -> Motion {
        Motion::none()
    }

    fn next_tick(&self) -> Option<Instant> {
        None
    }

    fn cancel(&mut self) -> Motion {
        Motion::none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackpointParams {
    pub tick: Duration,
    pub deadzone: f32,
    pub scale_divisor: f32,
    pub max_speed: f32,
}

impl Default for TrackpointParams {
    fn default() -> Self {
        Self {
            tick: TRACKPOINT_TICK,
            deadzone: TRACKPOINT_DEADZONE,
            scale_divisor: TRACKPOINT_SCALE_DIVISOR,
            max_speed: TRACKPOINT_MAX_SPEED,
        }
    }
}

impl TrackpointParams {
    /// Speed for a displacement of `distance` px, or `None` inside the
    /// deadzone.
    pub fn speed(&self, distance: f32) -> Option<f32> {
        if distance <= self.deadzone {
            return None;
        }
        Some(((distance - self.deadzone) / self.scale_divisor).min(self.max_speed))
    }

    pub fn velocity(&self, displacement: Vec2) -> Option<MovementVector> {
        let distance = displacement.length();
        let speed = self.speed(distance)?;
        Some(MovementVector::from_vec2(displacement / distance * speed))
    }
}

/// Joystick model: displacement from the surface center sets a velocity that
/// is emitted every tick while the contact is held.
#[derive(Debug)]
pub struct TrackpointModel {
    params: TrackpointParams,
    task: RepeatingTask,
    displacement: Vec2,
}

impl TrackpointModel {
    pub fn new() -> Self {
        Self::with_params(TrackpointParams::default())
    }

    pub fn with_params(params: TrackpointParams) -> Self {
        Self {
            params,
            task: RepeatingTask::new(params.tick),
            displacement: Vec2::ZERO,
        }
    }

    fn track(&mut self, position: Pos2, surface: Vec2) -> StickVisual {
        let inside = position.x >= 0.0
            && position.y >= 0.0
            && position.x <= surface.x
            && position.y <= surface.y;
        self.displacement = if inside {
            position - (surface / 2.0).to_pos2()
        } else {
            Vec2::ZERO
        };
        StickVisual::Offset(clamp_visual(self.displacement))
    }

    fn stop(&mut self) -> Motion {
        let was_running = self.task.is_running();
        self.task.cancel();
        self.displacement = Vec2::ZERO;
        Motion {
            vectors: Vec::new(),
            stick: was_running.then_some(StickVisual::ResetToCenter),
        }
    }
}

impl Default for TrackpointModel {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_visual(displacement: Vec2) -> Vec2 {
    let length = displacement.length();
    if length > STICK_VISUAL_RADIUS {
        displacement / length * STICK_VISUAL_RADIUS
    } else {
        displacement
    }
}

impl MovementModel for TrackpointModel {
    fn mode(&self) -> MouseMode {
        MouseMode::Trackpoint
    }

    fn on_contact(&mut self, event: &ContactEvent, surface: Vec2, now: Instant) -> Motion {
        match *event {
            ContactEvent::Down { position, .. } => {
                let stick = self.track(position, surface);
                self.task.start(now);
                Motion {
                    vectors: Vec::new(),
                    stick: Some(stick),
                }
            }
            ContactEvent::Move { position, .. } => {
                if !self.task.is_running() {
                    return Motion::none();
                }
                Motion {
                    vectors: Vec::new(),
                    stick: Some(self.track(position, surface)),
                }
            }
            ContactEvent::Up { .. } | ContactEvent::Cancelled { .. } => self.stop(),
        }
    }

    fn on_tick(&mut self, now: Instant) -> Motion {
        let periods = self.task.poll(now);
        let Some(vector) = self.params.velocity(self.displacement) else {
            return Motion::none();
        };
        Motion {
            vectors: vec![vector; periods as usize],
            stick: None,
        }
    }

    fn next_tick(&self) -> Option<Instant> {
        self.task.next_due()
    }

    fn cancel(&mut self) -> Motion {
        self.stop()
    }
}

/// Carries fractional movement between emissions so slow motion is not lost
/// to integer rounding.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubPixel {
    remainder: Vec2,
}

impl SubPixel {
    /// Whole-pixel part of `vector` plus whatever was carried, if non-zero.
    pub fn take(&mut self, vector: MovementVector) -> Option<(i32, i32)> {
        let total = self.remainder + Vec2::new(vector.dx, vector.dy);
        let whole = Vec2::new(total.x.trunc(), total.y.trunc());
        self.remainder = total - whole;
        if whole == Vec2::ZERO {
            None
        } else {
            Some((whole.x as i32, whole.y as i32))
        }
    }

    pub fn reset(&mut self) {
        self.remainder = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURFACE: Vec2 = Vec2::new(100.0, 100.0);

    fn down(x: f32, y: f32) -> ContactEvent {
        ContactEvent::Down {
            id: 1,
            position: Pos2::new(x, y),
        }
    }

    fn moved(x: f32, y: f32, delta: Vec2) -> ContactEvent {
        ContactEvent::Move {
            id: 1,
            position: Pos2::new(x, y),
            delta,
        }
    }

    #[test]
    fn trackpad_scales_deltas() {
        let now = Instant::now();
        let mut model = TrackpadModel::new();
        assert!(model.on_contact(&down(0.0, 0.0), SURFACE, now).is_empty());
        let motion = model.on_contact(&moved(2.0, -4.0, Vec2::new(2.0, -4.0)), SURFACE, now);
        assert_eq!(motion.vectors, vec![MovementVector::new(3.0, -6.0)]);
        assert_eq!(model.next_tick(), None);
    }

    #[test]
    fn deadzone_suppresses_motion() {
        let params = TrackpointParams::default();
        assert_eq!(params.speed(0.0), None);
        assert_eq!(params.speed(4.9), None);
        assert_eq!(params.speed(5.0), None);
        assert!(params.speed(5.1).is_some());
    }

    #[test]
    fn speed_is_monotonic_and_capped() {
        let params = TrackpointParams::default();
        let mut previous = 0.0;
        for d in 6..200 {
            let speed = params.speed(d as f32).unwrap_or(0.0);
            assert!(speed >= previous, "speed dropped at {d}");
            assert!(speed <= TRACKPOINT_MAX_SPEED);
            previous = speed;
        }
        assert_eq!(params.speed(20.0), Some(3.0));
        assert_eq!(params.speed(500.0), Some(TRACKPOINT_MAX_SPEED));
    }

    #[test]
    fn direction_follows_displacement() {
        let params = TrackpointParams::default();
        let v = params.velocity(Vec2::new(30.0, 40.0)).expect("outside deadzone");
        assert!((v.dx / v.length() - 0.6).abs() < 1e-5);
        assert!((v.dy / v.length() - 0.8).abs() < 1e-5);
        assert!((v.length() - 9.0).abs() < 1e-4);
    }

    #[test]
    fn trackpoint_emits_once_per_tick_while_held() {
        let t0 = Instant::now();
        let mut model = TrackpointModel::new();
        let motion = model.on_contact(&down(70.0, 50.0), SURFACE, t0);
        assert!(motion.vectors.is_empty());
        assert_eq!(motion.stick, Some(StickVisual::Offset(Vec2::new(15.0, 0.0))));

        assert!(model.on_tick(t0 + Duration::from_millis(10)).vectors.is_empty());
        let motion = model.on_tick(t0 + TRACKPOINT_TICK);
        assert_eq!(motion.vectors, vec![MovementVector::new(3.0, 0.0)]);

        let up = ContactEvent::Up {
            id: 1,
            position: Pos2::new(70.0, 50.0),
        };
        let motion = model.on_contact(&up, SURFACE, t0 + TRACKPOINT_TICK);
        assert_eq!(motion.stick, Some(StickVisual::ResetToCenter));
        assert!(model.on_tick(t0 + TRACKPOINT_TICK * 10).vectors.is_empty());
        assert_eq!(model.next_tick(), None);
    }

    #[test]
    fn leaving_the_surface_stops_motion() {
        let t0 = Instant::now();
        let mut model = TrackpointModel::new();
        model.on_contact(&down(90.0, 50.0), SURFACE, t0);
        let motion = model.on_contact(&moved(120.0, 50.0, Vec2::new(30.0, 0.0)), SURFACE, t0);
        assert_eq!(motion.stick, Some(StickVisual::Offset(Vec2::ZERO)));
        assert!(model.on_tick(t0 + TRACKPOINT_TICK).vectors.is_empty());

        model.on_contact(&moved(90.0, 50.0, Vec2::new(-30.0, 0.0)), SURFACE, t0);
        assert_eq!(model.on_tick(t0 + TRACKPOINT_TICK * 2).vectors.len(), 1);
    }

    #[test]
    fn cancel_resets_an_active_stick_only() {
        let t0 = Instant::now();
        let mut model = TrackpointModel::new();
        assert!(model.cancel().is_empty());
        model.on_contact(&down(80.0, 50.0), SURFACE, t0);
        assert_eq!(model.cancel().stick, Some(StickVisual::ResetToCenter));
        assert!(model.on_tick(t0 + TRACKPOINT_TICK).vectors.is_empty());
    }

    #[test]
    fn subpixel_carries_fractions() {
        let mut acc = SubPixel::default();
        assert_eq!(acc.take(MovementVector::new(0.6, 0.0)), None);
        assert_eq!(acc.take(MovementVector::new(0.6, 0.0)), Some((1, 0)));
        assert_eq!(acc.take(MovementVector::new(-1.5, 2.25)), Some((-1, 2)));
    }
}
