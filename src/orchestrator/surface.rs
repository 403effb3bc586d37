use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SurfaceRole {
    LeftKeyboard,
    RightKeyboard,
    /// Trackpoint or trackpad, depending on mouse mode.
    Pointer,
    ClickButtons,
}

impl SurfaceRole {
    pub const ALL: [SurfaceRole; 4] = [
        SurfaceRole::LeftKeyboard,
        SurfaceRole::RightKeyboard,
        SurfaceRole::Pointer,
        SurfaceRole::ClickButtons,
    ];

    pub fn index(self) -> usize {
        match self {
            SurfaceRole::LeftKeyboard => 0,
            SurfaceRole::RightKeyboard => 1,
            SurfaceRole::Pointer => 2,
            SurfaceRole::ClickButtons => 3,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            SurfaceRole::LeftKeyboard => "tapdeck left",
            SurfaceRole::RightKeyboard => "tapdeck right",
            SurfaceRole::Pointer => "tapdeck pointer",
            SurfaceRole::ClickButtons => "tapdeck buttons",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlideAnimation {
    pub from_x: f32,
    pub to_x: f32,
    pub start: Instant,
    pub duration: Duration,
}

impl SlideAnimation {
    pub fn end(&self) -> Instant {
        self.start + self.duration
    }

    pub fn is_done(&self, now: Instant) -> bool {
        now >= self.end()
    }

    /// Horizontal position at `now`, eased out quadratically.
    pub fn x_at(&self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.start).as_secs_f32();
        let total = self.duration.as_secs_f32();
        let t = if total <= 0.0 {
            1.0
        } else {
            (elapsed / total).clamp(0.0, 1.0)
        };
        let eased = 1.0 - (1.0 - t) * (1.0 - t);
        self.from_x + (self.to_x - self.from_x) * eased
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Visibility {
    Hidden,
    Showing(SlideAnimation),
    Visible,
    /// Inactivity elapsed; about to drop to the faded opacity.
    Fading,
    Faded,
    Hiding(SlideAnimation),
}

/// One overlay window as the orchestrator sees it.
#[derive(Clone, Debug)]
pub struct OverlaySurface {
    pub role: SurfaceRole,
    /// Top-left corner at rest (the animation target while sliding).
    pub position: Pos2,
    pub size: Vec2,
    /// Effective scale after overlap avoidance.
    pub scale_factor: f32,
    /// Scale the user chose; overlap avoidance never exceeds it.
    pub user_scale: f32,
    pub user_left: Option<f32>,
    pub user_top: Option<f32>,
    pub visibility: Visibility,
    pub opacity: f32,
    pub edit_mode: bool,
}

impl OverlaySurface {
    pub fn new(role: SurfaceRole, user_left: Option<f32>, user_top: Option<f32>, user_scale: f32) -> Self {
        Self {
            role,
            position: Pos2::ZERO,
            size: Vec2::ZERO,
            scale_factor: user_scale,
            user_scale,
            user_left,
            user_top,
            visibility: Visibility::Hidden,
            opacity: 1.0,
            edit_mode: false,
        }
    }

    pub fn visible(&self) -> bool {
        !matches!(self.visibility, Visibility::Hidden)
    }

    pub fn faded(&self) -> bool {
        matches!(self.visibility, Visibility::Fading | Visibility::Faded)
    }

    /// Showing or shown, i.e. accepting input.
    pub fn is_shown(&self) -> bool {
        matches!(
            self.visibility,
            Visibility::Showing(_) | Visibility::Visible | Visibility::Fading | Visibility::Faded
        )
    }

    pub fn is_animating(&self) -> bool {
        matches!(
            self.visibility,
            Visibility::Showing(_) | Visibility::Hiding(_)
        )
    }

    pub fn animation_end(&self) -> Option<Instant> {
        match self.visibility {
            Visibility::Showing(a) | Visibility::Hiding(a) => Some(a.end()),
            _ => None,
        }
    }

    pub fn current_left(&self, now: Instant) -> f32 {
        match self.visibility {
            Visibility::Showing(a) | Visibility::Hiding(a) => a.x_at(now),
            _ => self.position.x,
        }
    }

    pub fn rect(&self, now: Instant) -> Rect {
        Rect::from_min_size(Pos2::new(self.current_left(now), self.position.y), self.size)
    }

    pub fn right_edge(&self) -> f32 {
        self.position.x + self.size.x
    }

    /// Resize keeping the left edge, or the right edge for the right keyboard.
    pub fn resize(&mut self, size: Vec2, scale: f32) {
        if self.role == SurfaceRole::RightKeyboard && self.size.x > 0.0 {
            let right = self.right_edge();
            self.position.x = right - size.x;
        }
        self.size = size;
        self.scale_factor = scale;
    }

    /// Advance a running slide; returns true when the visibility changed.
    pub fn advance(&mut self, now: Instant) -> bool {
        match self.visibility {
            Visibility::Showing(a) if a.is_done(now) => {
                self.visibility = Visibility::Visible;
                tracing::debug!(role = ?self.role, "shown");
                true
            }
            Visibility::Hiding(a) if a.is_done(now) => {
                self.visibility = Visibility::Hidden;
                tracing::debug!(role = ?self.role, "hidden");
                true
            }
            _ => false,
        }
    }

    /// Jump any running slide to its end state.
    pub fn finish_animation(&mut self) {
        match self.visibility {
            Visibility::Showing(_) => self.visibility = Visibility::Visible,
            Visibility::Hiding(_) => self.visibility = Visibility::Hidden,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: Duration = Duration::from_millis(250);

    #[test]
    fn slide_eases_out() {
        let t0 = Instant::now();
        let anim = SlideAnimation {
            from_x: -100.0,
            to_x: 0.0,
            start: t0,
            duration: SLIDE,
        };
        assert_eq!(anim.x_at(t0), -100.0);
        // Halfway in time is three quarters of the way in distance.
        assert!((anim.x_at(t0 + SLIDE / 2) + 25.0).abs() < 1e-3);
        assert_eq!(anim.x_at(t0 + SLIDE), 0.0);
        assert_eq!(anim.x_at(t0 + SLIDE * 2), 0.0);
    }

    #[test]
    fn right_keyboard_keeps_its_right_edge() {
        let mut surface = OverlaySurface::new(SurfaceRole::RightKeyboard, None, None, 1.0);
        surface.position = Pos2::new(600.0, 0.0);
        surface.size = Vec2::new(400.0, 200.0);
        surface.resize(Vec2::new(300.0, 150.0), 0.75);
        assert_eq!(surface.position.x, 700.0);
        assert_eq!(surface.right_edge(), 1000.0);

        let mut left = OverlaySurface::new(SurfaceRole::LeftKeyboard, None, None, 1.0);
        left.position = Pos2::new(10.0, 0.0);
        left.size = Vec2::new(400.0, 200.0);
        left.resize(Vec2::new(300.0, 150.0), 0.75);
        assert_eq!(left.position.x, 10.0);
    }

    #[test]
    fn slides_settle_into_end_states() {
        let t0 = Instant::now();
        let mut surface = OverlaySurface::new(SurfaceRole::LeftKeyboard, None, None, 1.0);
        surface.visibility = Visibility::Showing(SlideAnimation {
            from_x: -300.0,
            to_x: 0.0,
            start: t0,
            duration: SLIDE,
        });
        assert!(surface.is_shown());
        assert!(!surface.advance(t0 + SLIDE / 2));
        assert!(surface.advance(t0 + SLIDE));
        assert_eq!(surface.visibility, Visibility::Visible);
    }
}
