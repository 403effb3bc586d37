use crate::motion::MouseMode;
use crate::orchestrator::SurfaceRole;
use egui::{Pos2, Rect, Vec2};

pub const TRACKPOINT_BASE: Vec2 = Vec2::new(100.0, 100.0);
pub const TRACKPAD_BASE: Vec2 = Vec2::new(250.0, 200.0);
pub const CLICK_BUTTONS_BASE: Vec2 = Vec2::new(160.0, 50.0);

/// Padding inside the scaled keyboard frame.
const KEYBOARD_INNER_PADDING: f32 = 10.0;
/// Border around the scaled keyboard frame, not affected by scale.
const KEYBOARD_FRAME: f32 = 20.0;

/// Vertical gap between the pointer surface and the screen center.
const POINTER_DROP: f32 = 100.0;
const STACK_GAP: f32 = 10.0;

pub const MIN_USER_SCALE: f32 = 0.5;
pub const MAX_USER_SCALE: f32 = 4.0;

/// Screen and content sizes every surface extent is derived from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dimensions {
    pub screen_width: f32,
    pub screen_height: f32,
    pub left_content: Vec2,
    pub right_content: Vec2,
    pub pointer_base: Vec2,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            screen_width: 1920.0,
            screen_height: 1080.0,
            left_content: Vec2::new(340.0, 285.0),
            right_content: Vec2::new(460.0, 285.0),
            pointer_base: TRACKPOINT_BASE,
        }
    }
}

pub fn keyboard_extent(content: Vec2, scale: f32) -> Vec2 {
    (content + Vec2::splat(KEYBOARD_INNER_PADDING)) * scale + Vec2::splat(KEYBOARD_FRAME)
}

/// Where a key at unscaled `key` (surface-local) lands on a keyboard surface
/// whose top-left corner is `origin`.
pub fn scaled_key_rect(origin: Pos2, key: Rect, scale: f32) -> Rect {
    let inner = origin + Vec2::splat(KEYBOARD_FRAME / 2.0);
    Rect::from_min_size(inner + key.min.to_vec2() * scale, key.size() * scale)
}

/// Equal-width cells across the click-button surface, left to right.
pub fn click_button_cells<const N: usize>(surface: Rect) -> [Rect; N] {
    let width = surface.width() / N as f32;
    std::array::from_fn(|i| {
        Rect::from_min_size(
            Pos2::new(surface.min.x + width * i as f32, surface.min.y),
            Vec2::new(width, surface.height()),
        )
        .shrink(2.0)
    })
}

pub fn pointer_base(mode: MouseMode) -> Vec2 {
    match mode {
        MouseMode::Trackpad => TRACKPAD_BASE,
        MouseMode::Trackpoint | MouseMode::Off => TRACKPOINT_BASE,
    }
}

impl Dimensions {
    pub fn new(screen_width: f32, screen_height: f32) -> Self {
        Self {
            screen_width,
            screen_height,
            ..Self::default()
        }
    }

    pub fn screen(&self) -> Vec2 {
        Vec2::new(self.screen_width, self.screen_height)
    }

    pub fn extent(&self, role: SurfaceRole, scale: f32) -> Vec2 {
        match role {
            SurfaceRole::LeftKeyboard => keyboard_extent(self.left_content, scale),
            SurfaceRole::RightKeyboard => keyboard_extent(self.right_content, scale),
            SurfaceRole::Pointer => self.pointer_base * scale,
            SurfaceRole::ClickButtons => CLICK_BUTTONS_BASE * scale,
        }
    }

    /// Where a surface goes when the user never placed it.
    pub fn default_position(&self, role: SurfaceRole, scale: f32) -> Pos2 {
        let size = self.extent(role, scale);
        let center_x = self.screen_width / 2.0;
        let center_y = self.screen_height / 2.0;
        match role {
            SurfaceRole::LeftKeyboard => Pos2::new(0.0, center_y - size.y / 2.0),
            SurfaceRole::RightKeyboard => {
                Pos2::new(self.screen_width - size.x, center_y - size.y / 2.0)
            }
            SurfaceRole::Pointer => Pos2::new(center_x - size.x / 2.0, center_y + POINTER_DROP),
            SurfaceRole::ClickButtons => {
                let pointer = self.extent(SurfaceRole::Pointer, 1.0);
                Pos2::new(
                    center_x - size.x / 2.0,
                    center_y + POINTER_DROP + pointer.y + STACK_GAP,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_frame_is_not_scaled() {
        let extent = keyboard_extent(Vec2::new(90.0, 40.0), 2.0);
        assert_eq!(extent, Vec2::new(220.0, 120.0));
    }

    #[test]
    fn default_positions_hug_the_edges() {
        let dims = Dimensions::new(1000.0, 800.0);
        let left = dims.default_position(SurfaceRole::LeftKeyboard, 1.0);
        let right = dims.default_position(SurfaceRole::RightKeyboard, 1.0);
        assert_eq!(left.x, 0.0);
        assert_eq!(right.x + dims.extent(SurfaceRole::RightKeyboard, 1.0).x, 1000.0);

        let pointer = dims.default_position(SurfaceRole::Pointer, 1.0);
        assert_eq!(pointer, Pos2::new(450.0, 500.0));
        let buttons = dims.default_position(SurfaceRole::ClickButtons, 1.0);
        assert_eq!(buttons, Pos2::new(420.0, 610.0));
    }

    #[test]
    fn keys_scale_inside_the_frame() {
        let key = Rect::from_min_size(Pos2::new(65.0, 10.0), Vec2::new(50.0, 50.0));
        let rect = scaled_key_rect(Pos2::new(100.0, 200.0), key, 2.0);
        assert_eq!(rect.min, Pos2::new(240.0, 230.0));
        assert_eq!(rect.size(), Vec2::new(100.0, 100.0));
    }

    #[test]
    fn click_cells_split_the_surface() {
        let cells: [Rect; 4] =
            click_button_cells(Rect::from_min_size(Pos2::ZERO, CLICK_BUTTONS_BASE));
        assert_eq!(cells[0].min, Pos2::new(2.0, 2.0));
        assert_eq!(cells[3].max, Pos2::new(158.0, 48.0));
    }

    #[test]
    fn pointer_size_follows_mode() {
        assert_eq!(pointer_base(MouseMode::Trackpad), TRACKPAD_BASE);
        assert_eq!(pointer_base(MouseMode::Trackpoint), TRACKPOINT_BASE);
    }
}
