//! Emulated cursor for remote viewports, where the real cursor is drawn by a
//! remote session and cannot be read back.

use crate::motion::MovementVector;
use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

impl fmt::Display for ViewportSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for ViewportSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
        let width: u32 = w.trim().parse().map_err(|e| format!("width: {e}"))?;
        let height: u32 = h.trim().parse().map_err(|e| format!("height: {e}"))?;
        if width == 0 || height == 0 {
            return Err("viewport dimensions must be non-zero".to_string());
        }
        Ok(Self { width, height })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorShape {
    #[default]
    Arrow,
    IBeam,
    Hand,
    ResizeHorizontal,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CursorState {
    position: Pos2,
    viewport: ViewportSize,
    shape: CursorShape,
}

impl CursorState {
    /// A cursor centered in `viewport`.
    pub fn new(viewport: ViewportSize) -> Self {
        let center = Pos2::new(viewport.width as f32 / 2.0, viewport.height as f32 / 2.0);
        Self {
            position: center,
            viewport,
            shape: CursorShape::Arrow,
        }
    }

    pub fn position(&self) -> Pos2 {
        self.position
    }

    pub fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    pub fn shape(&self) -> CursorShape {
        self.shape
    }

    /// Returns true when the shape changed.
    pub fn set_shape(&mut self, shape: CursorShape) -> bool {
        let changed = self.shape != shape;
        self.shape = shape;
        changed
    }

    pub fn apply(&mut self, vector: MovementVector) -> Pos2 {
        self.move_to(self.position + Vec2::new(vector.dx, vector.dy))
    }

    pub fn move_to(&mut self, position: Pos2) -> Pos2 {
        self.position = self.clamp(position);
        self.position
    }

    pub fn set_viewport(&mut self, viewport: ViewportSize) {
        self.viewport = viewport;
        self.position = self.clamp(self.position);
    }

    fn clamp(&self, p: Pos2) -> Pos2 {
        let max_x = (self.viewport.width as f32 - 1.0).max(0.0);
        let max_y = (self.viewport.height as f32 - 1.0).max(0.0);
        Pos2::new(p.x.clamp(0.0, max_x), p.y.clamp(0.0, max_y))
    }
}
