use crate::cursor::CursorShape;
use crate::motion::STICK_VISUAL_RADIUS;
use egui::{Color32, FontId, Painter, Pos2, Rect, Stroke, StrokeKind, Vec2};

pub const MAGENTA: Color32 = Color32::from_rgb(255, 0, 182);
pub const TEAL: Color32 = Color32::from_rgb(0, 213, 255);
pub const ORANGE: Color32 = Color32::from_rgb(255, 101, 0);
pub const PANEL: Color32 = Color32::from_rgb(32, 34, 40);
pub const KEY: Color32 = Color32::from_rgb(64, 68, 78);
pub const KEY_TEXT: Color32 = Color32::from_rgb(235, 235, 235);

/// How a key is highlighted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyHighlight {
    None,
    Active,
    Locked,
}

pub fn fade(color: Color32, alpha: f32) -> Color32 {
    let alpha = alpha.clamp(0.0, 1.0) * color.a() as f32 / 255.0;
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), (255.0 * alpha) as u8)
}

/// Background of one overlay surface; edit mode gets an orange boundary.
pub fn draw_surface_frame(painter: &Painter, rect: Rect, opacity: f32, edit_mode: bool) {
    painter.rect_filled(rect, 8.0, fade(PANEL, 0.85 * opacity));
    if edit_mode {
        painter.rect_stroke(
            rect.shrink(1.0),
            8.0,
            Stroke::new(2.0, fade(ORANGE, opacity)),
            StrokeKind::Inside,
        );
    }
}

pub fn draw_ring(
    painter: &Painter,
    center: Pos2,
    inner_radius: f32,
    outer_radius: f32,
    color: Color32,
) {
    let mid_radius = (inner_radius + outer_radius) / 2.0;
    let thickness = outer_radius - inner_radius;
    painter.circle_stroke(center, mid_radius, Stroke::new(thickness, color));
}

pub fn draw_key(
    painter: &Painter,
    rect: Rect,
    label: &str,
    highlight: KeyHighlight,
    pressed: bool,
    opacity: f32,
    scale: f32,
) {
    let fill = match (highlight, pressed) {
        (_, true) => TEAL,
        (KeyHighlight::Active, _) => MAGENTA,
        (KeyHighlight::Locked, _) => ORANGE,
        (KeyHighlight::None, _) => KEY,
    };
    painter.rect_filled(rect, 4.0 * scale, fade(fill, opacity));
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        label,
        FontId::proportional(16.0 * scale),
        fade(KEY_TEXT, opacity),
    );
}

/// Trackpoint: a recessed well with the stick drawn at its offset.
pub fn draw_trackpoint(painter: &Painter, rect: Rect, stick: Vec2, opacity: f32) {
    let center = rect.center();
    let radius = rect.width().min(rect.height()) / 2.0;
    draw_ring(painter, center, radius * 0.6, radius * 0.65, fade(KEY, opacity));
    let stick_radius = (radius * 0.3).max(STICK_VISUAL_RADIUS * 0.5);
    painter.circle_filled(center + stick, stick_radius, fade(MAGENTA, opacity));
}

pub fn draw_trackpad(painter: &Painter, rect: Rect, touching: bool, opacity: f32) {
    let inner = rect.shrink(6.0);
    painter.rect_filled(inner, 6.0, fade(KEY, opacity * 0.6));
    let color = if touching { TEAL } else { KEY };
    painter.rect_stroke(inner, 6.0, Stroke::new(1.0, fade(color, opacity)), StrokeKind::Outside);
}

pub fn draw_click_button(painter: &Painter, rect: Rect, label: &str, active: bool, opacity: f32) {
    let fill = if active { MAGENTA } else { KEY };
    painter.rect_filled(rect, 4.0, fade(fill, opacity));
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        label,
        FontId::monospace(14.0),
        fade(KEY_TEXT, opacity),
    );
}

pub fn draw_done_button(painter: &Painter, rect: Rect) {
    painter.rect_filled(rect, 4.0, ORANGE);
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        "Done",
        FontId::proportional(14.0),
        Color32::BLACK,
    );
}

/// Emulated cursor for remote viewports, drawn as a small glyph per shape.
pub fn draw_cursor(painter: &Painter, position: Pos2, shape: CursorShape) {
    let outline = Stroke::new(1.0, Color32::BLACK);
    match shape {
        CursorShape::Arrow => {
            let points = vec![
                position,
                position + Vec2::new(0.0, 16.0),
                position + Vec2::new(4.5, 12.0),
                position + Vec2::new(11.0, 12.0),
            ];
            painter.add(egui::Shape::convex_polygon(points, Color32::WHITE, outline));
        }
        CursorShape::IBeam => {
            let stroke = Stroke::new(2.0, Color32::WHITE);
            painter.line_segment([position + Vec2::new(0.0, -8.0), position + Vec2::new(0.0, 8.0)], stroke);
            painter.line_segment([position + Vec2::new(-3.0, -8.0), position + Vec2::new(3.0, -8.0)], stroke);
            painter.line_segment([position + Vec2::new(-3.0, 8.0), position + Vec2::new(3.0, 8.0)], stroke);
        }
        CursorShape::Hand => {
            painter.circle_filled(position + Vec2::new(0.0, 6.0), 6.0, Color32::WHITE);
            painter.circle_stroke(position + Vec2::new(0.0, 6.0), 6.0, outline);
        }
        CursorShape::ResizeHorizontal => {
            let stroke = Stroke::new(2.0, Color32::WHITE);
            painter.arrow(position, Vec2::new(10.0, 0.0), stroke);
            painter.arrow(position, Vec2::new(-10.0, 0.0), stroke);
        }
    }
}
