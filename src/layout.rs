//! Keyboard layouts: key descriptors for the two keyboard halves.
//!
//! The JSON format uses PascalCase field names:
//! `{"Name": "..", "LeftKeys": [{"Label": "Q", "VirtualKeyCode": 81, "Row": 1, "Column": 1}], "RightKeys": [..]}`.

use crate::keys::VirtualKey;
use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const KEY_SIZE: f32 = 50.0;
pub const KEY_PITCH: f32 = 55.0;
pub const KEY_INSET: f32 = 10.0;
/// Padding added right and below the last key.
pub const CONTENT_PADDING: f32 = 10.0;

pub const BUILTIN_LAYOUT: &str = "split60";

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("failed to read layout: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid layout JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("layout {0:?} has no keys")]
    Empty(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyModel {
    pub label: String,
    pub virtual_key_code: VirtualKey,
    #[serde(default)]
    pub row: f32,
    #[serde(default)]
    pub column: f32,
    #[serde(default = "default_width_units")]
    pub width_units: f32,
}

fn default_width_units() -> f32 {
    1.0
}

impl KeyModel {
    pub fn new(label: &str, vk: VirtualKey, row: f32, column: f32, width_units: f32) -> Self {
        Self {
            label: label.to_string(),
            virtual_key_code: vk,
            row,
            column,
            width_units,
        }
    }

    /// Unscaled rectangle inside the keyboard surface.
    pub fn rect(&self) -> Rect {
        Rect::from_min_size(
            Pos2::new(
                self.column * KEY_PITCH + KEY_INSET,
                self.row * KEY_PITCH + KEY_INSET,
            ),
            Vec2::new(KEY_SIZE * self.width_units, KEY_SIZE),
        )
    }
}

/// Unscaled content size of a set of keys.
pub fn content_size(keys: &[KeyModel]) -> Vec2 {
    let extent = keys
        .iter()
        .map(KeyModel::rect)
        .fold(Vec2::ZERO, |acc, r| acc.max(r.max.to_vec2()));
    extent + Vec2::splat(CONTENT_PADDING)
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyboardLayout {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub left_keys: Vec<KeyModel>,
    #[serde(default)]
    pub right_keys: Vec<KeyModel>,
}

impl KeyboardLayout {
    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        let text = std::fs::read_to_string(path)?;
        let mut layout: KeyboardLayout = serde_json::from_str(&text)?;
        if layout.name.is_empty() {
            layout.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        if layout.left_keys.is_empty() && layout.right_keys.is_empty() {
            return Err(LayoutError::Empty(layout.name));
        }
        tracing::info!(
            name = %layout.name,
            left = layout.left_keys.len(),
            right = layout.right_keys.len(),
            "loaded layout"
        );
        Ok(layout)
    }

    /// A built-in layout by name, or a layout file by path.
    pub fn resolve(name_or_path: &str) -> Result<Self, LayoutError> {
        if name_or_path == BUILTIN_LAYOUT {
            return Ok(Self::split60());
        }
        Self::load(Path::new(name_or_path))
    }

    pub fn keys(&self, right: bool) -> &[KeyModel] {
        if right {
            &self.right_keys
        } else {
            &self.left_keys
        }
    }

    /// US split 60% layout.
    pub fn split60() -> Self {
        let left = rows(&[
            &[
                ("Esc", VirtualKey::ESCAPE, 1.0),
                ("1", VirtualKey::digit(1), 1.0),
                ("2", VirtualKey::digit(2), 1.0),
                ("3", VirtualKey::digit(3), 1.0),
                ("4", VirtualKey::digit(4), 1.0),
                ("5", VirtualKey::digit(5), 1.0),
            ],
            &[
                ("Tab", VirtualKey::TAB, 1.0),
                ("Q", VirtualKey::letter(b'Q'), 1.0),
                ("W", VirtualKey::letter(b'W'), 1.0),
                ("E", VirtualKey::letter(b'E'), 1.0),
                ("R", VirtualKey::letter(b'R'), 1.0),
                ("T", VirtualKey::letter(b'T'), 1.0),
            ],
            &[
                ("Caps", VirtualKey::CAPITAL, 1.0),
                ("A", VirtualKey::letter(b'A'), 1.0),
                ("S", VirtualKey::letter(b'S'), 1.0),
                ("D", VirtualKey::letter(b'D'), 1.0),
                ("F", VirtualKey::letter(b'F'), 1.0),
                ("G", VirtualKey::letter(b'G'), 1.0),
            ],
            &[
                ("Shift", VirtualKey::LSHIFT, 1.0),
                ("Z", VirtualKey::letter(b'Z'), 1.0),
                ("X", VirtualKey::letter(b'X'), 1.0),
                ("C", VirtualKey::letter(b'C'), 1.0),
                ("V", VirtualKey::letter(b'V'), 1.0),
                ("B", VirtualKey::letter(b'B'), 1.0),
            ],
            &[
                ("Ctrl", VirtualKey::LCONTROL, 1.0),
                ("Win", VirtualKey::LWIN, 1.0),
                ("Alt", VirtualKey::LMENU, 1.0),
                ("Space", VirtualKey::SPACE, 3.2),
            ],
        ]);
        let right = rows(&[
            &[
                ("6", VirtualKey::digit(6), 1.0),
                ("7", VirtualKey::digit(7), 1.0),
                ("8", VirtualKey::digit(8), 1.0),
                ("9", VirtualKey::digit(9), 1.0),
                ("0", VirtualKey::digit(0), 1.0),
                ("-", VirtualKey::OEM_MINUS, 1.0),
                ("=", VirtualKey::OEM_PLUS, 1.0),
                ("Back", VirtualKey::BACK, 1.0),
            ],
            &[
                ("Y", VirtualKey::letter(b'Y'), 1.0),
                ("U", VirtualKey::letter(b'U'), 1.0),
                ("I", VirtualKey::letter(b'I'), 1.0),
                ("O", VirtualKey::letter(b'O'), 1.0),
                ("P", VirtualKey::letter(b'P'), 1.0),
                ("[", VirtualKey::OEM_4, 1.0),
                ("]", VirtualKey::OEM_6, 1.0),
                ("\\", VirtualKey::OEM_5, 1.0),
            ],
            &[
                ("H", VirtualKey::letter(b'H'), 1.0),
                ("J", VirtualKey::letter(b'J'), 1.0),
                ("K", VirtualKey::letter(b'K'), 1.0),
                ("L", VirtualKey::letter(b'L'), 1.0),
                (";", VirtualKey::OEM_1, 1.0),
                ("'", VirtualKey::OEM_7, 1.0),
                ("Enter", VirtualKey::RETURN, 2.1),
            ],
            &[
                ("N", VirtualKey::letter(b'N'), 1.0),
                ("M", VirtualKey::letter(b'M'), 1.0),
                (",", VirtualKey::OEM_COMMA, 1.0),
                (".", VirtualKey::OEM_PERIOD, 1.0),
                ("/", VirtualKey::OEM_2, 1.0),
                ("Shift", VirtualKey::RSHIFT, 1.0),
                ("Up", VirtualKey::UP, 1.0),
                ("Del", VirtualKey::DELETE, 1.0),
            ],
            &[
                ("Space", VirtualKey::SPACE, 2.1),
                ("Alt", VirtualKey::RMENU, 1.0),
                ("Ctrl", VirtualKey::RCONTROL, 1.0),
                ("`", VirtualKey::OEM_3, 1.0),
                ("Left", VirtualKey::LEFT, 1.0),
                ("Down", VirtualKey::DOWN, 1.0),
                ("Right", VirtualKey::RIGHT, 1.0),
            ],
        ]);
        Self {
            name: BUILTIN_LAYOUT.to_string(),
            left_keys: left,
            right_keys: right,
        }
    }
}

/// Lay rows out left to right; wide keys push the rest of the row along.
fn rows(table: &[&[(&str, VirtualKey, f32)]]) -> Vec<KeyModel> {
    let mut keys = Vec::new();
    for (row, entries) in table.iter().enumerate() {
        let mut column = 0.0;
        for &(label, vk, width) in entries.iter() {
            keys.push(KeyModel::new(label, vk, row as f32, column, width));
            column += width;
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn key_rect_follows_the_grid() {
        let key = KeyModel::new("Q", VirtualKey::letter(b'Q'), 1.0, 2.0, 2.0);
        let rect = key.rect();
        assert_eq!(rect.min, Pos2::new(120.0, 65.0));
        assert_eq!(rect.size(), Vec2::new(100.0, 50.0));
    }

    #[test]
    fn content_size_pads_the_extent() {
        let keys = vec![
            KeyModel::new("A", VirtualKey::letter(b'A'), 0.0, 0.0, 1.0),
            KeyModel::new("B", VirtualKey::letter(b'B'), 1.0, 1.0, 1.0),
        ];
        // Last key ends at 55 + 10 + 50 = 115 in both axes.
        assert_eq!(content_size(&keys), Vec2::new(125.0, 125.0));
        assert_eq!(content_size(&[]), Vec2::splat(CONTENT_PADDING));
    }

    #[test]
    fn builtin_layout_has_both_halves() {
        let layout = KeyboardLayout::resolve(BUILTIN_LAYOUT).expect("builtin");
        assert!(layout.keys(false).iter().any(|k| k.virtual_key_code == VirtualKey::LSHIFT));
        assert!(layout.keys(true).iter().any(|k| k.virtual_key_code == VirtualKey::RSHIFT));
    }

    #[test]
    fn loads_pascal_case_json() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"Name":"tiny","LeftKeys":[{{"Label":"Q","VirtualKeyCode":81,"Row":0,"Column":0}}],"RightKeys":[]}}"#
        )
        .expect("write");
        let layout = KeyboardLayout::load(file.path()).expect("load");
        assert_eq!(layout.name, "tiny");
        assert_eq!(layout.left_keys[0].virtual_key_code, VirtualKey(81));
        assert_eq!(layout.left_keys[0].width_units, 1.0);
    }

    #[test]
    fn empty_layouts_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"Name":"none"}}"#).expect("write");
        assert!(matches!(
            KeyboardLayout::load(file.path()),
            Err(LayoutError::Empty(_))
        ));
    }
}
