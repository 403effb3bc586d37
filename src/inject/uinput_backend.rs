//! Linux injection through two uinput virtual devices: a keyboard and an
//! absolute pointer whose axes span the normalized 0..65535 space.
//!
//! uinput cannot read the real cursor back, so the backend remembers the last
//! absolute position it produced and answers cursor queries from that.

use super::{denormalize, InjectError, InjectionBackend, MouseButton, SyntheticEvent};
use crate::keys::VirtualKey;
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AbsInfo, AbsoluteAxisType, AttributeSet, EventType, InputEvent, Key, UinputAbsSetup};

pub struct UinputBackend {
    keyboard: VirtualDevice,
    pointer: VirtualDevice,
    cursor: (i32, i32),
    screen: (i32, i32),
}

impl UinputBackend {
    pub fn open(width: i32, height: i32) -> Result<Self, InjectError> {
        let mut keys = AttributeSet::<Key>::new();
        for code in 0..=0xFFu16 {
            if let Some(key) = key_for(VirtualKey(code)) {
                keys.insert(key);
            }
        }
        let keyboard = VirtualDeviceBuilder::new()?
            .name("tapdeck keyboard")
            .with_keys(&keys)?
            .build()?;

        let mut buttons = AttributeSet::<Key>::new();
        buttons.insert(Key::BTN_LEFT);
        buttons.insert(Key::BTN_RIGHT);
        buttons.insert(Key::BTN_MIDDLE);
        let axis_x = UinputAbsSetup::new(AbsoluteAxisType::ABS_X, AbsInfo::new(0, 0, 65535, 0, 0, 0));
        let axis_y = UinputAbsSetup::new(AbsoluteAxisType::ABS_Y, AbsInfo::new(0, 0, 65535, 0, 0, 0));
        let pointer = VirtualDeviceBuilder::new()?
            .name("tapdeck pointer")
            .with_keys(&buttons)?
            .with_absolute_axis(&axis_x)?
            .with_absolute_axis(&axis_y)?
            .build()?;

        tracing::info!(width, height, "uinput devices created");
        Ok(Self {
            keyboard,
            pointer,
            cursor: (width / 2, height / 2),
            screen: (width, height),
        })
    }

    fn emit_key(&mut self, vk: VirtualKey, value: i32) -> Result<bool, InjectError> {
        let Some(key) = key_for(vk) else {
            tracing::debug!(%vk, "no evdev mapping for key");
            return Ok(false);
        };
        self.keyboard
            .emit(&[InputEvent::new(EventType::KEY, key.code(), value)])?;
        Ok(true)
    }

    fn emit_button(&mut self, button: MouseButton, value: i32) -> Result<bool, InjectError> {
        let key = match button {
            MouseButton::Left => Key::BTN_LEFT,
            MouseButton::Middle => Key::BTN_MIDDLE,
            MouseButton::Right => Key::BTN_RIGHT,
        };
        self.pointer
            .emit(&[InputEvent::new(EventType::KEY, key.code(), value)])?;
        Ok(true)
    }
}

impl InjectionBackend for UinputBackend {
    fn name(&self) -> &'static str {
        "uinput"
    }

    fn send(&mut self, events: &[SyntheticEvent]) -> Result<usize, InjectError> {
        let mut accepted = 0;
        for event in events {
            let delivered = match *event {
                SyntheticEvent::KeyDown(vk) => self.emit_key(vk, 1)?,
                SyntheticEvent::KeyUp(vk) => self.emit_key(vk, 0)?,
                SyntheticEvent::MoveAbsolute { x, y } => {
                    self.pointer.emit(&[
                        InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_X.0, x as i32),
                        InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_Y.0, y as i32),
                    ])?;
                    self.cursor = (
                        denormalize(x, self.screen.0),
                        denormalize(y, self.screen.1),
                    );
                    true
                }
                SyntheticEvent::ButtonDown(button) => self.emit_button(button, 1)?,
                SyntheticEvent::ButtonUp(button) => self.emit_button(button, 0)?,
            };
            if delivered {
                accepted += 1;
            }
        }
        Ok(accepted)
    }

    fn cursor_position(&self) -> Option<(i32, i32)> {
        Some(self.cursor)
    }

    fn screen_size(&self) -> (i32, i32) {
        self.screen
    }

    fn set_screen_size(&mut self, width: i32, height: i32) {
        self.screen = (width, height);
    }
}

/// Translate a virtual-key code to the evdev key with the same meaning on a
/// US layout.
pub fn key_for(vk: VirtualKey) -> Option<Key> {
    let code = vk.0;
    let key = match code {
        0x08 => Key::KEY_BACKSPACE,
        0x09 => Key::KEY_TAB,
        0x0D => Key::KEY_ENTER,
        0x14 => Key::KEY_CAPSLOCK,
        0x1B => Key::KEY_ESC,
        0x20 => Key::KEY_SPACE,
        0x21 => Key::KEY_PAGEUP,
        0x22 => Key::KEY_PAGEDOWN,
        0x23 => Key::KEY_END,
        0x24 => Key::KEY_HOME,
        0x25 => Key::KEY_LEFT,
        0x26 => Key::KEY_UP,
        0x27 => Key::KEY_RIGHT,
        0x28 => Key::KEY_DOWN,
        0x2C => Key::KEY_SYSRQ,
        0x2D => Key::KEY_INSERT,
        0x2E => Key::KEY_DELETE,
        0x30 => Key::KEY_0,
        0x31 => Key::KEY_1,
        0x32 => Key::KEY_2,
        0x33 => Key::KEY_3,
        0x34 => Key::KEY_4,
        0x35 => Key::KEY_5,
        0x36 => Key::KEY_6,
        0x37 => Key::KEY_7,
        0x38 => Key::KEY_8,
        0x39 => Key::KEY_9,
        0x41..=0x5A => return letter_key(code as u8),
        0x5B => Key::KEY_LEFTMETA,
        0x5C => Key::KEY_RIGHTMETA,
        0x5D => Key::KEY_COMPOSE,
        0x70 => Key::KEY_F1,
        0x71 => Key::KEY_F2,
        0x72 => Key::KEY_F3,
        0x73 => Key::KEY_F4,
        0x74 => Key::KEY_F5,
        0x75 => Key::KEY_F6,
        0x76 => Key::KEY_F7,
        0x77 => Key::KEY_F8,
        0x78 => Key::KEY_F9,
        0x79 => Key::KEY_F10,
        0x7A => Key::KEY_F11,
        0x7B => Key::KEY_F12,
        0x90 => Key::KEY_NUMLOCK,
        0x91 => Key::KEY_SCROLLLOCK,
        0xA0 => Key::KEY_LEFTSHIFT,
        0xA1 => Key::KEY_RIGHTSHIFT,
        0xA2 => Key::KEY_LEFTCTRL,
        0xA3 => Key::KEY_RIGHTCTRL,
        0xA4 => Key::KEY_LEFTALT,
        0xA5 => Key::KEY_RIGHTALT,
        0xBA => Key::KEY_SEMICOLON,
        0xBB => Key::KEY_EQUAL,
        0xBC => Key::KEY_COMMA,
        0xBD => Key::KEY_MINUS,
        0xBE => Key::KEY_DOT,
        0xBF => Key::KEY_SLASH,
        0xC0 => Key::KEY_GRAVE,
        0xDB => Key::KEY_LEFTBRACE,
        0xDC => Key::KEY_BACKSLASH,
        0xDD => Key::KEY_RIGHTBRACE,
        0xDE => Key::KEY_APOSTROPHE,
        _ => return None,
    };
    Some(key)
}

fn letter_key(c: u8) -> Option<Key> {
    let key = match c {
        b'A' => Key::KEY_A,
        b'B' => Key::KEY_B,
        b'C' => Key::KEY_C,
        b'D' => Key::KEY_D,
        b'E' => Key::KEY_E,
        b'F' => Key::KEY_F,
        b'G' => Key::KEY_G,
        b'H' => Key::KEY_H,
        b'I' => Key::KEY_I,
        b'J' => Key::KEY_J,
        b'K' => Key::KEY_K,
        b'L' => Key::KEY_L,
        b'M' => Key::KEY_M,
        b'N' => Key::KEY_N,
        b'O' => Key::KEY_O,
        b'P' => Key::KEY_P,
        b'Q' => Key::KEY_Q,
        b'R' => Key::KEY_R,
        b'S' => Key::KEY_S,
        b'T' => Key::KEY_T,
        b'U' => Key::KEY_U,
        b'V' => Key::KEY_V,
        b'W' => Key::KEY_W,
        b'X' => Key::KEY_X,
        b'Y' => Key::KEY_Y,
        b'Z' => Key::KEY_Z,
        _ => return None,
    };
    Some(key)
}
