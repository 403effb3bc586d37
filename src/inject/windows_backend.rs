use super::{InjectError, InjectionBackend, MouseButton, SyntheticEvent};
use windows::Win32::Foundation::POINT;
use windows::Win32::UI::Input::KeyboardAndMouse::*;
use windows::Win32::UI::WindowsAndMessaging::{GetCursorPos, GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

/// SendInput-based injection.
///
/// Keys go out as virtual-key codes only (no scan codes); every mouse move is
/// an absolute move in the normalized 0..65535 space.
pub struct SendInputBackend;

impl SendInputBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SendInputBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn keyboard_input(vk: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(vk),
                wScan: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn mouse_input(dx: i32, dy: i32, flags: MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn button_flags(button: MouseButton, down: bool) -> MOUSE_EVENT_FLAGS {
    match (button, down) {
        (MouseButton::Left, true) => MOUSEEVENTF_LEFTDOWN,
        (MouseButton::Left, false) => MOUSEEVENTF_LEFTUP,
        (MouseButton::Middle, true) => MOUSEEVENTF_MIDDLEDOWN,
        (MouseButton::Middle, false) => MOUSEEVENTF_MIDDLEUP,
        (MouseButton::Right, true) => MOUSEEVENTF_RIGHTDOWN,
        (MouseButton::Right, false) => MOUSEEVENTF_RIGHTUP,
    }
}

fn to_input(event: &SyntheticEvent) -> INPUT {
    match *event {
        SyntheticEvent::KeyDown(vk) => keyboard_input(vk.0, KEYBD_EVENT_FLAGS(0)),
        SyntheticEvent::KeyUp(vk) => keyboard_input(vk.0, KEYEVENTF_KEYUP),
        SyntheticEvent::MoveAbsolute { x, y } => {
            mouse_input(x as i32, y as i32, MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE)
        }
        SyntheticEvent::ButtonDown(button) => mouse_input(0, 0, button_flags(button, true)),
        SyntheticEvent::ButtonUp(button) => mouse_input(0, 0, button_flags(button, false)),
    }
}

impl InjectionBackend for SendInputBackend {
    fn name(&self) -> &'static str {
        "sendinput"
    }

    fn send(&mut self, events: &[SyntheticEvent]) -> Result<usize, InjectError> {
        let inputs: Vec<INPUT> = events.iter().map(to_input).collect();
        let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent == 0 && !inputs.is_empty() {
            return Err(InjectError::Rejected(
                windows::core::Error::from_win32().to_string(),
            ));
        }
        Ok(sent as usize)
    }

    fn cursor_position(&self) -> Option<(i32, i32)> {
        let mut pt = POINT::default();
        unsafe { GetCursorPos(&mut pt) }.ok()?;
        Some((pt.x, pt.y))
    }

    fn screen_size(&self) -> (i32, i32) {
        unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) }
    }
}
