use super::DesktopHost;
use crate::cursor::CursorShape;
use crate::focus::{FocusError, WindowHandle};
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::Input::KeyboardAndMouse::{GetKeyState, VK_CAPITAL};
use windows::Win32::UI::WindowsAndMessaging::{
    GetCursorInfo, IsWindow, LoadCursorW, SetForegroundWindow, CURSORINFO, HCURSOR, IDC_HAND,
    IDC_IBEAM, IDC_SIZEWE,
};

pub struct WindowsDesktop {
    ibeam: Option<HCURSOR>,
    hand: Option<HCURSOR>,
    resize_we: Option<HCURSOR>,
}

impl WindowsDesktop {
    pub fn new() -> Self {
        unsafe {
            Self {
                ibeam: LoadCursorW(None, IDC_IBEAM).ok(),
                hand: LoadCursorW(None, IDC_HAND).ok(),
                resize_we: LoadCursorW(None, IDC_SIZEWE).ok(),
            }
        }
    }
}

impl Default for WindowsDesktop {
    fn default() -> Self {
        Self::new()
    }
}

impl DesktopHost for WindowsDesktop {
    fn activate_window(&mut self, handle: WindowHandle) -> Result<(), FocusError> {
        let hwnd = HWND(handle.0 as *mut std::ffi::c_void);
        unsafe {
            if !IsWindow(Some(hwnd)).as_bool() {
                return Err(FocusError::WindowGone(handle));
            }
            if !SetForegroundWindow(hwnd).as_bool() {
                return Err(FocusError::Refused(handle));
            }
        }
        Ok(())
    }

    fn caps_lock_active(&self) -> bool {
        unsafe { GetKeyState(VK_CAPITAL.0 as i32) & 1 != 0 }
    }

    fn cursor_shape(&self) -> CursorShape {
        let mut info = CURSORINFO {
            cbSize: std::mem::size_of::<CURSORINFO>() as u32,
            ..Default::default()
        };
        if unsafe { GetCursorInfo(&mut info) }.is_err() {
            return CursorShape::Arrow;
        }
        let current = Some(info.hCursor);
        if current == self.ibeam {
            CursorShape::IBeam
        } else if current == self.hand {
            CursorShape::Hand
        } else if current == self.resize_we {
            CursorShape::ResizeHorizontal
        } else {
            CursorShape::Arrow
        }
    }
}
