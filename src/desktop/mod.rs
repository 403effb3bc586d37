//! Host desktop services the orchestrator needs beyond input injection.

#[cfg(target_os = "windows")]
pub mod windows_host;

use crate::cursor::CursorShape;
use crate::focus::{FocusError, WindowHandle};
use std::collections::HashSet;

pub trait DesktopHost {
    fn activate_window(&mut self, handle: WindowHandle) -> Result<(), FocusError>;
    fn caps_lock_active(&self) -> bool;
    /// Called after a Caps Lock key was injected.
    fn caps_lock_pressed(&mut self) {}
    /// Shape of the system cursor, for drawing the emulated cursor.
    fn cursor_shape(&self) -> CursorShape;
}

impl<T: DesktopHost + ?Sized> DesktopHost for Box<T> {
    fn activate_window(&mut self, handle: WindowHandle) -> Result<(), FocusError> {
        (**self).activate_window(handle)
    }

    fn caps_lock_active(&self) -> bool {
        (**self).caps_lock_active()
    }

    fn caps_lock_pressed(&mut self) {
        (**self).caps_lock_pressed()
    }

    fn cursor_shape(&self) -> CursorShape {
        (**self).cursor_shape()
    }
}

/// Host without foreground control; Caps Lock is tracked from our own key
/// presses.
#[derive(Debug, Default)]
pub struct NullDesktop {
    caps_lock: bool,
}

impl NullDesktop {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DesktopHost for NullDesktop {
    fn activate_window(&mut self, _handle: WindowHandle) -> Result<(), FocusError> {
        Err(FocusError::Unsupported)
    }

    fn caps_lock_active(&self) -> bool {
        self.caps_lock
    }

    fn caps_lock_pressed(&mut self) {
        self.caps_lock = !self.caps_lock;
    }

    fn cursor_shape(&self) -> CursorShape {
        CursorShape::Arrow
    }
}

/// Scriptable host that records activation attempts.
#[derive(Debug, Default)]
pub struct RecordingDesktop {
    pub activations: Vec<WindowHandle>,
    pub caps_lock: bool,
    pub cursor_shape: CursorShape,
    gone: HashSet<WindowHandle>,
}

impl RecordingDesktop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_gone(&mut self, handle: WindowHandle) {
        self.gone.insert(handle);
    }
}

impl DesktopHost for RecordingDesktop {
    fn activate_window(&mut self, handle: WindowHandle) -> Result<(), FocusError> {
        if self.gone.contains(&handle) {
            return Err(FocusError::WindowGone(handle));
        }
        self.activations.push(handle);
        Ok(())
    }

    fn caps_lock_active(&self) -> bool {
        self.caps_lock
    }

    fn cursor_shape(&self) -> CursorShape {
        self.cursor_shape
    }
}
