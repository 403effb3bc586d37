#[cfg(target_os = "windows")]
pub mod windows_backend;
#[cfg(target_os = "linux")]
pub mod uinput_backend;
pub mod recording;

use crate::keys::VirtualKey;

/// Upper bound of the OS normalized absolute coordinate space.
pub const ABSOLUTE_MAX: f64 = 65535.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// One synthetic input event in OS-neutral form.
///
/// Absolute moves are already normalized to `0..=65535` on both axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyntheticEvent {
    KeyDown(VirtualKey),
    KeyUp(VirtualKey),
    MoveAbsolute { x: u16, y: u16 },
    ButtonDown(MouseButton),
    ButtonUp(MouseButton),
}

#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error("os rejected input: {0}")]
    Rejected(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The OS side of synthetic input.
///
/// `send` returns how many of the events the OS accepted. A batch the OS
/// refused outright is `InjectError::Rejected`.
pub trait InjectionBackend {
    fn name(&self) -> &'static str;
    fn send(&mut self, events: &[SyntheticEvent]) -> Result<usize, InjectError>;
    fn cursor_position(&self) -> Option<(i32, i32)>;
    fn screen_size(&self) -> (i32, i32);

    /// Backends that cannot query the display are told its size instead.
    fn set_screen_size(&mut self, _width: i32, _height: i32) {}
}

impl<T: InjectionBackend + ?Sized> InjectionBackend for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn send(&mut self, events: &[SyntheticEvent]) -> Result<usize, InjectError> {
        (**self).send(events)
    }

    fn cursor_position(&self) -> Option<(i32, i32)> {
        (**self).cursor_position()
    }

    fn screen_size(&self) -> (i32, i32) {
        (**self).screen_size()
    }

    fn set_screen_size(&mut self, width: i32, height: i32) {
        (**self).set_screen_size(width, height)
    }
}

/// Map a pixel coordinate into the normalized absolute space.
///
/// The pixel is clamped to `[0, dimension - 1]` first and the result is
/// rounded, never truncated.
pub fn normalize(pixel: i32, dimension: i32) -> u16 {
    if dimension <= 0 {
        return 0;
    }
    let clamped = pixel.clamp(0, dimension - 1);
    (clamped as f64 * ABSOLUTE_MAX / dimension as f64).round() as u16
}

/// Inverse of [`normalize`].
pub fn denormalize(value: u16, dimension: i32) -> i32 {
    if dimension <= 0 {
        return 0;
    }
    (value as f64 * dimension as f64 / ABSOLUTE_MAX).round() as i32
}

/// Fire-and-forget facade over an [`InjectionBackend`].
///
/// Nothing here returns an error: a rejected or failed injection is logged and
/// dropped. Retrying could duplicate keystrokes.
pub struct InputInjector<B> {
    backend: B,
}

impl<B: InjectionBackend> InputInjector<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn send_key(&mut self, vk: VirtualKey) {
        self.dispatch(
            "key",
            &[SyntheticEvent::KeyDown(vk), SyntheticEvent::KeyUp(vk)],
        );
    }

    pub fn send_key_down(&mut self, vk: VirtualKey) {
        self.dispatch("key down", &[SyntheticEvent::KeyDown(vk)]);
    }

    pub fn send_key_up(&mut self, vk: VirtualKey) {
        self.dispatch("key up", &[SyntheticEvent::KeyUp(vk)]);
    }

    /// Move the OS cursor by a pixel delta.
    ///
    /// Issued as an absolute move against the primary display: relative OS
    /// movement does not compose with remote-display sessions.
    pub fn send_relative_move(&mut self, dx: i32, dy: i32) {
        let Some((x, y)) = self.backend.cursor_position() else {
            tracing::warn!(
                backend = self.backend.name(),
                "cursor position unavailable, dropping move"
            );
            return;
        };
        let (width, height) = self.backend.screen_size();
        self.send_absolute_move(x + dx, y + dy, width, height);
    }

    /// Move to a point inside a caller-supplied viewport.
    pub fn send_absolute_move(&mut self, x: i32, y: i32, viewport_width: i32, viewport_height: i32) {
        let event = SyntheticEvent::MoveAbsolute {
            x: normalize(x, viewport_width),
            y: normalize(y, viewport_height),
        };
        self.dispatch("move", &[event]);
    }

    pub fn send_click(&mut self, button: MouseButton) {
        self.dispatch(
            "click",
            &[
                SyntheticEvent::ButtonDown(button),
                SyntheticEvent::ButtonUp(button),
            ],
        );
    }

    /// Move-then-click in one batch. Some remote-display paths only register a
    /// click that follows an explicit move into the same coordinate space.
    pub fn send_click_at(
        &mut self,
        x: i32,
        y: i32,
        viewport_width: i32,
        viewport_height: i32,
        button: MouseButton,
    ) {
        let moved = SyntheticEvent::MoveAbsolute {
            x: normalize(x, viewport_width),
            y: normalize(y, viewport_height),
        };
        self.dispatch(
            "click at",
            &[
                moved,
                SyntheticEvent::ButtonDown(button),
                SyntheticEvent::ButtonUp(button),
            ],
        );
    }

    pub fn send_button_down(&mut self, button: MouseButton) {
        self.dispatch("button down", &[SyntheticEvent::ButtonDown(button)]);
    }

    pub fn send_button_up(&mut self, button: MouseButton) {
        self.dispatch("button up", &[SyntheticEvent::ButtonUp(button)]);
    }

    fn dispatch(&mut self, what: &str, events: &[SyntheticEvent]) {
        match self.backend.send(events) {
            Ok(0) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    what,
                    count = events.len(),
                    "os accepted zero synthetic events"
                );
            }
            Ok(accepted) if accepted < events.len() => {
                tracing::warn!(
                    backend = self.backend.name(),
                    what,
                    accepted,
                    count = events.len(),
                    "os accepted only part of the batch"
                );
            }
            Ok(_) => {
                tracing::trace!(backend = self.backend.name(), what, ?events, "injected");
            }
            Err(e) => {
                tracing::warn!(backend = self.backend.name(), what, error = %e, "injection failed");
            }
        }
    }
}
