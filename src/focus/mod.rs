//! Foreground-window tracking so a visibility toggle can hand focus back to
//! whatever the user was working in.

#[cfg(target_os = "windows")]
pub mod windows_probe;

use crate::timer::Deadline;
use std::fmt;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

pub const FOCUS_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const FOCUS_RESTORE_DELAY: Duration = Duration::from_millis(150);

/// Opaque OS window handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// The foreground window as seen by one poll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForegroundSnapshot {
    pub handle: WindowHandle,
    /// Belongs to this process (an overlay or the control panel).
    pub is_own: bool,
    /// Taskbar, desktop or another shell surface.
    pub is_shell: bool,
}

impl ForegroundSnapshot {
    pub fn external(handle: WindowHandle) -> Self {
        Self {
            handle,
            is_own: false,
            is_shell: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FocusError {
    #[error("window {0} no longer exists")]
    WindowGone(WindowHandle),
    #[error("window {0} refused foreground activation")]
    Refused(WindowHandle),
    #[error("foreground control is not supported on this platform")]
    Unsupported,
}

/// Remembers the last foreground window that was neither ours nor the shell's
/// and schedules its restoration.
#[derive(Debug)]
pub struct FocusTracker {
    last_external: Option<WindowHandle>,
    pending: Option<WindowHandle>,
    restore: Deadline,
    delay: Duration,
}

impl Default for FocusTracker {
    fn default() -> Self {
        Self::new(FOCUS_RESTORE_DELAY)
    }
}

impl FocusTracker {
    pub fn new(delay: Duration) -> Self {
        Self {
            last_external: None,
            pending: None,
            restore: Deadline::default(),
            delay,
        }
    }

    pub fn observe(&mut self, snapshot: ForegroundSnapshot) {
        if snapshot.is_own || snapshot.is_shell {
            return;
        }
        if self.last_external != Some(snapshot.handle) {
            tracing::trace!(window = %snapshot.handle, "foreground changed");
        }
        self.last_external = Some(snapshot.handle);
    }

    pub fn last_external(&self) -> Option<WindowHandle> {
        self.last_external
    }

    /// Arrange for the remembered window to get focus back after the restore
    /// delay. Does nothing if no external window has been seen.
    pub fn schedule_restore(&mut self, now: Instant) {
        if let Some(handle) = self.last_external {
            self.pending = Some(handle);
            self.restore.arm(now + self.delay);
        }
    }

    /// The window to activate, once the restore delay has passed.
    pub fn due(&mut self, now: Instant) -> Option<WindowHandle> {
        if self.restore.fire(now) {
            self.pending.take()
        } else {
            None
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.restore.at()
    }
}

/// Reads the current foreground window.
pub trait ForegroundProbe: Send + 'static {
    fn foreground(&mut self) -> Option<ForegroundSnapshot>;
}

/// Poll a probe on a background thread and send every change back to the UI
/// thread.
pub fn spawn_focus_poll<P: ForegroundProbe>(
    mut probe: P,
    interval: Duration,
) -> mpsc::Receiver<ForegroundSnapshot> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut last = None;
        loop {
            let current = probe.foreground();
            if current.is_some() && current != last {
                if let Some(snapshot) = current {
                    if tx.send(snapshot).is_err() {
                        break;
                    }
                }
                last = current;
            }
            thread::sleep(interval);
        }
    });
    rx
}
