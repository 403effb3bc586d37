use super::{ForegroundProbe, ForegroundSnapshot, WindowHandle};
use windows::Win32::Foundation::HWND;
use windows::Win32::System::Threading::GetCurrentProcessId;
use windows::Win32::UI::WindowsAndMessaging::{
    GetClassNameW, GetForegroundWindow, GetWindowThreadProcessId,
};

/// Window classes that belong to the shell rather than to an application.
const SHELL_CLASSES: &[&str] = &[
    "Shell_TrayWnd",
    "Shell_SecondaryTrayWnd",
    "Progman",
    "WorkerW",
    "NotifyIconOverflowWindow",
];

pub struct WindowsForegroundProbe {
    own_pid: u32,
}

impl WindowsForegroundProbe {
    pub fn new() -> Self {
        Self {
            own_pid: unsafe { GetCurrentProcessId() },
        }
    }
}

impl Default for WindowsForegroundProbe {
    fn default() -> Self {
        Self::new()
    }
}

fn class_name(hwnd: HWND) -> String {
    let mut buf = [0u16; 256];
    let len = unsafe { GetClassNameW(hwnd, &mut buf) };
    String::from_utf16_lossy(&buf[..len.max(0) as usize])
}

impl ForegroundProbe for WindowsForegroundProbe {
    fn foreground(&mut self) -> Option<ForegroundSnapshot> {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.is_invalid() {
            return None;
        }

        let mut pid = 0u32;
        unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid)) };
        let class = class_name(hwnd);

        Some(ForegroundSnapshot {
            handle: WindowHandle(hwnd.0 as isize),
            is_own: pid == self.own_pid,
            is_shell: SHELL_CLASSES.contains(&class.as_str()),
        })
    }
}
