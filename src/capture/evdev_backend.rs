use super::multitouch::{AxisRange, MTStateMachine};
use super::{CaptureError, TouchFrame, TouchSource};
use evdev::{AbsoluteAxisType, Device};
use std::collections::VecDeque;
use std::os::unix::io::AsRawFd;
use std::path::Path;

/// Touchscreen frames read straight from an evdev node.
pub struct EvdevTouchSource {
    name: String,
    device: Device,
    machine: MTStateMachine,
    pending: VecDeque<TouchFrame>,
}

impl EvdevTouchSource {
    pub fn open(device_path: &Path) -> Result<Self, CaptureError> {
        let device = Device::open(device_path)
            .map_err(|e| CaptureError::OpenFailed(format!("{}: {}", device_path.display(), e)))?;

        let abs = device
            .get_abs_state()
            .map_err(|e| CaptureError::OpenFailed(format!("abs state: {}", e)))?;
        let x = &abs[AbsoluteAxisType::ABS_MT_POSITION_X.0 as usize];
        let y = &abs[AbsoluteAxisType::ABS_MT_POSITION_Y.0 as usize];
        let x_range = AxisRange::new(x.minimum, x.maximum);
        let y_range = AxisRange::new(y.minimum, y.maximum);

        set_nonblocking(&device)?;

        let name = device.name().unwrap_or("touchscreen").to_string();
        tracing::info!(
            device = %device_path.display(),
            %name,
            x_max = x_range.max,
            y_max = y_range.max,
            "opened touchscreen"
        );

        Ok(Self {
            name,
            device,
            machine: MTStateMachine::new(x_range, y_range),
            pending: VecDeque::new(),
        })
    }
}

fn set_nonblocking(device: &Device) -> Result<(), CaptureError> {
    let fd = device.as_raw_fd();
    let rc = unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFL);
        libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK)
    };
    if rc < 0 {
        return Err(CaptureError::OpenFailed(
            std::io::Error::last_os_error().to_string(),
        ));
    }
    Ok(())
}

impl TouchSource for EvdevTouchSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll_frame(&mut self) -> Result<Option<TouchFrame>, CaptureError> {
        if let Some(frame) = self.pending.pop_front() {
            return Ok(Some(frame));
        }
        match self.device.fetch_events() {
            Ok(events) => {
                for event in events {
                    if let Some(frame) = self.machine.process(&event) {
                        self.pending.push_back(frame);
                    }
                }
                Ok(self.pending.pop_front())
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(CaptureError::ReadError(e.to_string())),
        }
    }
}
