#[cfg(target_os = "linux")]
pub mod udev_discovery;

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub devnode: PathBuf,
    pub name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("udev error: {0}")]
    UdevError(String),
    #[error("no touchscreen found")]
    NotFound,
}

pub trait DeviceDiscovery {
    fn find_touchscreens() -> Result<Vec<DeviceInfo>, DiscoveryError>;
}
