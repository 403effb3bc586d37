use super::{DeviceDiscovery, DeviceInfo, DiscoveryError};
use std::path::PathBuf;

pub struct UdevDiscovery;

impl DeviceDiscovery for UdevDiscovery {
    fn find_touchscreens() -> Result<Vec<DeviceInfo>, DiscoveryError> {
        let mut enumerator =
            udev::Enumerator::new().map_err(|e| DiscoveryError::UdevError(e.to_string()))?;

        enumerator
            .match_subsystem("input")
            .map_err(|e| DiscoveryError::UdevError(e.to_string()))?;

        enumerator
            .match_property("ID_INPUT_TOUCHSCREEN", "1")
            .map_err(|e| DiscoveryError::UdevError(e.to_string()))?;

        let mut results = Vec::new();

        for device in enumerator
            .scan_devices()
            .map_err(|e| DiscoveryError::UdevError(e.to_string()))?
        {
            let syspath = device.syspath().to_string_lossy().to_string();
            if !syspath.contains("/event") {
                continue;
            }

            let name = device.parent().and_then(|p| {
                p.property_value("NAME")
                    .map(|v| v.to_string_lossy().trim_matches('"').to_string())
            });

            if let Some(devnode) = device.devnode() {
                tracing::debug!(devnode = %devnode.display(), ?name, "touchscreen candidate");
                results.push(DeviceInfo {
                    devnode: PathBuf::from(devnode),
                    name,
                });
            }
        }

        if results.is_empty() {
            Err(DiscoveryError::NotFound)
        } else {
            Ok(results)
        }
    }
}
