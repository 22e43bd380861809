// Janus Input Layer - Device Detection
// Keyboard detection for autoselecting the device to grab

use std::collections::HashSet;

/// Device capabilities relevant to keyboard detection
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    /// Whether the device supports EV_KEY events
    pub has_ev_key: bool,
    /// Supported EV_KEY codes
    pub supported_keys: Vec<u16>,
}

impl DeviceCapabilities {
    pub fn new(has_ev_key: bool, supported_keys: Vec<u16>) -> Self {
        Self {
            has_ev_key,
            supported_keys,
        }
    }

    pub fn key_set(&self) -> HashSet<u16> {
        self.supported_keys.iter().copied().collect()
    }
}

// Q, W, E, R, T, Y
const QWERTY_CODES: &[u16] = &[16, 17, 18, 19, 20, 21];

// SPACE, A, Z
const A_Z_SPACE_CODES: &[u16] = &[57, 30, 44];

/// A device is a keyboard when it reports EV_KEY with the QWERTY row,
/// A, Z and SPACE.
pub fn is_keyboard(capabilities: &DeviceCapabilities) -> bool {
    if !capabilities.has_ev_key {
        return false;
    }
    let key_set = capabilities.key_set();
    QWERTY_CODES
        .iter()
        .chain(A_Z_SPACE_CODES)
        .all(|code| key_set.contains(code))
}

/// Our own virtual device must never be grabbed: it would feed its output
/// back into its input.
pub fn is_virtual_device(name: &str, prefix: &str) -> bool {
    name.contains(prefix)
}

/// Keyboard found while scanning /dev/input
#[cfg(feature = "evdev-io")]
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub path: std::path::PathBuf,
}

#[cfg(feature = "evdev-io")]
fn capabilities_of(device: &evdev::Device) -> DeviceCapabilities {
    let has_ev_key = device.supported_events().contains(evdev::EventType::KEY);
    let supported_keys = device
        .supported_keys()
        .map(|keys| keys.iter().map(|k| k.code()).collect())
        .unwrap_or_default();
    DeviceCapabilities::new(has_ev_key, supported_keys)
}

/// List physical keyboards, skipping devices whose name contains `virtual_prefix`
#[cfg(feature = "evdev-io")]
pub fn list_keyboards(virtual_prefix: &str) -> Vec<DeviceInfo> {
    let mut keyboards: Vec<DeviceInfo> = evdev::enumerate()
        .filter_map(|(path, device)| {
            let name = device.name().unwrap_or("Unknown").to_string();
            if is_virtual_device(&name, virtual_prefix) || !is_keyboard(&capabilities_of(&device)) {
                return None;
            }
            Some(DeviceInfo { name, path })
        })
        .collect();
    keyboards.sort_by(|a, b| a.path.cmp(&b.path));
    keyboards
}

/// First physical keyboard, for when no device path was configured
#[cfg(feature = "evdev-io")]
pub fn find_keyboard(virtual_prefix: &str) -> Result<DeviceInfo, super::InputError> {
    list_keyboards(virtual_prefix)
        .into_iter()
        .next()
        .ok_or_else(|| super::InputError::DeviceNotFound("No keyboard devices found".to_string()))
}
