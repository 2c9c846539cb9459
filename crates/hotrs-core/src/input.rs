// Hotrs Input Layer - Device Selection
// Which evdev devices the daemon grabs

/// Name given to our uinput device. Anything carrying this prefix is ours
/// and must never be grabbed, or replays would feed back into the engine.
pub const VIRTUAL_DEVICE_PREFIX: &str = "Hotrs (virtual)";

/// Full name of the uinput device we create
pub const VIRTUAL_DEVICE_NAME: &str = "Hotrs (virtual) Keyboard";

/// QWERTY row (Q..Y) plus SPACE, A and Z
const KEYBOARD_PROBE_CODES: &[u16] = &[16, 17, 18, 19, 20, 21, 57, 30, 44];

/// Check if a device name belongs to our own virtual device
pub fn is_virtual_device(device_name: &str) -> bool {
    device_name.starts_with(VIRTUAL_DEVICE_PREFIX)
}

/// A device is a keyboard if it reports every probe key
pub fn looks_like_keyboard(supports_key: impl Fn(u16) -> bool) -> bool {
    KEYBOARD_PROBE_CODES.iter().all(|code| supports_key(*code))
}

/// Device selection rule: explicit names/paths, or keyboard autodetection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    names: Vec<String>,
}

impl DeviceFilter {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn is_autodetect(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether to grab this device. Our virtual device is always refused.
    pub fn accepts(&self, device_name: &str, device_path: &str, is_keyboard: bool) -> bool {
        if is_virtual_device(device_name) {
            return false;
        }
        if self.is_autodetect() {
            return is_keyboard;
        }
        self.names
            .iter()
            .any(|wanted| wanted == device_path || wanted == device_name)
    }
}
