// Hotrs Pure Rust Event Loop
// Direct evdev capture of physical keyboards

use evdev::{Device, EventType, LedType};
use parking_lot::Mutex;
use std::os::unix::io::AsRawFd;
use std::sync::Arc;

use crate::engine::HookHandle;
use crate::input::{looks_like_keyboard, DeviceFilter};
use crate::{Key, Transition};

/// Result type for event loop operations
pub type EventLoopResult<T> = Result<T, EventLoopError>;

/// Errors that can occur in event loop
#[derive(Debug, thiserror::Error)]
pub enum EventLoopError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Device information for listing devices
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub index: usize,
    pub name: String,
    pub path: Option<String>,
}

/// One key event read from a grabbed device
#[derive(Debug, Clone)]
pub struct KeyInput {
    pub key: Key,
    pub transition: Transition,
    pub device_name: String,
}

/// Keyboard capture over evdev.
///
/// While grabbed, no other reader sees the physical keyboards: the daemon
/// must forward every event it does not consume. Devices are ungrabbed on
/// drop, including during panic unwinding.
pub struct EventLoop {
    devices: Vec<Device>,
    poll_fds: Vec<libc::pollfd>,
    grabbed: bool,
}

fn is_keyboard_device(device: &Device) -> bool {
    if !device.supported_events().contains(EventType::KEY) {
        return false;
    }
    match device.supported_keys() {
        Some(keys) => looks_like_keyboard(|code| keys.contains(evdev::Key::new(code))),
        None => false,
    }
}

impl EventLoop {
    /// Open and grab every device the filter accepts
    pub fn new_with_grab(filter: &DeviceFilter) -> EventLoopResult<Self> {
        let mut devices = Self::find_keyboards(filter)?;

        // A crashed previous instance may still hold the grab
        for device in &mut devices {
            let _ = device.ungrab();
        }
        for device in &mut devices {
            device.grab()?;
        }

        let poll_fds = Self::create_poll_fds(&devices);
        log::debug!("grabbed {} device(s)", devices.len());
        Ok(Self {
            devices,
            poll_fds,
            grabbed: true,
        })
    }

    fn create_poll_fds(devices: &[Device]) -> Vec<libc::pollfd> {
        devices
            .iter()
            .map(|d| libc::pollfd {
                fd: d.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            })
            .collect()
    }

    fn find_keyboards(filter: &DeviceFilter) -> EventLoopResult<Vec<Device>> {
        let mut keyboards = Vec::new();
        for (path, device) in evdev::enumerate() {
            let name = device.name().unwrap_or("Unknown");
            let path = path.to_str().unwrap_or_default();
            if filter.accepts(name, path, is_keyboard_device(&device)) {
                log::debug!("using device {} ({})", name, path);
                keyboards.push(device);
            }
        }

        if keyboards.is_empty() {
            return Err(EventLoopError::DeviceNotFound(
                "No keyboard devices found".to_string(),
            ));
        }
        Ok(keyboards)
    }

    /// List keyboards without opening them for capture
    pub fn list_devices() -> EventLoopResult<Vec<DeviceInfo>> {
        let filter = DeviceFilter::default();
        let devices: Vec<DeviceInfo> = evdev::enumerate()
            .filter(|(path, device)| {
                let name = device.name().unwrap_or("Unknown");
                filter.accepts(name, path.to_str().unwrap_or_default(), is_keyboard_device(device))
            })
            .enumerate()
            .map(|(index, (path, device))| DeviceInfo {
                index,
                name: device.name().unwrap_or("Unknown").to_string(),
                path: path.to_str().map(|s| s.to_string()),
            })
            .collect();

        if devices.is_empty() {
            return Err(EventLoopError::DeviceNotFound(
                "No keyboard devices found".to_string(),
            ));
        }
        Ok(devices)
    }

    /// Release the grab on all devices
    pub fn ungrab_all(&mut self) {
        if self.grabbed {
            for device in &mut self.devices {
                let _ = device.ungrab();
            }
            self.grabbed = false;
            log::debug!("ungrabbed all devices");
        }
    }

    pub fn is_grabbed(&self) -> bool {
        self.grabbed
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn device_names(&self) -> Vec<String> {
        self.devices
            .iter()
            .map(|d| d.name().unwrap_or("Unknown").to_string())
            .collect()
    }

    /// Whether any grabbed keyboard shows its Caps Lock LED lit.
    /// Devices without readable LEDs count as off.
    pub fn caps_lock_engaged(&self) -> bool {
        self.devices.iter().any(|device| match device.get_led_state() {
            Ok(leds) => leds.contains(LedType::LED_CAPSL),
            Err(e) => {
                log::debug!("reading LEDs of {}: {}", device.name().unwrap_or("Unknown"), e);
                false
            }
        })
    }

    /// Wait up to `timeout_ms` for key events from any device.
    ///
    /// Non-key events are dropped; unknown event values are skipped.
    /// EINTR and timeouts yield an empty vector.
    pub fn poll_keys(&mut self, timeout_ms: i32) -> EventLoopResult<Vec<KeyInput>> {
        let mut keys = Vec::new();

        let poll_result = unsafe {
            libc::poll(
                self.poll_fds.as_mut_ptr(),
                self.poll_fds.len() as libc::nfds_t,
                timeout_ms,
            )
        };

        if poll_result < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                return Ok(keys);
            }
            return Err(EventLoopError::Io(err));
        }
        if poll_result == 0 {
            return Ok(keys);
        }

        for (i, device) in self.devices.iter_mut().enumerate() {
            if self.poll_fds[i].revents & libc::POLLIN == 0 {
                continue;
            }
            let device_name = device.name().unwrap_or("Unknown").to_string();
            let Ok(events) = device.fetch_events() else {
                continue;
            };
            for event in events {
                if event.event_type() != EventType::KEY {
                    continue;
                }
                let Some(transition) = Transition::from_i32(event.value()) else {
                    continue;
                };
                keys.push(KeyInput {
                    key: Key::from(event.code()),
                    transition,
                    device_name: device_name.clone(),
                });
            }
        }

        Ok(keys)
    }

    /// Share this loop so the engine can release the grab on shutdown
    pub fn into_shared(self) -> Arc<Mutex<EventLoop>> {
        Arc::new(Mutex::new(self))
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        // A stuck grab leaves the keyboard unusable
        self.ungrab_all();
    }
}

/// Engine-side handle to a shared event loop's grab
pub struct GrabHandle {
    event_loop: Arc<Mutex<EventLoop>>,
}

impl GrabHandle {
    pub fn new(event_loop: Arc<Mutex<EventLoop>>) -> Self {
        Self { event_loop }
    }
}

impl HookHandle for GrabHandle {
    fn release(&mut self) {
        self.event_loop.lock().ungrab_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_devices() {
        match EventLoop::list_devices() {
            Ok(devices) => {
                for device in &devices {
                    assert!(!crate::input::is_virtual_device(&device.name));
                }
            }
            Err(EventLoopError::DeviceNotFound(_)) => {
                println!("Skipping test: no keyboard devices found");
            }
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }

    #[test]
    fn test_grab_and_release_through_handle() {
        // Needs read access to /dev/input; skipped otherwise
        match EventLoop::new_with_grab(&DeviceFilter::default()) {
            Ok(event_loop) => {
                // LED state depends on the hardware; reading it must not panic
                let _ = event_loop.caps_lock_engaged();
                let shared = event_loop.into_shared();
                assert!(shared.lock().is_grabbed());
                let mut handle = GrabHandle::new(Arc::clone(&shared));
                handle.release();
                assert!(!shared.lock().is_grabbed());
                handle.release();
            }
            Err(EventLoopError::DeviceNotFound(_)) | Err(EventLoopError::Io(_)) => {
                println!("Skipping test: no accessible keyboard devices");
            }
        }
    }
}
