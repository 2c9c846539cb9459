// Hotrs Event Source
// evdev keyboard capture feeding the engine

#[cfg(feature = "pure-rust")]
pub mod r#loop;

#[cfg(feature = "pure-rust")]
pub use r#loop::{DeviceInfo, EventLoop, EventLoopError, EventLoopResult, GrabHandle, KeyInput};
