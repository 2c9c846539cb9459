// Hotrs Output Layer
// Virtual keyboard the daemon writes to

mod state;

#[cfg(feature = "pure-rust")]
mod uinput;

pub use state::PressedKeyState;

#[cfg(feature = "pure-rust")]
pub use uinput::{UInputError, VirtualDevice};
