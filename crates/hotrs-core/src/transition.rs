use std::fmt;

/// Direction of a single key event.
///
/// The numeric values are the evdev event values:
///   0 == released
///   1 == pressed
///   2 == auto-repeat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Transition {
    Up = 0,
    Down = 1,
    Repeat = 2,
}

impl Transition {
    /// True for Down and Repeat. Auto-repeat types characters, so the
    /// matcher treats it as a key-down.
    pub fn is_down(self) -> bool {
        matches!(self, Transition::Down | Transition::Repeat)
    }

    /// True only for the initial press
    pub fn is_initial_press(self) -> bool {
        matches!(self, Transition::Down)
    }

    pub fn is_up(self) -> bool {
        matches!(self, Transition::Up)
    }

    /// Create from an evdev event value
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Transition::Up),
            1 => Some(Transition::Down),
            2 => Some(Transition::Repeat),
            _ => None,
        }
    }

    /// evdev event value
    pub fn to_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Up => write!(f, "up"),
            Transition::Down => write!(f, "down"),
            Transition::Repeat => write!(f, "repeat"),
        }
    }
}
