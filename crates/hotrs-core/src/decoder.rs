// Hotrs Key Decoder
// Pure mapping from (key, live state) to a character or a control signal

use crate::{Key, KeyboardLayout, ModifierState};

/// Keys that move the caret or edit away from it. The typing buffer no
/// longer reflects what precedes the caret once one of these is pressed.
const NAVIGATION_KEYS: [Key; 10] = [
    Key::UP,
    Key::DOWN,
    Key::LEFT,
    Key::RIGHT,
    Key::HOME,
    Key::END,
    Key::PAGE_UP,
    Key::PAGE_DOWN,
    Key::INSERT,
    Key::DELETE,
];

/// Result of decoding one key-down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Char(char),
    Navigation,
    Backspace,
    None,
}

/// Check if a key belongs to the navigation class
pub fn is_navigation_key(key: Key) -> bool {
    NAVIGATION_KEYS.contains(&key)
}

/// Decode a key against the given state and layout.
///
/// Navigation and Backspace are recognised before any translation, so
/// modifiers never change their meaning. Enter always decodes to `'\n'`.
/// Non-whitespace control characters are dropped.
pub fn decode(key: Key, state: &ModifierState, layout: &dyn KeyboardLayout) -> Decoded {
    if is_navigation_key(key) {
        return Decoded::Navigation;
    }
    if key == Key::BACKSPACE {
        return Decoded::Backspace;
    }
    if key == Key::ENTER || key == Key::KPENTER {
        return Decoded::Char('\n');
    }

    layout
        .translate(key, state)
        .into_iter()
        .find(|c| !c.is_control() || c.is_whitespace())
        .map(Decoded::Char)
        .unwrap_or(Decoded::None)
}
