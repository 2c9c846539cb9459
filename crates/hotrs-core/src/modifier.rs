// Hotrs Modifier Tracking
// Live key-state table and generic Shift/Ctrl/Alt flags

use crate::{Key, Transition};

/// Left/right pairs folded into each generic modifier flag
const SHIFT_KEYS: [Key; 2] = [Key::LEFT_SHIFT, Key::RIGHT_SHIFT];
const CTRL_KEYS: [Key; 2] = [Key::LEFT_CTRL, Key::RIGHT_CTRL];
const ALT_KEYS: [Key; 2] = [Key::LEFT_ALT, Key::RIGHT_ALT];

/// Static list for lock-free modifier checks in the hot path
const MODIFIER_KEY_CODES: &[u16] = &[
    29, 97, // L_CONTROL, R_CONTROL
    56, 100, // L_ALT, R_ALT
    42, 54, // L_SHIFT, R_SHIFT
    125, 126, // L_META, R_META
];

/// Check if a key code is a modifier
#[inline]
pub const fn is_key_modifier_code(code: u16) -> bool {
    let mut i = 0;
    while i < MODIFIER_KEY_CODES.len() {
        if MODIFIER_KEY_CODES[i] == code {
            return true;
        }
        i += 1;
    }
    false
}

/// Snapshot of the keyboard as the character decoder needs to see it.
///
/// The 256-slot table holds the physical down/up state of every key;
/// the generic flags are the OR of the left and right variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifierState {
    keys: [bool; 256],
    shift: bool,
    ctrl: bool,
    alt: bool,
    caps_lock: bool,
}

impl Default for ModifierState {
    fn default() -> Self {
        Self::new()
    }
}

impl ModifierState {
    /// All keys up, Caps Lock off
    pub fn new() -> Self {
        Self {
            keys: [false; 256],
            shift: false,
            ctrl: false,
            alt: false,
            caps_lock: false,
        }
    }

    pub fn shift(&self) -> bool {
        self.shift
    }

    pub fn ctrl(&self) -> bool {
        self.ctrl
    }

    pub fn alt(&self) -> bool {
        self.alt
    }

    /// Caps Lock toggle state
    pub fn caps_lock(&self) -> bool {
        self.caps_lock
    }

    /// Whether a key is currently held. Codes outside the table read as up.
    pub fn is_down(&self, key: Key) -> bool {
        key.slot().map(|slot| self.keys[slot]).unwrap_or(false)
    }

    /// Raw table, indexed by key code
    pub fn table(&self) -> &[bool; 256] {
        &self.keys
    }

    /// Builder used by tests and layouts
    pub fn with_key_down(mut self, key: Key) -> Self {
        self.set(key, true);
        self
    }

    /// Builder for the Caps Lock toggle
    pub fn with_caps_lock(mut self, on: bool) -> Self {
        self.caps_lock = on;
        self
    }

    /// State as it reads once `key` has made `transition`
    pub fn after(mut self, key: Key, transition: Transition) -> Self {
        self.apply(key, transition);
        self
    }

    fn apply(&mut self, key: Key, transition: Transition) {
        if key == Key::CAPSLOCK && transition.is_initial_press() {
            self.caps_lock = !self.caps_lock;
        }
        self.set(key, transition.is_down());
    }

    fn set(&mut self, key: Key, down: bool) {
        if let Some(slot) = key.slot() {
            self.keys[slot] = down;
        }
        self.recompute();
    }

    fn any_down(&self, pair: &[Key; 2]) -> bool {
        pair.iter().any(|k| self.is_down(*k))
    }

    fn recompute(&mut self) {
        self.shift = self.any_down(&SHIFT_KEYS);
        self.ctrl = self.any_down(&CTRL_KEYS);
        self.alt = self.any_down(&ALT_KEYS);
    }
}

/// Keeps a [`ModifierState`] in sync with every observed transition.
#[derive(Debug, Clone, Default)]
pub struct ModifierTracker {
    state: ModifierState,
}

impl ModifierTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one transition. Must see every event, including ones the
    /// matcher later ignores, or the flags drift from the physical keyboard.
    pub fn on_transition(&mut self, key: Key, transition: Transition) {
        self.state.apply(key, transition);
    }

    /// Seed the Caps Lock toggle, e.g. from the keyboard LED at startup
    pub fn set_caps_lock(&mut self, on: bool) {
        self.state.caps_lock = on;
    }

    /// Current state, handed by reference to the decoder
    pub fn state(&self) -> &ModifierState {
        &self.state
    }
}
