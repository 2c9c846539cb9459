// Hotrs Pressed Key State
// Keys held down on the virtual keyboard, in press order

use crate::Key;

/// Keys currently held on the output device.
///
/// Press order is kept so keys can be released last-pressed-first.
#[derive(Debug, Clone, Default)]
pub struct PressedKeyState {
    pressed: Vec<Key>,
}

impl PressedKeyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press; pressing a held key again is a no-op
    pub fn add(&mut self, key: Key) {
        if !self.pressed.contains(&key) {
            self.pressed.push(key);
        }
    }

    pub fn remove(&mut self, key: Key) {
        self.pressed.retain(|k| *k != key);
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    /// Held keys, oldest press first
    pub fn get_all(&self) -> Vec<Key> {
        self.pressed.clone()
    }

    /// Held keys absent from `snapshot`, newest press first
    pub fn pressed_since(&self, snapshot: &[Key]) -> Vec<Key> {
        self.pressed
            .iter()
            .rev()
            .filter(|k| !snapshot.contains(k))
            .copied()
            .collect()
    }

    /// Keys in `snapshot` that are no longer held, in snapshot order
    pub fn released_since(&self, snapshot: &[Key]) -> Vec<Key> {
        snapshot
            .iter()
            .filter(|k| !self.pressed.contains(k))
            .copied()
            .collect()
    }

    pub fn clear(&mut self) {
        self.pressed.clear();
    }

    pub fn len(&self) -> usize {
        self.pressed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty()
    }
}
