// Hotrs Typing Buffer
// Rolling record of what the user typed since the last reset

use std::collections::VecDeque;

/// Soft cap on buffered characters
pub const BUFFER_CAPACITY: usize = 200;

/// Characters dropped from the front when the cap is exceeded
pub const BUFFER_TRIM: usize = 100;

/// Recently typed characters, oldest first.
///
/// Only the tail matters for matching, so trimming always drops from the
/// front and never touches the most recent characters.
#[derive(Debug, Clone)]
pub struct TypingBuffer {
    chars: VecDeque<char>,
}

impl Default for TypingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TypingBuffer {
    pub fn new() -> Self {
        Self {
            chars: VecDeque::with_capacity(BUFFER_CAPACITY + 1),
        }
    }

    /// Append a character, trimming the oldest ones past the cap
    pub fn push(&mut self, c: char) {
        self.chars.push_back(c);
        if self.chars.len() > BUFFER_CAPACITY {
            self.chars.drain(..BUFFER_TRIM);
        }
    }

    /// Remove the most recent character; no-op when empty
    pub fn pop(&mut self) -> Option<char> {
        self.chars.pop_back()
    }

    pub fn clear(&mut self) {
        self.chars.clear();
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Whether the buffer ends with `suffix`.
    ///
    /// An empty suffix never matches. Case-insensitive comparison folds
    /// each character to lowercase, one char at a time.
    pub fn ends_with(&self, suffix: &str, case_sensitive: bool) -> bool {
        if suffix.is_empty() {
            return false;
        }
        let mut tail = self.chars.iter().rev();
        for expected in suffix.chars().rev() {
            let Some(&actual) = tail.next() else {
                return false;
            };
            let equal = if case_sensitive {
                actual == expected
            } else {
                chars_eq_ignore_case(actual, expected)
            };
            if !equal {
                return false;
            }
        }
        true
    }

    /// Buffered text as a String
    pub fn contents(&self) -> String {
        self.chars.iter().collect()
    }
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}
