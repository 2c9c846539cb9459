// Hotrs uinput Output Layer
// Virtual keyboard for forwarded events and replays

use std::time::Duration;

use evdev::{EventType, InputEvent};

use super::state::PressedKeyState;
use crate::input::VIRTUAL_DEVICE_NAME;
use crate::key::key_from_name;
use crate::modifier::is_key_modifier_code;
use crate::replay::{InjectError, InputSink, SyntheticEvent};
use crate::{Key, Transition};

/// Error types for uinput operations
#[derive(Debug, thiserror::Error)]
pub enum UInputError {
    #[error("Failed to create virtual device: {0}")]
    DeviceCreation(String),

    #[error("Failed to write event: {0}")]
    WriteError(String),
}

impl From<UInputError> for InjectError {
    fn from(err: UInputError) -> Self {
        InjectError::WriteError(err.to_string())
    }
}

/// US QWERTY key and Shift state that type `ch`
fn ascii_key_and_shift(ch: char) -> Option<(Key, bool)> {
    if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
        return key_from_name(&ch.to_string()).map(|k| (k, false));
    }
    if ch.is_ascii_uppercase() {
        return key_from_name(&ch.to_string()).map(|k| (k, true));
    }

    let (name, shift) = match ch {
        ' ' => ("SPACE", false),
        '\n' | '\r' => ("ENTER", false),
        '\t' => ("TAB", false),
        '-' => ("MINUS", false),
        '_' => ("MINUS", true),
        '=' => ("EQUAL", false),
        '+' => ("EQUAL", true),
        '[' => ("LEFT_BRACE", false),
        '{' => ("LEFT_BRACE", true),
        ']' => ("RIGHT_BRACE", false),
        '}' => ("RIGHT_BRACE", true),
        '\\' => ("BACKSLASH", false),
        '|' => ("BACKSLASH", true),
        ';' => ("SEMICOLON", false),
        ':' => ("SEMICOLON", true),
        '\'' => ("APOSTROPHE", false),
        '"' => ("APOSTROPHE", true),
        ',' => ("COMMA", false),
        '<' => ("COMMA", true),
        '.' => ("DOT", false),
        '>' => ("DOT", true),
        '/' => ("SLASH", false),
        '?' => ("SLASH", true),
        '`' => ("GRAVE", false),
        '~' => ("GRAVE", true),
        '!' => ("1", true),
        '@' => ("2", true),
        '#' => ("3", true),
        '$' => ("4", true),
        '%' => ("5", true),
        '^' => ("6", true),
        '&' => ("7", true),
        '*' => ("8", true),
        '(' => ("9", true),
        ')' => ("0", true),
        _ => return None,
    };
    key_from_name(name).map(|k| (k, shift))
}

fn key_required(name: &str) -> Result<Key, UInputError> {
    key_from_name(name)
        .ok_or_else(|| UInputError::WriteError(format!("Required key '{}' not found", name)))
}

/// Virtual uinput keyboard.
///
/// Carries both the events the engine lets through and the synthetic
/// replay sequences. Its name marks it as ours so the event source never
/// grabs it.
pub struct VirtualDevice {
    device: evdev::uinput::VirtualDevice,
    pressed_keys: PressedKeyState,
    pressed_modifiers: PressedKeyState,
    key_pre_delay_ms: u64,
    key_post_delay_ms: u64,
}

impl VirtualDevice {
    /// Create the virtual device
    pub fn new() -> Result<Self, UInputError> {
        use evdev::uinput::VirtualDeviceBuilder;
        use evdev::AttributeSet;

        let mut keys = AttributeSet::new();
        for code in 0..256u16 {
            keys.insert(evdev::Key::new(code));
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(|e: std::io::Error| UInputError::DeviceCreation(e.to_string()))?
            .name(VIRTUAL_DEVICE_NAME)
            .with_keys(&keys)
            .map_err(|e: std::io::Error| UInputError::DeviceCreation(e.to_string()))?
            .build()
            .map_err(|e: std::io::Error| UInputError::DeviceCreation(e.to_string()))?;

        log::debug!("created virtual device {:?}", VIRTUAL_DEVICE_NAME);
        Ok(Self {
            device,
            pressed_keys: PressedKeyState::new(),
            pressed_modifiers: PressedKeyState::new(),
            key_pre_delay_ms: 0,
            key_post_delay_ms: 0,
        })
    }

    /// Configure output throttle delays in milliseconds.
    pub fn set_throttle_delays(&mut self, key_pre_delay_ms: u64, key_post_delay_ms: u64) {
        self.key_pre_delay_ms = key_pre_delay_ms;
        self.key_post_delay_ms = key_post_delay_ms;
    }

    fn write_key_event(&mut self, key: Key, transition: Transition) -> Result<(), UInputError> {
        let key_event = InputEvent::new(EventType::KEY, key.code(), transition.to_i32());
        // The kernel only delivers after SYN_REPORT
        let syn_event = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);

        self.device
            .emit(&[key_event, syn_event])
            .map_err(|e: std::io::Error| UInputError::WriteError(e.to_string()))?;

        let held = if is_key_modifier_code(key.code()) {
            &mut self.pressed_modifiers
        } else {
            &mut self.pressed_keys
        };
        match transition {
            Transition::Down => held.add(key),
            Transition::Up => held.remove(key),
            Transition::Repeat => {}
        }
        Ok(())
    }

    fn send_key(&mut self, key: Key, transition: Transition) -> Result<(), UInputError> {
        if self.key_pre_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.key_pre_delay_ms));
        }
        self.write_key_event(key, transition)?;
        if self.key_post_delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.key_post_delay_ms));
        }
        Ok(())
    }

    fn tap_key(&mut self, key: Key) -> Result<(), UInputError> {
        self.send_key(key, Transition::Down)?;
        self.send_key(key, Transition::Up)
    }

    /// Pass a physical event on unchanged
    pub fn forward(&mut self, key: Key, transition: Transition) -> Result<(), UInputError> {
        self.write_key_event(key, transition)
    }

    /// Type a character outside the US map via Ctrl+Shift+U compose
    pub fn send_unicode(&mut self, ch: char) -> Result<(), UInputError> {
        let left_ctrl = Key::LEFT_CTRL;
        let left_shift = Key::LEFT_SHIFT;
        let u_key = key_required("U")?;

        self.send_key(left_ctrl, Transition::Down)?;
        self.send_key(left_shift, Transition::Down)?;
        self.tap_key(u_key)?;
        self.send_key(left_shift, Transition::Up)?;
        self.send_key(left_ctrl, Transition::Up)?;

        for digit in format!("{:x}", ch as u32).chars() {
            let digit_key = key_required(&digit.to_string())?;
            self.tap_key(digit_key)?;
        }
        self.tap_key(Key::ENTER)
    }

    fn send_char(&mut self, ch: char, transition: Transition) -> Result<(), UInputError> {
        match ascii_key_and_shift(ch) {
            Some((key, needs_shift)) => match transition {
                Transition::Down => {
                    if needs_shift {
                        self.send_key(Key::LEFT_SHIFT, Transition::Down)?;
                    }
                    self.send_key(key, Transition::Down)
                }
                Transition::Up => {
                    self.send_key(key, Transition::Up)?;
                    if needs_shift {
                        self.send_key(Key::LEFT_SHIFT, Transition::Up)?;
                    }
                    Ok(())
                }
                Transition::Repeat => self.send_key(key, Transition::Repeat),
            },
            // Compose emits the whole character on the press
            None if transition.is_initial_press() => self.send_unicode(ch),
            None => Ok(()),
        }
    }

    /// Release all pressed keys (for shutdown)
    pub fn release_all(&mut self) -> Result<(), UInputError> {
        for key in self.pressed_keys.get_all().into_iter().rev() {
            self.write_key_event(key, Transition::Up)?;
        }
        for key in self.pressed_modifiers.get_all().into_iter().rev() {
            self.write_key_event(key, Transition::Up)?;
        }
        Ok(())
    }

    pub fn is_mod_pressed(&self, key: Key) -> bool {
        self.pressed_modifiers.is_pressed(key)
    }

    pub fn pressed_key_count(&self) -> usize {
        self.pressed_keys.len()
    }

    /// Release everything and drop the device
    pub fn close(mut self) -> Result<(), UInputError> {
        self.release_all()
    }
}

impl InputSink for VirtualDevice {
    fn send(&mut self, batch: &[SyntheticEvent]) -> Result<(), InjectError> {
        let held_modifiers = self.pressed_modifiers.get_all();
        let held_keys = self.pressed_keys.get_all();

        let result = self.emit_batch(&held_modifiers, batch);
        // Restore even after a failed write
        let restored = self.restore_held(&held_modifiers, &held_keys);
        result.and(restored).map_err(InjectError::from)
    }
}

impl VirtualDevice {
    fn emit_batch(
        &mut self,
        held_modifiers: &[Key],
        batch: &[SyntheticEvent],
    ) -> Result<(), UInputError> {
        // Modifiers the user is holding would otherwise apply to the replay
        for modifier in held_modifiers.iter().rev() {
            self.send_key(*modifier, Transition::Up)?;
        }

        for event in batch {
            match *event {
                SyntheticEvent::Key { key, transition } => self.send_key(key, transition)?,
                SyntheticEvent::Char { ch, transition } => self.send_char(ch, transition)?,
            }
        }
        Ok(())
    }

    /// Lift whatever the batch left down and press the user's modifiers
    /// again. Tries every key; the first error is returned.
    fn restore_held(
        &mut self,
        held_modifiers: &[Key],
        held_keys: &[Key],
    ) -> Result<(), UInputError> {
        let mut first_error = None;

        let mut stray = self.pressed_keys.pressed_since(held_keys);
        stray.extend(self.pressed_modifiers.pressed_since(held_modifiers));
        for key in stray {
            if let Err(e) = self.send_key(key, Transition::Up) {
                first_error.get_or_insert(e);
            }
        }

        for modifier in self.pressed_modifiers.released_since(held_modifiers) {
            if let Err(e) = self.send_key(modifier, Transition::Down) {
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}
