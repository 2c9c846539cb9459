// Hotrs Replay
// Erase + replacement + terminator emission through an input sink

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::buffer::TypingBuffer;
use crate::matcher::MatchOutcome;
use crate::{Key, Transition};

/// One synthetic input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticEvent {
    /// Virtual-key event, e.g. Backspace
    Key { key: Key, transition: Transition },
    /// Character-level event, independent of the physical layout
    Char { ch: char, transition: Transition },
}

impl SyntheticEvent {
    /// Down + up pair for a key
    pub fn key_tap(key: Key) -> [SyntheticEvent; 2] {
        [
            SyntheticEvent::Key { key, transition: Transition::Down },
            SyntheticEvent::Key { key, transition: Transition::Up },
        ]
    }

    /// Down + up pair for a character
    pub fn char_tap(ch: char) -> [SyntheticEvent; 2] {
        [
            SyntheticEvent::Char { ch, transition: Transition::Down },
            SyntheticEvent::Char { ch, transition: Transition::Up },
        ]
    }
}

/// Errors reported by an input sink
#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error("Failed to write event: {0}")]
    WriteError(String),

    #[error("Unsupported character: {0:?}")]
    UnsupportedChar(char),

    #[error("Sink closed")]
    Closed,
}

/// Destination for synthetic input.
///
/// A batch is submitted in order; implementations that can submit it
/// atomically should do so.
pub trait InputSink: Send {
    fn send(&mut self, batch: &[SyntheticEvent]) -> Result<(), InjectError>;
}

/// A sink shared with another owner, e.g. a device that also forwards
/// passthrough events
impl<S: InputSink + ?Sized> InputSink for Arc<parking_lot::Mutex<S>> {
    fn send(&mut self, batch: &[SyntheticEvent]) -> Result<(), InjectError> {
        self.lock().send(batch)
    }
}

/// Shared "a replay is emitting" flag.
///
/// The engine reads it before doing anything with an event, so events
/// produced by our own injection are passed through untouched.
#[derive(Debug, Clone, Default)]
pub struct SuppressionFlag {
    active: Arc<AtomicBool>,
}

impl SuppressionFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Raise the flag unless a replay already holds it
    pub fn try_acquire(&self) -> Option<ReplayGuard> {
        if self.active.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(ReplayGuard {
            active: Arc::clone(&self.active),
        })
    }
}

/// Lowers the suppression flag when dropped, on every exit path
#[derive(Debug)]
pub struct ReplayGuard {
    active: Arc<AtomicBool>,
}

impl Drop for ReplayGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Number of characters to erase for a match.
///
/// An immediate match erases one fewer: its last trigger character is the
/// keystroke being swallowed and never reached the application.
pub fn erase_count(outcome: &MatchOutcome) -> usize {
    let len = outcome.rule.trigger_len();
    if outcome.is_immediate() {
        len.saturating_sub(1)
    } else {
        len
    }
}

/// Drives the synthetic sequence for a winning match
pub struct Replayer {
    sink: Box<dyn InputSink>,
    flag: SuppressionFlag,
}

impl Replayer {
    pub fn new(sink: Box<dyn InputSink>, flag: SuppressionFlag) -> Self {
        Self { sink, flag }
    }

    pub fn flag(&self) -> &SuppressionFlag {
        &self.flag
    }

    /// Emit erase, replacement and terminator, then clear `buffer`.
    ///
    /// Emission stops at the first failing submission. The buffer is
    /// cleared and the suppression flag lowered regardless.
    pub fn execute(
        &mut self,
        outcome: &MatchOutcome,
        buffer: &mut TypingBuffer,
    ) -> Result<(), InjectError> {
        let Some(_guard) = self.flag.try_acquire() else {
            log::warn!("replay skipped: another replay is still active");
            return Ok(());
        };

        let result = self.emit(outcome);
        buffer.clear();
        result
    }

    fn emit(&mut self, outcome: &MatchOutcome) -> Result<(), InjectError> {
        let rule = &outcome.rule;
        let erase = erase_count(outcome);
        log::debug!(
            "replay {}: erase={} replacement_len={} terminator={:?}",
            outcome.id,
            erase,
            rule.replacement.chars().count(),
            outcome.terminator
        );

        if erase > 0 {
            let batch: Vec<SyntheticEvent> = (0..erase)
                .flat_map(|_| SyntheticEvent::key_tap(Key::BACKSPACE))
                .collect();
            self.sink.send(&batch)?;
        }

        if !rule.replacement.is_empty() {
            let batch: Vec<SyntheticEvent> =
                rule.replacement.chars().flat_map(SyntheticEvent::char_tap).collect();
            self.sink.send(&batch)?;
        }

        if let Some(terminator) = outcome.terminator {
            if !rule.omit_terminator {
                self.sink.send(&SyntheticEvent::char_tap(terminator))?;
            }
        }

        Ok(())
    }
}
