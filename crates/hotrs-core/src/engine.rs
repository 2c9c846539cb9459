// Hotrs Engine
// Per-event pipeline: modifier tracking -> decode -> match -> replay
//
// The engine is driven by one synchronous delivery path and must answer
// every event without blocking. Pause and replay suppression are atomics
// read before any lock, so an event delivered from inside our own replay
// is answered immediately with PassThrough.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::buffer::TypingBuffer;
use crate::decoder::{decode, Decoded};
use crate::matcher::{is_terminator, MatchOutcome, Matcher};
use crate::modifier::ModifierTracker;
use crate::replay::{InputSink, Replayer, SuppressionFlag};
use crate::rule::RuleSet;
use crate::{Key, KeyboardLayout, ModifierState, Transition};

/// Answer to the event source for one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Let the event continue to the focused application
    PassThrough,
    /// Swallow the event
    Consume,
}

impl Verdict {
    pub fn is_consume(self) -> bool {
        matches!(self, Verdict::Consume)
    }
}

/// Attachment to the event source, released once on shutdown
pub trait HookHandle: Send {
    fn release(&mut self);
}

/// State touched only on the event path
struct EngineState {
    tracker: ModifierTracker,
    buffer: TypingBuffer,
    replayer: Replayer,
    /// Keys whose key-down was swallowed; their release is swallowed too
    consumed: HashSet<Key>,
}

/// Hotstring engine: the single entry point for observed key events
pub struct Engine {
    rules: RuleSet,
    layout: Box<dyn KeyboardLayout>,
    paused: Arc<AtomicBool>,
    suppression: SuppressionFlag,
    shut_down: AtomicBool,
    state: Mutex<EngineState>,
    hook: Mutex<Option<Box<dyn HookHandle>>>,
}

impl Engine {
    pub fn new(rules: RuleSet, layout: Box<dyn KeyboardLayout>, sink: Box<dyn InputSink>) -> Self {
        let suppression = SuppressionFlag::new();
        Self {
            rules,
            layout,
            paused: Arc::new(AtomicBool::new(false)),
            suppression: suppression.clone(),
            shut_down: AtomicBool::new(false),
            state: Mutex::new(EngineState {
                tracker: ModifierTracker::new(),
                buffer: TypingBuffer::new(),
                replayer: Replayer::new(sink, suppression),
                consumed: HashSet::new(),
            }),
            hook: Mutex::new(None),
        }
    }

    /// Shared rule collection; safe to edit from any thread
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Takes effect on the next event
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
        log::debug!("engine paused={}", paused);
    }

    /// Flip the pause flag, returning the new value
    pub fn toggle_paused(&self) -> bool {
        let paused = !self.paused.fetch_xor(true, Ordering::SeqCst);
        log::debug!("engine paused={}", paused);
        paused
    }

    /// The pause flag itself, for owners that toggle it directly
    pub fn pause_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.paused)
    }

    /// True while a replay is emitting
    pub fn is_replaying(&self) -> bool {
        self.suppression.is_active()
    }

    /// Drop everything typed so far
    pub fn reset(&self) {
        self.state.lock().buffer.clear();
        log::debug!("engine buffer reset");
    }

    /// Buffered text, for diagnostics
    pub fn buffer_contents(&self) -> String {
        self.state.lock().buffer.contents()
    }

    /// Copy of the live modifier state
    pub fn modifier_state(&self) -> ModifierState {
        self.state.lock().tracker.state().clone()
    }

    /// Start from a known Caps Lock state instead of off
    pub fn set_caps_lock(&self, on: bool) {
        self.state.lock().tracker.set_caps_lock(on);
        log::debug!("engine caps_lock={}", on);
    }

    /// Hand the engine its event-source attachment
    pub fn attach(&self, handle: Box<dyn HookHandle>) {
        let previous = self.hook.lock().replace(handle);
        if let Some(mut previous) = previous {
            previous.release();
        }
        self.shut_down.store(false, Ordering::SeqCst);
    }

    /// Detach from the event source. Idempotent; never waits on the event path.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        let handle = self.hook.lock().take();
        if let Some(mut handle) = handle {
            log::debug!("engine shutdown: releasing event source");
            handle.release();
        }
    }

    /// Process one observed key event
    pub fn process_event(&self, key: Key, transition: Transition, is_system: bool) -> Verdict {
        if self.suppression.is_active() {
            log::trace!("ignoring {} {} during replay", key, transition);
            return Verdict::PassThrough;
        }
        if self.shut_down.load(Ordering::SeqCst) {
            return Verdict::PassThrough;
        }
        // Another thread mid-event: never block the delivery path
        let Some(mut state) = self.state.try_lock() else {
            log::trace!("engine busy, passing {} through", key);
            return Verdict::PassThrough;
        };

        state.tracker.on_transition(key, transition);

        if transition.is_up() {
            if state.consumed.remove(&key) {
                return Verdict::Consume;
            }
            return Verdict::PassThrough;
        }

        if self.is_paused() {
            return Verdict::PassThrough;
        }

        let decoded = decode(key, state.tracker.state(), self.layout.as_ref());
        log::trace!("{} {} system={} -> {:?}", key, transition, is_system, decoded);

        let verdict = match decoded {
            Decoded::Navigation => {
                state.buffer.clear();
                Verdict::PassThrough
            }
            Decoded::Backspace => {
                state.buffer.pop();
                Verdict::PassThrough
            }
            Decoded::None => Verdict::PassThrough,
            Decoded::Char(c) => self.consider(&mut state, c),
        };

        // A repeat consumed after its press was forwarded keeps its release
        if verdict.is_consume() && transition.is_initial_press() {
            state.consumed.insert(key);
        }
        verdict
    }

    fn consider(&self, state: &mut EngineState, c: char) -> Verdict {
        let rules = self.rules.snapshot();

        if is_terminator(c) {
            if let Some(outcome) = Matcher::match_end_char(&rules, &state.buffer, c) {
                self.replay(state, &outcome);
                return Verdict::Consume;
            }
        }

        state.buffer.push(c);

        if let Some(outcome) = Matcher::match_immediate(&rules, &state.buffer) {
            self.replay(state, &outcome);
            return Verdict::Consume;
        }

        Verdict::PassThrough
    }

    fn replay(&self, state: &mut EngineState, outcome: &MatchOutcome) {
        log::debug!(
            "match {} trigger={:?} terminator={:?}",
            outcome.id,
            outcome.rule.trigger,
            outcome.terminator
        );
        let EngineState { replayer, buffer, .. } = state;
        if let Err(e) = replayer.execute(outcome, buffer) {
            log::warn!("replay {} failed: {}", outcome.id, e);
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::UsLayout;
    use crate::replay::{InjectError, SyntheticEvent};
    use crate::rule::TriggerRule;

    struct NullSink;

    impl InputSink for NullSink {
        fn send(&mut self, _batch: &[SyntheticEvent]) -> Result<(), InjectError> {
            Ok(())
        }
    }

    struct CountingHandle(Arc<std::sync::atomic::AtomicUsize>);

    impl HookHandle for CountingHandle {
        fn release(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn engine(rules: Vec<TriggerRule>) -> Engine {
        Engine::new(RuleSet::from_rules(rules), Box::new(UsLayout), Box::new(NullSink))
    }

    fn press(engine: &Engine, code: u16) -> Verdict {
        engine.process_event(Key::from(code), Transition::Down, false)
    }

    #[test]
    fn test_characters_accumulate() {
        let engine = engine(vec![]);
        assert_eq!(press(&engine, 35), Verdict::PassThrough); // h
        assert_eq!(press(&engine, 23), Verdict::PassThrough); // i
        assert_eq!(engine.buffer_contents(), "hi");
    }

    #[test]
    fn test_key_up_never_touches_buffer() {
        let engine = engine(vec![]);
        press(&engine, 35);
        let verdict = engine.process_event(Key::from(35), Transition::Up, false);
        assert_eq!(verdict, Verdict::PassThrough);
        assert_eq!(engine.buffer_contents(), "h");
    }

    #[test]
    fn test_toggle_paused() {
        let engine = engine(vec![]);
        assert!(!engine.is_paused());
        assert!(engine.toggle_paused());
        assert!(engine.is_paused());
        assert!(!engine.toggle_paused());
        engine.pause_handle().store(true, Ordering::SeqCst);
        assert!(engine.is_paused());
    }

    #[test]
    fn test_modifiers_tracked_while_paused() {
        let engine = engine(vec![]);
        engine.set_paused(true);
        engine.process_event(Key::LEFT_SHIFT, Transition::Down, false);
        assert!(engine.modifier_state().shift());
        engine.set_paused(false);
        press(&engine, 30);
        assert_eq!(engine.buffer_contents(), "A");
    }

    #[test]
    fn test_seeded_caps_lock_uppercases_letters() {
        let engine = engine(vec![]);
        engine.set_caps_lock(true);
        assert!(engine.modifier_state().caps_lock());
        press(&engine, 30);
        assert_eq!(engine.buffer_contents(), "A");
    }

    #[test]
    fn test_consumed_key_release_is_consumed() {
        let engine = engine(vec![TriggerRule::new("ok", "okay")]);
        press(&engine, 24); // o
        press(&engine, 37); // k
        assert_eq!(press(&engine, 57), Verdict::Consume);
        assert_eq!(
            engine.process_event(Key::SPACE, Transition::Up, false),
            Verdict::Consume
        );
        assert_eq!(
            engine.process_event(Key::SPACE, Transition::Up, false),
            Verdict::PassThrough
        );
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let engine = engine(vec![]);
        engine.attach(Box::new(CountingHandle(Arc::clone(&count))));
        engine.shutdown();
        engine.shutdown();
        drop(engine);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_events_pass_through_after_shutdown() {
        let engine = engine(vec![TriggerRule::new("a", "b").immediate(true)]);
        engine.shutdown();
        assert_eq!(press(&engine, 30), Verdict::PassThrough);
        assert_eq!(engine.buffer_contents(), "");
    }

    #[test]
    fn test_reattach_releases_previous_handle() {
        let first = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let second = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let engine = engine(vec![]);
        engine.attach(Box::new(CountingHandle(Arc::clone(&first))));
        engine.attach(Box::new(CountingHandle(Arc::clone(&second))));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        drop(engine);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
