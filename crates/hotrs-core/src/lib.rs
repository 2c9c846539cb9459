// Hotrs Core Library
// Hotstring matching and replay for observed keyboard input

pub mod buffer;
pub mod config;
pub mod decoder;
pub mod engine;
pub mod input;
pub mod key;
pub mod layout;
pub mod matcher;
pub mod modifier;
pub mod output;
pub mod replay;
pub mod rule;
pub mod transition;

#[cfg(feature = "pure-rust")]
pub mod event;

pub use buffer::TypingBuffer;
pub use config::{Config, ConfigError};
pub use decoder::{decode, Decoded};
pub use engine::{Engine, HookHandle, Verdict};
pub use input::{is_virtual_device, DeviceFilter};
pub use key::{key_from_name, Key};
pub use layout::{KeyboardLayout, Translation, UsLayout};
pub use matcher::{is_terminator, MatchOutcome, Matcher};
pub use modifier::{ModifierState, ModifierTracker};
pub use output::PressedKeyState;
pub use replay::{InjectError, InputSink, Replayer, SuppressionFlag, SyntheticEvent};
pub use rule::{RuleChange, RuleId, RuleSet, RuleSnapshot, SubscriptionId, TriggerRule};
pub use transition::Transition;

#[cfg(feature = "pure-rust")]
pub use event::{EventLoop, EventLoopError, EventLoopResult, GrabHandle, KeyInput};
#[cfg(feature = "pure-rust")]
pub use output::{UInputError, VirtualDevice};
