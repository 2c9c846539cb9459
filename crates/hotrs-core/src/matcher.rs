// Hotrs Matcher
// End-character and immediate matching against the typing buffer

use std::sync::Arc;

use crate::buffer::TypingBuffer;
use crate::rule::{RuleId, RuleSnapshot, TriggerRule};

/// Characters that complete a non-immediate trigger
const TERMINATORS: &[char] = &[
    ' ', '\r', '\n', '\t', '-', '(', ')', '[', ']', '{', '}', ':', ';', '"', '\'', ',', '.', '<',
    '>', '/', '\\', '?', '!',
];

/// Check if a character completes end-character triggers
pub fn is_terminator(c: char) -> bool {
    TERMINATORS.contains(&c)
}

/// Winning rule for one keystroke
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub id: RuleId,
    pub rule: Arc<TriggerRule>,
    /// Character that completed an end-character match
    pub terminator: Option<char>,
}

impl MatchOutcome {
    /// True when the match fired on the trigger's own last character
    pub fn is_immediate(&self) -> bool {
        self.terminator.is_none()
    }
}

/// Stateless matching policy over a rule snapshot.
///
/// Within each policy the first rule in enumeration order wins; there is
/// no longest-match preference.
pub struct Matcher;

impl Matcher {
    /// End-character policy. `buffer` must not yet contain `terminator`.
    pub fn match_end_char(
        rules: &RuleSnapshot,
        buffer: &TypingBuffer,
        terminator: char,
    ) -> Option<MatchOutcome> {
        if !is_terminator(terminator) {
            return None;
        }
        Self::first_match(rules, buffer, false).map(|(id, rule)| MatchOutcome {
            id,
            rule,
            terminator: Some(terminator),
        })
    }

    /// Immediate policy, tested after the character was appended
    pub fn match_immediate(rules: &RuleSnapshot, buffer: &TypingBuffer) -> Option<MatchOutcome> {
        Self::first_match(rules, buffer, true).map(|(id, rule)| MatchOutcome {
            id,
            rule,
            terminator: None,
        })
    }

    fn first_match(
        rules: &RuleSnapshot,
        buffer: &TypingBuffer,
        immediate: bool,
    ) -> Option<(RuleId, Arc<TriggerRule>)> {
        rules
            .iter()
            .filter(|(_, rule)| rule.immediate == immediate)
            .find(|(_, rule)| buffer.ends_with(&rule.trigger, rule.case_sensitive))
            .map(|(id, rule)| (*id, Arc::clone(rule)))
    }
}
