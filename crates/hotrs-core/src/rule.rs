// Hotrs Trigger Rules
// Rule data and the shared, copy-on-write rule collection

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_RULE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// One trigger/replacement pair and its matching flags
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TriggerRule {
    pub trigger: String,
    pub replacement: String,
    /// Compare the buffer tail case-sensitively
    pub case_sensitive: bool,
    /// Fire on the trigger's last character instead of waiting for a terminator
    pub immediate: bool,
    /// Drop the terminator that completed the match instead of re-typing it
    pub omit_terminator: bool,
}

impl TriggerRule {
    /// Rule with all flags off
    pub fn new(trigger: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            replacement: replacement.into(),
            ..Self::default()
        }
    }

    pub fn case_sensitive(mut self, on: bool) -> Self {
        self.case_sensitive = on;
        self
    }

    pub fn immediate(mut self, on: bool) -> Self {
        self.immediate = on;
        self
    }

    pub fn omit_terminator(mut self, on: bool) -> Self {
        self.omit_terminator = on;
        self
    }

    /// Trigger length in characters
    pub fn trigger_len(&self) -> usize {
        self.trigger.chars().count()
    }
}

/// Identity of a rule slot. Two rules with the same trigger text are
/// still distinct slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u64);

impl RuleId {
    fn next() -> Self {
        RuleId(NEXT_RULE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule#{}", self.0)
    }
}

/// Change notification delivered to rule-set observers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleChange {
    Added(RuleId),
    Removed(RuleId),
    Updated(RuleId),
    /// The whole collection was replaced or cleared
    Reset,
}

/// Handle returned by [`RuleSet::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Arc<dyn Fn(RuleChange) + Send + Sync>;

/// Immutable view of the rules in enumeration order
pub type RuleSnapshot = Arc<IndexMap<RuleId, Arc<TriggerRule>>>;

struct RuleSetInner {
    rules: RwLock<RuleSnapshot>,
    observers: Mutex<Vec<(SubscriptionId, Observer)>>,
}

/// Ordered, shareable rule collection.
///
/// Readers take a snapshot (an `Arc` clone) and iterate it without holding
/// any lock. Writers copy the current map, edit the copy and publish it,
/// so an in-flight event never sees a half-edited rule.
#[derive(Clone)]
pub struct RuleSet {
    inner: Arc<RuleSetInner>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("rules", &self.snapshot())
            .finish()
    }
}

impl RuleSet {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RuleSetInner {
                rules: RwLock::new(Arc::new(IndexMap::new())),
                observers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Build a set from rules in order
    pub fn from_rules(rules: impl IntoIterator<Item = TriggerRule>) -> Self {
        let set = Self::new();
        {
            let mut guard = set.inner.rules.write();
            let map = Arc::make_mut(&mut guard);
            for rule in rules {
                map.insert(RuleId::next(), Arc::new(rule));
            }
        }
        set
    }

    /// Current rules; cheap, lock held only for the `Arc` clone
    pub fn snapshot(&self) -> RuleSnapshot {
        self.inner.rules.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.rules.read().is_empty()
    }

    /// Ids in enumeration order
    pub fn ids(&self) -> Vec<RuleId> {
        self.snapshot().keys().copied().collect()
    }

    pub fn get(&self, id: RuleId) -> Option<Arc<TriggerRule>> {
        self.inner.rules.read().get(&id).cloned()
    }

    /// Append a rule at the end of the enumeration order
    pub fn add_rule(&self, rule: TriggerRule) -> RuleId {
        let id = RuleId::next();
        log::debug!("rule set: add {} trigger={:?}", id, rule.trigger);
        self.publish(|map| {
            map.insert(id, Arc::new(rule));
        });
        self.notify(RuleChange::Added(id));
        id
    }

    /// Remove a rule; later rules keep their relative order
    pub fn remove_rule(&self, id: RuleId) -> Option<TriggerRule> {
        let mut removed = None;
        self.publish(|map| {
            removed = map.shift_remove(&id);
        });
        let removed = removed?;
        log::debug!("rule set: remove {}", id);
        self.notify(RuleChange::Removed(id));
        Some(Arc::unwrap_or_clone(removed))
    }

    /// Replace a rule in place, keeping its position. False if unknown.
    pub fn update_rule(&self, id: RuleId, rule: TriggerRule) -> bool {
        let mut found = false;
        self.publish(|map| {
            if let Some(slot) = map.get_mut(&id) {
                *slot = Arc::new(rule);
                found = true;
            }
        });
        if found {
            log::debug!("rule set: update {}", id);
            self.notify(RuleChange::Updated(id));
        }
        found
    }

    /// Swap in a whole new list, e.g. after a config reload
    pub fn replace_all(&self, rules: impl IntoIterator<Item = TriggerRule>) -> Vec<RuleId> {
        let fresh: IndexMap<RuleId, Arc<TriggerRule>> = rules
            .into_iter()
            .map(|rule| (RuleId::next(), Arc::new(rule)))
            .collect();
        let ids = fresh.keys().copied().collect();
        log::debug!("rule set: replace with {} rules", fresh.len());
        *self.inner.rules.write() = Arc::new(fresh);
        self.notify(RuleChange::Reset);
        ids
    }

    pub fn clear(&self) {
        *self.inner.rules.write() = Arc::new(IndexMap::new());
        self.notify(RuleChange::Reset);
    }

    /// Register a change observer. Callbacks run on the mutating thread,
    /// after the change is visible, with no rule-set lock held.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(RuleChange) + Send + Sync + 'static,
    {
        let id = SubscriptionId(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed));
        self.inner.observers.lock().push((id, Arc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.inner.observers.lock();
        let before = observers.len();
        observers.retain(|(sub, _)| *sub != id);
        observers.len() != before
    }

    fn publish(&self, edit: impl FnOnce(&mut IndexMap<RuleId, Arc<TriggerRule>>)) {
        let mut guard = self.inner.rules.write();
        // Readers holding the old snapshot keep it; we edit a private copy
        let mut next = IndexMap::clone(&guard);
        edit(&mut next);
        *guard = Arc::new(next);
    }

    fn notify(&self, change: RuleChange) {
        let observers: Vec<Observer> = self
            .inner
            .observers
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in observers {
            callback(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_enumeration_follows_insertion_order() {
        let set = RuleSet::new();
        let a = set.add_rule(TriggerRule::new("ab", "X"));
        let b = set.add_rule(TriggerRule::new("b", "Y"));
        let c = set.add_rule(TriggerRule::new("ab", "Z"));
        assert_eq!(set.ids(), vec![a, b, c]);

        let triggers: Vec<String> = set.snapshot().values().map(|r| r.replacement.clone()).collect();
        assert_eq!(triggers, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn test_duplicate_triggers_are_distinct_slots() {
        let set = RuleSet::new();
        let first = set.add_rule(TriggerRule::new("omw", "on my way"));
        let second = set.add_rule(TriggerRule::new("omw", "on my way!"));
        assert_ne!(first, second);
        assert_eq!(set.len(), 2);

        assert_eq!(set.remove_rule(first).map(|r| r.replacement), Some("on my way".to_string()));
        assert_eq!(set.ids(), vec![second]);
        assert!(set.remove_rule(first).is_none());
    }

    #[test]
    fn test_update_keeps_position() {
        let set = RuleSet::from_rules(vec![
            TriggerRule::new("a", "1"),
            TriggerRule::new("b", "2"),
            TriggerRule::new("c", "3"),
        ]);
        let ids = set.ids();
        assert!(set.update_rule(ids[1], TriggerRule::new("bb", "22").immediate(true)));
        assert_eq!(set.ids(), ids);
        let updated = set.get(ids[1]).unwrap();
        assert_eq!(updated.trigger, "bb");
        assert!(updated.immediate);
    }

    #[test]
    fn test_update_unknown_id_is_false() {
        let set = RuleSet::new();
        let id = set.add_rule(TriggerRule::new("a", "b"));
        set.remove_rule(id);
        assert!(!set.update_rule(id, TriggerRule::new("x", "y")));
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_edits() {
        let set = RuleSet::new();
        let id = set.add_rule(TriggerRule::new("brb", "be right back"));
        let before = set.snapshot();

        set.update_rule(id, TriggerRule::new("brb", "changed"));
        set.add_rule(TriggerRule::new("ty", "thank you"));

        assert_eq!(before.len(), 1);
        assert_eq!(before[&id].replacement, "be right back");
        assert_eq!(set.snapshot().len(), 2);
    }

    #[test]
    fn test_observers_receive_changes() {
        let set = RuleSet::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = set.subscribe(move |change| sink.lock().push(change));

        let id = set.add_rule(TriggerRule::new("a", "b"));
        set.update_rule(id, TriggerRule::new("a", "c"));
        set.remove_rule(id);
        set.replace_all(vec![TriggerRule::new("x", "y")]);

        assert_eq!(
            *seen.lock(),
            vec![
                RuleChange::Added(id),
                RuleChange::Updated(id),
                RuleChange::Removed(id),
                RuleChange::Reset
            ]
        );

        assert!(set.unsubscribe(sub));
        set.clear();
        assert_eq!(seen.lock().len(), 4);
        assert!(!set.unsubscribe(sub));
    }

    #[test]
    fn test_observer_may_read_the_set() {
        let set = RuleSet::new();
        let reader = set.clone();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        set.subscribe(move |_| {
            seen.store(reader.len(), Ordering::SeqCst);
        });
        set.add_rule(TriggerRule::new("a", "b"));
        set.add_rule(TriggerRule::new("c", "d"));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_mutation_while_reading() {
        let set = RuleSet::new();
        let writer = set.clone();
        let handle = std::thread::spawn(move || {
            for i in 0..500 {
                let id = writer.add_rule(TriggerRule::new(format!("t{i}"), "x"));
                if i % 2 == 0 {
                    writer.remove_rule(id);
                }
            }
        });
        for _ in 0..500 {
            for rule in set.snapshot().values() {
                assert!(rule.trigger.starts_with('t'));
            }
        }
        handle.join().unwrap();
        assert_eq!(set.len(), 250);
    }

    #[test]
    fn test_trigger_len_counts_chars() {
        assert_eq!(TriggerRule::new("café", "").trigger_len(), 4);
        assert_eq!(TriggerRule::new("", "x").trigger_len(), 0);
    }
}
