/*
[INPUT]:  Subscribe/unsubscribe intents from stream consumers
[OUTPUT]: Reference counts and the set of keys to replay after reconnect
[POS]:    WebSocket layer - subscription bookkeeping
[UPDATE]: When subscription identity or replay rules change
*/

use std::collections::BTreeMap;

use super::message::Subscription;

/// Outcome of adding a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    /// Count went 0 -> 1; a subscribe frame is due
    First,
    Shared { count: usize },
}

/// Outcome of dropping a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Key had no references; nothing to do
    Unknown,
    /// Count went 1 -> 0; an unsubscribe frame is due
    Last,
    Shared { count: usize },
}

/// Reference-counted subscriptions. Only keys with a positive count are stored.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    counts: BTreeMap<Subscription, usize>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self, sub: &Subscription) -> Acquire {
        let count = self.counts.entry(sub.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            Acquire::First
        } else {
            Acquire::Shared { count: *count }
        }
    }

    pub fn release(&mut self, sub: &Subscription) -> Release {
        let Some(count) = self.counts.get_mut(sub) else {
            return Release::Unknown;
        };
        *count -= 1;
        if *count == 0 {
            self.counts.remove(sub);
            Release::Last
        } else {
            Release::Shared { count: *count }
        }
    }

    pub fn count(&self, sub: &Subscription) -> usize {
        self.counts.get(sub).copied().unwrap_or(0)
    }

    pub fn contains(&self, sub: &Subscription) -> bool {
        self.counts.contains_key(sub)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Every key with a positive count, each exactly once, in key order
    pub fn active(&self) -> impl Iterator<Item = &Subscription> {
        self.counts.keys()
    }
}
