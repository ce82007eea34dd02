// SPDX-FileCopyrightText: 2026 Huddle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyed coalescing window.
//!
//! Bursty events are held per key; each new push for a key resets that key's
//! deadline, so a burst flushes once, after the burst goes quiet. The key
//! space is explicit: events for different keys never suppress each other.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;

/// A timer-backed queue holding the latest value per key.
#[derive(Debug)]
pub struct CoalescingWindow<K, V> {
    window: Duration,
    pending: HashMap<K, (Instant, V)>,
}

impl<K: Eq + Hash + Clone, V> CoalescingWindow<K, V> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    /// Hold `value` for `key`, replacing any pending value and resetting the
    /// key's deadline.
    pub fn push(&mut self, now: Instant, key: K, value: V) {
        self.pending.insert(key, (now + self.window, value));
    }

    /// Like [`push`](Self::push), but merges into a pending value instead of
    /// replacing it. The deadline still resets.
    pub fn push_with(&mut self, now: Instant, key: K, value: V, merge: impl FnOnce(&mut V, V)) {
        let deadline = now + self.window;
        match self.pending.get_mut(&key) {
            Some(entry) => {
                entry.0 = deadline;
                merge(&mut entry.1, value);
            }
            None => {
                self.pending.insert(key, (deadline, value));
            }
        }
    }

    /// Earliest pending deadline, if anything is held.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|(deadline, _)| *deadline).min()
    }

    /// Remove and return every entry whose deadline has passed.
    pub fn take_expired(&mut self, now: Instant) -> Vec<(K, V)> {
        let expired: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, (deadline, _))| *deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|key| self.pending.remove(&key).map(|(_, value)| (key, value)))
            .collect()
    }

    /// Drop a pending entry without flushing it.
    pub fn cancel(&mut self, key: &K) -> Option<V> {
        self.pending.remove(key).map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
