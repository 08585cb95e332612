// Engagement counters - likes and views with optimistic local values.
//
// Counter writes are read-current-then-write-new-value. The tracker keeps the
// value we last wrote so a viewer sees it immediately, and drops it as soon as
// the store pushes the real value back. The store always wins.

use dashmap::{DashMap, DashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    Likes,
    Views,
}

/// Outcome of reconciling a pushed server value with a local guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Nothing was pending for this counter
    Untracked,
    /// The store agreed with the guess
    Confirmed(u64),
    /// Someone else wrote in between; the server value replaces the guess
    Overridden { guess: u64, server: u64 },
}

/// Apply a signed delta to a counter, never going below zero.
pub fn apply_delta(current: u64, delta: i64) -> u64 {
    if delta < 0 {
        current.saturating_sub(delta.unsigned_abs())
    } else {
        current.saturating_add(delta as u64)
    }
}

#[derive(Default)]
pub struct EngagementTracker {
    /// (record key, counter) -> value we wrote and have not yet seen echoed
    pending: DashMap<(String, Counter), u64>,
    /// viewer id -> keys of records that viewer currently likes
    liked: DashMap<String, DashSet<String>>,
}

impl EngagementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the next value from the last-known server value and remember
    /// it as the pending guess.
    pub fn propose(&self, record_id: &str, counter: Counter, server_value: u64, delta: i64) -> u64 {
        let next = apply_delta(server_value, delta);
        self.pending.insert((record_id.to_string(), counter), next);
        next
    }

    /// Forget a guess whose write never made it to the store.
    pub fn discard(&self, record_id: &str, counter: Counter) {
        self.pending.remove(&(record_id.to_string(), counter));
    }

    pub fn optimistic(&self, record_id: &str, counter: Counter) -> Option<u64> {
        self.pending
            .get(&(record_id.to_string(), counter))
            .map(|value| *value)
    }

    /// What to show right now: the pending guess if any, else the server value.
    pub fn display_value(&self, record_id: &str, counter: Counter, server_value: u64) -> u64 {
        self.optimistic(record_id, counter).unwrap_or(server_value)
    }

    /// Take a freshly pushed server value. Any pending guess is dropped.
    pub fn reconcile(&self, record_id: &str, counter: Counter, server_value: u64) -> Reconciliation {
        match self.pending.remove(&(record_id.to_string(), counter)) {
            None => Reconciliation::Untracked,
            Some((_, guess)) if guess == server_value => Reconciliation::Confirmed(server_value),
            Some((_, guess)) => Reconciliation::Overridden {
                guess,
                server: server_value,
            },
        }
    }

    /// Drop pending guesses and likes for records that no longer exist.
    pub fn retain_records<F>(&self, mut exists: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.pending.retain(|(record_id, _), _| exists(record_id));
        for set in self.liked.iter() {
            set.retain(|record_id| exists(record_id));
        }
        self.liked.retain(|_, set| !set.is_empty());
    }

    pub fn is_liked(&self, viewer_id: &str, record_id: &str) -> bool {
        self.liked
            .get(viewer_id)
            .map(|set| set.contains(record_id))
            .unwrap_or(false)
    }

    /// Flip the viewer's like on a record. Returns the new liked state.
    pub fn toggle_liked(&self, viewer_id: &str, record_id: &str) -> bool {
        let set = self.liked.entry(viewer_id.to_string()).or_default();
        if set.remove(record_id).is_some() {
            false
        } else {
            set.insert(record_id.to_string());
            true
        }
    }
}
