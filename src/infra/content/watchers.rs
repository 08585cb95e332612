// Subscriber fan-out shared by the store implementations.
//
// One watch channel per subscribed path. After a write, every watched path on
// the same branch (ancestor, the path itself, or a descendant) is refreshed.

use crate::core::content::Subscription;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::watch;

#[derive(Default)]
pub struct Watchers {
    channels: DashMap<String, watch::Sender<Value>>,
}

impl Watchers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber at `segments`, seeded with the current value.
    pub fn subscribe(&self, segments: &[&str], current: Value) -> Subscription {
        let path = segments.join("/");
        let sender = self
            .channels
            .entry(path.clone())
            .or_insert_with(|| watch::channel(current.clone()).0);
        publish_to(&sender, current);
        Subscription::new(path, sender.subscribe())
    }

    /// Watched paths affected by a write at `segments`. Channels nobody
    /// listens to any more are dropped here.
    pub fn related(&self, segments: &[&str]) -> Vec<String> {
        self.channels.retain(|_, sender| sender.receiver_count() > 0);

        let written = segments.join("/");
        self.channels
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|watched| on_same_branch(watched, &written))
            .collect()
    }

    /// Push a new value to the subscribers of `path`, if it changed.
    pub fn publish(&self, path: &str, value: Value) {
        if let Some(sender) = self.channels.get(path) {
            publish_to(&sender, value);
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

fn publish_to(sender: &watch::Sender<Value>, value: Value) {
    sender.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    });
}

fn on_same_branch(a: &str, b: &str) -> bool {
    a == b || is_descendant(a, b) || is_descendant(b, a)
}

fn is_descendant(path: &str, ancestor: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}
