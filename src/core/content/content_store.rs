// Storage port for the synchronized record store.
//
// The store is a path-addressable JSON tree ("projects/<id>/comments/<key>").
// Subscribers get the current value at a path and then every later change.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid path '{0}'")]
    InvalidPath(String),

    #[error("Subscription to '{0}' closed")]
    SubscriptionClosed(String),
}

/// Split a store path into its segments, rejecting empty ones.
pub fn split_path(path: &str) -> Result<Vec<&str>, StoreError> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

/// Live view of one path in the store.
pub struct Subscription {
    path: String,
    receiver: watch::Receiver<Value>,
}

impl Subscription {
    pub fn new(path: impl Into<String>, receiver: watch::Receiver<Value>) -> Self {
        Self {
            path: path.into(),
            receiver,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Value at the path right now (`Null` when nothing is stored there).
    pub fn current(&self) -> Value {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change and return the new value.
    ///
    /// Changes that land while nobody is waiting are coalesced; the caller
    /// always sees the latest value.
    pub async fn changed(&mut self) -> Result<Value, StoreError> {
        self.receiver
            .changed()
            .await
            .map_err(|_| StoreError::SubscriptionClosed(self.path.clone()))?;
        Ok(self.receiver.borrow_and_update().clone())
    }
}

/// Trait for the external synchronized record store.
///
/// Writes are last-write-wins. A single `set` or `update` lands whole or not
/// at all.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Current value at `path` plus every subsequent change.
    async fn subscribe(&self, path: &str) -> Result<Subscription, StoreError>;

    /// Replace the whole value at `path`. Writing `Null` removes it.
    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Merge the given fields into the object at `path`. Field names may be
    /// nested paths themselves ("comments/<key>").
    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError>;

    /// Like `update`, but only when something is already stored at `path`.
    /// Returns `false` (and writes nothing) otherwise. The existence check and
    /// the write are one step, so a concurrent delete is never undone.
    async fn update_existing(
        &self,
        path: &str,
        fields: Map<String, Value>,
    ) -> Result<bool, StoreError>;

    /// Delete everything at `path`.
    async fn remove(&self, path: &str) -> Result<(), StoreError>;

    /// Generate a unique, time-ordered child key.
    fn push_key(&self) -> String;

    /// One-off read of the value at `path`.
    async fn get(&self, path: &str) -> Result<Value, StoreError> {
        Ok(self.subscribe(path).await?.current())
    }
}
