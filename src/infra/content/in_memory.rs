// In-memory implementation of RecordStore.
//
// The whole tree lives in one JSON value behind an async RwLock. Subscribers
// are notified while the write lock is still held, so they observe writes in
// the order they were applied.

use super::json_tree;
use super::push_key::PushKeyGenerator;
use super::watchers::Watchers;
use crate::core::content::{split_path, RecordStore, StoreError, Subscription};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

pub struct InMemoryRecordStore {
    root: RwLock<Value>,
    watchers: Watchers,
    keys: PushKeyGenerator,
}

impl InMemoryRecordStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            root: RwLock::new(Value::Null),
            watchers: Watchers::new(),
            keys: PushKeyGenerator::new(),
        }
    }

    fn notify(&self, root: &Value, segments: &[&str]) {
        for path in self.watchers.related(segments) {
            let watched: Vec<&str> = path.split('/').collect();
            self.watchers
                .publish(&path, json_tree::get_or_null(root, &watched));
        }
    }
}

/// Reject the whole update before anything is applied.
fn validate_fields(fields: &Map<String, Value>) -> Result<(), StoreError> {
    for field in fields.keys() {
        split_path(field)?;
    }
    Ok(())
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn subscribe(&self, path: &str) -> Result<Subscription, StoreError> {
        let segments = split_path(path)?;
        let root = self.root.read().await;
        let current = json_tree::get_or_null(&root, &segments);
        Ok(self.watchers.subscribe(&segments, current))
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        let mut root = self.root.write().await;
        json_tree::set(&mut root, &segments, value);
        self.notify(&root, &segments);
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        validate_fields(&fields)?;
        let mut root = self.root.write().await;
        json_tree::merge(&mut root, &segments, fields);
        self.notify(&root, &segments);
        Ok(())
    }

    async fn update_existing(
        &self,
        path: &str,
        fields: Map<String, Value>,
    ) -> Result<bool, StoreError> {
        let segments = split_path(path)?;
        validate_fields(&fields)?;
        let mut root = self.root.write().await;
        if json_tree::get(&root, &segments).is_none() {
            return Ok(false);
        }
        json_tree::merge(&mut root, &segments, fields);
        self.notify(&root, &segments);
        Ok(true)
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.set(path, Value::Null).await
    }

    fn push_key(&self) -> String {
        self.keys.next_key()
    }

    async fn get(&self, path: &str) -> Result<Value, StoreError> {
        let segments = split_path(path)?;
        let root = self.root.read().await;
        Ok(json_tree::get_or_null(&root, &segments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = InMemoryRecordStore::new();
        assert_eq!(store.get("projects").await.unwrap(), Value::Null);

        store
            .set("projects/a", json!({"title": "Rover", "likes": 0}))
            .await
            .unwrap();
        assert_eq!(store.get("projects/a/title").await.unwrap(), json!("Rover"));

        let mut fields = Map::new();
        fields.insert("likes".to_string(), json!(3));
        store.update("projects/a", fields).await.unwrap();
        assert_eq!(store.get("projects/a/likes").await.unwrap(), json!(3));
        assert_eq!(store.get("projects/a/title").await.unwrap(), json!("Rover"));

        store.remove("projects/a").await.unwrap();
        assert_eq!(store.get("projects").await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_subscribers_see_child_writes() {
        let store = InMemoryRecordStore::new();
        let mut collection = store.subscribe("projects").await.unwrap();
        let mut other = store.subscribe("communityPosts").await.unwrap();

        store.set("projects/a", json!({"title": "Rover"})).await.unwrap();
        let value = collection.changed().await.unwrap();
        assert_eq!(value, json!({"a": {"title": "Rover"}}));

        store
            .set("communityPosts/p", json!({"title": "Showcase"}))
            .await
            .unwrap();
        assert_eq!(other.changed().await.unwrap()["p"]["title"], "Showcase");
        assert_eq!(collection.current(), json!({"a": {"title": "Rover"}}));
    }

    #[tokio::test]
    async fn test_invalid_path() {
        let store = InMemoryRecordStore::new();
        assert!(matches!(
            store.set("projects//a", json!(1)).await,
            Err(StoreError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_update_is_all_or_nothing() {
        let store = InMemoryRecordStore::new();
        store.set("projects/a", json!({"likes": 1})).await.unwrap();

        let mut fields = Map::new();
        fields.insert("likes".to_string(), json!(5));
        fields.insert("zz//broken".to_string(), json!(1));
        assert!(matches!(
            store.update("projects/a", fields).await,
            Err(StoreError::InvalidPath(_))
        ));
        assert_eq!(store.get("projects/a/likes").await.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn test_update_existing_skips_deleted_records() {
        let store = InMemoryRecordStore::new();
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("approved"));

        assert!(!store
            .update_existing("projects/gone", fields.clone())
            .await
            .unwrap());
        assert_eq!(store.get("projects").await.unwrap(), Value::Null);

        store.set("projects/a", json!({"title": "Rover"})).await.unwrap();
        assert!(store.update_existing("projects/a", fields).await.unwrap());
        assert_eq!(store.get("projects/a/status").await.unwrap(), json!("approved"));
    }

    #[test]
    fn test_push_keys_are_unique() {
        let store = InMemoryRecordStore::new();
        let a = store.push_key();
        let b = store.push_key();
        assert_ne!(a, b);
        assert!(a < b);
    }
}
