// SQLite-backed implementation of RecordStore.
//
// Tables:
// - records: one row per top-level child of a collection
//   ("projects/<key>"), holding that child's JSON tree.
//
// Deeper paths are read-modify-write on the row. Every write runs in one
// transaction and writes are serialized in-process so subscribers see them
// in order.

use super::json_tree;
use super::push_key::PushKeyGenerator;
use super::watchers::Watchers;
use crate::core::content::{split_path, RecordStore, StoreError, Subscription};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite, SqliteConnection, Transaction};
use std::path::Path;
use tokio::sync::Mutex;

pub struct SqliteRecordStore {
    pool: Pool<Sqlite>,
    watchers: Watchers,
    keys: PushKeyGenerator,
    write_lock: Mutex<()>,
}

impl SqliteRecordStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure the file exists if it's a file path
        let in_memory = database_url.contains(":memory:");
        let path_str = database_url.trim_start_matches("sqlite://");
        if !in_memory && !Path::new(path_str).exists() {
            if let Some(parent) = Path::new(path_str).parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path_str)?;
        }

        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{}", database_url)
        };

        // Every connection to an in-memory database gets its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .connect(&conn_str)
            .await?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self {
            pool,
            watchers: Watchers::new(),
            keys: PushKeyGenerator::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, key)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::StorageError(e.to_string()))?;

        Ok(())
    }

    async fn read(&self, segments: &[&str]) -> Result<Value, StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| StoreError::StorageError(e.to_string()))?;
        read_at(&mut conn, segments).await
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| StoreError::StorageError(e.to_string()))
    }

    async fn notify(&self, segments: &[&str]) -> Result<(), StoreError> {
        for path in self.watchers.related(segments) {
            let watched: Vec<&str> = path.split('/').collect();
            let value = self.read(&watched).await?;
            self.watchers.publish(&path, value);
        }
        Ok(())
    }
}

async fn read_at(conn: &mut SqliteConnection, segments: &[&str]) -> Result<Value, StoreError> {
    match segments {
        [collection] => read_collection(conn, collection).await,
        [collection, key, rest @ ..] => {
            let record = read_record(conn, collection, key).await?;
            Ok(json_tree::get_or_null(&record, rest))
        }
        [] => Err(StoreError::InvalidPath(String::new())),
    }
}

async fn read_collection(conn: &mut SqliteConnection, collection: &str) -> Result<Value, StoreError> {
    let rows = sqlx::query("SELECT key, value FROM records WHERE collection = ? ORDER BY key")
        .bind(collection)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| StoreError::StorageError(e.to_string()))?;

    let mut children = Map::new();
    for row in rows {
        let key: String = row.get("key");
        let value: String = row.get("value");
        children.insert(key, serde_json::from_str(&value)?);
    }

    if children.is_empty() {
        Ok(Value::Null)
    } else {
        Ok(Value::Object(children))
    }
}

async fn read_record(
    conn: &mut SqliteConnection,
    collection: &str,
    key: &str,
) -> Result<Value, StoreError> {
    let row = sqlx::query("SELECT value FROM records WHERE collection = ? AND key = ?")
        .bind(collection)
        .bind(key)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| StoreError::StorageError(e.to_string()))?;

    match row {
        Some(row) => {
            let value: String = row.get("value");
            Ok(serde_json::from_str(&value)?)
        }
        None => Ok(Value::Null),
    }
}

async fn write_record(
    conn: &mut SqliteConnection,
    collection: &str,
    key: &str,
    value: &Value,
) -> Result<(), StoreError> {
    let is_empty = value.is_null() || value.as_object().is_some_and(|m| m.is_empty());
    if is_empty {
        sqlx::query("DELETE FROM records WHERE collection = ? AND key = ?")
            .bind(collection)
            .bind(key)
            .execute(&mut *conn)
            .await
            .map_err(|e| StoreError::StorageError(e.to_string()))?;
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO records (collection, key, value, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(collection, key) DO UPDATE SET
        value = excluded.value,
        updated_at = excluded.updated_at
        "#,
    )
    .bind(collection)
    .bind(key)
    .bind(serde_json::to_string(value)?)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await
    .map_err(|e| StoreError::StorageError(e.to_string()))?;

    Ok(())
}

/// Replace a whole collection.
async fn replace_collection(
    conn: &mut SqliteConnection,
    collection: &str,
    value: Value,
) -> Result<(), StoreError> {
    let children = match value {
        Value::Null => Map::new(),
        Value::Object(children) => children,
        _ => {
            return Err(StoreError::StorageError(format!(
                "collection '{}' can only hold keyed records",
                collection
            )))
        }
    };

    sqlx::query("DELETE FROM records WHERE collection = ?")
        .bind(collection)
        .execute(&mut *conn)
        .await
        .map_err(|e| StoreError::StorageError(e.to_string()))?;

    for (key, child) in children {
        let mut record = Value::Null;
        json_tree::set(&mut record, &[], child);
        write_record(conn, collection, &key, &record).await?;
    }
    Ok(())
}

/// Apply one write inside the caller's transaction.
async fn write_at(
    conn: &mut SqliteConnection,
    segments: &[&str],
    value: Value,
) -> Result<(), StoreError> {
    match segments {
        [collection] => replace_collection(conn, collection, value).await,
        [collection, key, rest @ ..] => {
            let mut record = read_record(conn, collection, key).await?;
            json_tree::set(&mut record, rest, value);
            write_record(conn, collection, key, &record).await
        }
        [] => Err(StoreError::InvalidPath(String::new())),
    }
}

/// Apply every field of an update inside the caller's transaction.
async fn merge_at(
    conn: &mut SqliteConnection,
    segments: &[&str],
    fields: Map<String, Value>,
) -> Result<(), StoreError> {
    for (field, value) in fields {
        let mut target = segments.to_vec();
        target.extend(split_path(&field)?);
        write_at(conn, &target, value).await?;
    }
    Ok(())
}

async fn commit(tx: Transaction<'static, Sqlite>) -> Result<(), StoreError> {
    tx.commit()
        .await
        .map_err(|e| StoreError::StorageError(e.to_string()))
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn subscribe(&self, path: &str) -> Result<Subscription, StoreError> {
        let segments = split_path(path)?;
        let _guard = self.write_lock.lock().await;
        let current = self.read(&segments).await?;
        Ok(self.watchers.subscribe(&segments, current))
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        let _guard = self.write_lock.lock().await;
        let mut tx = self.begin().await?;
        write_at(&mut tx, &segments, value).await?;
        commit(tx).await?;
        self.notify(&segments).await
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<(), StoreError> {
        let segments = split_path(path)?;
        let _guard = self.write_lock.lock().await;
        // Dropping the transaction on error rolls back fields already written.
        let mut tx = self.begin().await?;
        merge_at(&mut tx, &segments, fields).await?;
        commit(tx).await?;
        self.notify(&segments).await
    }

    async fn update_existing(
        &self,
        path: &str,
        fields: Map<String, Value>,
    ) -> Result<bool, StoreError> {
        let segments = split_path(path)?;
        let _guard = self.write_lock.lock().await;
        let mut tx = self.begin().await?;
        if read_at(&mut tx, &segments).await?.is_null() {
            return Ok(false);
        }
        merge_at(&mut tx, &segments, fields).await?;
        commit(tx).await?;
        self.notify(&segments).await?;
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
        self.read(&segments).await
    }
}
