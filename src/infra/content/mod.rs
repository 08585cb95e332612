// Implementations of the record store.

pub mod in_memory;
pub mod json_tree;
pub mod push_key;
pub mod sqlite_store;
pub mod watchers;

// Re-export for convenience
pub use in_memory::InMemoryRecordStore;
pub use push_key::PushKeyGenerator;
pub use sqlite_store::SqliteRecordStore;
