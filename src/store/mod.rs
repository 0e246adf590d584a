//! Persisted key-value state

mod kv;

pub use kv::{KeyValueStore, MemoryStore, SqliteStore, StoreError, USER_DISCONNECTED_KEY};
