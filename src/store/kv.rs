use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

/// Key under which the "user explicitly disconnected" flag is stored.
pub const USER_DISCONNECTED_KEY: &str = "user_disconnected";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    fn get_bool(&self, key: &str, default: bool) -> Result<bool, StoreError> {
        Ok(match self.get(key)?.as_deref() {
            Some("true") => true,
            Some("false") => false,
            _ => default,
        })
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), StoreError> {
        self.set(key, if value { "true" } else { "false" })
    }
}

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let conn = Connection::open(path).with_context(|| format!("open db {}", path.display()))?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO kv(key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

/// Process-local store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_default_when_missing() {
        let store = MemoryStore::new();
        assert!(store.get_bool(USER_DISCONNECTED_KEY, true).unwrap());
        assert!(!store.get_bool(USER_DISCONNECTED_KEY, false).unwrap());
    }

    #[test]
    fn test_memory_clones_share_state() {
        let store = MemoryStore::new();
        let view = store.clone();
        store.set_bool(USER_DISCONNECTED_KEY, false).unwrap();
        assert!(!view.get_bool(USER_DISCONNECTED_KEY, true).unwrap());
    }

    #[test]
    fn test_sqlite_flag_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.sqlite3");

        {
            let store = SqliteStore::open(&path).unwrap();
            assert_eq!(store.get(USER_DISCONNECTED_KEY).unwrap(), None);
            store.set_bool(USER_DISCONNECTED_KEY, false).unwrap();
            store.set_bool(USER_DISCONNECTED_KEY, false).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.get(USER_DISCONNECTED_KEY).unwrap().as_deref(),
            Some("false")
        );
        assert!(!store.get_bool(USER_DISCONNECTED_KEY, true).unwrap());
    }
}
