//! Key-value storage backends for preferences.
//!
//! `KeyValueStore` abstracts over where preferences live. `SqliteStore` keeps
//! them in a single-table database in the config directory; `MemoryStore`
//! backs tests.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use skycast_core::error::RusqliteErrorExt;
use skycast_core::StorageError;
use std::collections::HashMap;
use std::path::Path;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StorageError>;

/// String-keyed storage of string values.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::Unavailable(format!("{}: {}", parent.display(), e)))?;
        }
        let conn = Connection::open(path).map_err(RusqliteErrorExt::into_storage_error)?;
        tracing::debug!("Opened preferences database at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(RusqliteErrorExt::into_storage_error)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn
            .lock()
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS preferences (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL
                );
                "#,
            )
            .map_err(RusqliteErrorExt::into_storage_error)
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.conn
            .lock()
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(RusqliteErrorExt::into_storage_error)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO preferences (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(RusqliteErrorExt::into_storage_error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.conn
            .lock()
            .execute("DELETE FROM preferences WHERE key = ?1", params![key])
            .map_err(RusqliteErrorExt::into_storage_error)?;
        Ok(())
    }
}
