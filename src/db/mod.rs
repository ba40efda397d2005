//! Durable key/value storage for the player snapshot.
//!
//! The browser build writes to `localStorage`; native builds keep the same
//! JSON document in a small SQLite settings table.

use crate::playback::PlayerSnapshot;
#[cfg(not(target_arch = "wasm32"))]
use dioxus::logger::tracing::warn;
use serde_json::Value;
use std::rc::Rc;
use thiserror::Error;

#[cfg(target_arch = "wasm32")]
use gloo_storage::{errors::StorageError, LocalStorage, Storage};

/// Error type for snapshot storage operations
#[derive(Debug, Error)]
pub enum DbError {
    #[cfg(not(target_arch = "wasm32"))]
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[cfg(target_arch = "wasm32")]
    #[error("local storage error: {0}")]
    Storage(String),
    #[error("stored player state is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Where the persisted [`PlayerSnapshot`] lives.
pub trait SnapshotStore {
    /// Raw stored document, `Ok(None)` when nothing was saved yet.
    fn load(&self) -> Result<Option<Value>, DbError>;
    fn save(&self, snapshot: &PlayerSnapshot) -> Result<(), DbError>;
}

#[cfg(target_arch = "wasm32")]
pub struct LocalStore {
    key: String,
}

#[cfg(target_arch = "wasm32")]
impl LocalStore {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl SnapshotStore for LocalStore {
    fn load(&self) -> Result<Option<Value>, DbError> {
        match LocalStorage::get::<Value>(&self.key) {
            Ok(value) => Ok(Some(value)),
            Err(StorageError::KeyNotFound(_)) => Ok(None),
            Err(StorageError::SerdeError(err)) => Err(DbError::Corrupt(err)),
            Err(err) => Err(DbError::Storage(err.to_string())),
        }
    }

    fn save(&self, snapshot: &PlayerSnapshot) -> Result<(), DbError> {
        LocalStorage::set(&self.key, snapshot).map_err(|e| match e {
            StorageError::SerdeError(err) => DbError::Corrupt(err),
            other => DbError::Storage(other.to_string()),
        })
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub struct SqliteStore {
    conn: rusqlite::Connection,
    key: String,
}

#[cfg(not(target_arch = "wasm32"))]
impl SqliteStore {
    pub fn open(key: &str) -> Result<Self, DbError> {
        let data_dir = data_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let conn = rusqlite::Connection::open(data_dir.join("folio-player.db"))?;
        Self::with_connection(conn, key)
    }

    pub fn in_memory(key: &str) -> Result<Self, DbError> {
        Self::with_connection(rusqlite::Connection::open_in_memory()?, key)
    }

    fn with_connection(conn: rusqlite::Connection, key: &str) -> Result<Self, DbError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn,
            key: key.to_string(),
        })
    }

    #[cfg(test)]
    pub fn save_raw(&self, raw: &str) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            [self.key.as_str(), raw],
        )?;
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl SnapshotStore for SqliteStore {
    fn load(&self) -> Result<Option<Value>, DbError> {
        let result: Result<String, rusqlite::Error> = self.conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            [self.key.as_str()],
            |row: &rusqlite::Row| row.get(0),
        );

        match result {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, snapshot: &PlayerSnapshot) -> Result<(), DbError> {
        let json = serde_json::to_string(snapshot)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            [self.key.as_str(), json.as_str()],
        )?;
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn data_dir() -> Option<std::path::PathBuf> {
    let dir = dirs::data_dir()?.join("folio-player");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Platform store for the given key.
#[cfg(target_arch = "wasm32")]
pub fn open_store(key: &str) -> Rc<dyn SnapshotStore> {
    Rc::new(LocalStore::new(key))
}

/// Platform store for the given key. Falls back to an in-memory database
/// when the data directory cannot be opened.
#[cfg(not(target_arch = "wasm32"))]
pub fn open_store(key: &str) -> Rc<dyn SnapshotStore> {
    match SqliteStore::open(key) {
        Ok(store) => Rc::new(store),
        Err(err) => {
            warn!("Falling back to in-memory player state: {err}");
            match SqliteStore::in_memory(key) {
                Ok(store) => Rc::new(store),
                Err(err) => {
                    warn!("In-memory player state unavailable: {err}");
                    Rc::new(NullStore)
                }
            }
        }
    }
}

/// Store that never remembers anything.
#[cfg_attr(target_arch = "wasm32", allow(dead_code))]
pub struct NullStore;

impl SnapshotStore for NullStore {
    fn load(&self) -> Result<Option<Value>, DbError> {
        Ok(None)
    }

    fn save(&self, _snapshot: &PlayerSnapshot) -> Result<(), DbError> {
        Ok(())
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn empty_store_loads_nothing() {
        let store = SqliteStore::in_memory("musicPlayerState").unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn saved_snapshot_reads_back() {
        let store = SqliteStore::in_memory("musicPlayerState").unwrap();
        let snapshot = PlayerSnapshot {
            current_track: 4,
            volume: 0.3,
            is_looping: true,
            is_minimized: true,
            playlist_visible: false,
        };
        store.save(&snapshot).unwrap();

        let value = store.load().unwrap().unwrap();
        assert_eq!(value["currentTrack"], 4);
        assert_eq!(value["isMinimized"], true);
        let decoded: PlayerSnapshot = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn malformed_document_is_reported_as_corrupt() {
        let store = SqliteStore::in_memory("musicPlayerState").unwrap();
        store.save_raw("{not json").unwrap();
        assert!(matches!(store.load(), Err(DbError::Corrupt(_))));
    }

    #[test]
    fn keys_do_not_collide() {
        let store = SqliteStore::in_memory("a").unwrap();
        store.save(&PlayerSnapshot::defaults(0.7)).unwrap();
        let other = SqliteStore {
            conn: store.conn,
            key: "b".to_string(),
        };
        assert!(other.load().unwrap().is_none());
    }
}
