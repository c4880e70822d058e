//! Local key-value persistence substrate.
//!
//! # Responsibility
//! - Store arbitrary JSON values under string keys.
//! - Convert backend failures into logged `bool` / `Option` results for
//!   domain stores, while still exposing typed errors to restore paths.
//!
//! # Invariants
//! - A write is atomic per key (last writer wins); there is no cross-key
//!   transaction.
//! - A failed write leaves the prior value for that key untouched.
//! - Corrupt or unparsable values read as "absent".

use crate::db::DbError;
use crate::logging::log_safe;
use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod keys;
mod sqlite;

pub use sqlite::SqliteKvBackend;

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage-layer error for key-value backends.
#[derive(Debug)]
pub enum StorageError {
    Db(DbError),
    Serialization(serde_json::Error),
    /// Backend lock was poisoned by a panicking writer.
    Unavailable(&'static str),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "value serialization failed: {err}"),
            Self::Unavailable(details) => write!(f, "storage unavailable: {details}"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Raw string-valued backend contract.
pub trait KvBackend: Send + Sync {
    fn read(&self, key: &str) -> StorageResult<Option<String>>;
    fn write(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
    fn clear(&self) -> StorageResult<()>;
    /// Returns every stored key, sorted.
    fn keys(&self) -> StorageResult<Vec<String>>;
}

/// JSON key-value store shared by all domain stores.
///
/// Cloning is cheap and shares the same backend.
#[derive(Clone)]
pub struct KeyValueStore {
    backend: Arc<dyn KvBackend>,
}

impl KeyValueStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// Opens a SQLite-backed store at `path`.
    pub fn open(path: impl AsRef<std::path::Path>) -> StorageResult<Self> {
        Ok(Self::new(Arc::new(SqliteKvBackend::open(path)?)))
    }

    /// Opens a fresh in-memory SQLite-backed store.
    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self::new(Arc::new(SqliteKvBackend::open_in_memory()?)))
    }

    /// Serializes and writes `value`; failures are logged and reported as
    /// `false`.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match self.try_save(key, value) {
            Ok(()) => true,
            Err(err) => {
                error!(
                    "event=kv_write module=storage status=error key={} error={}",
                    key,
                    log_safe(&err)
                );
                false
            }
        }
    }

    /// Serializes and writes `value`, surfacing the failure reason.
    pub fn try_save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let text = serde_json::to_string(value)?;
        self.backend.write(key, &text)
    }

    /// Reads and deserializes `key`; absent, unreadable and corrupt values all
    /// read as `None`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let text = match self.backend.read(key) {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(err) => {
                warn!(
                    "event=kv_read module=storage status=error key={} error={}",
                    key,
                    log_safe(&err)
                );
                return None;
            }
        };

        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(
                    "event=kv_read module=storage status=corrupt key={} error={}",
                    key,
                    log_safe(&err)
                );
                None
            }
        }
    }

    /// Reads `key` as an untyped JSON value.
    pub fn load_value(&self, key: &str) -> Option<Value> {
        self.load::<Value>(key)
    }

    /// Whether `key` currently holds a readable value.
    pub fn contains(&self, key: &str) -> bool {
        self.load_value(key).is_some()
    }

    /// Best-effort removal of one key.
    pub fn remove(&self, key: &str) -> bool {
        match self.backend.remove(key) {
            Ok(()) => {
                debug!("event=kv_remove module=storage status=ok key={key}");
                true
            }
            Err(err) => {
                error!(
                    "event=kv_remove module=storage status=error key={} error={}",
                    key,
                    log_safe(&err)
                );
                false
            }
        }
    }

    /// Best-effort removal of every key.
    pub fn clear_all(&self) -> bool {
        self.try_clear_all().is_ok()
    }

    pub(crate) fn try_clear_all(&self) -> StorageResult<()> {
        self.backend.clear().map_err(|err| {
            error!(
                "event=kv_clear module=storage status=error error={}",
                log_safe(&err)
            );
            err
        })
    }

    /// Lists stored keys; an unreadable backend lists as empty.
    pub fn keys(&self) -> Vec<String> {
        self.backend.keys().unwrap_or_else(|err| {
            warn!(
                "event=kv_keys module=storage status=error error={}",
                log_safe(&err)
            );
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyValueStore, KvBackend, StorageError, StorageResult};
    use serde_json::json;
    use std::sync::Arc;

    struct ReadOnlyBackend;

    impl KvBackend for ReadOnlyBackend {
        fn read(&self, _key: &str) -> StorageResult<Option<String>> {
            Ok(Some("{not json".to_string()))
        }

        fn write(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Unavailable("read-only"))
        }

        fn remove(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::Unavailable("read-only"))
        }

        fn clear(&self) -> StorageResult<()> {
            Err(StorageError::Unavailable("read-only"))
        }

        fn keys(&self) -> StorageResult<Vec<String>> {
            Err(StorageError::Unavailable("read-only"))
        }
    }

    #[test]
    fn save_and_load_roundtrip_json_values() {
        let store = KeyValueStore::open_in_memory().expect("open store");
        assert!(store.save("habits_v2", &json!([{ "id": "h1" }])));
        let loaded: serde_json::Value = store.load("habits_v2").expect("stored value");
        assert_eq!(loaded, json!([{ "id": "h1" }]));
        assert!(store.load_value("missing").is_none());
    }

    #[test]
    fn failing_backend_reports_false_and_corrupt_reads_as_absent() {
        let store = KeyValueStore::new(Arc::new(ReadOnlyBackend));
        assert!(!store.save("tasks_v2", &json!([])));
        assert!(store.load_value("tasks_v2").is_none());
        assert!(!store.remove("tasks_v2"));
        assert!(!store.clear_all());
        assert!(store.keys().is_empty());
    }

    #[test]
    fn remove_and_clear_all_drop_keys() {
        let store = KeyValueStore::open_in_memory().expect("open store");
        store.save("a", &1);
        store.save("b", &2);
        assert!(store.remove("a"));
        assert_eq!(store.keys(), vec!["b".to_string()]);
        assert!(store.clear_all());
        assert!(store.keys().is_empty());
    }
}
