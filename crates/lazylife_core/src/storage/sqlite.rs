//! SQLite implementation of the key-value backend.

use super::{KvBackend, StorageError, StorageResult};
use crate::db::{open_db, open_db_in_memory};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Key-value backend over the `kv_entries` table.
pub struct SqliteKvBackend {
    conn: Mutex<Connection>,
}

impl SqliteKvBackend {
    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens a fresh in-memory database.
    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already-migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("sqlite connection lock poisoned"))
    }
}

impl KvBackend for SqliteKvBackend {
    fn read(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(())
    }

    fn clear(&self) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM kv_entries;", [])?;
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key FROM kv_entries ORDER BY key ASC;")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for key in rows {
            keys.push(key?);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteKvBackend;
    use crate::storage::KvBackend;

    #[test]
    fn write_overwrites_existing_key() {
        let backend = SqliteKvBackend::open_in_memory().expect("open backend");
        backend.write("settings_v1", "{\"a\":1}").expect("first write");
        backend.write("settings_v1", "{\"a\":2}").expect("second write");
        assert_eq!(
            backend.read("settings_v1").expect("read").as_deref(),
            Some("{\"a\":2}")
        );
        assert_eq!(backend.keys().expect("keys"), vec!["settings_v1".to_string()]);
    }

    #[test]
    fn file_backend_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("lazylife.db");
        {
            let backend = SqliteKvBackend::open(&path).expect("open file backend");
            backend.write("tasks_v2", "[]").expect("write");
        }
        let reopened = SqliteKvBackend::open(&path).expect("reopen file backend");
        assert_eq!(reopened.read("tasks_v2").expect("read").as_deref(), Some("[]"));
    }
}
