use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use trainer_core::{StorageArea, StorageError};

#[derive(Debug)]
pub enum PersistenceError {
    Sqlite(rusqlite::Error),
    Poisoned,
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::Poisoned => write!(f, "sqlite connection lock poisoned"),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Poisoned => None,
        }
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<PersistenceError> for StorageError {
    fn from(value: PersistenceError) -> Self {
        match value {
            PersistenceError::Poisoned => {
                StorageError::Unavailable("sqlite connection lock poisoned".to_string())
            }
            PersistenceError::Sqlite(err) => StorageError::backend(err),
        }
    }
}

/// Storage area kept in one SQLite file. Every process that opens the same
/// file shares the same items, the way tabs of one origin share theirs.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Stored keys in ascending order.
    pub fn keys(&self) -> Result<Vec<String>, PersistenceError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key FROM storage_items ORDER BY key ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, PersistenceError> {
        self.conn.lock().map_err(|_| PersistenceError::Poisoned)
    }

    fn configure(&self) -> Result<(), PersistenceError> {
        let conn = self.conn()?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_millis(500))?;
        Ok(())
    }

    fn migrate(&self) -> Result<(), PersistenceError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS storage_items (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;

        conn.execute(
            "INSERT OR IGNORE INTO schema_migrations(version, name)
             VALUES(1, 'storage_items_v1')",
            [],
        )?;

        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM storage_items WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO storage_items (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), PersistenceError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM storage_items WHERE key = ?1", params![key])?;
        Ok(())
    }
}

impl StorageArea for SqliteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read(key)?)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Ok(self.write(key, value)?)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        Ok(self.delete(key)?)
    }
}
