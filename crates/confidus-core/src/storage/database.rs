//! SQLite-backed key-value store.
//!
//! A single `kv` table holds application state such as the visualisation
//! completion record. Multi-key writes run inside one transaction.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use super::{data_dir, KvStore};
use crate::error::{CoreError, DatabaseError, PersistenceError};

/// SQLite database holding the key-value namespace.
pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// File backing this database, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Open the database at `<data_dir>/confidus.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("confidus.db");
        Ok(Self::open_at(path)?)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self, DatabaseError> {
        let path = path.into();
        let conn = Connection::open(&path).map_err(|source| DatabaseError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        let db = Self {
            conn,
            path: Some(path),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn, path: None };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Set several values in one transaction.
    pub fn kv_set_many(&self, entries: &[(&str, &str)]) -> Result<(), rusqlite::Error> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare("INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)")?;
            for (key, value) in entries {
                stmt.execute(params![key, value])?;
            }
        }
        tx.commit()
    }

    /// Remove a value. Returns whether a row existed.
    pub fn kv_delete(&self, key: &str) -> Result<bool, rusqlite::Error> {
        let n = self.conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(n > 0)
    }
}

impl KvStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        self.kv_get(key).map_err(|e| PersistenceError::read(key, e))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        tracing::debug!(key, "kv set");
        self.kv_set(key, value)
            .map_err(|e| PersistenceError::write(key, e))
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), PersistenceError> {
        tracing::debug!(count = entries.len(), "kv set_many");
        self.kv_set_many(entries).map_err(|e| {
            let keys: Vec<&str> = entries.iter().map(|(k, _)| *k).collect();
            PersistenceError::write(keys.join(","), e)
        })
    }
}
