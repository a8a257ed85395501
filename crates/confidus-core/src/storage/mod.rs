mod config;
pub mod database;
mod memory;

pub use config::{Config, PromptsConfig, SequenceConfig, SequenceVariant};
pub use database::Database;
pub use memory::MemoryStore;

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{ConfigError, PersistenceError};

/// String-keyed, string-valued persistence provider.
///
/// One operation at a time from the caller's perspective; implementations
/// need not be safe against concurrent writers.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    /// Write every entry or none of them.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), PersistenceError>;
}

impl<S: KvStore + ?Sized> KvStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        (**self).set(key, value)
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), PersistenceError> {
        (**self).set_many(entries)
    }
}

impl<S: KvStore + ?Sized> KvStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        (**self).set(key, value)
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), PersistenceError> {
        (**self).set_many(entries)
    }
}

/// Returns the data directory, creating it if needed.
///
/// `CONFIDUS_DATA_DIR` wins when set. Otherwise `~/.config/confidus/`, or
/// `~/.config/confidus-dev/` with `CONFIDUS_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("CONFIDUS_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("CONFIDUS_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("confidus-dev")
            } else {
                base_dir.join("confidus")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
