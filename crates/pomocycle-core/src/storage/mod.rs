mod config;
pub mod database;
pub mod migrations;
pub mod session_store;
pub mod write_behind;

pub use config::TimerConfiguration;
pub use database::Database;
pub use session_store::{keys, SessionStore};
pub use write_behind::WriteBehindStore;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::PersistenceError;

/// Durable key/value store the timer persists into.
///
/// Values are JSON documents. Implementations may acknowledge writes before
/// they are durable (see [`WriteBehindStore`]).
pub trait KvStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

impl<S: KvStore + ?Sized> KvStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        (**self).set(key, value)
    }
}

/// In-process store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Returns the data directory.
///
/// `POMOCYCLE_DATA_DIR` wins when set; otherwise `~/.config/pomocycle`, or
/// `~/.config/pomocycle-dev` with `POMOCYCLE_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("POMOCYCLE_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("POMOCYCLE_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("pomocycle-dev")
            } else {
                base_dir.join("pomocycle")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_clones_share_values() {
        let store = MemoryStore::new();
        let view = store.clone();
        assert!(store.get("phase").unwrap().is_none());

        store.set("phase", "\"WORK\"").unwrap();
        assert_eq!(view.get("phase").unwrap().as_deref(), Some("\"WORK\""));
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn boxed_store_forwards() {
        let inner = MemoryStore::new();
        let boxed: Box<dyn KvStore> = Box::new(inner.clone());
        boxed.set("currentCycle", "3").unwrap();
        assert_eq!(inner.get("currentCycle").unwrap().as_deref(), Some("3"));
    }
}
