//! JSON-file backed storage adapter.
//!
//! `JsonFileAdapter` persists all entries in a single JSON file on disk: a
//! flat map of `physical key → serialized value string`, the same shape a
//! browser's localStorage exposes. Every logical key is namespaced with a
//! fixed prefix (default `vsd:`) so the file can be shared with other
//! writers without key collisions.
//!
//! ### Design
//! - One file for everything (`HashMap<String, String>` on disk).
//! - Values are stored as JSON-serialized strings, so a raw token string is
//!   written as `"\"abc\""`. An entry that no longer parses is treated as
//!   missing, never as a hard error.
//! - `clear` and `keys` only touch entries under this adapter's prefix;
//!   foreign entries in the same file are left alone.
//!
//! ### I/O characteristics & caveats
//! - Every operation reads then rewrites the entire file. Fine for the small
//!   key counts this engine deals in; route bulk data (`project:`,
//!   `response:`) to the SQLite adapter instead.
//! - File writes are not atomic.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::storage::adapter::{ExtendedStorageAdapter, StorageAdapter};

/// Storage adapter persisting to one shared JSON file under a key prefix.
pub struct JsonFileAdapter {
    /// Path to the JSON file where entries are stored.
    path: PathBuf,

    /// Namespace prefix prepended to every logical key.
    prefix: String,

    /// Serializes load-mutate-save cycles within this process.
    file_lock: Mutex<()>,
}

impl JsonFileAdapter {
    /// Creates (or opens) a JSON store at `path`, namespaced under `prefix`.
    ///
    /// If the file does not exist an empty map is written to disk.
    pub fn new(path: PathBuf, prefix: &str) -> Self {
        if !path.exists() {
            if let Err(e) = fs::write(&path, b"{}") {
                log::error!("JsonFileAdapter: cannot initialize {}: {}", path.display(), e);
            }
        }

        Self {
            path,
            prefix: prefix.to_string(),
            file_lock: Mutex::new(()),
        }
    }

    fn physical(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Loads and deserializes the full store file.
    ///
    /// Returns an empty map if the file is missing or no longer parses.
    fn load_file(&self) -> HashMap<String, String> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                log::error!("JsonFileAdapter: cannot read {}: {}", self.path.display(), e);
                return HashMap::new();
            }
        };

        serde_json::from_str(&contents).unwrap_or_default()
    }

    /// Serializes and writes the full store file (pretty-printed).
    fn save_file(&self, entries: &HashMap<String, String>) -> Result<()> {
        let contents = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, contents)
            .with_context(|| format!("writing store file {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for JsonFileAdapter {
    async fn get(&self, key: &str) -> Option<Value> {
        let _guard = self.file_lock.lock().ok()?;
        let entries = self.load_file();
        let raw = entries.get(&self.physical(key))?;

        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("JsonFileAdapter: cannot parse value for key {}: {}", key, e);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let _guard = self
            .file_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("storage lock poisoned"))?;

        let mut entries = self.load_file();
        entries.insert(self.physical(key), serde_json::to_string(value)?);

        if let Err(e) = self.save_file(&entries) {
            log::error!("JsonFileAdapter: cannot write key {}: {}", key, e);
            return Err(e);
        }
        Ok(())
    }

    async fn remove(&self, key: &str) {
        let Ok(_guard) = self.file_lock.lock() else {
            return;
        };

        let mut entries = self.load_file();
        entries.remove(&self.physical(key));

        if let Err(e) = self.save_file(&entries) {
            log::error!("JsonFileAdapter: cannot remove key {}: {}", key, e);
        }
    }

    async fn clear(&self) {
        let Ok(_guard) = self.file_lock.lock() else {
            return;
        };

        // Only this adapter's namespace; foreign entries stay.
        let mut entries = self.load_file();
        entries.retain(|k, _| !k.starts_with(&self.prefix));

        if let Err(e) = self.save_file(&entries) {
            log::error!("JsonFileAdapter: cannot clear store: {}", e);
        }
    }

    async fn keys(&self) -> Vec<String> {
        let Ok(_guard) = self.file_lock.lock() else {
            return vec![];
        };

        let mut keys: Vec<String> = self
            .load_file()
            .keys()
            .filter_map(|k| k.strip_prefix(&self.prefix).map(str::to_string))
            .collect();
        keys.sort_unstable();
        keys
    }
}

#[async_trait]
impl ExtendedStorageAdapter for JsonFileAdapter {
    async fn get_all_by_prefix(&self, prefix: &str) -> BTreeMap<String, Value> {
        let Ok(_guard) = self.file_lock.lock() else {
            return BTreeMap::new();
        };

        let physical_prefix = self.physical(prefix);
        self.load_file()
            .iter()
            .filter(|(k, _)| k.starts_with(&physical_prefix))
            .filter_map(|(k, raw)| {
                let logical = k.strip_prefix(&self.prefix)?.to_string();
                match serde_json::from_str(raw) {
                    Ok(value) => Some((logical, value)),
                    Err(e) => {
                        log::error!("JsonFileAdapter: skipping unparsable key {}: {}", k, e);
                        None
                    }
                }
            })
            .collect()
    }
}
