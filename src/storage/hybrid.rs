//! Two-backend storage façade.
//!
//! `HybridStorage` owns a JSON-file backend for small frequently-read keys
//! (`auth:*`, `user:*`, `team:*`) and an indexed backend for bulk data
//! (`project:*`, `response:*`). Which backend serves a key is a pure
//! function of the key string: a fixed prefix set, chosen at construction
//! and immutable afterwards. Callers never learn which backend they hit.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::config::StorageConfig;
use crate::storage::adapter::{ExtendedStorageAdapter, StorageAdapter, StorageHandle};
use crate::storage::json_store::JsonFileAdapter;

pub struct HybridStorage {
    local: StorageHandle,
    indexed: StorageHandle,
    /// Key prefixes served by the indexed backend.
    routes: Vec<String>,
}

impl HybridStorage {
    /// Composes two existing backends. `routes` lists the key prefixes the
    /// indexed backend serves; everything else goes to `local`.
    pub fn new(local: StorageHandle, indexed: StorageHandle, routes: Vec<String>) -> Self {
        Self { local, indexed, routes }
    }

    /// Opens the on-disk backends described by `config`: a JSON file for the
    /// local side and a SQLite database for the indexed side.
    #[cfg(feature = "sqlite_store")]
    pub fn open(config: &StorageConfig) -> Result<Self> {
        use crate::storage::sqlite_store::SqliteAdapter;

        std::fs::create_dir_all(&config.data_dir)?;

        let local = Arc::new(JsonFileAdapter::new(config.json_path(), &config.local_prefix));
        let indexed = Arc::new(SqliteAdapter::new(&config.db_path(), config.stores.clone())?);

        Ok(Self::new(local, indexed, config.indexed_prefixes.clone()))
    }

    /// Without the SQLite backend the indexed side is ephemeral.
    #[cfg(not(feature = "sqlite_store"))]
    pub fn open(config: &StorageConfig) -> Result<Self> {
        use crate::storage::memory::InMemoryAdapter;

        std::fs::create_dir_all(&config.data_dir)?;
        log::warn!("HybridStorage: sqlite_store feature disabled, indexed keys will not persist");

        let local = Arc::new(JsonFileAdapter::new(config.json_path(), &config.local_prefix));
        let indexed = Arc::new(InMemoryAdapter::new());

        Ok(Self::new(local, indexed, config.indexed_prefixes.clone()))
    }

    /// The routing predicate: true when `key` is served by the indexed backend.
    pub fn uses_indexed(&self, key: &str) -> bool {
        self.routes.iter().any(|p| key.starts_with(p.as_str()))
    }

    fn backend_for(&self, key: &str) -> &StorageHandle {
        if self.uses_indexed(key) {
            &self.indexed
        } else {
            &self.local
        }
    }
}

#[async_trait]
impl StorageAdapter for HybridStorage {
    async fn get(&self, key: &str) -> Option<Value> {
        self.backend_for(key).get(key).await
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        self.backend_for(key).set(key, value).await
    }

    async fn remove(&self, key: &str) {
        self.backend_for(key).remove(key).await
    }

    async fn clear(&self) {
        self.local.clear().await;
        self.indexed.clear().await;
    }

    async fn keys(&self) -> Vec<String> {
        // Key-spaces are disjoint by construction, so plain concatenation
        // (local first) cannot produce duplicates.
        let mut keys = self.local.keys().await;
        keys.extend(self.indexed.keys().await);
        keys
    }
}

#[async_trait]
impl ExtendedStorageAdapter for HybridStorage {
    /// Enumerates by prefix on the backend the *prefix itself* routes to.
    /// A prefix whose keys would span both backends is unsupported; the
    /// routing table keeps each prefix wholly on one side.
    async fn get_all_by_prefix(&self, prefix: &str) -> BTreeMap<String, Value> {
        self.backend_for(prefix).get_all_by_prefix(prefix).await
    }
}
