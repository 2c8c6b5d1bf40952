use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::storage::adapter::{ExtendedStorageAdapter, StorageAdapter};

/// In-memory storage (no persistence). Used for tests and ephemeral sessions
/// where nothing should outlive the process.
#[derive(Default)]
pub struct InMemoryAdapter {
    map: RwLock<HashMap<String, Value>>,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageAdapter for InMemoryAdapter {
    async fn get(&self, key: &str) -> Option<Value> {
        self.map.read().ok()?.get(key).cloned()
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        self.map
            .write()
            .map_err(|_| anyhow::anyhow!("storage lock poisoned"))?
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) {
        if let Ok(mut map) = self.map.write() {
            map.remove(key);
        }
    }

    async fn clear(&self) {
        if let Ok(mut map) = self.map.write() {
            map.clear();
        }
    }

    async fn keys(&self) -> Vec<String> {
        let mut v: Vec<String> = match self.map.read() {
            Ok(map) => map.keys().cloned().collect(),
            Err(_) => return vec![],
        };
        v.sort_unstable(); // stable order for deterministic tests
        v
    }
}

#[async_trait]
impl ExtendedStorageAdapter for InMemoryAdapter {
    async fn get_all_by_prefix(&self, prefix: &str) -> BTreeMap<String, Value> {
        match self.map.read() {
            Ok(map) => map
                .iter()
                .filter(|(k, _)| k.starts_with(prefix))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            Err(_) => BTreeMap::new(),
        }
    }
}
