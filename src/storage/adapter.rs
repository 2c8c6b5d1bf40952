use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Object-safe key/value storage backend.
///
/// Failure policy is part of the contract: reads degrade (a backend failure
/// looks like a missing key), `remove`/`clear` swallow errors after logging,
/// and only `set` surfaces an error to the caller.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Retrieves the value for `key`, or `None` if missing or unreadable.
    async fn get(&self, key: &str) -> Option<Value>;

    /// Stores `value` under `key`, overwriting any existing value.
    async fn set(&self, key: &str, value: &Value) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str);

    /// Removes every key this adapter owns.
    async fn clear(&self);

    /// Returns all keys this adapter owns.
    async fn keys(&self) -> Vec<String>;
}

/// Storage backend that can also enumerate values under a key prefix.
#[async_trait]
pub trait ExtendedStorageAdapter: StorageAdapter {
    /// Returns every `key → value` pair whose key starts with `prefix`.
    /// Unreadable entries are skipped.
    async fn get_all_by_prefix(&self, prefix: &str) -> BTreeMap<String, Value>;
}

/// Shared handle to a storage backend.
pub type StorageHandle = Arc<dyn ExtendedStorageAdapter>;
