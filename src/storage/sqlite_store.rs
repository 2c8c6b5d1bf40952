use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::rusqlite::{params, OpenFlags};
use r2d2_sqlite::SqliteConnectionManager;
use serde_json::Value;

use crate::config::StoreBinding;
use crate::storage::adapter::{ExtendedStorageAdapter, StorageAdapter};

/// SQLite-backed storage adapter with named object stores.
///
/// All stores share one database file; each entry is tagged with the store
/// that owns it. A key is assigned to a store by testing every registered
/// prefix in registration order. First match wins; keys no prefix claims
/// fall back to the first registered store.
pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
    stores: Vec<StoreBinding>,
}

impl SqliteAdapter {
    /// Creates a new SQLite store at `path` with the given store bindings.
    pub fn new(path: &Path, stores: Vec<StoreBinding>) -> Result<Self> {
        if stores.is_empty() {
            anyhow::bail!("at least one store binding is required");
        }

        let manager = SqliteConnectionManager::file(path)
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_WRITE |
                    OpenFlags::SQLITE_OPEN_CREATE |
                    OpenFlags::SQLITE_OPEN_URI
            )
            .with_init(|c| {
                c.busy_timeout(Duration::from_millis(500))?;
                c.pragma_update(None, "journal_mode", &"WAL")?;
                c.execute_batch(
                    "CREATE TABLE IF NOT EXISTS entries (
                        store TEXT NOT NULL,
                        key TEXT NOT NULL,
                        value TEXT NOT NULL,
                        updated_at INTEGER NOT NULL DEFAULT (strftime('%s','now')),
                        PRIMARY KEY(store, key)
                    );"
                )?;
                Ok(())
            });

        let pool = Pool::builder()
            .max_size(16)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)?;

        Ok(Self { pool, stores })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Store owning `key`: first registered prefix that matches, else the
    /// first (default) store.
    fn store_for(&self, key: &str) -> &str {
        for binding in &self.stores {
            if binding.prefixes.iter().any(|p| key.starts_with(p.as_str())) {
                return &binding.name;
            }
        }
        &self.stores[0].name
    }
}

#[async_trait]
impl StorageAdapter for SqliteAdapter {
    async fn get(&self, key: &str) -> Option<Value> {
        let conn = self.conn().ok()?;
        let raw = match conn.query_row(
            "SELECT value FROM entries WHERE store=?1 AND key=?2",
            params![self.store_for(key), key],
            |row| row.get::<_, String>(0),
        ) {
            Ok(raw) => raw,
            Err(r2d2_sqlite::rusqlite::Error::QueryReturnedNoRows) => return None,
            Err(e) => {
                log::error!("SqliteAdapter: cannot read key {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("SqliteAdapter: cannot parse value for key {}: {}", key, e);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let result = (|| -> Result<()> {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO entries(store,key,value) VALUES (?1,?2,?3)
                 ON CONFLICT(store,key) DO UPDATE
                 SET value=excluded.value, updated_at=strftime('%s','now')",
                params![self.store_for(key), key, serde_json::to_string(value)?],
            )?;
            Ok(())
        })();

        if let Err(ref e) = result {
            log::error!("SqliteAdapter: cannot write key {}: {}", key, e);
        }
        result
    }

    async fn remove(&self, key: &str) {
        let result = (|| -> Result<()> {
            let conn = self.conn()?;
            conn.execute(
                "DELETE FROM entries WHERE store=?1 AND key=?2",
                params![self.store_for(key), key],
            )?;
            Ok(())
        })();

        if let Err(e) = result {
            log::error!("SqliteAdapter: cannot remove key {}: {}", key, e);
        }
    }

    async fn clear(&self) {
        let result = (|| -> Result<()> {
            let conn = self.conn()?;
            conn.execute("DELETE FROM entries", [])?;
            Ok(())
        })();

        if let Err(e) = result {
            log::error!("SqliteAdapter: cannot clear store: {}", e);
        }
    }

    async fn keys(&self) -> Vec<String> {
        let conn = match self.conn() { Ok(c) => c, Err(_) => return vec![] };
        let mut stmt = match conn.prepare(
            "SELECT key FROM entries WHERE store=?1 ORDER BY key",
        ) { Ok(s) => s, Err(_) => return vec![] };

        // Per-store key lists concatenated in registration order.
        let mut all = Vec::new();
        for binding in &self.stores {
            let rows = match stmt.query_map(params![binding.name], |row| row.get::<_, String>(0)) {
                Ok(r) => r,
                Err(_) => continue,
            };
            all.extend(rows.filter_map(Result::ok));
        }
        all
    }
}

#[async_trait]
impl ExtendedStorageAdapter for SqliteAdapter {
    async fn get_all_by_prefix(&self, prefix: &str) -> BTreeMap<String, Value> {
        // Scan all keys, then read each match through the normal routed get,
        // skipping entries that disappeared or no longer parse.
        let mut out = BTreeMap::new();
        for key in self.keys().await {
            if !key.starts_with(prefix) {
                continue;
            }
            if let Some(value) = self.get(&key).await {
                out.insert(key, value);
            }
        }
        out
    }
}
