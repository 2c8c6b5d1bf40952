//! Storage system for the story-form engine.
//!
//! This module defines the traits, types, and implementations that persist
//! the engine's key/value data. It provides an in-memory backend, a JSON
//! file backend, a SQLite backend, and a hybrid façade that routes between
//! two backends by key prefix.
//!
//! # Concepts
//!
//! The engine separates storage into two physical categories:
//!
//! - **Local storage**: small, frequently-read session keys (`auth:token`,
//!   `auth:user`, `user:{id}`, `team:{id}`). Backed by [`JsonFileAdapter`].
//! - **Indexed storage**: bulk wizard data (`project:{id}`, `response:*`).
//!   Backed by [`SqliteAdapter`] with named object stores.
//!
//! All backends implement the [`StorageAdapter`] trait (`get`, `set`,
//! `remove`, `clear`, `keys`); backends that can enumerate by key prefix
//! additionally implement [`ExtendedStorageAdapter`].
//!
//! A [`HybridStorage`] wraps one backend of each category behind a single
//! handle; which backend serves a key is decided by an immutable prefix set
//! chosen at construction. Callers only ever see logical keys.
//!
//! # Choosing a backend
//!
//! - For the durable default, use [`HybridStorage::open`] with a
//!   [`StorageConfig`](crate::config::StorageConfig).
//! - For tests or ephemeral sessions, use [`InMemoryAdapter`] for both sides.
//!
//! # Example: routing by key prefix
//!
//! ```no_run
//! use std::sync::Arc;
//! use storyform_engine::storage::{HybridStorage, InMemoryAdapter};
//!
//! let hybrid = HybridStorage::new(
//!     Arc::new(InMemoryAdapter::new()),
//!     Arc::new(InMemoryAdapter::new()),
//!     vec!["project:".to_string(), "response:".to_string()],
//! );
//! assert!(hybrid.uses_indexed("project:p1"));
//! assert!(!hybrid.uses_indexed("auth:token"));
//! ```

/// Adapter module, defining the key/value storage contract.
pub mod adapter;
/// Hybrid module, routing between two backends by key prefix.
pub mod hybrid;
/// JSON-file backed storage adapter.
pub mod json_store;
/// In-memory storage adapter.
pub mod memory;
/// SQLite-backed storage adapter with named stores.
#[cfg(feature = "sqlite_store")]
pub mod sqlite_store;

pub use adapter::{ExtendedStorageAdapter, StorageAdapter, StorageHandle};
pub use hybrid::HybridStorage;
pub use json_store::JsonFileAdapter;
pub use memory::InMemoryAdapter;
#[cfg(feature = "sqlite_store")]
pub use sqlite_store::SqliteAdapter;
