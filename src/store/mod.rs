//! Pluggable storage for Routes and Certificates: a small byte-oriented
//! [`StorageBackend`] trait with swappable backends (in-memory, file-based
//! JSON, Redis behind a feature flag), and a typed domain layer
//! ([`RouteStore`]) on top that serialises into it under `route:`/`cert:`
//! key prefixes — the same shape this lineage uses for its own certificate
//! bundle store.
pub mod file;
pub mod memory;
pub mod route_store;

#[cfg(feature = "redis")]
pub mod redis;

use crate::error::Result;
use async_trait::async_trait;

/// A trait defining the interface for all storage backends.
/// Implementations must be thread-safe and support asynchronous operations.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Stores a binary value associated with the given key.
    async fn store(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Loads a binary value by its key. Returns `None` if the key does not exist.
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Deletes the value associated with the given key.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Lists all keys that start with the specified prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Blanket implementation for `Arc<T>` to allow easy sharing of storage backends.
#[async_trait]
impl<T: StorageBackend + ?Sized> StorageBackend for std::sync::Arc<T> {
    async fn store(&self, key: &str, value: &[u8]) -> Result<()> {
        (**self).store(key, value).await
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).load(key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        (**self).list(prefix).await
    }
}

pub use file::FileStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "redis")]
pub use redis::RedisStorage;
pub use route_store::RouteStore;
