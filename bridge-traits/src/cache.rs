//! Cache List Store Abstraction
//!
//! A cache store hands out named, ordered lists of already-decoded domain
//! objects. The core reads a list when it boots and replaces its contents
//! after each successful network page; the storage engine behind it (memory,
//! JSON files, an embedded database) belongs to the host.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// Keyed collection of cached lists.
///
/// `find_or_create` never fails just because the key is new: a missing list is
/// created empty. Implementations must return handles that observe the same
/// underlying list for the same key.
#[async_trait]
pub trait CacheStore<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    /// Look up the list stored under `key`, creating an empty one if needed.
    async fn find_or_create(&self, key: &str) -> Result<Arc<dyn CacheList<T>>>;
}

/// An ordered, named list of cached items.
#[async_trait]
pub trait CacheList<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    /// Key this list is stored under.
    fn key(&self) -> &str;

    /// Snapshot of the stored items, in insertion order.
    async fn items(&self) -> Result<Vec<T>>;

    /// Append items to the end of the list.
    async fn add(&self, items: &[T]) -> Result<()>;

    /// Remove every item from the list.
    async fn clear(&self) -> Result<()>;
}
