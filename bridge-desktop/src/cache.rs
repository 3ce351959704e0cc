//! Cache list stores for desktop hosts.
//!
//! [`MemoryCacheStore`] keeps lists in process memory and is what tests and
//! short-lived tools use. [`JsonFileCacheStore`] keeps one JSON array per key
//! inside a directory, so cached topics survive a restart.

use async_trait::async_trait;
use bridge_traits::{
    cache::{CacheList, CacheStore},
    error::{BridgeError, Result},
};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

// ============================================================================
// In-memory store
// ============================================================================

/// In-memory [`CacheStore`]. Handles for the same key share one list.
pub struct MemoryCacheStore<T> {
    lists: RwLock<HashMap<String, Arc<MemoryCacheList<T>>>>,
}

impl<T> MemoryCacheStore<T> {
    pub fn new() -> Self {
        Self {
            lists: RwLock::new(HashMap::new()),
        }
    }

    /// Pre-populate `key` with `items`, replacing whatever was there.
    pub fn seed(&self, key: &str, items: Vec<T>) {
        let list = self.list(key);
        *list.items.write() = items;
    }

    fn list(&self, key: &str) -> Arc<MemoryCacheList<T>> {
        if let Some(list) = self.lists.read().get(key) {
            return Arc::clone(list);
        }
        let mut lists = self.lists.write();
        Arc::clone(lists.entry(key.to_string()).or_insert_with(|| {
            Arc::new(MemoryCacheList {
                key: key.to_string(),
                items: RwLock::new(Vec::new()),
            })
        }))
    }
}

impl<T> Default for MemoryCacheStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> CacheStore<T> for MemoryCacheStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn find_or_create(&self, key: &str) -> Result<Arc<dyn CacheList<T>>> {
        let list: Arc<dyn CacheList<T>> = self.list(key);
        Ok(list)
    }
}

/// A single list inside a [`MemoryCacheStore`].
pub struct MemoryCacheList<T> {
    key: String,
    items: RwLock<Vec<T>>,
}

#[async_trait]
impl<T> CacheList<T> for MemoryCacheList<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn key(&self) -> &str {
        &self.key
    }

    async fn items(&self) -> Result<Vec<T>> {
        Ok(self.items.read().clone())
    }

    async fn add(&self, items: &[T]) -> Result<()> {
        self.items.write().extend_from_slice(items);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.items.write().clear();
        Ok(())
    }
}

// ============================================================================
// JSON file store
// ============================================================================

/// [`CacheStore`] writing each list to `<dir>/<key>.json`.
///
/// Keys are percent-encoded into the file name, so distinct keys never share
/// a file. Writes go through a per-file lock and land via a temp file plus
/// rename, so a reader never sees a half-written list.
pub struct JsonFileCacheStore<T> {
    dir: PathBuf,
    locks: RwLock<HashMap<PathBuf, Arc<Mutex<()>>>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFileCacheStore<T> {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: RwLock::new(HashMap::new()),
            _marker: PhantomData,
        }
    }

    /// Directory the list files live in.
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().get(path) {
            return Arc::clone(lock);
        }
        let mut locks = self.locks.write();
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }
}

#[async_trait]
impl<T> CacheStore<T> for JsonFileCacheStore<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn find_or_create(&self, key: &str) -> Result<Arc<dyn CacheList<T>>> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(key);
        let lock = self.lock_for(&path);
        {
            let _guard = lock.lock().await;
            match fs::metadata(&path).await {
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    write_items::<T>(&path, &[]).await?;
                    debug!(key, path = ?path, "Created cache list file");
                }
                Err(e) => return Err(BridgeError::Io(e)),
            }
        }

        let list: Arc<dyn CacheList<T>> = Arc::new(JsonFileCacheList {
            key: key.to_string(),
            path,
            lock,
            _marker: PhantomData,
        });
        Ok(list)
    }
}

/// A single list file inside a [`JsonFileCacheStore`].
pub struct JsonFileCacheList<T> {
    key: String,
    path: PathBuf,
    lock: Arc<Mutex<()>>,
    _marker: PhantomData<fn() -> T>,
}

async fn read_items<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    match fs::read(path).await {
        Ok(bytes) if bytes.is_empty() => Ok(Vec::new()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
            BridgeError::Cache(format!("Corrupt cache file {}: {}", path.display(), e))
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(BridgeError::Io(e)),
    }
}

/// Callers hold the list lock; the temp file name is only used under it.
async fn write_items<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let bytes = serde_json::to_vec(items)
        .map_err(|e| BridgeError::Cache(format!("Failed to encode cache list: {}", e)))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, bytes).await?;
    fs::rename(&tmp_path, path).await?;
    Ok(())
}

#[async_trait]
impl<T> CacheList<T> for JsonFileCacheList<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn key(&self) -> &str {
        &self.key
    }

    async fn items(&self) -> Result<Vec<T>> {
        let _guard = self.lock.lock().await;
        read_items(&self.path).await
    }

    async fn add(&self, items: &[T]) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut stored: Vec<T> = read_items(&self.path).await?;
        stored.extend_from_slice(items);
        write_items(&self.path, &stored).await
    }

    async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        write_items::<T>(&self.path, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_shares_list_per_key() {
        let store = MemoryCacheStore::<String>::new();
        let first = store.find_or_create("topics").await.unwrap();
        let second = store.find_or_create("topics").await.unwrap();

        first.add(&["rock".to_string()]).await.unwrap();

        assert_eq!(second.items().await.unwrap(), vec!["rock".to_string()]);
        assert_eq!(second.key(), "topics");
    }

    #[tokio::test]
    async fn test_memory_store_clear_then_add() {
        let store = MemoryCacheStore::<u32>::new();
        store.seed("numbers", vec![1, 2]);

        let list = store.find_or_create("numbers").await.unwrap();
        list.clear().await.unwrap();
        list.add(&[3, 4, 5]).await.unwrap();

        assert_eq!(list.items().await.unwrap(), vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn test_memory_store_keys_are_independent() {
        let store = MemoryCacheStore::<u32>::new();
        store.seed("a", vec![1]);

        let other = store.find_or_create("b").await.unwrap();
        assert!(other.items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_json_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        {
            let store = JsonFileCacheStore::<String>::new(dir.path());
            let list = store.find_or_create("topics").await.unwrap();
            list.add(&["jazz".to_string(), "soul".to_string()])
                .await
                .unwrap();
        }

        let store = JsonFileCacheStore::<String>::new(dir.path());
        let list = store.find_or_create("topics").await.unwrap();
        assert_eq!(
            list.items().await.unwrap(),
            vec!["jazz".to_string(), "soul".to_string()]
        );

        list.clear().await.unwrap();
        assert!(list.items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_json_store_encodes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileCacheStore::<u32>::new(dir.path());
        store.find_or_create("feed/http://x").await.unwrap();

        assert!(dir.path().join("feed%2Fhttp%3A%2F%2Fx.json").exists());
    }

    #[tokio::test]
    async fn test_json_store_similar_keys_do_not_share_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileCacheStore::<u32>::new(dir.path());

        let slashed = store.find_or_create("feed/a").await.unwrap();
        slashed.add(&[1, 2]).await.unwrap();

        let underscored = store.find_or_create("feed_a").await.unwrap();
        assert!(underscored.items().await.unwrap().is_empty());
        underscored.add(&[3]).await.unwrap();

        assert_eq!(slashed.items().await.unwrap(), vec![1, 2]);
        assert_eq!(underscored.items().await.unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_json_store_locks_per_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileCacheStore::<u32>::new(dir.path());

        let first = store.lock_for(&store.path_for("topics"));
        let second = store.lock_for(&store.path_for("topics"));
        let other = store.lock_for(&store.path_for("topics/v2"));

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[tokio::test]
    async fn test_json_store_writes_leave_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileCacheStore::<u32>::new(dir.path());
        let list = store.find_or_create("topics").await.unwrap();

        list.add(&[1]).await.unwrap();
        list.clear().await.unwrap();
        list.add(&[2, 3]).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["topics.json".to_string()]);
        assert_eq!(list.items().await.unwrap(), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_json_store_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("topics.json"), b"[7, 8]").unwrap();

        let store = JsonFileCacheStore::<u32>::new(dir.path());
        let list = store.find_or_create("topics").await.unwrap();
        assert_eq!(list.items().await.unwrap(), vec![7, 8]);
    }

    #[tokio::test]
    async fn test_json_store_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("topics.json"), b"{not json").unwrap();

        let store = JsonFileCacheStore::<u32>::new(dir.path());
        let list = store.find_or_create("topics").await.unwrap();

        assert!(matches!(list.items().await, Err(BridgeError::Cache(_))));
    }
}
