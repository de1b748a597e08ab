//! # In-Memory Store
//!
//! `StateStore` backed by a `HashMap`, for tests and for running without a
//! database file.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreResult;
use crate::store::StateStore;

/// Volatile key/value store.
///
/// Clones share the same map, so a test can hand one clone to a component
/// and inspect what it persisted through the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, value: &str) -> StoreResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_load_remove() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);

        store.save("cache.menu", "[]").await.unwrap();
        store.save("cache.menu", "[1]").await.unwrap();
        assert_eq!(store.load("cache.menu").await.unwrap().as_deref(), Some("[1]"));
        assert_eq!(store.len().await, 1);

        store.remove("cache.menu").await.unwrap();
        store.remove("cache.menu").await.unwrap();
        assert!(store.load("cache.menu").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_with_prefix() {
        let store = MemoryStore::new();
        store.save("cache.tables", "{}").await.unwrap();
        store.save("cache.menu", "{}").await.unwrap();
        store.save("sync.queue", "[]").await.unwrap();

        let keys = store.keys_with_prefix("cache.").await.unwrap();
        assert_eq!(keys, vec!["cache.menu", "cache.tables"]);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.save("printer.last_device", "{}").await.unwrap();
        assert!(other.load("printer.last_device").await.unwrap().is_some());
    }
}
