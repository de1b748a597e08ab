//! # State Store Port
//!
//! The one storage abstraction the sync queue, offline cache and printer
//! manager depend on.
//!
//! ## Key Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Persisted Keys                                    │
//! │                                                                         │
//! │  sync.queue            ──► JSON array of queued mutations              │
//! │  cache.menu            ──► { data, fetched_at }                        │
//! │  cache.tables          ──► { data, fetched_at }                        │
//! │  printer.last_device   ──► { id, name }                                │
//! │                                                                         │
//! │  Values are opaque strings to the store; the JSON helpers below        │
//! │  are how components read and write them.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};

/// Well-known persistence keys.
pub mod keys {
    /// Pending offline mutations.
    pub const SYNC_QUEUE: &str = "sync.queue";

    /// Last successfully connected printer.
    pub const PRINTER_LAST_DEVICE: &str = "printer.last_device";

    /// Prefix shared by all cache entries.
    pub const CACHE_PREFIX: &str = "cache.";

    /// Storage key for a cache entry (`cache.<key>`).
    pub fn cache(key: &str) -> String {
        format!("{CACHE_PREFIX}{key}")
    }
}

/// Durable key/value storage.
///
/// ## Contract
/// - `save` replaces any previous value for the key
/// - `load` of a missing key is `Ok(None)`, never an error
/// - `remove` of a missing key is a no-op
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Reads the value stored under `key`.
    async fn load(&self, key: &str) -> StoreResult<Option<String>>;

    /// Writes `value` under `key`.
    async fn save(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Deletes `key`.
    async fn remove(&self, key: &str) -> StoreResult<()>;

    /// Lists stored keys starting with `prefix`, sorted.
    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;
}

// =============================================================================
// JSON Helpers
// =============================================================================

/// Loads and decodes a JSON value.
///
/// ## Returns
/// * `Ok(None)` - Nothing stored under the key
/// * `Err(StoreError::Serialization)` - Stored document doesn't decode
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &str,
) -> StoreResult<Option<T>> {
    match store.load(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::serialization(key, e)),
        None => Ok(None),
    }
}

/// Encodes and stores a JSON value.
pub async fn save_json<T: Serialize + ?Sized>(
    store: &dyn StateStore,
    key: &str,
    value: &T,
) -> StoreResult<()> {
    let raw = serde_json::to_string(value).map_err(|e| StoreError::serialization(key, e))?;
    store.save(key, &raw).await
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Device {
        id: String,
        name: String,
    }

    #[test]
    fn test_cache_key() {
        assert_eq!(keys::cache("menu"), "cache.menu");
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        let store = MemoryStore::new();
        let device = Device {
            id: "AA:BB".to_string(),
            name: "Counter Printer".to_string(),
        };

        save_json(&store, keys::PRINTER_LAST_DEVICE, &device).await.unwrap();
        let loaded: Option<Device> = load_json(&store, keys::PRINTER_LAST_DEVICE).await.unwrap();

        assert_eq!(loaded, Some(device));
    }

    #[tokio::test]
    async fn test_load_json_missing_key() {
        let store = MemoryStore::new();
        let loaded: Option<Device> = load_json(&store, "nothing.here").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_load_json_corrupt_document() {
        let store = MemoryStore::new();
        store.save(keys::SYNC_QUEUE, "{not json").await.unwrap();

        let result: StoreResult<Option<Vec<String>>> = load_json(&store, keys::SYNC_QUEUE).await;
        assert!(matches!(result, Err(StoreError::Serialization { .. })));
    }
}
