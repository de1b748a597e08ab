//! # Offline Cache
//!
//! TTL snapshots of read-mostly API data (menu, tables, settings) so the
//! billing screens keep working offline.
//!
//! ## Read Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Cache Lookup                                    │
//! │                                                                         │
//! │  online?  ── yes ──► get_fresh(key) ── hit ──► use it                   │
//! │     │                     │                                             │
//! │     │                    miss ──► fetch from API ──► put(key, data)     │
//! │     │                                                                   │
//! │     └── no ──► get_stale(key) ── hit ──► use it, show "offline" badge   │
//! │                      │                                                  │
//! │                     miss ──► nothing to show                            │
//! │                                                                         │
//! │  A synced mutation on `orders.*` invalidates every `cache.orders*`     │
//! │  entry so the next online read refetches.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use restobill_store::{keys, load_json, save_json, StateStore};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::CacheSettings;
use crate::error::SyncResult;

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    data: serde_json::Value,
    fetched_at: DateTime<Utc>,
}

/// A cached value together with its age.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub data: T,
    pub fetched_at: DateTime<Utc>,
    /// Older than the TTL.
    pub is_stale: bool,
}

/// Snapshot cache persisted under `cache.<key>`.
pub struct OfflineCache {
    store: Arc<dyn StateStore>,
    ttl: Duration,
}

impl OfflineCache {
    pub fn new(store: Arc<dyn StateStore>, settings: &CacheSettings) -> Self {
        let ttl = i64::try_from(settings.ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);

        OfflineCache { store, ttl }
    }

    /// Stores a snapshot fetched just now.
    pub async fn put<T: Serialize + Sync>(&self, key: &str, data: &T) -> SyncResult<()> {
        self.put_at(key, data, Utc::now()).await
    }

    /// Stores a snapshot with an explicit fetch time (e.g. the server's).
    pub async fn put_at<T: Serialize + Sync>(
        &self,
        key: &str,
        data: &T,
        fetched_at: DateTime<Utc>,
    ) -> SyncResult<()> {
        let entry = CacheEntry {
            data: serde_json::to_value(data)?,
            fetched_at,
        };

        save_json(self.store.as_ref(), &keys::cache(key), &entry).await?;
        debug!(key = %key, "Cached snapshot");
        Ok(())
    }

    /// Returns the snapshot only if it is younger than the TTL.
    pub async fn get_fresh<T: DeserializeOwned>(&self, key: &str) -> SyncResult<Option<T>> {
        Ok(self
            .get_stale(key)
            .await?
            .filter(|cached| !cached.is_stale)
            .map(|cached| cached.data))
    }

    /// Returns the snapshot regardless of age (offline fallback).
    ///
    /// An entry that no longer decodes as `T` is treated as a miss.
    pub async fn get_stale<T: DeserializeOwned>(&self, key: &str) -> SyncResult<Option<Cached<T>>> {
        let entry: Option<CacheEntry> = match load_json(self.store.as_ref(), &keys::cache(key)).await
        {
            Ok(entry) => entry,
            Err(restobill_store::StoreError::Serialization { message, .. }) => {
                warn!(key = %key, error = %message, "Ignoring unreadable cache entry");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let Some(entry) = entry else {
            return Ok(None);
        };

        let data = match serde_json::from_value(entry.data) {
            Ok(data) => data,
            Err(e) => {
                warn!(key = %key, error = %e, "Cached snapshot has an unexpected shape");
                return Ok(None);
            }
        };

        Ok(Some(Cached {
            data,
            fetched_at: entry.fetched_at,
            is_stale: Utc::now() - entry.fetched_at >= self.ttl,
        }))
    }

    /// Drops one entry.
    pub async fn invalidate(&self, key: &str) -> SyncResult<()> {
        self.store.remove(&keys::cache(key)).await?;
        debug!(key = %key, "Cache entry invalidated");
        Ok(())
    }

    /// Drops every entry whose key starts with `prefix`. Returns how many.
    pub async fn invalidate_prefix(&self, prefix: &str) -> SyncResult<usize> {
        let stored = self.store.keys_with_prefix(&keys::cache(prefix)).await?;

        for key in &stored {
            self.store.remove(key).await?;
        }

        if !stored.is_empty() {
            debug!(prefix = %prefix, count = stored.len(), "Cache entries invalidated");
        }

        Ok(stored.len())
    }
}
