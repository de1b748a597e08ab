//! # Sync Service
//!
//! The online/offline orchestration the UI talks to.
//!
//! ## Submit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        submit(action, payload)                          │
//! │                                                                         │
//! │  offline ─────────────────────────────────────► enqueue ► Queued        │
//! │                                                                         │
//! │  online ──► transport.replay                                            │
//! │                 │                                                       │
//! │                 ├── Ok ───────────► invalidate cache.<resource> ► Sent  │
//! │                 ├── Err(retryable) ► enqueue ─────────────────► Queued  │
//! │                 └── Err(permanent) ► Err(Rejected), NOT queued          │
//! │                                                                         │
//! │  set_online(true)  ──► drain queue, invalidate synced resources         │
//! │  set_online(false) ──► flip flag only                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::OfflineCache;
use crate::error::{SyncError, SyncResult};
use crate::events::{NoOpEmitter, SyncEventEmitter, SyncStatus};
use crate::queue::{DrainReport, OfflineSyncQueue, QueueItem};
use crate::transport::SyncTransport;

/// What happened to a submitted mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Accepted by the server.
    Sent,
    /// Stored for replay when connectivity returns.
    Queued(QueueItem),
}

#[derive(Debug, Default)]
struct DrainState {
    last_drain_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Routes mutations to the server or the offline queue.
pub struct SyncService {
    queue: Arc<OfflineSyncQueue>,
    transport: Arc<dyn SyncTransport>,
    cache: Option<Arc<OfflineCache>>,
    emitter: Arc<dyn SyncEventEmitter>,
    online: AtomicBool,
    state: RwLock<DrainState>,
}

impl SyncService {
    /// Creates a service that starts offline.
    pub fn new(queue: Arc<OfflineSyncQueue>, transport: Arc<dyn SyncTransport>) -> Self {
        SyncService {
            queue,
            transport,
            cache: None,
            emitter: Arc::new(NoOpEmitter),
            online: AtomicBool::new(false),
            state: RwLock::new(DrainState::default()),
        }
    }

    /// Invalidates this cache after successful replays.
    pub fn with_cache(mut self, cache: Arc<OfflineCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the event emitter.
    pub fn with_emitter(mut self, emitter: Arc<dyn SyncEventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    pub fn queue(&self) -> &OfflineSyncQueue {
        &self.queue
    }

    /// Sends a mutation now if possible, otherwise queues it.
    ///
    /// ## Errors
    /// - `Rejected` when the server refuses it outright (not queued)
    /// - `QueueFull` when it must be queued and the queue rejects it
    pub async fn submit(
        &self,
        action: impl Into<String>,
        payload: serde_json::Value,
    ) -> SyncResult<SubmitOutcome> {
        let item = QueueItem::new(action, payload);

        if !self.is_online() {
            debug!(action = %item.action, "Offline, queuing mutation");
            return self.queue_item(item).await;
        }

        match self.transport.replay(&item).await {
            Ok(()) => {
                debug!(action = %item.action, "Mutation sent");
                self.invalidate_resources([item.resource()]).await;
                Ok(SubmitOutcome::Sent)
            }
            Err(err) if err.retryable => {
                warn!(action = %item.action, error = %err, "Send failed, queuing mutation");
                self.queue_item(item).await
            }
            Err(err) => {
                warn!(action = %item.action, error = %err, "Server rejected mutation");
                Err(SyncError::Rejected {
                    action: item.action,
                    reason: err.message,
                })
            }
        }
    }

    /// Records a connectivity change. Coming online drains the queue.
    pub async fn set_online(&self, online: bool) -> Option<DrainReport> {
        let was_online = self.online.swap(online, Ordering::AcqRel);
        if was_online != online {
            info!(online, "Connectivity changed");
        }

        if online {
            Some(self.drain_now().await)
        } else {
            self.emit_status().await;
            None
        }
    }

    /// Drains the queue immediately.
    pub async fn drain_now(&self) -> DrainReport {
        let report = self.queue.drain(self.transport.as_ref()).await;
        if report.skipped {
            return report;
        }

        let resources: BTreeSet<&str> = report.synced.iter().map(QueueItem::resource).collect();
        self.invalidate_resources(resources).await;

        {
            let mut state = self.state.write().await;
            state.last_drain_at = Some(Utc::now());
            state.last_error = if report.auth_required {
                Some("server refused credentials".to_string())
            } else {
                report.failed.last().map(|f| f.error.clone()).or_else(|| {
                    (report.retried > 0).then(|| "some mutations will be retried".to_string())
                })
            };
        }

        self.emit_status().await;
        report
    }

    /// Snapshot for the status bar.
    pub async fn status(&self) -> SyncStatus {
        let state = self.state.read().await;
        SyncStatus {
            online: self.is_online(),
            pending: self.queue.len().await,
            draining: self.queue.is_draining(),
            last_drain_at: state.last_drain_at,
            last_error: state.last_error.clone(),
        }
    }

    async fn queue_item(&self, item: QueueItem) -> SyncResult<SubmitOutcome> {
        self.queue.enqueue_item(item.clone()).await?;
        self.emit_status().await;
        Ok(SubmitOutcome::Queued(item))
    }

    async fn invalidate_resources<'a>(&self, resources: impl IntoIterator<Item = &'a str>) {
        let Some(cache) = &self.cache else {
            return;
        };

        for resource in resources {
            if let Err(e) = cache.invalidate_prefix(resource).await {
                warn!(resource = %resource, error = %e, "Cache invalidation failed");
            }
        }
    }

    async fn emit_status(&self) {
        let status = self.status().await;
        self.emitter.emit_status(&status);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheSettings, QueueSettings};
    use crate::testing::{init_tracing, RecordingEmitter, ScriptedTransport};
    use crate::transport::TransportError;
    use restobill_store::MemoryStore;
    use serde_json::json;

    struct Harness {
        service: SyncService,
        transport: Arc<ScriptedTransport>,
        cache: Arc<OfflineCache>,
        emitter: Arc<RecordingEmitter>,
    }

    fn harness() -> Harness {
        init_tracing();
        let store = Arc::new(MemoryStore::new());
        let emitter = Arc::new(RecordingEmitter::default());
        let queue = Arc::new(
            OfflineSyncQueue::new(store.clone(), QueueSettings::default())
                .with_emitter(emitter.clone()),
        );
        let cache = Arc::new(OfflineCache::new(store, &CacheSettings::default()));
        let transport = Arc::new(ScriptedTransport::new());

        let service = SyncService::new(queue, transport.clone())
            .with_cache(cache.clone())
            .with_emitter(emitter.clone());

        Harness {
            service,
            transport,
            cache,
            emitter,
        }
    }

    #[tokio::test]
    async fn test_offline_submit_queues() {
        let h = harness();

        let outcome = h.service.submit("orders.create", json!({"table": 1})).await.unwrap();

        assert!(matches!(outcome, SubmitOutcome::Queued(_)));
        assert!(h.transport.called_actions().is_empty());
        assert_eq!(h.service.status().await.pending, 1);
        assert_eq!(h.emitter.statuses().last().map(|s| s.pending), Some(1));
    }

    #[tokio::test]
    async fn test_online_submit_sends_and_invalidates_cache() {
        let h = harness();
        h.cache.put("orders.today", &json!([])).await.unwrap();
        h.cache.put("menu", &json!([])).await.unwrap();
        h.service.set_online(true).await;

        let outcome = h.service.submit("orders.create", json!({"table": 1})).await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Sent);
        let orders: Option<serde_json::Value> = h.cache.get_fresh("orders.today").await.unwrap();
        let menu: Option<serde_json::Value> = h.cache.get_fresh("menu").await.unwrap();
        assert!(orders.is_none());
        assert!(menu.is_some());
    }

    #[tokio::test]
    async fn test_online_retryable_failure_queues() {
        let h = harness();
        h.transport.fail_action("orders.create", TransportError::retryable("502"));
        h.service.set_online(true).await;

        let outcome = h.service.submit("orders.create", json!({})).await.unwrap();

        let SubmitOutcome::Queued(item) = outcome else {
            panic!("expected the mutation to be queued");
        };
        assert_eq!(item.retry_count, 0);
        assert_eq!(h.service.queue().len().await, 1);
    }

    #[tokio::test]
    async fn test_expired_token_keeps_queue_for_later() {
        let h = harness();
        h.service.submit("orders.create", json!({"table": 5})).await.unwrap();
        h.transport.fail_action("orders.create", TransportError::unauthorized("401"));

        let report = h.service.set_online(true).await.unwrap();
        assert!(report.auth_required);

        let status = h.service.status().await;
        assert_eq!(status.pending, 1);
        assert_eq!(status.last_error.as_deref(), Some("server refused credentials"));
        assert_eq!(h.emitter.auth_required(), vec!["401".to_string()]);
    }

    #[tokio::test]
    async fn test_online_rejection_is_not_queued() {
        let h = harness();
        h.transport.fail_action("orders.create", TransportError::permanent("400 Bad Request"));
        h.service.set_online(true).await;

        let err = h.service.submit("orders.create", json!({})).await.unwrap_err();

        assert!(matches!(err, SyncError::Rejected { .. }));
        assert!(h.service.queue().is_empty().await);
    }

    #[tokio::test]
    async fn test_going_offline_does_not_drain() {
        let h = harness();
        h.service.submit("orders.create", json!({})).await.unwrap();

        assert!(h.service.set_online(false).await.is_none());
        assert!(h.transport.called_actions().is_empty());
    }

    #[tokio::test]
    async fn test_reconnect_with_three_failing_items() {
        let h = harness();
        for n in 1..=3 {
            h.service.submit(format!("orders.fail{n}"), json!(n)).await.unwrap();
            h.transport.fail_action(&format!("orders.fail{n}"), TransportError::retryable("503"));
        }
        let last = match h.service.submit("tables.update", json!(4)).await.unwrap() {
            SubmitOutcome::Queued(item) => item,
            SubmitOutcome::Sent => panic!("service should be offline"),
        };

        let first = h.service.set_online(true).await.unwrap();
        assert_eq!(first.synced, vec![QueueItem { retry_count: 0, ..last.clone() }]);
        assert_eq!(first.retried, 3);

        let second = h.service.drain_now().await;
        assert_eq!(second.retried, 3);

        let third = h.service.drain_now().await;
        assert_eq!(third.failed.len(), 3);
        assert_eq!(third.remaining, 0);

        assert!(h.service.queue().is_empty().await);
        assert_eq!(h.emitter.failed().len(), 3);
        assert_eq!(h.transport.call_count(&last.id), 1);

        let status = h.service.status().await;
        assert!(status.online);
        assert_eq!(status.pending, 0);
        assert!(status.last_error.is_some());
    }
}
