//! # Offline Sync Queue
//!
//! Durable FIFO of mutations that could not reach the server.
//!
//! ## Queue Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Offline Queue Flow                                   │
//! │                                                                         │
//! │  enqueue(action, payload)                                              │
//! │       │                                                                 │
//! │       ├── full + drop_oldest ──► evict front, emit_dropped             │
//! │       ├── full + reject ───────► Err(QueueFull)                        │
//! │       ▼                                                                 │
//! │  push_back ──► persist "sync.queue"                                    │
//! │                                                                         │
//! │  drain(transport)                (no-op if another drain is running)   │
//! │       │                                                                 │
//! │       ▼  for each item, oldest first:                                  │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  replay ── Ok ──────────────────────► remove         (synced)   │   │
//! │  │     │                                                           │   │
//! │  │     └─ Err ─► retry_count += 1                                  │   │
//! │  │                 │                                               │   │
//! │  │                 ├─ retryable && retry_count < 3 ► keep (retried)│   │
//! │  │                 └─ otherwise ──► remove, emit_failed   (failed) │   │
//! │  │                                                                 │   │
//! │  │  persist "sync.queue" after every item                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                       │
//! │  • Strict FIFO: retried items keep their place at the front            │
//! │  • A failing item never blocks the items behind it                     │
//! │  • No item is replayed more than max_attempts times                    │
//! │  • Queue survives restart (load() at startup)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use restobill_store::{keys, load_json, save_json, StateStore, StoreError};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{OverflowPolicy, QueueSettings};
use crate::error::{SyncError, SyncResult};
use crate::events::{NoOpEmitter, SyncEventEmitter};
use crate::transport::SyncTransport;

// =============================================================================
// Queue Item
// =============================================================================

/// A mutation waiting to be replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Unique id, also sent as the idempotency key.
    pub id: String,

    /// Server action, e.g. `orders.create` or `tables.update`.
    pub action: String,

    /// Request body.
    pub payload: serde_json::Value,

    /// When the mutation was first attempted.
    pub timestamp: DateTime<Utc>,

    /// Failed replay attempts so far.
    pub retry_count: u32,
}

impl QueueItem {
    pub fn new(action: impl Into<String>, payload: serde_json::Value) -> Self {
        QueueItem {
            id: Uuid::new_v4().to_string(),
            action: action.into(),
            payload,
            timestamp: Utc::now(),
            retry_count: 0,
        }
    }

    /// Resource the action touches (`orders` for `orders.create`).
    ///
    /// Used to invalidate cached snapshots after a successful replay.
    pub fn resource(&self) -> &str {
        self.action
            .split(|c| c == '.' || c == '/')
            .next()
            .unwrap_or(&self.action)
    }
}

// =============================================================================
// Drain Report
// =============================================================================

/// An item abandoned during a drain.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedItem {
    pub item: QueueItem,
    pub error: String,
}

/// Outcome of one `drain` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainReport {
    /// Replayed successfully and removed.
    pub synced: Vec<QueueItem>,

    /// Removed after the final failed attempt or a permanent rejection.
    pub failed: Vec<FailedItem>,

    /// Failed this time, kept for the next drain.
    pub retried: usize,

    /// Items left in the queue afterwards.
    pub remaining: usize,

    /// Another drain was already running; nothing was attempted.
    pub skipped: bool,

    /// The server refused the credentials and the drain stopped early.
    /// No item was charged an attempt for it.
    pub auth_required: bool,
}

impl DrainReport {
    /// True when every attempted item was synced.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.retried == 0 && !self.auth_required
    }
}

/// Clears the draining flag when the drain ends, however it ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl<'a> DrainGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DrainGuard(flag))
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// Offline Sync Queue
// =============================================================================

/// Bounded, persisted FIFO of pending mutations.
pub struct OfflineSyncQueue {
    items: Mutex<VecDeque<QueueItem>>,
    draining: AtomicBool,
    settings: QueueSettings,
    store: Arc<dyn StateStore>,
    emitter: Arc<dyn SyncEventEmitter>,
}

impl OfflineSyncQueue {
    /// Creates an empty queue. Does not read persisted state.
    pub fn new(store: Arc<dyn StateStore>, settings: QueueSettings) -> Self {
        OfflineSyncQueue {
            items: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
            settings,
            store,
            emitter: Arc::new(NoOpEmitter),
        }
    }

    /// Restores the queue persisted by a previous run.
    ///
    /// A corrupt document is logged and discarded so the POS can start;
    /// storage failures are returned.
    pub async fn load(store: Arc<dyn StateStore>, settings: QueueSettings) -> SyncResult<Self> {
        let items = match load_json::<VecDeque<QueueItem>>(store.as_ref(), keys::SYNC_QUEUE).await
        {
            Ok(Some(items)) => items,
            Ok(None) => VecDeque::new(),
            Err(StoreError::Serialization { message, .. }) => {
                warn!(error = %message, "Discarding unreadable sync queue");
                VecDeque::new()
            }
            Err(e) => return Err(e.into()),
        };

        if items.len() > settings.capacity {
            warn!(
                len = items.len(),
                capacity = settings.capacity,
                "Restored sync queue exceeds capacity"
            );
        }

        info!(pending = items.len(), "Sync queue loaded");

        let queue = Self::new(store, settings);
        *queue.items.lock().await = items;
        Ok(queue)
    }

    /// Sets the event emitter.
    pub fn with_emitter(mut self, emitter: Arc<dyn SyncEventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Queues a mutation for later replay.
    ///
    /// ## Errors
    /// `QueueFull` when at capacity under the `reject` policy.
    pub async fn enqueue(
        &self,
        action: impl Into<String>,
        payload: serde_json::Value,
    ) -> SyncResult<QueueItem> {
        let item = QueueItem::new(action, payload);
        self.enqueue_item(item.clone()).await?;
        Ok(item)
    }

    /// Queues an already-built item (keeps its id and timestamp).
    pub async fn enqueue_item(&self, item: QueueItem) -> SyncResult<()> {
        let mut items = self.items.lock().await;
        let capacity = self.settings.capacity;

        if items.len() >= capacity {
            match self.settings.overflow {
                OverflowPolicy::Reject => {
                    warn!(action = %item.action, capacity, "Sync queue full, rejecting mutation");
                    return Err(SyncError::QueueFull { capacity });
                }
                OverflowPolicy::DropOldest => {
                    while items.len() >= capacity {
                        let Some(dropped) = items.pop_front() else {
                            break;
                        };
                        warn!(
                            id = %dropped.id,
                            action = %dropped.action,
                            "Sync queue full, dropping oldest mutation"
                        );
                        self.emitter.emit_dropped(&dropped);
                    }
                }
            }
        }

        debug!(id = %item.id, action = %item.action, "Queued mutation");
        items.push_back(item);
        self.persist(&items).await;
        Ok(())
    }

    /// Replays queued mutations in FIFO order.
    ///
    /// Returns immediately with `skipped: true` if a drain is already in
    /// progress. Items enqueued while draining wait for the next drain.
    pub async fn drain(&self, transport: &dyn SyncTransport) -> DrainReport {
        let Some(_guard) = DrainGuard::try_acquire(&self.draining) else {
            debug!("Drain already in progress, skipping");
            return DrainReport {
                skipped: true,
                remaining: self.len().await,
                ..Default::default()
            };
        };

        let snapshot: Vec<QueueItem> = self.items.lock().await.iter().cloned().collect();
        if snapshot.is_empty() {
            return DrainReport::default();
        }

        info!(count = snapshot.len(), "Draining sync queue");
        let mut report = DrainReport::default();

        for item in snapshot {
            let result = transport.replay(&item).await;

            let mut items = self.items.lock().await;
            let Some(pos) = items.iter().position(|i| i.id == item.id) else {
                debug!(id = %item.id, "Item left the queue during replay");
                continue;
            };

            match result {
                Err(err) if err.is_auth_failure() => {
                    warn!(
                        id = %item.id,
                        action = %item.action,
                        error = %err,
                        "Server refused credentials, pausing drain"
                    );
                    self.emitter.emit_auth_required(&err.message);
                    report.auth_required = true;
                    break;
                }
                Ok(()) => {
                    if let Some(done) = items.remove(pos) {
                        debug!(id = %done.id, action = %done.action, "Mutation synced");
                        report.synced.push(done);
                    }
                }
                Err(err) => {
                    let attempts = {
                        let entry = &mut items[pos];
                        entry.retry_count += 1;
                        entry.retry_count
                    };

                    if err.retryable && attempts < self.settings.max_attempts {
                        warn!(
                            id = %item.id,
                            action = %item.action,
                            attempt = attempts,
                            error = %err,
                            "Replay failed, will retry"
                        );
                        report.retried += 1;
                    } else if let Some(abandoned) = items.remove(pos) {
                        error!(
                            id = %abandoned.id,
                            action = %abandoned.action,
                            attempts,
                            retryable = err.retryable,
                            error = %err,
                            "Abandoning queued mutation"
                        );
                        self.emitter.emit_failed(&abandoned, &err.message);
                        report.failed.push(FailedItem {
                            item: abandoned,
                            error: err.message,
                        });
                    }
                }
            }

            self.persist(&items).await;
            self.emitter.emit_progress(items.len(), report.synced.len());
        }

        report.remaining = self.len().await;

        info!(
            synced = report.synced.len(),
            failed = report.failed.len(),
            retried = report.retried,
            remaining = report.remaining,
            "Drain complete"
        );

        report
    }

    /// Snapshot of pending items, oldest first.
    pub async fn pending(&self) -> Vec<QueueItem> {
        self.items.lock().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Whether a drain is running right now.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Drops every pending item.
    pub async fn clear(&self) {
        let mut items = self.items.lock().await;
        info!(dropped = items.len(), "Clearing sync queue");
        items.clear();
        self.persist(&items).await;
    }

    /// Writes the queue through the storage port.
    ///
    /// Failures are logged; the in-memory queue stays authoritative and the
    /// next mutation writes it again.
    async fn persist(&self, items: &VecDeque<QueueItem>) {
        if let Err(e) = save_json(self.store.as_ref(), keys::SYNC_QUEUE, items).await {
            error!(error = %e, pending = items.len(), "Failed to persist sync queue");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
