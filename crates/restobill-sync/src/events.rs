//! # Sync Events
//!
//! Status snapshots and the emitter trait the frontend bridge implements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::queue::QueueItem;

/// Current sync status for UI display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Whether the device believes it has connectivity.
    pub online: bool,

    /// Mutations waiting to be replayed.
    pub pending: usize,

    /// Whether a drain is running right now.
    pub draining: bool,

    /// When the last drain finished.
    pub last_drain_at: Option<DateTime<Utc>>,

    /// Last replay error, cleared by a clean drain.
    pub last_error: Option<String>,
}

/// Trait for emitting sync events to the frontend.
///
/// Implement this to bridge events into the UI layer. Methods are called
/// from async tasks and must not block.
pub trait SyncEventEmitter: Send + Sync {
    /// Emits a sync status change event.
    fn emit_status(&self, status: &SyncStatus);

    /// Emits a drain progress event.
    fn emit_progress(&self, pending: usize, synced: usize);

    /// An item was abandoned after its final failed attempt.
    fn emit_failed(&self, item: &QueueItem, error: &str);

    /// An item was evicted to make room under the `drop_oldest` policy.
    fn emit_dropped(&self, item: &QueueItem);

    /// The server refused the credentials; the drain stopped with the queue
    /// intact.
    fn emit_auth_required(&self, error: &str);
}

/// No-op event emitter for testing.
pub struct NoOpEmitter;

impl SyncEventEmitter for NoOpEmitter {
    fn emit_status(&self, _status: &SyncStatus) {}
    fn emit_progress(&self, _pending: usize, _synced: usize) {}
    fn emit_failed(&self, _item: &QueueItem, _error: &str) {}
    fn emit_dropped(&self, _item: &QueueItem) {}
    fn emit_auth_required(&self, _error: &str) {}
}
