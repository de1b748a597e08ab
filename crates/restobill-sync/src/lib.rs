//! # restobill-sync: Offline-First Sync for RestoBill
//!
//! Keeps billing usable without a network. Mutations made offline are
//! queued durably and replayed in order once connectivity returns; read-mostly
//! API data is cached with a TTL and served stale while offline.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Service Architecture                        │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                  SyncService (Orchestrator)                      │  │
//! │  │                                                                  │  │
//! │  │  submit() online → send, offline → queue                         │  │
//! │  │  set_online(true) → drain                                        │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │OfflineSyncQueue│  │ SyncTransport  │  │  OfflineCache          │    │
//! │  │                │  │                │  │                        │    │
//! │  │ FIFO, bounded, │  │ HTTP replay    │  │ TTL snapshots under    │    │
//! │  │ persisted as   │  │ with idempot-  │  │ cache.<key>, served    │    │
//! │  │ "sync.queue"   │  │ ency key       │  │ stale when offline     │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  STATUS EVENTS (via SyncEventEmitter):                                 │
//! │  • status   - online flag, pending count, last error                   │
//! │  • progress - drain progress                                           │
//! │  • failed   - item abandoned after its final attempt                   │
//! │  • dropped  - item evicted by the drop_oldest overflow policy          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`service`] - `SyncService` online/offline orchestration
//! - [`queue`] - Durable FIFO queue and drain algorithm
//! - [`transport`] - Replay port and HTTP implementation
//! - [`cache`] - TTL cache for offline reads
//! - [`conflict`] - Version-based conflict resolution
//! - [`config`] - Sync configuration (API, queue, cache)
//! - [`events`] - Status snapshots and emitter trait
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use restobill_store::{SqliteStore, StoreConfig};
//! use restobill_sync::{HttpTransport, OfflineSyncQueue, SyncConfig, SyncService};
//!
//! let config = SyncConfig::load_or_default(None);
//! let store = Arc::new(SqliteStore::new(StoreConfig::new("restobill.db")).await?);
//!
//! let queue = Arc::new(OfflineSyncQueue::load(store, config.queue.clone()).await?);
//! let transport = Arc::new(HttpTransport::new(&config.api)?);
//! let sync = SyncService::new(queue, transport);
//!
//! sync.submit("orders.create", order_json).await?;
//! sync.set_online(true).await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cache;
pub mod config;
pub mod conflict;
pub mod error;
pub mod events;
pub mod queue;
pub mod service;
pub mod transport;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use cache::{Cached, OfflineCache};
pub use config::{ApiSettings, CacheSettings, OverflowPolicy, QueueSettings, SyncConfig};
pub use conflict::{merge, resolve, Resolution, Versioned, VersionedRecord};
pub use error::{SyncError, SyncResult};
pub use events::{NoOpEmitter, SyncEventEmitter, SyncStatus};
pub use queue::{DrainReport, FailedItem, OfflineSyncQueue, QueueItem};
pub use service::{SubmitOutcome, SyncService};
pub use transport::{HttpTransport, SyncTransport, TransportError};
