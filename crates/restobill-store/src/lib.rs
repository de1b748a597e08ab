//! # restobill-store: Durable State for RestoBill
//!
//! The storage port shared by the offline sync queue, the offline cache
//! and the printer manager, with SQLite and in-memory implementations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        RestoBill State Flow                             │
//! │                                                                         │
//! │  OfflineSyncQueue   OfflineCache   PrinterManager                      │
//! │        │                 │               │                              │
//! │        └────────────┬────┴───────────────┘                              │
//! │                     ▼   Arc<dyn StateStore>                             │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  restobill-store (THIS CRATE)                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │  StateStore   │    │  SqliteStore  │    │ MemoryStore  │  │   │
//! │  │   │  (the port)   │◄───│  kv_state     │    │  HashMap     │  │   │
//! │  │   │  JSON helpers │◄───│  WAL, pool    │    │  (tests)     │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`store`] - `StateStore` trait, well-known keys, JSON helpers
//! - [`sqlite`] - SQLite implementation and pool configuration
//! - [`memory`] - In-memory implementation
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Storage error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use restobill_store::{keys, load_json, SqliteStore, StoreConfig};
//!
//! let store = SqliteStore::new(StoreConfig::new("restobill.db")).await?;
//! let queue: Option<Vec<QueueItem>> = load_json(&store, keys::SYNC_QUEUE).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod memory;
pub mod migrations;
pub mod sqlite;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::{SqliteStore, StoreConfig};
pub use store::{keys, load_json, save_json, StateStore};
