//! # restobill-printer: Bluetooth Thermal Printer Manager
//!
//! Keeps the receipt/KOT printer link alive for the billing screens.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Printer Manager Architecture                       │
//! │                                                                         │
//! │   UI / commands                                                         │
//! │        │  PrinterHandle (Clone)                                         │
//! │        ▼                                                                │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                PrinterManager task (one per till)                │  │
//! │  │                                                                  │  │
//! │  │   select! {                                                      │  │
//! │  │     command      → connect / print / disconnect / status         │  │
//! │  │     reconnect_at → next attempt (ReconnectPolicy)                │  │
//! │  │     health tick  → DLE EOT 1 probe every 30s                     │  │
//! │  │   }                                                              │  │
//! │  └───────────┬───────────────────────────────┬──────────────────────┘  │
//! │              ▼                               ▼                          │
//! │      BluetoothPort (host)           StateStore "printer.last_device"   │
//! │                                                                         │
//! │  EVENTS (via PrinterEventEmitter):                                     │
//! │  • state changes  • printed jobs  • dropped jobs                       │
//! │  • manual reconnect required                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`manager`] - Actor, handle and connection state machine
//! - [`reconnect`] - Capped exponential reconnect schedule
//! - [`queue`] - Bounded print job queue
//! - [`port`] - Bluetooth stack trait and device types
//! - [`config`] - Printer configuration
//! - [`events`] - Status snapshot and emitter trait
//! - [`error`] - Printer error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod events;
pub mod manager;
pub mod port;
pub mod queue;
pub mod reconnect;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{
    HealthCheckSettings, PrintQueueSettings, PrinterConfig, ReconnectSettings, TimeoutSettings,
};
pub use error::{PrintError, PrintResult};
pub use events::{NoOpEmitter, PrinterEventEmitter, PrinterStatus};
pub use manager::{ConnectionState, PrintOutcome, PrinterHandle, PrinterManager};
pub use port::{BluetoothPort, PortError, PrinterDevice, PrinterLink, STATUS_PROBE};
pub use queue::{PrintJob, PrintQueue};
pub use reconnect::{delay_for_attempt, ReconnectPolicy};
