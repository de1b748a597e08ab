//! # Printer Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Printer Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Link          │  │     Queue               │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  QueueFull              │ │
//! │  │  ConfigLoad/Save│  │  Timeout        │  │  JobFailed              │ │
//! │  │                 │  │  InvalidState   │  │                         │ │
//! │  │                 │  │  NoKnownDevice  │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Storage      │  │    Actor        │                              │
//! │  │  Storage        │  │  ManagerStopped │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::manager::ConnectionState;
use crate::port::PortError;

/// Result type alias for printer operations.
pub type PrintResult<T> = Result<T, PrintError>;

#[derive(Debug, Error)]
pub enum PrintError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid printer configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Link Errors
    // =========================================================================
    /// The Bluetooth stack refused or dropped the link.
    #[error("Printer connection failed: {0}")]
    Connection(String),

    /// A connect or write did not finish in time.
    #[error("Printer {operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    /// The operation is not legal in the current connection state.
    ///
    /// ## When This Occurs
    /// - `connect()` while connecting, connected or reconnecting
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: ConnectionState,
    },

    /// `connect_last_known()` with nothing persisted.
    #[error("No previously connected printer")]
    NoKnownDevice,

    // =========================================================================
    // Queue Errors
    // =========================================================================
    #[error("Print queue is full ({capacity} jobs)")]
    QueueFull { capacity: usize },

    /// The job used up its attempts and was dropped.
    #[error("Print job {job_id} failed: {reason}")]
    JobFailed { job_id: String, reason: String },

    // =========================================================================
    // Storage / Actor Errors
    // =========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    /// The manager task has exited.
    #[error("Printer manager is not running")]
    ManagerStopped,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<PortError> for PrintError {
    fn from(err: PortError) -> Self {
        PrintError::Connection(err.to_string())
    }
}

impl From<restobill_store::StoreError> for PrintError {
    fn from(err: restobill_store::StoreError) -> Self {
        PrintError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for PrintError {
    fn from(err: std::io::Error) -> Self {
        PrintError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for PrintError {
    fn from(err: toml::de::Error) -> Self {
        PrintError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for PrintError {
    fn from(err: toml::ser::Error) -> Self {
        PrintError::ConfigSaveFailed(err.to_string())
    }
}

impl PrintError {
    /// Returns true if trying again later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PrintError::Connection(_) | PrintError::Timeout { .. } | PrintError::QueueFull { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(PrintError::from(PortError::new("GATT server disconnected")).is_retryable());
        assert!(PrintError::Timeout { operation: "connect", secs: 10 }.is_retryable());
        assert!(!PrintError::NoKnownDevice.is_retryable());
        assert!(!PrintError::InvalidConfig("bad".into()).is_retryable());
    }

    #[test]
    fn test_invalid_state_display() {
        let err = PrintError::InvalidState {
            operation: "connect",
            state: ConnectionState::Reconnecting,
        };
        assert_eq!(err.to_string(), "Cannot connect while reconnecting");
    }
}
