//! # Bluetooth Port
//!
//! The seam between the manager and the host Bluetooth stack (Web Bluetooth
//! in the webview, BlueZ, CoreBluetooth). The manager only needs three
//! operations; everything device-specific stays behind this trait.
//!
//! ```text
//! ┌──────────────────┐  connect(device)   ┌──────────────────────────────┐
//! │  PrinterManager  │ ─────────────────► │  BluetoothPort impl          │
//! │                  │ ◄───────────────── │  GATT connect, discover the  │
//! │                  │   PrinterLink      │  writable characteristic     │
//! │                  │                    │                              │
//! │                  │  write(link, buf)  │  ESC/POS bytes, chunked as   │
//! │                  │ ─────────────────► │  the device requires         │
//! │                  │                    │                              │
//! │                  │  disconnect(link)  │                              │
//! │                  │ ─────────────────► │                              │
//! └──────────────────┘                    └──────────────────────────────┘
//!
//!  Unexpected link loss is reported back through
//!  PrinterHandle::notify_link_lost().
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ESC/POS "transmit real-time status" (DLE EOT 1). Harmless on every
/// printer, used as the health-check probe.
pub const STATUS_PROBE: &[u8] = &[0x10, 0x04, 0x01];

/// A printer the user picked. Persisted as the last-known device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterDevice {
    /// Stable identifier assigned by the Bluetooth stack.
    pub id: String,

    /// Advertised name, for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl PrinterDevice {
    pub fn new(id: impl Into<String>) -> Self {
        PrinterDevice {
            id: id.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// An open GATT link: the device plus the characteristic print data goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterLink {
    pub device_id: String,
    pub characteristic: String,
}

/// Failure reported by the Bluetooth stack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PortError {
    pub message: String,
}

impl PortError {
    pub fn new(message: impl Into<String>) -> Self {
        PortError {
            message: message.into(),
        }
    }
}

/// Host Bluetooth stack.
///
/// Implementations should fail fast; the manager wraps every call in its
/// own timeout.
#[async_trait]
pub trait BluetoothPort: Send + Sync {
    /// Opens a link and resolves the writable characteristic.
    async fn connect(&self, device: &PrinterDevice) -> Result<PrinterLink, PortError>;

    /// Writes raw bytes to the link.
    async fn write(&self, link: &PrinterLink, data: &[u8]) -> Result<(), PortError>;

    /// Closes the link. Errors are not interesting at this point.
    async fn disconnect(&self, link: &PrinterLink);
}
