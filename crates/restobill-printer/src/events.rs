//! # Printer Events
//!
//! What the UI hears from the manager.

use serde::{Deserialize, Serialize};

use crate::manager::ConnectionState;
use crate::port::PrinterDevice;
use crate::queue::PrintJob;

/// Snapshot for the printer indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterStatus {
    pub state: ConnectionState,
    pub device: Option<PrinterDevice>,
    /// Consecutive failed reconnects in the current outage.
    pub reconnect_attempts: u32,
    pub queued_jobs: usize,
}

/// Implement this to bridge printer events into the UI layer.
///
/// Called from the manager task; must not block.
pub trait PrinterEventEmitter: Send + Sync {
    /// Every state transition.
    fn emit_state(&self, status: &PrinterStatus);

    fn emit_printed(&self, job: &PrintJob);

    /// A job used up its attempts and was dropped.
    fn emit_job_failed(&self, job: &PrintJob, error: &str);

    /// Reconnecting gave up; the user has to reconnect by hand.
    fn emit_manual_reconnect_required(&self, device: &PrinterDevice);
}

pub struct NoOpEmitter;

impl PrinterEventEmitter for NoOpEmitter {
    fn emit_state(&self, _status: &PrinterStatus) {}
    fn emit_printed(&self, _job: &PrintJob) {}
    fn emit_job_failed(&self, _job: &PrintJob, _error: &str) {}
    fn emit_manual_reconnect_required(&self, _device: &PrinterDevice) {}
}
