//! Fakes for the manager tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

use crate::events::{PrinterEventEmitter, PrinterStatus};
use crate::manager::ConnectionState;
use crate::port::{BluetoothPort, PortError, PrinterDevice, PrinterLink};
use crate::queue::PrintJob;

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,restobill=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Fake Bluetooth stack
// =============================================================================

#[derive(Default)]
pub(crate) struct FakePort {
    fail_all_connects: AtomicBool,
    fail_next_connects: AtomicU32,
    fail_writes: AtomicBool,
    connects: Mutex<Vec<Instant>>,
    writes: Mutex<Vec<Vec<u8>>>,
}

impl FakePort {
    pub(crate) fn fail_connects(&self, fail: bool) {
        self.fail_all_connects.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_next_connects(&self, n: u32) {
        self.fail_next_connects.store(n, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// When each connect call happened.
    pub(crate) fn connect_times(&self) -> Vec<Instant> {
        self.connects.lock().unwrap().clone()
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.connects.lock().unwrap().len()
    }

    /// Every write attempt, failed ones included.
    pub(crate) fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }

    pub(crate) fn write_count(&self, payload: &[u8]) -> usize {
        self.writes.lock().unwrap().iter().filter(|w| w.as_slice() == payload).count()
    }
}

#[async_trait]
impl BluetoothPort for FakePort {
    async fn connect(&self, device: &PrinterDevice) -> Result<PrinterLink, PortError> {
        self.connects.lock().unwrap().push(Instant::now());

        let scripted = self
            .fail_next_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        if scripted || self.fail_all_connects.load(Ordering::SeqCst) {
            return Err(PortError::new("device not in range"));
        }

        Ok(PrinterLink {
            device_id: device.id.clone(),
            characteristic: "49535343-8841-43f4-a8d4-ecbe34729bb3".to_string(),
        })
    }

    async fn write(&self, _link: &PrinterLink, data: &[u8]) -> Result<(), PortError> {
        self.writes.lock().unwrap().push(data.to_vec());

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PortError::new("GATT write failed"));
        }
        Ok(())
    }

    async fn disconnect(&self, _link: &PrinterLink) {}
}

// =============================================================================
// Recording emitter
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Recorded {
    State(ConnectionState),
    Printed(String),
    JobFailed(String),
    ManualReconnect(String),
}

pub(crate) struct RecordingEmitter {
    tx: mpsc::UnboundedSender<Recorded>,
}

impl PrinterEventEmitter for RecordingEmitter {
    fn emit_state(&self, status: &PrinterStatus) {
        let _ = self.tx.send(Recorded::State(status.state));
    }

    fn emit_printed(&self, job: &PrintJob) {
        let _ = self.tx.send(Recorded::Printed(job.id.clone()));
    }

    fn emit_job_failed(&self, job: &PrintJob, _error: &str) {
        let _ = self.tx.send(Recorded::JobFailed(job.id.clone()));
    }

    fn emit_manual_reconnect_required(&self, device: &PrinterDevice) {
        let _ = self.tx.send(Recorded::ManualReconnect(device.id.clone()));
    }
}

/// Test side of the recording emitter.
pub(crate) struct Recorder {
    rx: mpsc::UnboundedReceiver<Recorded>,
    seen: Vec<Recorded>,
}

pub(crate) fn recording_emitter() -> (Arc<RecordingEmitter>, Recorder) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Arc::new(RecordingEmitter { tx }),
        Recorder {
            rx,
            seen: Vec::new(),
        },
    )
}

impl Recorder {
    /// Consumes events until `expected` arrives. Panics after an hour of
    /// (usually paused) time.
    pub(crate) async fn wait_for(&mut self, expected: Recorded) {
        let rx = &mut self.rx;
        let seen = &mut self.seen;
        let search = async {
            while let Some(event) = rx.recv().await {
                seen.push(event.clone());
                if event == expected {
                    return true;
                }
            }
            false
        };

        let found = tokio::time::timeout(Duration::from_secs(3600), search).await;
        if !matches!(found, Ok(true)) {
            panic!("never saw {:?}; saw {:?}", expected, self.seen);
        }
    }

    /// Everything received so far, oldest first.
    pub(crate) fn drain_seen(&mut self) -> Vec<Recorded> {
        while let Ok(event) = self.rx.try_recv() {
            self.seen.push(event);
        }
        self.seen.clone()
    }
}
