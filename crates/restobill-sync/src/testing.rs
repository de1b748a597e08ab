//! Fakes shared by the queue and service tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing_subscriber::EnvFilter;

use crate::events::{SyncEventEmitter, SyncStatus};
use crate::queue::QueueItem;
use crate::transport::{SyncTransport, TransportError};

/// Installs a test-friendly subscriber once per test binary.
pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,restobill=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

enum Failure {
    Always(TransportError),
    Times(u32, TransportError),
}

/// Transport whose failures are scripted per action.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    calls: Mutex<Vec<QueueItem>>,
    failures: Mutex<HashMap<String, Failure>>,
    gate: Option<Semaphore>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every replay blocks until `release` hands out a permit.
    pub(crate) fn gated() -> Self {
        ScriptedTransport {
            gate: Some(Semaphore::new(0)),
            ..Default::default()
        }
    }

    pub(crate) fn fail_action(&self, action: &str, err: TransportError) {
        self.failures
            .lock()
            .unwrap()
            .insert(action.to_string(), Failure::Always(err));
    }

    /// The next `times` replays of `action` fail, later ones succeed.
    pub(crate) fn fail_action_times(&self, action: &str, times: u32, err: TransportError) {
        self.failures
            .lock()
            .unwrap()
            .insert(action.to_string(), Failure::Times(times, err));
    }

    pub(crate) fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    pub(crate) async fn wait_for_calls(&self, n: usize) {
        while self.calls.lock().unwrap().len() < n {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    pub(crate) fn called_actions(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|i| i.action.clone()).collect()
    }

    pub(crate) fn called_ids(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|i| i.id.clone()).collect()
    }

    pub(crate) fn call_count(&self, id: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|i| i.id == id).count()
    }

    fn outcome(&self, action: &str) -> Result<(), TransportError> {
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(action) {
            Some(Failure::Always(err)) => Err(err.clone()),
            Some(Failure::Times(remaining, err)) if *remaining > 0 => {
                *remaining -= 1;
                Err(err.clone())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl SyncTransport for ScriptedTransport {
    async fn replay(&self, item: &QueueItem) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(item.clone());

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.outcome(&item.action)
    }
}

/// Emitter that remembers what it was told.
#[derive(Default)]
pub(crate) struct RecordingEmitter {
    statuses: Mutex<Vec<SyncStatus>>,
    failed: Mutex<Vec<String>>,
    dropped: Mutex<Vec<String>>,
    auth_required: Mutex<Vec<String>>,
}

impl RecordingEmitter {
    pub(crate) fn statuses(&self) -> Vec<SyncStatus> {
        self.statuses.lock().unwrap().clone()
    }

    pub(crate) fn failed(&self) -> Vec<String> {
        self.failed.lock().unwrap().clone()
    }

    pub(crate) fn dropped(&self) -> Vec<String> {
        self.dropped.lock().unwrap().clone()
    }

    pub(crate) fn auth_required(&self) -> Vec<String> {
        self.auth_required.lock().unwrap().clone()
    }
}

impl SyncEventEmitter for RecordingEmitter {
    fn emit_status(&self, status: &SyncStatus) {
        self.statuses.lock().unwrap().push(status.clone());
    }

    fn emit_progress(&self, _pending: usize, _synced: usize) {}

    fn emit_failed(&self, item: &QueueItem, _error: &str) {
        self.failed.lock().unwrap().push(item.id.clone());
    }

    fn emit_dropped(&self, item: &QueueItem) {
        self.dropped.lock().unwrap().push(item.id.clone());
    }

    fn emit_auth_required(&self, error: &str) {
        self.auth_required.lock().unwrap().push(error.to_string());
    }
}
