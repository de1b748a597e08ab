//! # Printer Connection Manager
//!
//! A single task owns the link, the reconnect schedule and the print queue.
//! Callers hold a cloneable [`PrinterHandle`] and talk to it over a channel,
//! so connection state is only ever touched from one place.
//!
//! ## Connection Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Printer Connection States                            │
//! │                                                                         │
//! │  ┌────────────┐    connect()    ┌────────────┐                         │
//! │  │Disconnected│ ──────────────► │ Connecting │                         │
//! │  └────────────┘                 └─────┬──────┘                         │
//! │     ▲    ▲                  success   │   failure ──► Disconnected     │
//! │     │    │                            ▼                                 │
//! │     │    │  disconnect()      ┌────────────┐                           │
//! │     │    └────────────────────│ Connected  │◄──────────┐               │
//! │     │                         └─────┬──────┘           │               │
//! │     │                 link lost /   │                  │ success       │
//! │     │               health check /  │                  │               │
//! │     │                write failure  ▼                  │               │
//! │     │                         ┌────────────┐  timer    │               │
//! │     └──── max_attempts ────── │Reconnecting│ ──────────┘               │
//! │           failures            └────────────┘  (delay from backoff)     │
//! │           (manual reconnect required)                                  │
//! │                                                                         │
//! │  PRINT QUEUE                                                           │
//! │  • Not connected: job waits (cap 10, QueueFull beyond)                 │
//! │  • On Connected: jobs written oldest first                             │
//! │  • Write failure: attempts += 1, link treated as lost                  │
//! │  • attempts > max_job_retries: job dropped, reported                   │
//! │  • disconnect(): jobs kept, attempts reset                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use restobill_store::{keys, load_json, save_json, StateStore};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::PrinterConfig;
use crate::error::{PrintError, PrintResult};
use crate::events::{NoOpEmitter, PrinterEventEmitter, PrinterStatus};
use crate::port::{BluetoothPort, PrinterDevice, PrinterLink, STATUS_PROBE};
use crate::queue::{PrintJob, PrintQueue};
use crate::reconnect::ReconnectPolicy;

const COMMAND_BUFFER: usize = 32;

// =============================================================================
// Connection State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Waiting for or running a reconnect attempt.
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// What happened to a job handed to `print`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintOutcome {
    /// Written to the printer.
    Printed,
    /// Waiting for the printer; `position` is 1-based.
    Queued { position: usize },
}

enum Command {
    /// `None` means the persisted last-known device.
    Connect {
        device: Option<PrinterDevice>,
        reply: oneshot::Sender<PrintResult<PrinterDevice>>,
    },
    Print {
        job: PrintJob,
        reply: oneshot::Sender<PrintResult<PrintOutcome>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    LinkLost,
    Status {
        reply: oneshot::Sender<PrinterStatus>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

// =============================================================================
// Handle
// =============================================================================

/// Cheap, cloneable access to the running manager.
#[derive(Clone)]
pub struct PrinterHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ConnectionState>,
}

impl PrinterHandle {
    /// Connects to `device`. Only legal while disconnected.
    pub async fn connect(&self, device: PrinterDevice) -> PrintResult<()> {
        self.request(|reply| Command::Connect {
            device: Some(device),
            reply,
        })
        .await?
        .map(|_| ())
    }

    /// Connects to the device from the last successful connection.
    pub async fn connect_last_known(&self) -> PrintResult<PrinterDevice> {
        self.request(|reply| Command::Connect {
            device: None,
            reply,
        })
        .await?
    }

    /// Prints now if connected, otherwise queues the job.
    ///
    /// ## Errors
    /// - `QueueFull` when the queue is at capacity
    /// - `JobFailed` when the job used its last attempt in this call
    pub async fn print(&self, job: PrintJob) -> PrintResult<PrintOutcome> {
        self.request(|reply| Command::Print { job, reply }).await?
    }

    /// Drops the link and cancels any scheduled reconnect. Always legal.
    pub async fn disconnect(&self) -> PrintResult<()> {
        self.request(|reply| Command::Disconnect { reply }).await
    }

    /// Reports that the host stack saw the link drop.
    pub async fn notify_link_lost(&self) -> PrintResult<()> {
        self.commands
            .send(Command::LinkLost)
            .await
            .map_err(|_| PrintError::ManagerStopped)
    }

    pub async fn status(&self) -> PrintResult<PrinterStatus> {
        self.request(|reply| Command::Status { reply }).await
    }

    /// Latest connection state without a round trip.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch channel of state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Disconnects and stops the manager task.
    pub async fn shutdown(&self) -> PrintResult<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> PrintResult<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| PrintError::ManagerStopped)?;
        rx.await.map_err(|_| PrintError::ManagerStopped)
    }
}

// =============================================================================
// Manager
// =============================================================================

/// Builder for the manager task.
///
/// ## Usage
/// ```rust,ignore
/// let printer = PrinterManager::new(port, store, PrinterConfig::load_or_default(None))?
///     .with_emitter(ui_bridge)
///     .spawn();
///
/// printer.connect_last_known().await?;
/// printer.print(PrintJob::new(receipt_bytes).with_label("Bill #1042")).await?;
/// ```
pub struct PrinterManager {
    port: Arc<dyn BluetoothPort>,
    store: Arc<dyn StateStore>,
    emitter: Arc<dyn PrinterEventEmitter>,
    config: PrinterConfig,
}

impl PrinterManager {
    pub fn new(
        port: Arc<dyn BluetoothPort>,
        store: Arc<dyn StateStore>,
        config: PrinterConfig,
    ) -> PrintResult<Self> {
        config.validate()?;

        Ok(PrinterManager {
            port,
            store,
            emitter: Arc::new(NoOpEmitter),
            config,
        })
    }

    pub fn with_emitter(mut self, emitter: Arc<dyn PrinterEventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Starts the manager task. Must be called within a Tokio runtime.
    pub fn spawn(self) -> PrinterHandle {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let actor = PrinterActor {
            policy: ReconnectPolicy::new(&self.config.reconnect),
            queue: PrintQueue::new(self.config.queue.capacity),
            port: self.port,
            store: self.store,
            emitter: self.emitter,
            config: self.config,
            commands: commands_rx,
            state_tx,
            state: ConnectionState::Disconnected,
            device: None,
            link: None,
            reconnect_attempts: 0,
            reconnect_at: None,
            health: None,
        };

        tokio::spawn(actor.run());

        PrinterHandle {
            commands: commands_tx,
            state: state_rx,
        }
    }
}

// =============================================================================
// Actor
// =============================================================================

enum Wake {
    Command(Command),
    ReconnectDue,
    HealthCheck,
    Closed,
}

struct PrinterActor {
    port: Arc<dyn BluetoothPort>,
    store: Arc<dyn StateStore>,
    emitter: Arc<dyn PrinterEventEmitter>,
    config: PrinterConfig,
    commands: mpsc::Receiver<Command>,
    state_tx: watch::Sender<ConnectionState>,

    state: ConnectionState,
    device: Option<PrinterDevice>,
    link: Option<PrinterLink>,
    reconnect_attempts: u32,
    reconnect_at: Option<Instant>,
    health: Option<Interval>,
    policy: ReconnectPolicy,
    queue: PrintQueue,
}

impl PrinterActor {
    async fn run(mut self) {
        info!("Printer manager started");

        loop {
            let wake = tokio::select! {
                biased;

                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => Wake::Command(cmd),
                    None => Wake::Closed,
                },
                _ = sleep_until_opt(self.reconnect_at) => Wake::ReconnectDue,
                _ = tick_opt(&mut self.health) => Wake::HealthCheck,
            };

            match wake {
                Wake::Command(cmd) => {
                    if !self.handle(cmd).await {
                        break;
                    }
                }
                Wake::ReconnectDue => self.attempt_reconnect().await,
                Wake::HealthCheck => self.health_check().await,
                Wake::Closed => {
                    debug!("All printer handles dropped");
                    self.disconnect().await;
                    break;
                }
            }
        }

        info!("Printer manager stopped");
    }

    /// Returns false when the manager should stop.
    async fn handle(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Connect { device, reply } => {
                let result = self.connect(device).await;
                let _ = reply.send(result);
            }
            Command::Print { job, reply } => {
                let result = self.print(job).await;
                let _ = reply.send(result);
            }
            Command::Disconnect { reply } => {
                self.disconnect().await;
                let _ = reply.send(());
            }
            Command::LinkLost => self.link_lost("reported by host").await,
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Command::Shutdown { reply } => {
                info!("Printer manager shutting down");
                self.disconnect().await;
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    // =========================================================================
    // Connecting
    // =========================================================================

    async fn connect(&mut self, requested: Option<PrinterDevice>) -> PrintResult<PrinterDevice> {
        if self.state != ConnectionState::Disconnected {
            return Err(PrintError::InvalidState {
                operation: "connect",
                state: self.state,
            });
        }

        let device = match requested {
            Some(device) => device,
            None => load_json::<PrinterDevice>(self.store.as_ref(), keys::PRINTER_LAST_DEVICE)
                .await?
                .ok_or(PrintError::NoKnownDevice)?,
        };

        info!(device = %device.id, "Connecting to printer");
        self.device = Some(device.clone());
        self.reconnect_attempts = 0;
        self.set_state(ConnectionState::Connecting);

        match self.open_link(&device).await {
            Ok(link) => {
                self.on_connected(link).await;
                Ok(device)
            }
            Err(e) => {
                warn!(device = %device.id, error = %e, "Printer connection failed");
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    async fn on_connected(&mut self, link: PrinterLink) {
        self.link = Some(link);
        self.reconnect_attempts = 0;
        self.reconnect_at = None;
        self.policy.reset();

        let period = self.config.health_check.interval();
        let mut health = tokio::time::interval_at(Instant::now() + period, period);
        health.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.health = Some(health);

        if let Some(device) = &self.device {
            info!(device = %device.id, "Printer connected");
            if let Err(e) = save_json(self.store.as_ref(), keys::PRINTER_LAST_DEVICE, device).await {
                warn!(error = %e, "Failed to remember printer");
            }
        }

        self.set_state(ConnectionState::Connected);
        self.drain_queue().await;
    }

    // =========================================================================
    // Reconnecting
    // =========================================================================

    async fn link_lost(&mut self, reason: &str) {
        if self.state != ConnectionState::Connected {
            debug!(state = %self.state, reason, "Ignoring link loss");
            return;
        }

        warn!(reason, "Printer link lost, reconnecting");
        self.close_link().await;
        self.reconnect_attempts = 0;
        self.policy.reset();
        self.set_state(ConnectionState::Reconnecting);
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        let delay = self.policy.next_delay();
        debug!(attempt = self.reconnect_attempts + 1, ?delay, "Reconnect scheduled");
        self.reconnect_at = Some(Instant::now() + delay);
    }

    async fn attempt_reconnect(&mut self) {
        self.reconnect_at = None;

        if self.state != ConnectionState::Reconnecting {
            return;
        }

        let Some(device) = self.device.clone() else {
            self.set_state(ConnectionState::Disconnected);
            return;
        };

        match self.open_link(&device).await {
            Ok(link) => {
                info!(attempts = self.reconnect_attempts + 1, "Printer reconnected");
                self.on_connected(link).await;
            }
            Err(e) => {
                self.reconnect_attempts += 1;

                if self.policy.exhausted(self.reconnect_attempts) {
                    error!(
                        device = %device.id,
                        attempts = self.reconnect_attempts,
                        error = %e,
                        "Giving up on printer, manual reconnect required"
                    );
                    self.set_state(ConnectionState::Disconnected);
                    self.emitter.emit_manual_reconnect_required(&device);
                } else {
                    warn!(
                        device = %device.id,
                        attempt = self.reconnect_attempts,
                        error = %e,
                        "Reconnect attempt failed"
                    );
                    self.emit_status();
                    self.schedule_reconnect();
                }
            }
        }
    }

    async fn health_check(&mut self) {
        let Some(link) = self.link.clone() else {
            return;
        };

        match self.write(&link, STATUS_PROBE).await {
            Ok(()) => debug!("Printer health check ok"),
            Err(e) => self.link_lost(&format!("health check failed: {}", e)).await,
        }
    }

    /// Manual disconnect. Keeps queued jobs but forgets their failures.
    async fn disconnect(&mut self) {
        self.reconnect_at = None;
        self.close_link().await;
        self.reconnect_attempts = 0;
        self.queue.reset_attempts();

        if self.state != ConnectionState::Disconnected {
            info!(queued = self.queue.len(), "Printer disconnected");
            self.set_state(ConnectionState::Disconnected);
        }
    }

    async fn close_link(&mut self) {
        self.health = None;
        if let Some(link) = self.link.take() {
            let secs = self.config.timeouts.write_secs;
            if tokio::time::timeout(Duration::from_secs(secs), self.port.disconnect(&link))
                .await
                .is_err()
            {
                debug!("Printer disconnect timed out");
            }
        }
    }

    // =========================================================================
    // Printing
    // =========================================================================

    async fn print(&mut self, job: PrintJob) -> PrintResult<PrintOutcome> {
        let id = job.id.clone();

        if let Err(e) = self.queue.push(job) {
            warn!(job = %id, state = %self.state, "Print queue full, rejecting job");
            return Err(e);
        }

        let failed = if self.state == ConnectionState::Connected {
            self.drain_queue().await
        } else {
            debug!(job = %id, state = %self.state, "Printer not connected, job queued");
            Vec::new()
        };

        if let Some((_, reason)) = failed.into_iter().find(|(job_id, _)| *job_id == id) {
            return Err(PrintError::JobFailed { job_id: id, reason });
        }

        Ok(match self.queue.position(&id) {
            Some(position) => PrintOutcome::Queued { position },
            None => PrintOutcome::Printed,
        })
    }

    /// Writes queued jobs while the link holds. Returns the jobs dropped
    /// along the way with their last error.
    async fn drain_queue(&mut self) -> Vec<(String, String)> {
        let mut failed = Vec::new();

        while self.state == ConnectionState::Connected {
            let Some(link) = self.link.clone() else {
                break;
            };
            let Some(mut job) = self.queue.pop_front() else {
                break;
            };

            match self.write(&link, &job.payload).await {
                Ok(()) => {
                    info!(job = %job.id, label = ?job.label, bytes = job.payload.len(), "Printed");
                    self.emitter.emit_printed(&job);
                }
                Err(e) => {
                    job.attempts += 1;
                    let reason = e.to_string();

                    if job.attempts > self.config.queue.max_job_retries {
                        error!(
                            job = %job.id,
                            attempts = job.attempts,
                            error = %reason,
                            "Dropping print job"
                        );
                        self.emitter.emit_job_failed(&job, &reason);
                        failed.push((job.id, reason.clone()));
                    } else {
                        warn!(job = %job.id, attempt = job.attempts, error = %reason, "Print failed");
                        self.queue.requeue_front(job);
                    }

                    self.link_lost(&reason).await;
                }
            }
        }

        failed
    }

    async fn open_link(&self, device: &PrinterDevice) -> PrintResult<PrinterLink> {
        let secs = self.config.timeouts.connect_secs;
        match tokio::time::timeout(Duration::from_secs(secs), self.port.connect(device)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(PrintError::Timeout {
                operation: "connect",
                secs,
            }),
        }
    }

    async fn write(&self, link: &PrinterLink, data: &[u8]) -> PrintResult<()> {
        let secs = self.config.timeouts.write_secs;
        match tokio::time::timeout(Duration::from_secs(secs), self.port.write(link, data)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(PrintError::Timeout {
                operation: "write",
                secs,
            }),
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "Printer state change");
        }
        self.state = state;
        self.state_tx.send_replace(state);
        self.emit_status();
    }

    fn emit_status(&self) {
        self.emitter.emit_state(&self.status());
    }

    fn status(&self) -> PrinterStatus {
        PrinterStatus {
            state: self.state,
            device: self.device.clone(),
            reconnect_attempts: self.reconnect_attempts,
            queued_jobs: self.queue.len(),
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn tick_opt(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconnect::delay_for_attempt;
    use crate::testing::{init_tracing, recording_emitter, FakePort, Recorded, Recorder};
    use restobill_store::MemoryStore;

    struct Harness {
        printer: PrinterHandle,
        port: Arc<FakePort>,
        store: MemoryStore,
        events: Recorder,
    }

    fn harness(config: PrinterConfig) -> Harness {
        init_tracing();
        let port = Arc::new(FakePort::default());
        let store = MemoryStore::new();
        let (emitter, events) = recording_emitter();

        let printer = PrinterManager::new(port.clone(), Arc::new(store.clone()), config)
            .unwrap()
            .with_emitter(emitter)
            .spawn();

        Harness {
            printer,
            port,
            store,
            events,
        }
    }

    fn device() -> PrinterDevice {
        PrinterDevice::new("BT:66:22:01:A3:F0").with_name("MTP-II")
    }

    fn job(text: &str) -> PrintJob {
        PrintJob::new(text.as_bytes().to_vec())
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_remembers_device() {
        let h = harness(PrinterConfig::default());

        h.printer.connect(device()).await.unwrap();

        assert_eq!(h.printer.state(), ConnectionState::Connected);
        let saved: Option<PrinterDevice> =
            load_json(&h.store, keys::PRINTER_LAST_DEVICE).await.unwrap();
        assert_eq!(saved, Some(device()));

        let status = h.printer.status().await.unwrap();
        assert_eq!(status.device, Some(device()));
        assert_eq!(status.reconnect_attempts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_only_from_disconnected() {
        let h = harness(PrinterConfig::default());
        h.printer.connect(device()).await.unwrap();

        let err = h.printer.connect(device()).await.unwrap_err();
        assert!(matches!(
            err,
            PrintError::InvalidState {
                state: ConnectionState::Connected,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_connect_returns_to_disconnected() {
        let mut h = harness(PrinterConfig::default());
        h.port.fail_connects(true);

        let err = h.printer.connect(device()).await.unwrap_err();
        assert!(matches!(err, PrintError::Connection(_)));
        assert_eq!(h.printer.state(), ConnectionState::Disconnected);

        let states: Vec<_> = h
            .events
            .drain_seen()
            .into_iter()
            .filter_map(|e| match e {
                Recorded::State(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(
            states,
            vec![ConnectionState::Connecting, ConnectionState::Disconnected]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_last_known() {
        let h = harness(PrinterConfig::default());
        assert!(matches!(
            h.printer.connect_last_known().await,
            Err(PrintError::NoKnownDevice)
        ));

        h.printer.connect(device()).await.unwrap();
        h.printer.shutdown().await.unwrap();

        // Fresh manager over the same store, as after an app restart.
        let restarted = PrinterManager::new(
            h.port.clone(),
            Arc::new(h.store.clone()),
            PrinterConfig::default(),
        )
        .unwrap()
        .spawn();

        assert_eq!(restarted.connect_last_known().await.unwrap(), device());
        assert_eq!(restarted.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_print_when_connected() {
        let mut h = harness(PrinterConfig::default());
        h.printer.connect(device()).await.unwrap();

        let receipt = job("Bill #1042");
        let id = receipt.id.clone();
        assert_eq!(h.printer.print(receipt).await.unwrap(), PrintOutcome::Printed);

        h.events.wait_for(Recorded::Printed(id)).await;
        assert_eq!(h.port.writes(), vec![b"Bill #1042".to_vec()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_jobs_print_in_order_on_connect() {
        let h = harness(PrinterConfig::default());

        for (n, text) in ["KOT T1", "KOT T2", "Bill T1"].iter().enumerate() {
            let outcome = h.printer.print(job(text)).await.unwrap();
            assert_eq!(outcome, PrintOutcome::Queued { position: n + 1 });
        }
        assert!(h.port.writes().is_empty());

        h.printer.connect(device()).await.unwrap();

        assert_eq!(
            h.port.writes(),
            vec![b"KOT T1".to_vec(), b"KOT T2".to_vec(), b"Bill T1".to_vec()]
        );
        assert_eq!(h.printer.status().await.unwrap().queued_jobs, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_full() {
        let h = harness(PrinterConfig::default());

        for n in 0..10 {
            h.printer.print(job(&format!("job {n}"))).await.unwrap();
        }

        let err = h.printer.print(job("one too many")).await.unwrap_err();
        assert!(matches!(err, PrintError::QueueFull { capacity: 10 }));
        assert_eq!(h.printer.status().await.unwrap().queued_jobs, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_reconnect_attempts() {
        let mut config = PrinterConfig::default();
        config.reconnect.max_attempts = 5;
        let mut h = harness(config);

        h.printer.connect(device()).await.unwrap();
        h.port.fail_connects(true);
        h.printer.notify_link_lost().await.unwrap();

        h.events.wait_for(Recorded::ManualReconnect(device().id)).await;

        assert_eq!(h.printer.state(), ConnectionState::Disconnected);
        assert_eq!(h.port.connect_count(), 1 + 5);
        assert_eq!(h.printer.status().await.unwrap().reconnect_attempts, 5);

        // No further attempts once given up.
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(h.port.connect_count(), 1 + 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_delays_follow_capped_backoff() {
        let mut config = PrinterConfig::default();
        config.reconnect.base_delay_ms = 100;
        config.reconnect.multiplier = 2.0;
        config.reconnect.max_delay_ms = 400;
        config.reconnect.max_attempts = 6;
        let max_delay = Duration::from_millis(400);
        let mut h = harness(config.clone());

        h.printer.connect(device()).await.unwrap();
        h.port.fail_connects(true);
        let lost_at = Instant::now();
        h.printer.notify_link_lost().await.unwrap();

        h.events.wait_for(Recorded::ManualReconnect(device().id)).await;

        let mut previous = lost_at;
        let times = h.port.connect_times();
        let attempts = &times[1..];
        assert_eq!(attempts.len(), 6);

        for (n, at) in attempts.iter().enumerate() {
            let gap = *at - previous;
            assert!(gap <= max_delay, "attempt {n} waited {gap:?}");
            assert_eq!(
                gap.as_millis(),
                delay_for_attempt(&config.reconnect, n as u32).as_millis()
            );
            previous = *at;
        }
        assert_eq!(h.printer.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_resumes_queue() {
        let mut h = harness(PrinterConfig::default());
        h.printer.connect(device()).await.unwrap();

        h.port.fail_next_connects(2);
        h.printer.notify_link_lost().await.unwrap();

        let kot = job("KOT T4");
        let id = kot.id.clone();
        assert_eq!(
            h.printer.print(kot).await.unwrap(),
            PrintOutcome::Queued { position: 1 }
        );

        h.events.wait_for(Recorded::Printed(id)).await;
        assert_eq!(h.printer.state(), ConnectionState::Connected);
        assert_eq!(h.port.connect_count(), 1 + 3);
        assert_eq!(h.printer.status().await.unwrap().reconnect_attempts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_failure_triggers_reconnect() {
        let mut h = harness(PrinterConfig::default());
        h.printer.connect(device()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(h.port.writes(), vec![STATUS_PROBE.to_vec()]);

        h.port.fail_writes(true);
        h.events.wait_for(Recorded::State(ConnectionState::Reconnecting)).await;

        h.port.fail_writes(false);
        h.events.wait_for(Recorded::State(ConnectionState::Connected)).await;
        assert_eq!(h.port.connect_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_dropped_after_three_retries() {
        let mut h = harness(PrinterConfig::default());
        h.printer.connect(device()).await.unwrap();
        h.port.fail_writes(true);

        let bill = job("Bill #7");
        let id = bill.id.clone();
        assert_eq!(
            h.printer.print(bill).await.unwrap(),
            PrintOutcome::Queued { position: 1 }
        );

        h.events.wait_for(Recorded::JobFailed(id)).await;
        assert_eq!(h.port.write_count(b"Bill #7"), 4);

        // Dropped for good: later reconnects never write it again.
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(h.port.write_count(b"Bill #7"), 4);
        assert_eq!(h.printer.status().await.unwrap().queued_jobs, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_cancels_reconnect_and_resets_jobs() {
        let mut config = PrinterConfig::default();
        config.queue.max_job_retries = 1;
        let h = harness(config);

        h.printer.connect(device()).await.unwrap();
        h.port.fail_writes(true);
        h.port.fail_connects(true);
        h.printer.print(job("Bill #9")).await.unwrap();
        assert_eq!(h.printer.state(), ConnectionState::Reconnecting);

        h.printer.disconnect().await.unwrap();
        assert_eq!(h.printer.state(), ConnectionState::Disconnected);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(h.port.connect_count(), 1);

        // One failed write before the disconnect was forgotten, so this
        // failure is the job's first again and it stays queued.
        h.port.fail_connects(false);
        h.printer.connect(device()).await.unwrap();
        let status = h.printer.status().await.unwrap();
        assert_eq!(status.state, ConnectionState::Reconnecting);
        assert_eq!(status.queued_jobs, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_link_loss_ignored_when_disconnected() {
        let h = harness(PrinterConfig::default());

        h.printer.notify_link_lost().await.unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(h.printer.state(), ConnectionState::Disconnected);
        assert_eq!(h.port.connect_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_manager() {
        let h = harness(PrinterConfig::default());
        h.printer.connect(device()).await.unwrap();

        h.printer.shutdown().await.unwrap();

        assert!(matches!(h.printer.status().await, Err(PrintError::ManagerStopped)));
        assert_eq!(h.printer.state(), ConnectionState::Disconnected);
    }
}
