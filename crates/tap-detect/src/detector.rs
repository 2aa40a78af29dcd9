//! Reader detection actor
//!
//! This module provides the scan orchestrator. All scan state lives in
//! a single actor task: `scan()`/`stop()` entry points and attempt
//! resolutions arrive as messages on one channel, so no two of them can
//! interleave their effect on the state. Handshake attempts themselves
//! run concurrently in their own tasks and only report back.
//!
//! Observers hold at most one device-confirmed callback and one status
//! callback (last writer wins). The status callback is edge-triggered:
//! it fires when the aggregate "is scanning" boolean changes, or on the
//! first evaluation ever, never on every internal event.
//!
//! # Example
//!
//! ```rust,no_run
//! use tap_detect::{Detector, DetectorConfig};
//!
//! # async fn demo() {
//! let detector = Detector::new(DetectorConfig::default());
//! detector
//!     .set_confirmed_callback(|device| println!("Reader at {}", device.path))
//!     .await;
//! detector.scan().await;
//! # }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::attempt::{run_attempt, WaitTimeout};
use crate::transport::{CandidateDevice, SerialTransport, Transport};

/// Callback invoked once per confirmed reader
pub type ConfirmedCallback = Box<dyn Fn(&CandidateDevice) + Send>;

/// Callback invoked on each scanning-status edge
pub type StatusCallback = Box<dyn Fn(bool) + Send>;

/// Configuration for a [`Detector`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Bounded wait applied to each handshake attempt
    pub wait_timeout: WaitTimeout,
}

/// Commands sent to the detector actor
pub enum DetectorCommand {
    /// Start a scan: enumerate once and probe every eligible candidate
    Scan {
        /// Acknowledged once all attempts have been spawned
        ack: oneshot::Sender<()>,
    },

    /// Stop reporting: gates future confirmations, does not cancel
    /// in-flight attempts
    Stop {
        /// Acknowledged once the status has been re-evaluated
        ack: oneshot::Sender<()>,
    },

    /// One handshake attempt has resolved
    AttemptResolved {
        /// The candidate the attempt probed
        device: CandidateDevice,
        /// True iff a recognized ping response arrived in time
        confirmed: bool,
    },

    /// Query the aggregate scanning status
    IsScanning {
        /// Channel to send back the current status
        reply: oneshot::Sender<bool>,
    },

    /// Replace the device-confirmed callback
    SetConfirmedCallback(ConfirmedCallback),

    /// Replace the status callback
    SetStatusCallback(StatusCallback),
}

impl std::fmt::Debug for DetectorCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorCommand::Scan { .. } => f.write_str("Scan"),
            DetectorCommand::Stop { .. } => f.write_str("Stop"),
            DetectorCommand::AttemptResolved { device, confirmed } => f
                .debug_struct("AttemptResolved")
                .field("device", device)
                .field("confirmed", confirmed)
                .finish(),
            DetectorCommand::IsScanning { .. } => f.write_str("IsScanning"),
            DetectorCommand::SetConfirmedCallback(_) => f.write_str("SetConfirmedCallback"),
            DetectorCommand::SetStatusCallback(_) => f.write_str("SetStatusCallback"),
        }
    }
}

/// Internal state for the detector actor
struct DetectorState<T: Transport> {
    transport: Arc<T>,
    wait_timeout: WaitTimeout,
    /// True between scan() and stop()
    report_scans: bool,
    /// Attempts spawned but not yet resolved
    outstanding: usize,
    /// Whether any status notification has ever fired
    has_reported: bool,
    /// Last value delivered to the status observer
    last_status: bool,
    on_confirmed: ConfirmedCallback,
    on_status: StatusCallback,
}

impl<T: Transport> DetectorState<T> {
    fn new(config: DetectorConfig, transport: Arc<T>) -> Self {
        Self {
            transport,
            wait_timeout: config.wait_timeout,
            report_scans: false,
            outstanding: 0,
            has_reported: false,
            last_status: false,
            on_confirmed: Box::new(|_| {}),
            on_status: Box::new(|_| {}),
        }
    }

    fn is_scanning(&self) -> bool {
        self.report_scans && self.outstanding > 0
    }

    /// Re-evaluate the aggregate status and notify on edges
    ///
    /// `forced` delivers the current value even without an edge; the
    /// empty-scan path uses it so observers always see at least the
    /// inactive state.
    fn notify_status(&mut self, forced: bool) {
        let current = self.is_scanning();
        if forced || !self.has_reported || current != self.last_status {
            self.has_reported = true;
            self.last_status = current;
            (self.on_status)(current);
        }
    }

    fn handle_scan(&mut self, cmd_tx: &mpsc::WeakSender<DetectorCommand>) {
        self.report_scans = true;

        let devices = match self.transport.enumerate() {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Device enumeration failed: {}", e);
                self.notify_status(true);
                return;
            }
        };

        let eligible: Vec<_> = devices.into_iter().filter(|d| d.is_eligible()).collect();
        if eligible.is_empty() {
            debug!("No eligible candidates found");
            self.notify_status(true);
            return;
        }

        info!("Probing {} candidate device(s)", eligible.len());
        for device in eligible {
            let Some(tx) = cmd_tx.upgrade() else {
                return;
            };
            self.outstanding += 1;
            self.notify_status(false);
            tokio::spawn(run_attempt(
                Arc::clone(&self.transport),
                device,
                self.wait_timeout,
                tx,
            ));
        }
    }

    fn handle_resolved(&mut self, device: CandidateDevice, confirmed: bool) {
        debug_assert!(
            self.outstanding > 0,
            "attempt resolved with none outstanding"
        );
        self.outstanding = self.outstanding.saturating_sub(1);

        if confirmed && self.report_scans {
            (self.on_confirmed)(&device);
        }
        self.notify_status(false);
    }
}

/// Run the detector actor until every handle and attempt has gone away
async fn run_detector_actor<T: Transport>(
    config: DetectorConfig,
    transport: Arc<T>,
    mut cmd_rx: mpsc::Receiver<DetectorCommand>,
    cmd_tx: mpsc::WeakSender<DetectorCommand>,
) {
    let mut state = DetectorState::new(config, transport);
    debug!("Detector actor started");

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            DetectorCommand::Scan { ack } => {
                state.handle_scan(&cmd_tx);
                let _ = ack.send(());
            }
            DetectorCommand::Stop { ack } => {
                state.report_scans = false;
                state.notify_status(false);
                let _ = ack.send(());
            }
            DetectorCommand::AttemptResolved { device, confirmed } => {
                state.handle_resolved(device, confirmed);
            }
            DetectorCommand::IsScanning { reply } => {
                let _ = reply.send(state.is_scanning());
            }
            DetectorCommand::SetConfirmedCallback(cb) => state.on_confirmed = cb,
            DetectorCommand::SetStatusCallback(cb) => state.on_status = cb,
        }
    }

    debug!("Detector actor stopped");
}

/// Handle to a running detector
///
/// Cloneable; all clones talk to the same actor. The actor exits once
/// every handle is dropped and all in-flight attempts have resolved.
#[derive(Debug, Clone)]
pub struct Detector {
    cmd_tx: mpsc::Sender<DetectorCommand>,
}

impl Detector {
    /// Create a detector over the host's real serial ports
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: DetectorConfig) -> Self {
        Self::with_transport(config, SerialTransport::new())
    }

    /// Create a detector over a custom transport
    pub fn with_transport<T: Transport>(config: DetectorConfig, transport: T) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let weak_tx = cmd_tx.downgrade();
        tokio::spawn(run_detector_actor(
            config,
            Arc::new(transport),
            cmd_rx,
            weak_tx,
        ));
        Self { cmd_tx }
    }

    /// Start a scan
    ///
    /// Enumerates devices once and spawns one handshake attempt per
    /// eligible candidate. Returns once all attempts are in flight (or
    /// immediately, after a forced status notification, when nothing is
    /// eligible). Never fails: transport problems degrade to "no reader
    /// confirmed" and are logged.
    pub async fn scan(&self) {
        let (ack, done) = oneshot::channel();
        if self
            .cmd_tx
            .send(DetectorCommand::Scan { ack })
            .await
            .is_ok()
        {
            let _ = done.await;
        }
    }

    /// Stop reporting scan results
    ///
    /// In-flight attempts run to completion; their confirmations are
    /// suppressed while stopped.
    pub async fn stop(&self) {
        let (ack, done) = oneshot::channel();
        if self
            .cmd_tx
            .send(DetectorCommand::Stop { ack })
            .await
            .is_ok()
        {
            let _ = done.await;
        }
    }

    /// True while a scan is active and attempts are outstanding
    pub async fn is_scanning(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(DetectorCommand::IsScanning { reply })
            .await
            .is_err()
        {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Replace the device-confirmed callback (last writer wins)
    pub async fn set_confirmed_callback<F>(&self, cb: F)
    where
        F: Fn(&CandidateDevice) + Send + 'static,
    {
        let _ = self
            .cmd_tx
            .send(DetectorCommand::SetConfirmedCallback(Box::new(cb)))
            .await;
    }

    /// Replace the status callback (last writer wins)
    pub async fn set_status_callback<F>(&self, cb: F)
    where
        F: Fn(bool) + Send + 'static,
    {
        let _ = self
            .cmd_tx
            .send(DetectorCommand::SetStatusCallback(Box::new(cb)))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::io::DuplexStream;

    /// Transport stub that enumerates a fixed list and never opens
    struct ListTransport {
        devices: Vec<CandidateDevice>,
    }

    impl Transport for ListTransport {
        type Io = DuplexStream;

        fn enumerate(&self) -> Result<Vec<CandidateDevice>, crate::DetectError> {
            Ok(self.devices.clone())
        }

        fn open(&self, path: &str) -> Result<Self::Io, crate::DetectError> {
            Err(crate::DetectError::OpenFailed {
                port: path.to_string(),
                reason: "stub".to_string(),
            })
        }
    }

    fn status_edges(state: &mut DetectorState<ListTransport>) -> Arc<Mutex<Vec<bool>>> {
        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reported);
        state.on_status = Box::new(move |status| sink.lock().unwrap().push(status));
        reported
    }

    fn state_with(devices: Vec<CandidateDevice>) -> DetectorState<ListTransport> {
        DetectorState::new(
            DetectorConfig::default(),
            Arc::new(ListTransport { devices }),
        )
    }

    #[test]
    fn test_first_notification_always_reports() {
        let mut state = state_with(vec![]);
        let reported = status_edges(&mut state);

        state.notify_status(false);

        assert_eq!(*reported.lock().unwrap(), vec![false]);
    }

    #[test]
    fn test_unchanged_status_is_debounced() {
        let mut state = state_with(vec![]);
        let reported = status_edges(&mut state);

        state.notify_status(false);
        state.notify_status(false);
        state.notify_status(false);

        assert_eq!(*reported.lock().unwrap(), vec![false]);
    }

    #[test]
    fn test_forced_notification_bypasses_debounce() {
        let mut state = state_with(vec![]);
        let reported = status_edges(&mut state);

        state.notify_status(false);
        state.notify_status(true);

        assert_eq!(*reported.lock().unwrap(), vec![false, false]);
    }

    #[test]
    fn test_edge_reported_once_per_transition() {
        let mut state = state_with(vec![]);
        let reported = status_edges(&mut state);

        state.report_scans = true;
        state.outstanding = 2;
        state.notify_status(false);
        state.notify_status(false);

        state.outstanding = 1;
        state.notify_status(false);
        state.outstanding = 0;
        state.notify_status(false);

        assert_eq!(*reported.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_is_scanning_requires_both_conditions() {
        let mut state = state_with(vec![]);

        assert!(!state.is_scanning());
        state.report_scans = true;
        assert!(!state.is_scanning());
        state.outstanding = 1;
        assert!(state.is_scanning());
        state.report_scans = false;
        assert!(!state.is_scanning());
    }

    #[test]
    fn test_stopped_resolution_suppresses_confirmation() {
        let mut state = state_with(vec![]);
        let confirmed = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&confirmed);
        state.on_confirmed = Box::new(move |d| sink.lock().unwrap().push(d.path.clone()));

        state.report_scans = false;
        state.outstanding = 1;
        state.handle_resolved(
            CandidateDevice {
                path: "/dev/ttyUSB0".to_string(),
                vendor_id: Some(crate::TARGET_VENDOR_ID),
            },
            true,
        );

        assert!(confirmed.lock().unwrap().is_empty());
        assert_eq!(state.outstanding, 0);
    }
}
