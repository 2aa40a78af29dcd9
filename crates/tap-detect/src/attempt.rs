//! One in-flight handshake attempt
//!
//! Each eligible candidate gets its own spawned task: open the port,
//! send a ping, then race the first recognized ping response against a
//! bounded-wait deadline. The task reports exactly one resolution back
//! to the detector actor, whichever trigger fires first; anything a
//! device sends after that lands on a closed connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::detector::DetectorCommand;
use crate::link::HandshakeLink;
use crate::transport::{CandidateDevice, Transport};

/// Bounded wait applied to each handshake attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum WaitTimeout {
    /// Wait up to the given duration for the ping response
    Bounded(Duration),
    /// Do not wait: resolve as soon as the ping has been sent
    ///
    /// A response already delivered by then still counts as a
    /// confirmation. This keeps headless and test runs from hanging on
    /// devices that never answer, while remaining deterministic.
    Immediate,
}

impl WaitTimeout {
    /// The deadline duration this wait maps to
    pub(crate) fn bound(&self) -> Duration {
        match self {
            WaitTimeout::Bounded(d) => *d,
            WaitTimeout::Immediate => Duration::ZERO,
        }
    }
}

impl Default for WaitTimeout {
    fn default() -> Self {
        WaitTimeout::Bounded(Duration::from_millis(100))
    }
}

/// Run one handshake attempt to resolution and report it
///
/// Sends exactly one `AttemptResolved` message, which is what makes
/// duplicate resolution structurally impossible.
pub(crate) async fn run_attempt<T: Transport>(
    transport: Arc<T>,
    device: CandidateDevice,
    wait: WaitTimeout,
    cmd_tx: mpsc::Sender<DetectorCommand>,
) {
    let confirmed = handshake(transport.as_ref(), &device, wait).await;
    let _ = cmd_tx
        .send(DetectorCommand::AttemptResolved { device, confirmed })
        .await;
}

/// Verify one candidate: true iff a recognized ping response arrived
/// before the deadline
async fn handshake<T: Transport>(
    transport: &T,
    device: &CandidateDevice,
    wait: WaitTimeout,
) -> bool {
    let io = match transport.open(&device.path) {
        Ok(io) => io,
        Err(e) => {
            warn!("Failed to open {}: {}", device.path, e);
            return false;
        }
    };

    let mut link = HandshakeLink::new(io);
    if let Err(e) = link.send_ping().await {
        warn!("Failed to send ping to {}: {}", device.path, e);
        return false;
    }

    let deadline = tokio::time::sleep(wait.bound());
    tokio::pin!(deadline);
    let mut link_open = true;

    loop {
        tokio::select! {
            // A response already delivered beats a simultaneous deadline
            biased;
            resp = link.recv(), if link_open => match resp {
                Some(resp) if resp.is_ping() => {
                    debug!("Reader confirmed at {}", device.path);
                    return true;
                }
                Some(resp) => {
                    debug!("Ignoring non-ping response from {}: {:?}", device.path, resp);
                }
                None => {
                    // Connection closed; wait out the deadline
                    link_open = false;
                }
            },
            _ = &mut deadline => {
                debug!("Handshake at {} resolved without confirmation", device.path);
                return false;
            }
        }
    }
}
