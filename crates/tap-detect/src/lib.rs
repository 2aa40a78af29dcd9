//! Tappy Reader Autodetection Library
//!
//! This crate finds TapTrack Tappy NFC readers among the serial devices
//! attached to the host. Enumerated ports are filtered by USB vendor id
//! and every surviving candidate is verified with a concurrent ping
//! handshake under an independent bounded wait.
//!
//! # Example
//!
//! ```rust,no_run
//! use tap_detect::{Detector, DetectorConfig};
//!
//! # async fn demo() {
//! let detector = Detector::new(DetectorConfig::default());
//!
//! detector
//!     .set_confirmed_callback(|device| println!("Found reader: {}", device.path))
//!     .await;
//! detector
//!     .set_status_callback(|scanning| println!("Scanning: {}", scanning))
//!     .await;
//!
//! detector.scan().await;
//! # }
//! ```

pub mod attempt;
pub mod detector;
pub mod error;
pub mod link;
pub mod transport;

pub use attempt::WaitTimeout;
pub use detector::{Detector, DetectorCommand, DetectorConfig};
pub use error::DetectError;
pub use link::HandshakeLink;
pub use transport::{
    CandidateDevice, SerialTransport, Transport, DEFAULT_BAUD_RATE, TARGET_VENDOR_ID,
};
