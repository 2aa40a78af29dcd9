//! Error types for reader detection

use thiserror::Error;

/// Errors that can occur during detection
///
/// These surface from the transport seam only; the detector itself
/// never propagates them to its callers. A candidate whose transport
/// fails simply ends up unconfirmed.
#[derive(Debug, Error)]
pub enum DetectError {
    /// Failed to enumerate serial ports
    #[error("failed to enumerate ports: {0}")]
    EnumerationFailed(String),

    /// Failed to open serial port
    #[error("failed to open port {port}: {reason}")]
    OpenFailed { port: String, reason: String },

    /// I/O error on an open connection
    #[error("I/O error on {port}: {reason}")]
    IoError { port: String, reason: String },

    /// Serial port error
    #[error("serial port error: {0}")]
    SerialPort(#[from] serialport::Error),
}
