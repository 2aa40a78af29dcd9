//! Serial transport seam
//!
//! This module provides device enumeration and connection opening. The
//! detector talks to the platform only through the [`Transport`] trait,
//! so tests can substitute simulated devices for real serial ports.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serialport::{available_ports, SerialPortType};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

use crate::error::DetectError;

/// USB vendor id of the FTDI bridge chip carried by Tappy readers
///
/// This is a hardware-identity filter, not a confirmation: other FTDI
/// devices pass it too, which is why eligible candidates still go
/// through the ping handshake.
pub const TARGET_VENDOR_ID: u16 = 0x0403;

/// Default baud rate for reader connections
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// A device descriptor as reported by enumeration, not yet verified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDevice {
    /// Platform device path (e.g., /dev/ttyUSB0, COM3)
    pub path: String,
    /// USB vendor id (None for non-USB ports)
    pub vendor_id: Option<u16>,
}

impl CandidateDevice {
    /// True if this candidate's vendor id matches the target hardware
    pub fn is_eligible(&self) -> bool {
        self.vendor_id == Some(TARGET_VENDOR_ID)
    }
}

/// Device enumeration and connection opening
///
/// Implementations must be cheap to share across handshake attempts;
/// each attempt opens its own connection.
pub trait Transport: Send + Sync + 'static {
    /// Async byte stream for one open connection
    type Io: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Enumerate currently attached candidate devices
    fn enumerate(&self) -> Result<Vec<CandidateDevice>, DetectError>;

    /// Open a connection to the device at `path`
    fn open(&self, path: &str) -> Result<Self::Io, DetectError>;
}

/// Transport backed by the host's real serial ports
#[derive(Debug, Clone)]
pub struct SerialTransport {
    baud_rate: u32,
}

impl SerialTransport {
    /// Create a transport with the default reader baud rate
    pub fn new() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }

    /// Create a transport with a custom baud rate
    pub fn with_baud_rate(baud_rate: u32) -> Self {
        Self { baud_rate }
    }
}

impl Default for SerialTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SerialTransport {
    type Io = tokio_serial::SerialStream;

    fn enumerate(&self) -> Result<Vec<CandidateDevice>, DetectError> {
        let ports =
            available_ports().map_err(|e| DetectError::EnumerationFailed(e.to_string()))?;

        let result: Vec<_> = ports
            .into_iter()
            .map(|p| {
                let vendor_id = match &p.port_type {
                    SerialPortType::UsbPort(usb) => Some(usb.vid),
                    _ => None,
                };
                CandidateDevice {
                    path: p.port_name,
                    vendor_id,
                }
            })
            .collect();

        if result.is_empty() {
            info!("No serial ports found");
        } else {
            info!("Found {} serial port(s)", result.len());
            for device in &result {
                debug!(
                    "  {} (vendor {})",
                    device.path,
                    device
                        .vendor_id
                        .map(|v| format!("0x{:04X}", v))
                        .unwrap_or_else(|| "none".to_string())
                );
            }
        }

        Ok(result)
    }

    fn open(&self, path: &str) -> Result<Self::Io, DetectError> {
        tokio_serial::new(path, self.baud_rate)
            .timeout(Duration::from_millis(100))
            .open_native_async()
            .map_err(|e| DetectError::OpenFailed {
                port: path.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_vendor_is_eligible() {
        let device = CandidateDevice {
            path: "/dev/ttyUSB0".to_string(),
            vendor_id: Some(TARGET_VENDOR_ID),
        };
        assert!(device.is_eligible());
    }

    #[test]
    fn test_other_vendor_is_not_eligible() {
        let device = CandidateDevice {
            path: "/dev/ttyUSB1".to_string(),
            vendor_id: Some(0x10C4),
        };
        assert!(!device.is_eligible());
    }

    #[test]
    fn test_non_usb_port_is_not_eligible() {
        let device = CandidateDevice {
            path: "/dev/ttyS0".to_string(),
            vendor_id: None,
        };
        assert!(!device.is_eligible());
    }
}
