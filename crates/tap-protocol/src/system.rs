//! System command family
//!
//! The system family carries the reader's housekeeping exchanges. The
//! only member the detector needs is the ping: a ping command answered
//! by a ping response proves the device on the other end of the serial
//! link really is a reader and not some other FTDI-bridged peripheral.

use crate::error::ProtocolError;
use crate::frame::Frame;

/// Command code for a ping
pub const CMD_PING: u8 = 0x01;

/// Response code for a ping response
pub const RESP_PING: u8 = 0x81;

/// Response code for a system error report
pub const RESP_SYSTEM_ERROR: u8 = 0x7F;

/// Commands the detector can send to a reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemCommand {
    /// Ask the reader to identify itself
    Ping,
}

impl SystemCommand {
    /// Encode this command to its wire format
    pub fn encode(&self) -> Vec<u8> {
        match self {
            SystemCommand::Ping => Frame::new(CMD_PING, Vec::new()).encode(),
        }
    }
}

/// Recognized responses from a reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemResponse {
    /// The reader answered a ping
    Ping,
    /// The reader reported a system-level error
    SystemError {
        /// Reader-defined error code
        code: u8,
    },
}

impl SystemResponse {
    /// True if this is a ping response
    pub fn is_ping(&self) -> bool {
        matches!(self, SystemResponse::Ping)
    }
}

/// Resolve a decoded frame into a recognized system response
///
/// Frames that are not part of the system family resolve to an error;
/// callers decide whether that is fatal (for the detector it never is,
/// unrecognized traffic is simply ignored).
pub fn resolve_response(frame: &Frame) -> Result<SystemResponse, ProtocolError> {
    match frame.command {
        RESP_PING => {
            if !frame.payload.is_empty() {
                return Err(ProtocolError::MalformedPayload {
                    command: frame.command,
                    reason: format!("unexpected {} payload bytes", frame.payload.len()),
                });
            }
            Ok(SystemResponse::Ping)
        }
        RESP_SYSTEM_ERROR => Ok(SystemResponse::SystemError {
            code: frame.payload.first().copied().unwrap_or(0),
        }),
        other => Err(ProtocolError::UnrecognizedResponse(other)),
    }
}

/// Encode a ping response frame (used by simulated readers in tests)
pub fn encode_ping_response() -> Vec<u8> {
    Frame::new(RESP_PING, Vec::new()).encode()
}

/// Encode a system error frame (used by simulated readers in tests)
pub fn encode_system_error(code: u8) -> Vec<u8> {
    Frame::new(RESP_SYSTEM_ERROR, vec![code]).encode()
}
