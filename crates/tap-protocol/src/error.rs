//! Error types for frame parsing and response resolution

use thiserror::Error;

/// Errors that can occur while parsing framed data
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Buffer is incomplete - need more data
    #[error("incomplete frame: need {needed} more bytes")]
    Incomplete { needed: usize },

    /// Invalid frame structure
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Checksum mismatch
    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}

/// Higher-level protocol errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Parse error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Response command code is not part of the system family
    #[error("unrecognized response: 0x{0:02X}")]
    UnrecognizedResponse(u8),

    /// Response payload does not match its command code
    #[error("malformed response payload for 0x{command:02X}: {reason}")]
    MalformedPayload { command: u8, reason: String },
}
