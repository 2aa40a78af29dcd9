//! Streaming frame codec for the reader's serial link
//!
//! Application messages are carried in small binary frames:
//!
//! ```text
//! A5 [len] [cmd] [data...] [ck]
//! ```
//!
//! - `A5`: Start-of-frame marker
//! - `len`: Number of bytes covered by `cmd` plus `data`
//! - `cmd`: Command or response code
//! - `data`: Variable length payload
//! - `ck`: XOR checksum over `len`, `cmd` and `data`
//!
//! The codec is a streaming parser: bytes arrive in arbitrary chunks,
//! garbage between frames is skipped by scanning for the start marker,
//! and frames with a bad checksum are dropped without losing sync.

use tracing::trace;

use crate::error::ParseError;

/// Start-of-frame marker byte
pub const START_BYTE: u8 = 0xA5;

/// Maximum payload length accepted by the codec
const MAX_PAYLOAD_LEN: usize = 64;

/// One decoded application frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command or response code
    pub command: u8,
    /// Payload bytes (may be empty)
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame with the given command code and payload
    pub fn new(command: u8, payload: Vec<u8>) -> Self {
        Self { command, payload }
    }

    /// Encode this frame to its wire format
    pub fn encode(&self) -> Vec<u8> {
        let len = (1 + self.payload.len()) as u8;
        let mut out = Vec::with_capacity(4 + self.payload.len());
        out.push(START_BYTE);
        out.push(len);
        out.push(self.command);
        out.extend_from_slice(&self.payload);
        out.push(checksum(&out[1..]));
        out
    }
}

/// XOR checksum over a byte slice
fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Streaming codec for reader frames
#[derive(Debug, Default)]
pub struct FrameCodec {
    buffer: Vec<u8>,
}

impl FrameCodec {
    /// Create a new codec with an empty buffer
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(64),
        }
    }

    /// Push raw bytes into the codec's buffer
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);

        // Prevent buffer overflow
        let max = (MAX_PAYLOAD_LEN + 4) * 4;
        if self.buffer.len() > max {
            let start = self.buffer.len() - (MAX_PAYLOAD_LEN + 4);
            self.buffer = self.buffer[start..].to_vec();
        }
    }

    /// Try to extract the next complete frame from the buffer
    pub fn next_frame(&mut self) -> Option<Frame> {
        self.next_frame_with_bytes().map(|(frame, _)| frame)
    }

    /// Try to extract the next complete frame along with its raw bytes
    pub fn next_frame_with_bytes(&mut self) -> Option<(Frame, Vec<u8>)> {
        loop {
            let start = self.buffer.iter().position(|&b| b == START_BYTE)?;

            // Drop garbage before the start marker
            if start > 0 {
                trace!("Skipping {} bytes of garbage before frame start", start);
                self.buffer.drain(..start);
            }

            match Self::parse_frame(&self.buffer) {
                Ok((frame, consumed)) => {
                    let raw = self.buffer.drain(..consumed).collect();
                    return Some((frame, raw));
                }
                Err(ParseError::Incomplete { .. }) => return None,
                Err(e) => {
                    // Bad frame: drop the start marker and rescan
                    trace!("Dropping invalid frame: {}", e);
                    self.buffer.drain(..1);
                }
            }
        }
    }

    /// Clear the internal buffer
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Parse one frame from the front of `data`, which must begin with
    /// the start marker. Returns the frame and the number of bytes consumed.
    fn parse_frame(data: &[u8]) -> Result<(Frame, usize), ParseError> {
        // Minimum frame: A5 len cmd ck = 4 bytes
        if data.len() < 4 {
            return Err(ParseError::Incomplete {
                needed: 4 - data.len(),
            });
        }

        let len = data[1] as usize;
        if len == 0 || len > MAX_PAYLOAD_LEN + 1 {
            return Err(ParseError::InvalidFrame(format!("bad length {}", len)));
        }

        // A5 + len byte + (cmd + payload) + ck
        let total = 2 + len + 1;
        if data.len() < total {
            return Err(ParseError::Incomplete {
                needed: total - data.len(),
            });
        }

        let expected = checksum(&data[1..total - 1]);
        let actual = data[total - 1];
        if expected != actual {
            return Err(ParseError::ChecksumMismatch { expected, actual });
        }

        let command = data[2];
        let payload = data[3..total - 1].to_vec();

        Ok((Frame { command, payload }, total))
    }
}
