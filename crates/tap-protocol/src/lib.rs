//! Tappy Reader Protocol Library
//!
//! This crate provides the byte-level link framing and the system
//! command family used to talk to TapTrack Tappy NFC readers over a
//! serial connection.
//!
//! # Architecture
//!
//! - [`frame`] provides a streaming frame codec that handles partial
//!   data and resynchronizes after garbage or corrupt frames
//! - [`system`] provides the ping command/response catalog used by the
//!   autodetector's handshake
//!
//! # Example
//!
//! ```rust
//! use tap_protocol::{FrameCodec, SystemCommand};
//!
//! // Parse a ping command echoed back over the wire
//! let mut codec = FrameCodec::new();
//! codec.push_bytes(&SystemCommand::Ping.encode());
//!
//! let frame = codec.next_frame().unwrap();
//! assert_eq!(frame.command, tap_protocol::system::CMD_PING);
//! ```

pub mod error;
pub mod frame;
pub mod system;

pub use error::{ParseError, ProtocolError};
pub use frame::{Frame, FrameCodec, START_BYTE};
pub use system::{
    encode_ping_response, encode_system_error, resolve_response, SystemCommand, SystemResponse,
};
