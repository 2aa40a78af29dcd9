//! Handshake link over an open connection
//!
//! A [`HandshakeLink`] wraps one open byte stream with the frame codec
//! and the system response catalog: it can send a ping and deliver each
//! recognized response that comes back. Unrecognized or corrupt traffic
//! is logged and swallowed so a noisy device cannot resolve an attempt.

use tap_protocol::{resolve_response, FrameCodec, SystemCommand, SystemResponse};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// One verification conversation with one candidate device
pub struct HandshakeLink<T> {
    io: T,
    codec: FrameCodec,
    buffer: Vec<u8>,
}

impl<T> HandshakeLink<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an open connection
    pub fn new(io: T) -> Self {
        Self {
            io,
            codec: FrameCodec::new(),
            buffer: vec![0u8; 256],
        }
    }

    /// Send one ping command
    pub async fn send_ping(&mut self) -> Result<(), std::io::Error> {
        self.io.write_all(&SystemCommand::Ping.encode()).await?;
        self.io.flush().await
    }

    /// Receive the next recognized response
    ///
    /// Returns `None` once the connection is closed or fails; nothing
    /// more can arrive after that. Cancellation-safe: the codec buffer
    /// persists across polls, so a cancelled read loses no frames.
    pub async fn recv(&mut self) -> Option<SystemResponse> {
        loop {
            while let Some(frame) = self.codec.next_frame() {
                match resolve_response(&frame) {
                    Ok(resp) => return Some(resp),
                    Err(e) => debug!("Ignoring unrecognized frame: {}", e),
                }
            }

            match self.io.read(&mut self.buffer).await {
                Ok(0) => return None,
                Ok(n) => self.codec.push_bytes(&self.buffer[..n]),
                Err(e) => {
                    debug!("Link read error: {}", e);
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tap_protocol::system::CMD_PING;
    use tap_protocol::{encode_ping_response, encode_system_error};

    #[tokio::test]
    async fn test_recv_skips_garbage_and_delivers_response() {
        let (near, mut far) = tokio::io::duplex(256);
        let mut link = HandshakeLink::new(near);

        far.write_all(&[0x00, 0x13, 0x37]).await.unwrap();
        far.write_all(&encode_ping_response()).await.unwrap();

        let resp = link.recv().await.unwrap();
        assert!(resp.is_ping());
    }

    #[tokio::test]
    async fn test_recv_delivers_each_recognized_response() {
        let (near, mut far) = tokio::io::duplex(256);
        let mut link = HandshakeLink::new(near);

        far.write_all(&encode_system_error(0x02)).await.unwrap();
        far.write_all(&encode_ping_response()).await.unwrap();

        assert_eq!(
            link.recv().await,
            Some(SystemResponse::SystemError { code: 0x02 })
        );
        assert_eq!(link.recv().await, Some(SystemResponse::Ping));
    }

    #[tokio::test]
    async fn test_recv_returns_none_on_eof() {
        let (near, far) = tokio::io::duplex(256);
        let mut link = HandshakeLink::new(near);

        drop(far);
        assert_eq!(link.recv().await, None);
    }

    #[tokio::test]
    async fn test_send_ping_writes_a_ping_frame() {
        let (near, mut far) = tokio::io::duplex(256);
        let mut link = HandshakeLink::new(near);

        link.send_ping().await.unwrap();

        let mut buf = vec![0u8; 16];
        let n = far.read(&mut buf).await.unwrap();
        let mut codec = FrameCodec::new();
        codec.push_bytes(&buf[..n]);
        assert_eq!(codec.next_frame().unwrap().command, CMD_PING);
    }
}
