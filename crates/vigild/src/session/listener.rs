//! Inbound side of the client connection.

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use vigil_protocol::MAX_LINE_LENGTH;

use super::SessionError;
use crate::monitor::LoopExit;

/// Boxed read half of the client connection.
pub type ClientReader = Box<dyn AsyncRead + Send + Unpin>;

/// Watches the client link for disconnects.
///
/// Inbound bytes carry no protocol; they are logged and dropped. A zero-byte
/// read means the client hung up.
pub struct ClientLinkListener {
    reader: ClientReader,
    cancel_token: CancellationToken,
    bytes_received: u64,
}

impl ClientLinkListener {
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            cancel_token,
            bytes_received: 0,
        }
    }

    /// Total inbound bytes seen so far.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Reads until EOF, a read error, or cancellation.
    pub async fn run(&mut self) -> Result<LoopExit, SessionError> {
        let mut buffer = vec![0u8; MAX_LINE_LENGTH];

        loop {
            let read = tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => {
                    debug!("Link listener cancelled");
                    return Ok(LoopExit::Cancelled);
                }

                result = self.reader.read(&mut buffer) => result,
            };

            match read {
                Ok(0) => {
                    info!(bytes_received = self.bytes_received, "Client closed the connection");
                    return Ok(LoopExit::LinkClosed);
                }
                Ok(n) => {
                    self.bytes_received += n as u64;
                    if let Some(chunk) = buffer.get(..n) {
                        let text = String::from_utf8_lossy(chunk);
                        info!(bytes = n, message = %text.trim_end(), "Client message");
                    }
                }
                Err(e) => {
                    debug!(error = %e, "Client read failed");
                    return Err(SessionError::Read(e.to_string()));
                }
            }
        }
    }
}
