//! Mutex-guarded writer shared by the monitors.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tokio::time::timeout;
use vigil_protocol::MonitorMessage;

use super::SessionError;

/// Boxed write half of the client connection.
pub type ClientWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// The single outbound stream to the client.
///
/// Cloning is cheap; every clone writes to the same connection. A `send`
/// holds the lock for the whole line and its flush, so lines from
/// concurrent senders never interleave on the wire. No order is promised
/// between lines from different senders.
#[derive(Clone)]
pub struct OutputChannel {
    writer: Arc<Mutex<BufWriter<ClientWriter>>>,
    write_timeout: Duration,
    lines_sent: Arc<AtomicU64>,
}

impl OutputChannel {
    /// Wraps the write half of a connection.
    pub fn new(writer: impl AsyncWrite + Send + Unpin + 'static, write_timeout: Duration) -> Self {
        let writer: ClientWriter = Box::new(writer);
        Self {
            writer: Arc::new(Mutex::new(BufWriter::new(writer))),
            write_timeout,
            lines_sent: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Sends one message as a line.
    pub async fn send(&self, msg: &MonitorMessage) -> Result<(), SessionError> {
        self.send_line(&msg.to_string()).await
    }

    /// Sends `text` followed by `\n` as one contiguous unit.
    pub async fn send_line(&self, text: &str) -> Result<(), SessionError> {
        let mut writer = self.writer.lock().await;

        match timeout(self.write_timeout, async {
            writer.write_all(text.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
            Ok::<(), std::io::Error>(())
        })
        .await
        {
            Ok(Ok(())) => {
                self.lines_sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Ok(Err(e)) => Err(SessionError::Write(e.to_string())),
            Err(_) => Err(SessionError::WriteTimeout),
        }
    }

    /// Number of lines fully written so far.
    pub fn lines_sent(&self) -> u64 {
        self.lines_sent.load(Ordering::Relaxed)
    }

    /// Flushes and shuts down the write half.
    pub async fn close(&self) -> Result<(), SessionError> {
        let mut writer = self.writer.lock().await;
        match timeout(self.write_timeout, writer.shutdown()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SessionError::Write(e.to_string())),
            Err(_) => Err(SessionError::WriteTimeout),
        }
    }
}
