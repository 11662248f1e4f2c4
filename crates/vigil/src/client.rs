//! Daemon connection for the watch client.
//!
//! This module provides the `WatchClient` which handles:
//! - Connection to the daemon over TCP, retried with exponential backoff
//! - Parsing received lines into [`MonitorMessage`]s
//! - Optional `ping` keep-alives back to the daemon
//!
//! The daemon serves one session per process, so the client does not
//! reconnect after the link closes. It reports the end and returns.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use vigil_protocol::{MonitorMessage, KEEPALIVE_LINE};

use crate::error::Result;

/// Address the client dials when none is given.
pub const DEFAULT_DAEMON_ADDR: &str = "127.0.0.1:8080";

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the watch client.
///
/// # Example
///
/// ```rust
/// use vigil_client::WatchConfig;
/// use std::time::Duration;
///
/// let config = WatchConfig {
///     addr: "192.168.0.20:8080".to_string(),
///     keepalive: Some(Duration::from_secs(30)),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Daemon address as `host:port`.
    pub addr: String,

    /// Initial delay before the first retry after a failed connect.
    pub retry_initial_delay: Duration,

    /// Maximum delay between retry attempts.
    pub retry_max_delay: Duration,

    /// Multiplier for exponential backoff (e.g., 2.0 doubles delay each retry).
    pub retry_multiplier: f64,

    /// Period between `ping` lines; `None` sends nothing.
    pub keepalive: Option<Duration>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_DAEMON_ADDR.to_string(),
            retry_initial_delay: Duration::from_millis(500),
            retry_max_delay: Duration::from_secs(5),
            retry_multiplier: 2.0,
            keepalive: None,
        }
    }
}

impl WatchConfig {
    /// Delay to wait after one that just elapsed.
    fn next_delay(&self, delay: Duration) -> Duration {
        let next_ms = (delay.as_millis() as f64 * self.retry_multiplier) as u64;
        Duration::from_millis(next_ms).min(self.retry_max_delay)
    }
}

// ============================================================================
// Events
// ============================================================================

/// What the watch task reports to its consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// The TCP connection is up.
    Connected {
        /// Address that was dialled.
        addr: String,
    },

    /// A line that parsed as a known message.
    Message {
        received_at: DateTime<Local>,
        message: MonitorMessage,
    },

    /// A line that did not parse; kept verbatim without its line ending.
    Unparsed {
        received_at: DateTime<Local>,
        line: String,
    },

    /// The connection is gone.
    Disconnected,
}

/// Why [`WatchClient::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEnd {
    /// The daemon closed its side of the connection.
    DaemonClosed,

    /// The cancellation token fired.
    Cancelled,
}

// ============================================================================
// Watch Client
// ============================================================================

/// Client that follows the daemon's message stream.
///
/// # Example
///
/// ```rust,ignore
/// use vigil_client::{WatchClient, WatchConfig};
/// use tokio::sync::mpsc;
/// use tokio_util::sync::CancellationToken;
///
/// let (tx, mut rx) = mpsc::unbounded_channel();
/// let client = WatchClient::new(WatchConfig::default(), tx, CancellationToken::new());
///
/// tokio::spawn(async move { client.run().await });
/// while let Some(event) = rx.recv().await {
///     println!("{event:?}");
/// }
/// ```
pub struct WatchClient {
    config: WatchConfig,
    event_tx: mpsc::UnboundedSender<WatchEvent>,
    cancel_token: CancellationToken,
}

impl WatchClient {
    /// Creates a new watch client.
    ///
    /// # Arguments
    ///
    /// * `config` - Connection behaviour
    /// * `event_tx` - Channel receiving everything the client observes
    /// * `cancel_token` - Token for signaling shutdown
    #[must_use]
    pub fn new(
        config: WatchConfig,
        event_tx: mpsc::UnboundedSender<WatchEvent>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            event_tx,
            cancel_token,
        }
    }

    /// Connects, then follows the stream until it ends.
    ///
    /// Returns `WatchEnd::Cancelled` if the token fires before or during the
    /// session, `WatchEnd::DaemonClosed` when the daemon hangs up, and an
    /// error if the established link fails.
    pub async fn run(&self) -> Result<WatchEnd> {
        info!(addr = %self.config.addr, "Watch client starting");

        let Some(stream) = self.connect_with_retry().await else {
            info!("Watch client shutting down (cancelled)");
            return Ok(WatchEnd::Cancelled);
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "Failed to set TCP_NODELAY");
        }
        info!(addr = %self.config.addr, "Connected to daemon");
        let _ = self.event_tx.send(WatchEvent::Connected {
            addr: self.config.addr.clone(),
        });

        let (reader, writer) = stream.into_split();
        let result = self.follow(BufReader::new(reader), writer).await;

        // The consumer may already be gone; nothing to do about it here.
        let _ = self.event_tx.send(WatchEvent::Disconnected);
        result
    }

    /// Attempts to connect with exponential backoff.
    ///
    /// Retries indefinitely; returns `None` only when cancelled.
    async fn connect_with_retry(&self) -> Option<TcpStream> {
        let mut delay = self.config.retry_initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt = attempt.saturating_add(1);
            debug!(attempt, addr = %self.config.addr, "Attempting to connect to daemon");

            let connect = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => return None,
                result = TcpStream::connect(self.config.addr.as_str()) => result,
            };

            match connect {
                Ok(stream) => {
                    debug!(attempt, "Connection successful");
                    return Some(stream);
                }
                Err(e) if attempt == 1 => {
                    info!(addr = %self.config.addr, error = %e, "Daemon not reachable, will retry");
                }
                Err(e) => {
                    debug!(attempt, error = %e, "Connection attempt failed");
                }
            }

            tokio::select! {
                _ = sleep(delay) => {
                    delay = self.config.next_delay(delay);
                }
                _ = self.cancel_token.cancelled() => {
                    info!("Connection retry cancelled");
                    return None;
                }
            }
        }
    }

    /// Reads lines until EOF or cancellation, interleaving keep-alives.
    async fn follow<R, W>(&self, mut reader: R, mut writer: W) -> Result<WatchEnd>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut ticker = self
            .config
            .keepalive
            .filter(|period| !period.is_zero())
            .map(|period| {
                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker
            });

        // `read_until` keeps partial bytes in `line` when a tick wins the
        // race, so the buffer is only cleared after a complete line.
        let mut line = Vec::new();

        loop {
            tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => {
                    debug!("Watch loop cancelled");
                    return Ok(WatchEnd::Cancelled);
                }

                read = reader.read_until(b'\n', &mut line) => {
                    if read? == 0 {
                        if !line.is_empty() {
                            self.handle_line(&String::from_utf8_lossy(&line));
                        }
                        info!("Daemon closed the connection");
                        return Ok(WatchEnd::DaemonClosed);
                    }
                    if line.ends_with(b"\n") {
                        self.handle_line(&String::from_utf8_lossy(&line));
                        line.clear();
                    }
                }

                _ = next_tick(&mut ticker) => {
                    writer.write_all(KEEPALIVE_LINE.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                    writer.flush().await?;
                    debug!("Sent keep-alive");
                }
            }
        }
    }

    /// Parses one received line and forwards it.
    fn handle_line(&self, raw: &str) {
        let received_at = Local::now();
        let text = raw.trim_end_matches(['\r', '\n']);

        let event = match text.parse::<MonitorMessage>() {
            Ok(message) => {
                if message.is_alert() {
                    info!(%message, "Alert from daemon");
                } else {
                    debug!(%message, "Status from daemon");
                }
                WatchEvent::Message {
                    received_at,
                    message,
                }
            }
            Err(e) => {
                debug!(error = %e, "Unrecognized line from daemon");
                WatchEvent::Unparsed {
                    received_at,
                    line: text.to_string(),
                }
            }
        };

        let _ = self.event_tx.send(event);
    }
}

/// Waits for the next keep-alive tick, or forever when disabled.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

// ============================================================================
// Tests
// ============================================================================
