//! One client session: three concurrent loops over one connection.
//!
//! # Lifecycle
//!
//! ```text
//! Listening ──accept──▶ Connected ──first loop exits──▶ Disconnecting ──▶ Closed
//! ```
//!
//! `Listening` belongs to the server, before the accept. A session starts
//! `Connected` with the environment monitor, the motion monitor and the
//! link listener running as separate tasks. The first task to return, for
//! any reason, decides the [`EndReason`] and cancels the session token. The
//! remaining tasks stop at their next await point, the write half is shut
//! down, and the session reports `Closed`.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - A panicking loop task is reported as [`EndReason::TaskFailed`]

mod listener;
mod output;

pub use listener::{ClientLinkListener, ClientReader};
pub use output::{ClientWriter, OutputChannel};

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::hardware::{ActuatorPanel, SensorBus};
use crate::monitor::{EnvironmentMonitor, LoopExit, MotionMonitor};

/// Session-level connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Listening,
    Connected,
    Disconnecting,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Listening => "listening",
            SessionState::Connected => "connected",
            SessionState::Disconnecting => "disconnecting",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Errors that end a session loop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Write to client failed: {0}")]
    Write(String),

    #[error("Write to client timed out")]
    WriteTimeout,

    #[error("Read from client failed: {0}")]
    Read(String),
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// The client closed the connection
    ClientDisconnected,

    /// Reading from the client failed
    ReadFailed(String),

    /// Writing to the client failed or timed out
    WriteFailed(String),

    /// The daemon was asked to shut down
    ShutdownRequested,

    /// A loop task panicked or was aborted
    TaskFailed(String),
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::ClientDisconnected => write!(f, "client disconnected"),
            EndReason::ReadFailed(e) => write!(f, "read failed: {e}"),
            EndReason::WriteFailed(e) => write!(f, "write failed: {e}"),
            EndReason::ShutdownRequested => write!(f, "shutdown requested"),
            EndReason::TaskFailed(e) => write!(f, "task failed: {e}"),
        }
    }
}

/// Outcome of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Why the session ended
    pub end_reason: EndReason,

    /// Whether the tamper alarm fired
    pub alarm_triggered: bool,

    /// Lines fully written to the client
    pub lines_sent: u64,
}

/// Which session loop a report comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopKind {
    Environment,
    Motion,
    Listener,
}

impl fmt::Display for LoopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopKind::Environment => "environment",
            LoopKind::Motion => "motion",
            LoopKind::Listener => "listener",
        };
        f.write_str(name)
    }
}

/// What a loop task hands back when it finishes.
#[derive(Debug)]
struct LoopReport {
    kind: LoopKind,
    result: Result<LoopExit, SessionError>,
    alarm_triggered: bool,
}

impl LoopReport {
    fn end_reason(&self) -> EndReason {
        match &self.result {
            Ok(LoopExit::LinkClosed) => EndReason::ClientDisconnected,
            Ok(LoopExit::Cancelled) => EndReason::ShutdownRequested,
            Err(SessionError::Read(e)) => EndReason::ReadFailed(e.clone()),
            Err(e @ (SessionError::Write(_) | SessionError::WriteTimeout)) => {
                EndReason::WriteFailed(e.to_string())
            }
        }
    }
}

/// A single client session.
pub struct Session {
    peer: Option<SocketAddr>,
    listener: ClientLinkListener,
    output: OutputChannel,
    sensors: Arc<dyn SensorBus>,
    actuators: Arc<dyn ActuatorPanel>,
    config: MonitorConfig,
    cancel_token: CancellationToken,
    state_tx: watch::Sender<SessionState>,
}

impl Session {
    /// Creates a session over an arbitrary read/write pair.
    ///
    /// `cancel_token` is owned by the session: it is cancelled on teardown.
    /// Pass a child token to let an outer shutdown end the session too.
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
        sensors: Arc<dyn SensorBus>,
        actuators: Arc<dyn ActuatorPanel>,
        config: MonitorConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Connected);
        Self {
            peer: None,
            listener: ClientLinkListener::new(reader, cancel_token.clone()),
            output: OutputChannel::new(writer, config.write_timeout),
            sensors,
            actuators,
            config,
            cancel_token,
            state_tx,
        }
    }

    /// Creates a session over an accepted TCP connection.
    pub fn from_tcp(
        stream: TcpStream,
        sensors: Arc<dyn SensorBus>,
        actuators: Arc<dyn ActuatorPanel>,
        config: MonitorConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        let peer = stream.peer_addr().ok();
        let (reader, writer) = stream.into_split();
        let mut session = Self::new(reader, writer, sensors, actuators, config, cancel_token);
        session.peer = peer;
        session
    }

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Subscribes to state transitions.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Runs the session to completion.
    pub async fn run(self) -> SessionSummary {
        let Session {
            peer,
            mut listener,
            output,
            sensors,
            actuators,
            config,
            cancel_token,
            state_tx,
        } = self;

        info!(peer = ?peer, "Session started");

        let mut tasks = JoinSet::new();

        let environment = EnvironmentMonitor::new(
            Arc::clone(&sensors),
            output.clone(),
            config.climate_interval,
            cancel_token.clone(),
        );
        tasks.spawn(async move {
            LoopReport {
                kind: LoopKind::Environment,
                result: environment.run().await,
                alarm_triggered: false,
            }
        });

        let mut motion = MotionMonitor::new(
            sensors,
            actuators,
            output.clone(),
            config.baseline,
            config.latch,
            config.motion_interval,
            cancel_token.clone(),
        );
        tasks.spawn(async move {
            let result = motion.run().await;
            LoopReport {
                kind: LoopKind::Motion,
                result,
                alarm_triggered: motion.alarm_triggered(),
            }
        });

        tasks.spawn(async move {
            LoopReport {
                kind: LoopKind::Listener,
                result: listener.run().await,
                alarm_triggered: false,
            }
        });

        let first = tasks.join_next().await;
        transition(&state_tx, SessionState::Disconnecting);
        cancel_token.cancel();

        let mut alarm_triggered = false;
        let end_reason = match first {
            Some(Ok(report)) => {
                info!(task = %report.kind, result = ?report.result, "Session loop ended");
                alarm_triggered |= report.alarm_triggered;
                report.end_reason()
            }
            Some(Err(e)) => {
                warn!(error = %e, "Session loop task failed");
                EndReason::TaskFailed(e.to_string())
            }
            None => EndReason::ShutdownRequested,
        };

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => {
                    debug!(task = %report.kind, result = ?report.result, "Session loop stopped");
                    alarm_triggered |= report.alarm_triggered;
                }
                Err(e) => warn!(error = %e, "Session loop task failed during teardown"),
            }
        }

        if let Err(e) = output.close().await {
            debug!(error = %e, "Failed to shut down client writer");
        }
        transition(&state_tx, SessionState::Closed);

        let summary = SessionSummary {
            end_reason,
            alarm_triggered,
            lines_sent: output.lines_sent(),
        };
        info!(
            peer = ?peer,
            reason = %summary.end_reason,
            alarm_triggered = summary.alarm_triggered,
            lines_sent = summary.lines_sent,
            "Session closed"
        );
        summary
    }
}

fn transition(state_tx: &watch::Sender<SessionState>, next: SessionState) {
    let previous = state_tx.send_replace(next);
    debug!(from = %previous, to = %next, "Session state changed");
}
