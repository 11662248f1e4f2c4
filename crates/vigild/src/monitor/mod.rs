//! The two sensor polling loops.
//!
//! Both loops follow the same shape: read, report, sleep. Sensor reads and
//! sleeps are raced against the session's cancellation token; writes are
//! not, so a line is never cut short by cancellation.

mod environment;
mod motion;

pub use environment::EnvironmentMonitor;
pub use motion::MotionMonitor;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Why a session loop returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The session token was cancelled
    Cancelled,

    /// The client closed its end of the connection
    LinkClosed,
}

/// Sleeps for `duration`. Returns false if cancelled first.
pub(crate) async fn pause(cancel_token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        biased;

        _ = cancel_token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
