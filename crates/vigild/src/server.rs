//! TCP front door for the daemon.
//!
//! The server binds once, accepts exactly one client, and hands the
//! connection to a [`Session`]. The listening socket is dropped as soon as
//! the client is accepted, so later connection attempts are refused for the
//! rest of the session. When the session ends, `run` returns and the
//! process exits.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Bind and accept failures are returned to the caller

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::MonitorConfig;
use crate::hardware::{ActuatorPanel, SensorBus};
use crate::session::{Session, SessionState, SessionSummary};

/// Default listen address (all interfaces, fixed port).
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Single-client TCP server.
pub struct MonitorServer {
    listener: TcpListener,
    sensors: Arc<dyn SensorBus>,
    actuators: Arc<dyn ActuatorPanel>,
    config: MonitorConfig,
    cancel_token: CancellationToken,
}

impl MonitorServer {
    /// Binds the listening socket.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address to listen on, e.g. `0.0.0.0:8080`
    /// * `sensors` - Sensor bus shared by the monitors
    /// * `actuators` - Actuator panel driven on tamper
    /// * `config` - Session settings
    /// * `cancel_token` - Token for graceful shutdown
    pub async fn bind(
        addr: &str,
        sensors: Arc<dyn SensorBus>,
        actuators: Arc<dyn ActuatorPanel>,
        config: MonitorConfig,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_string(),
                error: e.to_string(),
            })?;

        Ok(Self {
            listener,
            sensors,
            actuators,
            config,
            cancel_token,
        })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::Accept(e.to_string()))
    }

    /// Waits for one client and runs its session to completion.
    pub async fn run(self) -> Result<SessionSummary, ServerError> {
        let MonitorServer {
            listener,
            sensors,
            actuators,
            config,
            cancel_token,
        } = self;

        info!(
            addr = ?listener.local_addr().ok(),
            state = %SessionState::Listening,
            "Waiting for client connection"
        );

        let (stream, peer) = tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                info!("Shutdown requested before a client connected");
                return Err(ServerError::Cancelled);
            }

            result = listener.accept() => {
                result.map_err(|e| ServerError::Accept(e.to_string()))?
            }
        };

        drop(listener);
        info!(%peer, "Client connected");

        if let Err(e) = stream.set_nodelay(true) {
            debug!(error = %e, "Failed to set TCP_NODELAY");
        }

        let session = Session::from_tcp(
            stream,
            sensors,
            actuators,
            config,
            cancel_token.child_token(),
        );
        Ok(session.run().await)
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {error}")]
    Bind { addr: String, error: String },

    #[error("Failed to accept client connection: {0}")]
    Accept(String),

    #[error("Shut down before a client connected")]
    Cancelled,
}
