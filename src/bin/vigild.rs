//! vigil daemon - climate and tamper monitor for a single client
//!
//! Binds a TCP port, waits for one client, then streams climate status,
//! climate warnings and at most one tamper alert to it until either side
//! hangs up. The process exits when the session ends.
//!
//! # Usage
//!
//! ```bash
//! # Listen on 0.0.0.0:8080 with steady nominal sensors
//! vigild
//!
//! # Replay a recorded sensor script
//! vigild --script demos/tamper.toml
//!
//! # Compare the first motion reading against zero instead of itself
//! vigild --baseline zero --bind 127.0.0.1:9000
//! ```

use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vigil_core::BaselinePolicy;
use vigild::hardware::{LoggingActuatorPanel, ScriptedSensorBus, SensorBus, SteadySensorBus};
use vigild::{MonitorConfig, MonitorServer, DEFAULT_BIND_ADDR};

/// vigil daemon - single-board security monitor
#[derive(Parser, Debug)]
#[command(name = "vigild", version, about)]
struct Args {
    /// Address to listen on [env: VIGIL_BIND] [default: 0.0.0.0:8080]
    #[arg(long)]
    bind: Option<String>,

    /// TOML sensor script to replay instead of steady readings
    #[arg(long)]
    script: Option<PathBuf>,

    /// Motion baseline: `first-reading` or `zero`
    #[arg(long, default_value_t = BaselinePolicy::FirstReading)]
    baseline: BaselinePolicy,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("vigild=info".parse()?)
                .add_directive("vigil_core=info".parse()?),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "vigil daemon starting"
    );

    let bind_addr = args
        .bind
        .or_else(|| env::var("VIGIL_BIND").ok())
        .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

    let sensors: Arc<dyn SensorBus> = match &args.script {
        Some(path) => {
            let bus = ScriptedSensorBus::load(path)
                .await
                .with_context(|| format!("Failed to load sensor script {}", path.display()))?;
            info!(script = %path.display(), "Replaying sensor script");
            Arc::new(bus)
        }
        None => {
            info!("No sensor script given, using steady nominal readings");
            Arc::new(SteadySensorBus::default())
        }
    };

    let config = MonitorConfig {
        baseline: args.baseline,
        ..Default::default()
    };

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let server = MonitorServer::bind(
        &bind_addr,
        sensors,
        Arc::new(LoggingActuatorPanel::new()),
        config,
        cancel_token,
    )
    .await
    .context("Failed to start server")?;

    info!(addr = %bind_addr, baseline = %args.baseline, "Starting server");

    match server.run().await {
        Ok(summary) => {
            info!(
                end_reason = %summary.end_reason,
                alarm_triggered = summary.alarm_triggered,
                lines_sent = summary.lines_sent,
                "vigil daemon stopped"
            );
            Ok(())
        }
        Err(vigild::ServerError::Cancelled) => {
            info!("vigil daemon stopped before a client connected");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Server error");
            Err(e.into())
        }
    }
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
