//! vigil - watch the stream of a running vigil daemon
//!
//! Connects to `vigild`, waits for it with backoff if it is not up yet, and
//! prints every line it sends with a local timestamp. Logs go to stderr so
//! stdout carries only daemon lines.
//!
//! # Usage
//!
//! ```text
//! vigil                              # watch 127.0.0.1:8080
//! vigil --addr 192.168.0.20:8080     # watch a board on the LAN
//! vigil --json | jq .                # one JSON object per line
//! vigil --keepalive 30               # send "ping" every 30 seconds
//! ```

use std::env;
use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vigil_client::client::DEFAULT_DAEMON_ADDR;
use vigil_client::{render, OutputFormat, WatchClient, WatchConfig, WatchEnd, WatchEvent};

/// vigil - watch a vigil daemon
#[derive(Parser, Debug)]
#[command(name = "vigil", version, about)]
struct Args {
    /// Daemon address as host:port [env: VIGIL_ADDR] [default: 127.0.0.1:8080]
    #[arg(long)]
    addr: Option<String>,

    /// Print one JSON object per message instead of text
    #[arg(long)]
    json: bool,

    /// Seconds between keep-alive pings (0 disables)
    #[arg(long, default_value_t = 0)]
    keepalive: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("vigil=info".parse()?)
                .add_directive("vigil_client=info".parse()?),
        )
        .init();

    let addr = args
        .addr
        .or_else(|| env::var("VIGIL_ADDR").ok())
        .unwrap_or_else(|| DEFAULT_DAEMON_ADDR.to_string());
    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let config = WatchConfig {
        addr,
        keepalive: (args.keepalive > 0).then(|| Duration::from_secs(args.keepalive)),
        ..Default::default()
    };

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Error waiting for Ctrl+C");
            return;
        }
        info!("Interrupted");
        shutdown_token.cancel();
    });

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let client = WatchClient::new(config, event_tx, cancel_token);
    let watch_handle = tokio::spawn(async move { client.run().await });

    let mut stdout = io::stdout().lock();
    while let Some(event) = event_rx.recv().await {
        match &event {
            WatchEvent::Connected { addr } => info!(%addr, "Watching daemon"),
            WatchEvent::Disconnected => info!("Daemon connection closed"),
            WatchEvent::Message { .. } | WatchEvent::Unparsed { .. } => {}
        }

        if let Some(line) = render(&event, format)? {
            writeln!(stdout, "{line}").context("Failed to write to stdout")?;
            stdout.flush().context("Failed to flush stdout")?;
        }
    }

    let end = watch_handle
        .await
        .context("Watch task panicked")?
        .context("Connection to daemon failed")?;

    match end {
        WatchEnd::DaemonClosed => info!("Daemon ended the session"),
        WatchEnd::Cancelled => info!("Stopped watching"),
    }
    Ok(())
}
