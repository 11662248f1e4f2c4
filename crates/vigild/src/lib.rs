//! vigil daemon - sensor monitors and the single-client event stream
//!
//! This crate provides the runtime pieces of the security monitor:
//! - `hardware` - sensor bus and actuator panel seams, plus bundled backends
//! - `monitor` - the climate and motion polling loops
//! - `session` - one client connection: output channel, link listener, teardown
//! - `server` - TCP bind and the single accept
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        vigild session                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌────────────────────┐   ┌────────────────────┐             │
//! │  │ EnvironmentMonitor │   │   MotionMonitor    │──▶ Actuator │
//! │  │   (every 2 s)      │   │  (every 500 ms)    │    Panel    │
//! │  └─────────┬──────────┘   └─────────┬──────────┘             │
//! │            │ send()                 │ send()                 │
//! │            ▼                        ▼                        │
//! │  ┌──────────────────────────────────────────┐                │
//! │  │   OutputChannel (mutex-guarded writer)   │──▶ TCP write   │
//! │  └──────────────────────────────────────────┘                │
//! │                                                              │
//! │  ┌────────────────────┐                                      │
//! │  │ ClientLinkListener │◀── TCP read (EOF ends the session)   │
//! │  └────────────────────┘                                      │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The three loops share one `CancellationToken`. Whichever loop exits
//! first cancels it, and the other two stop at their next await point.
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Connection errors end the session instead of the process

pub mod config;
pub mod hardware;
pub mod monitor;
pub mod server;
pub mod session;

pub use config::MonitorConfig;
pub use server::{MonitorServer, ServerError, DEFAULT_BIND_ADDR};
pub use session::{EndReason, Session, SessionError, SessionState, SessionSummary};
