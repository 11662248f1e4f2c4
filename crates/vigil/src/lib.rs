//! vigil client - library side of the `vigil` watch command
//!
//! The client keeps one TCP connection to `vigild`, turns each received line
//! into a [`WatchEvent`], and leaves presentation to [`render`].
//!
//! # Architecture
//!
//! Two tasks cooperate, both honouring one `CancellationToken`:
//!
//! 1. **Watch task**: [`WatchClient::run`] connects with backoff, reads lines,
//!    sends keep-alives and forwards events over an mpsc channel
//! 2. **Printer loop**: the binary drains the channel and prints what
//!    [`render`] produces
//!
//! The channel closes when the watch task returns, which ends the printer.

pub mod client;
pub mod error;
pub mod render;

pub use client::{WatchClient, WatchConfig, WatchEnd, WatchEvent};
pub use error::{ClientError, Result};
pub use render::{render, OutputFormat};
