//! vigil protocol - wire format between the daemon and its client
//!
//! The daemon streams plain UTF-8 text lines, one message per line, over a
//! single TCP connection. There is no framing beyond the trailing `\n`, no
//! acknowledgement and no structured encoding. Anything the client sends
//! back is treated as keep-alive traffic and only logged.

pub mod message;
pub mod parse;

pub use message::MonitorMessage;
pub use parse::ParseError;

/// Fixed TCP port the daemon listens on.
pub const DEFAULT_PORT: u16 = 8080;

/// Line a client may send to keep the link visibly alive.
pub const KEEPALIVE_LINE: &str = "ping";

/// Upper bound on a single inbound or outbound line, in bytes.
pub const MAX_LINE_LENGTH: usize = 1024;
