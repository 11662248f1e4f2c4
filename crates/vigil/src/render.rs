//! Turning watch events into printable lines.
//!
//! Text output prefixes each daemon line with the local time it arrived.
//! JSON output emits one object per line for piping into other tools.

use chrono::{DateTime, Local};
use serde::Serialize;
use vigil_protocol::MonitorMessage;

use crate::client::WatchEvent;
use crate::error::Result;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How the watch command prints events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `[timestamp] line` as received
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    received_at: &'a DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a MonitorMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<&'a str>,
}

/// Renders one event, or `None` for events that carry no daemon line.
///
/// Connection changes are left to the log.
pub fn render(event: &WatchEvent, format: OutputFormat) -> Result<Option<String>> {
    let record = match event {
        WatchEvent::Message {
            received_at,
            message,
        } => JsonRecord {
            received_at,
            message: Some(message),
            raw: None,
        },
        WatchEvent::Unparsed { received_at, line } => JsonRecord {
            received_at,
            message: None,
            raw: Some(line.as_str()),
        },
        WatchEvent::Connected { .. } | WatchEvent::Disconnected => return Ok(None),
    };

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string(&record)?,
        OutputFormat::Text => {
            let stamp = record.received_at.format(TIMESTAMP_FORMAT);
            let body = record
                .message
                .map(ToString::to_string)
                .or_else(|| record.raw.map(str::to_string))
                .unwrap_or_default();
            format!("[{stamp}] {body}")
        }
    };

    Ok(Some(rendered))
}
