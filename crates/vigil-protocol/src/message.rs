//! Message catalogue sent from the daemon to the client.

use std::fmt;

use serde::{Deserialize, Serialize};
use vigil_core::ClimateReading;

pub(crate) const STATUS_PREFIX: &str = "현재 온도: ";
pub(crate) const STATUS_SEPARATOR: &str = "°C, 현재 습도: ";
pub(crate) const WARNING_PREFIX: &str = "온습도 경고: 온도=";
pub(crate) const WARNING_SEPARATOR: &str = "°C, 습도=";
pub(crate) const PERCENT_SUFFIX: &str = "%";
pub(crate) const TAMPER_TEXT: &str = "도난 감지됨!";

/// A single line on the daemon-to-client stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorMessage {
    /// Sent on every climate poll
    ClimateStatus {
        /// The reading just taken
        reading: ClimateReading,
    },

    /// Sent after the status line when the reading is out of range
    ClimateWarning {
        /// The offending reading
        reading: ClimateReading,
    },

    /// Sent once per session when the motion alarm trips
    TamperDetected,
}

impl MonitorMessage {
    /// Creates a climate status message.
    pub fn climate_status(reading: ClimateReading) -> Self {
        Self::ClimateStatus { reading }
    }

    /// Creates a climate warning message.
    pub fn climate_warning(reading: ClimateReading) -> Self {
        Self::ClimateWarning { reading }
    }

    /// Creates a tamper alert message.
    pub fn tamper_detected() -> Self {
        Self::TamperDetected
    }

    /// Returns true for messages that signal a problem.
    pub fn is_alert(&self) -> bool {
        !matches!(self, MonitorMessage::ClimateStatus { .. })
    }
}

impl fmt::Display for MonitorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorMessage::ClimateStatus { reading } => write!(
                f,
                "{STATUS_PREFIX}{}{STATUS_SEPARATOR}{}{PERCENT_SUFFIX}",
                reading.temperature_celsius, reading.humidity_percent
            ),
            MonitorMessage::ClimateWarning { reading } => write!(
                f,
                "{WARNING_PREFIX}{}{WARNING_SEPARATOR}{}{PERCENT_SUFFIX}",
                reading.temperature_celsius, reading.humidity_percent
            ),
            MonitorMessage::TamperDetected => f.write_str(TAMPER_TEXT),
        }
    }
}
