//! Parsing wire lines back into [`MonitorMessage`]s.

use std::str::FromStr;

use thiserror::Error;
use vigil_core::ClimateReading;

use crate::message::{
    MonitorMessage, PERCENT_SUFFIX, STATUS_PREFIX, STATUS_SEPARATOR, TAMPER_TEXT, WARNING_PREFIX,
    WARNING_SEPARATOR,
};

/// Errors produced while parsing a wire line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Unrecognized line: {0:?}")]
    Unrecognized(String),

    #[error("Invalid {field} in line {line:?}")]
    InvalidNumber { field: &'static str, line: String },
}

impl FromStr for MonitorMessage {
    type Err = ParseError;

    /// Parses one line; a trailing `\n` or `\r\n` is ignored.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']);

        if line == TAMPER_TEXT {
            return Ok(MonitorMessage::TamperDetected);
        }

        if let Some(rest) = line.strip_prefix(STATUS_PREFIX) {
            let reading = parse_reading(rest, STATUS_SEPARATOR, line)?;
            return Ok(MonitorMessage::ClimateStatus { reading });
        }

        if let Some(rest) = line.strip_prefix(WARNING_PREFIX) {
            let reading = parse_reading(rest, WARNING_SEPARATOR, line)?;
            return Ok(MonitorMessage::ClimateWarning { reading });
        }

        Err(ParseError::Unrecognized(line.to_string()))
    }
}

/// Parses `"{T}{separator}{H}%"`.
fn parse_reading(rest: &str, separator: &str, line: &str) -> Result<ClimateReading, ParseError> {
    let (temperature, humidity) = rest
        .split_once(separator)
        .ok_or_else(|| ParseError::Unrecognized(line.to_string()))?;
    let humidity = humidity
        .strip_suffix(PERCENT_SUFFIX)
        .ok_or_else(|| ParseError::Unrecognized(line.to_string()))?;

    let temperature_celsius = temperature
        .parse::<i32>()
        .map_err(|_| ParseError::InvalidNumber {
            field: "temperature",
            line: line.to_string(),
        })?;
    let humidity_percent = humidity
        .parse::<i32>()
        .map_err(|_| ParseError::InvalidNumber {
            field: "humidity",
            line: line.to_string(),
        })?;

    Ok(ClimateReading::new(temperature_celsius, humidity_percent))
}
