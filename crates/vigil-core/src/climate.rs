//! Temperature and humidity readings.
//!
//! A reading is "out of range" when it touches or leaves the comfort band:
//! the band itself is open on both ends, so `20 °C` and `40 %` already warn.

use serde::{Deserialize, Serialize};

/// Lowest temperature (inclusive) that raises a warning.
pub const TEMPERATURE_LOW_C: i32 = 20;

/// Highest temperature (inclusive) that raises a warning.
pub const TEMPERATURE_HIGH_C: i32 = 30;

/// Lowest relative humidity (inclusive) that raises a warning.
pub const HUMIDITY_LOW_PERCENT: i32 = 30;

/// Highest relative humidity (inclusive) that raises a warning.
pub const HUMIDITY_HIGH_PERCENT: i32 = 40;

/// A single temperature/humidity sample.
///
/// Produced fresh on every climate poll and not retained afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClimateReading {
    /// Temperature in whole degrees Celsius
    pub temperature_celsius: i32,

    /// Relative humidity in whole percent
    pub humidity_percent: i32,
}

impl ClimateReading {
    /// A reading in the middle of the comfort band.
    pub const NOMINAL: ClimateReading = ClimateReading::new(25, 35);

    /// Creates a new reading.
    pub const fn new(temperature_celsius: i32, humidity_percent: i32) -> Self {
        Self {
            temperature_celsius,
            humidity_percent,
        }
    }

    /// Returns true if the temperature is at or beyond either bound.
    pub fn temperature_out_of_range(&self) -> bool {
        self.temperature_celsius <= TEMPERATURE_LOW_C
            || self.temperature_celsius >= TEMPERATURE_HIGH_C
    }

    /// Returns true if the humidity is at or beyond either bound.
    pub fn humidity_out_of_range(&self) -> bool {
        self.humidity_percent <= HUMIDITY_LOW_PERCENT
            || self.humidity_percent >= HUMIDITY_HIGH_PERCENT
    }

    /// Returns true if this reading warrants a climate warning.
    pub fn is_out_of_range(&self) -> bool {
        self.temperature_out_of_range() || self.humidity_out_of_range()
    }
}

impl Default for ClimateReading {
    fn default() -> Self {
        Self::NOMINAL
    }
}
