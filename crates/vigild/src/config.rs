//! Runtime settings for a monitoring session.
//!
//! Thresholds are compile-time constants in `vigil_core`; only cadence,
//! timeouts and the two named policies live here.

use std::time::Duration;

use vigil_core::{BaselinePolicy, LatchPolicy};

/// Delay between climate polls.
pub const CLIMATE_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Delay between accelerometer polls.
pub const MOTION_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Write timeout for a single outbound line.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings shared by the monitors of one session.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use vigild::MonitorConfig;
///
/// let config = MonitorConfig {
///     motion_interval: Duration::from_millis(50),
///     ..Default::default()
/// };
/// assert_eq!(config.climate_interval, Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Sleep between climate polls
    pub climate_interval: Duration,

    /// Sleep between accelerometer polls
    pub motion_interval: Duration,

    /// Upper bound on writing and flushing one line
    pub write_timeout: Duration,

    /// Where the first motion comparison takes its baseline from
    pub baseline: BaselinePolicy,

    /// Alarm latch behaviour
    pub latch: LatchPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            climate_interval: CLIMATE_POLL_INTERVAL,
            motion_interval: MOTION_POLL_INTERVAL,
            write_timeout: WRITE_TIMEOUT,
            baseline: BaselinePolicy::default(),
            latch: LatchPolicy::default(),
        }
    }
}
