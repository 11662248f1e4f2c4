use async_trait::async_trait;
use tracing::{info, warn};
use vigil_core::AlertPattern;

use super::ActuatorPanel;

/// Actuator panel that records each command in the log.
///
/// Used when no GPIO backend is wired in; the PWM and LED timing
/// primitives belong to the board driver, not to this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingActuatorPanel;

impl LoggingActuatorPanel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActuatorPanel for LoggingActuatorPanel {
    async fn alert(&self, pattern: AlertPattern) {
        warn!(
            blink_count = pattern.blink_count,
            interval_ms = pattern.interval.as_millis() as u64,
            "Alert LED pattern requested"
        );
    }

    async fn lock(&self, angle: u16) {
        info!(angle, "Lock servo moved");
    }
}
