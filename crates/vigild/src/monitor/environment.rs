use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vigil_core::ClimateReading;
use vigil_protocol::MonitorMessage;

use super::{pause, LoopExit};
use crate::hardware::SensorBus;
use crate::session::{OutputChannel, SessionError};

/// Climate polling loop.
///
/// Every cycle sends a status line; readings at or outside the comfort band
/// are followed by a warning line.
pub struct EnvironmentMonitor {
    sensors: Arc<dyn SensorBus>,
    output: OutputChannel,
    interval: Duration,
    cancel_token: CancellationToken,
}

impl EnvironmentMonitor {
    pub fn new(
        sensors: Arc<dyn SensorBus>,
        output: OutputChannel,
        interval: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            sensors,
            output,
            interval,
            cancel_token,
        }
    }

    /// Runs until cancelled or until a write fails.
    pub async fn run(&self) -> Result<LoopExit, SessionError> {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "Environment monitor started"
        );

        loop {
            let Some(reading) = self
                .cancel_token
                .run_until_cancelled(self.sensors.read_climate())
                .await
            else {
                break;
            };

            if let Err(e) = self.report(reading).await {
                debug!(error = %e, "Environment monitor stopping on write failure");
                return Err(e);
            }

            if !pause(&self.cancel_token, self.interval).await {
                break;
            }
        }

        debug!("Environment monitor cancelled");
        Ok(LoopExit::Cancelled)
    }

    /// Sends the status line for one reading, plus a warning if needed.
    ///
    /// Returns true if a warning was sent.
    pub async fn report(&self, reading: ClimateReading) -> Result<bool, SessionError> {
        self.output
            .send(&MonitorMessage::climate_status(reading))
            .await?;
        debug!(
            temperature = reading.temperature_celsius,
            humidity = reading.humidity_percent,
            "Climate status sent"
        );

        if !reading.is_out_of_range() {
            return Ok(false);
        }

        self.output
            .send(&MonitorMessage::climate_warning(reading))
            .await?;
        warn!(
            temperature = reading.temperature_celsius,
            humidity = reading.humidity_percent,
            "Climate out of range, warning sent"
        );
        Ok(true)
    }
}
