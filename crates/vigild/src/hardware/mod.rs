//! Seams to the physical board.
//!
//! The monitors only see two narrow traits: [`SensorBus`] for readings and
//! [`ActuatorPanel`] for side effects. Register-level drivers live behind
//! them; this crate ships a scripted sensor bus, a steady one, and an
//! actuator panel that records its commands in the log.

mod actuator;
mod scripted;
mod steady;

pub use actuator::LoggingActuatorPanel;
pub use scripted::{ScriptError, ScriptedSensorBus, SensorScript};
pub use steady::SteadySensorBus;

use async_trait::async_trait;
use vigil_core::{AlertPattern, AxisTriplet, Bus, ClimateReading};

/// Source of climate and accelerometer readings.
///
/// Reads have no failure contract: a bus that stops responding keeps
/// returning whatever its driver produces.
#[async_trait]
pub trait SensorBus: Send + Sync {
    /// Reads the current temperature and humidity.
    async fn read_climate(&self) -> ClimateReading;

    /// Reads one accelerometer, already scaled by the raw divisor.
    async fn read_axis_triplet(&self, bus: Bus) -> AxisTriplet;
}

/// Physical outputs driven when tampering is detected.
///
/// Both calls are fire-and-forget; implementations should return promptly.
#[async_trait]
pub trait ActuatorPanel: Send + Sync {
    /// Plays a blink pattern on the alert LED.
    async fn alert(&self, pattern: AlertPattern);

    /// Moves the lock servo to `angle` degrees.
    async fn lock(&self, angle: u16);
}
