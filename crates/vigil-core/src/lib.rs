//! vigil core - shared domain types for the security monitor
//!
//! This crate holds the sensor data model and the alarm-decision rules
//! shared between the daemon (vigild) and the client (vigil).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod alarm;
pub mod climate;
pub mod error;
pub mod motion;

// Re-exports for convenience
pub use alarm::{AlarmLatch, AlertPattern, LatchPolicy, LOCK_ANGLE_CLOSED, TAMPER_ALERT};
pub use climate::ClimateReading;
pub use error::{DomainError, DomainResult};
pub use motion::{
    Axis, AxisTriplet, BaselinePolicy, Bus, MotionState, MotionVerdict, ACCEL_SCALE_DIVISOR,
    THRESHOLD,
};
