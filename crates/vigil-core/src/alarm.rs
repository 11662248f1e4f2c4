//! Alarm latch and the fixed actuator commands issued on a tamper event.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Servo angle (degrees) that closes the display case lock.
pub const LOCK_ANGLE_CLOSED: u16 = 90;

/// LED pattern played when tampering is detected.
pub const TAMPER_ALERT: AlertPattern = AlertPattern {
    blink_count: 5,
    interval: Duration::from_millis(200),
};

/// A blink pattern for the alert LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPattern {
    /// Number of on/off cycles
    pub blink_count: u32,

    /// Duration of each on and each off phase
    pub interval: Duration,
}

/// How the alarm latch behaves once tripped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatchPolicy {
    /// Alert on the first crossing, then stay silent for the rest of the session.
    #[default]
    OneShot,
}

/// The tamper alarm latch.
///
/// Starts armed. `trip` succeeds once; after that the latch stays tripped
/// until `rearm` is called explicitly. Nothing in the session re-arms it
/// automatically under [`LatchPolicy::OneShot`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlarmLatch {
    policy: LatchPolicy,
    tripped: bool,
}

impl AlarmLatch {
    /// Creates an armed latch with the given policy.
    pub fn new(policy: LatchPolicy) -> Self {
        Self {
            policy,
            tripped: false,
        }
    }

    /// Returns the latch policy.
    pub fn policy(&self) -> LatchPolicy {
        self.policy
    }

    /// Returns true if a crossing would raise an alarm.
    pub fn is_armed(&self) -> bool {
        !self.tripped
    }

    /// Returns true once the alarm has fired.
    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    /// Trips the latch. Returns false if it was already tripped.
    pub fn trip(&mut self) -> bool {
        match self.policy {
            LatchPolicy::OneShot => {
                if self.tripped {
                    return false;
                }
                self.tripped = true;
                true
            }
        }
    }

    /// Re-arms a tripped latch.
    pub fn rearm(&mut self) {
        self.tripped = false;
    }
}
