//! Accelerometer data model and the tamper decision rule.
//!
//! Two accelerometer buses are sampled every cycle. Each bus is compared only
//! against its own reading from the immediately preceding cycle; the buses are
//! never merged or compared with each other.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::alarm::{AlarmLatch, LatchPolicy};
use crate::error::{DomainError, DomainResult};

/// Per-axis delta (scaled units) at or above which motion counts as tampering.
pub const THRESHOLD: u32 = 5;

/// Raw accelerometer counts are divided by this before reaching the monitor.
pub const ACCEL_SCALE_DIVISOR: i32 = 100;

/// One of the two independent accelerometer buses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bus {
    /// The SPI-attached accelerometer
    A,
    /// The I2C-attached accelerometer
    B,
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bus::A => write!(f, "bus-a"),
            Bus::B => write!(f, "bus-b"),
        }
    }
}

/// Accelerometer axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// A scaled three-axis acceleration sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisTriplet {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl AxisTriplet {
    /// The all-zero triplet.
    pub const ZERO: AxisTriplet = AxisTriplet::new(0, 0, 0);

    /// Creates a triplet from already-scaled values.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Scales raw 16-bit accelerometer counts by [`ACCEL_SCALE_DIVISOR`].
    ///
    /// Division truncates toward zero, so `-199` becomes `-1`.
    pub fn from_raw(x: i16, y: i16, z: i16) -> Self {
        Self {
            x: i32::from(x) / ACCEL_SCALE_DIVISOR,
            y: i32::from(y) / ACCEL_SCALE_DIVISOR,
            z: i32::from(z) / ACCEL_SCALE_DIVISOR,
        }
    }

    /// Like [`AxisTriplet::from_raw`], but validates that each count fits a
    /// 16-bit register first.
    pub fn try_from_raw(x: i64, y: i64, z: i64) -> DomainResult<Self> {
        let narrow = |field: &str, value: i64| {
            i16::try_from(value).map_err(|_| DomainError::InvalidFieldValue {
                field: field.to_string(),
                value: value.to_string(),
                expected: format!("{}..={}", i16::MIN, i16::MAX),
            })
        };
        Ok(Self::from_raw(
            narrow("x", x)?,
            narrow("y", y)?,
            narrow("z", z)?,
        ))
    }

    /// Absolute per-axis differences against a previous triplet.
    pub fn deltas(&self, previous: &AxisTriplet) -> [(Axis, u32); 3] {
        [
            (Axis::X, self.x.abs_diff(previous.x)),
            (Axis::Y, self.y.abs_diff(previous.y)),
            (Axis::Z, self.z.abs_diff(previous.z)),
        ]
    }
}

impl fmt::Display for AxisTriplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X={}, Y={}, Z={}", self.x, self.y, self.z)
    }
}

/// Where the motion monitor takes its first "previous" triplets from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaselinePolicy {
    /// Compare the first cycle against zero triplets.
    ///
    /// Any resting reading with gravity on one axis will trip the alarm on
    /// the very first cycle.
    Zero,

    /// Take one real reading from each bus before the comparison loop starts.
    #[default]
    FirstReading,
}

impl fmt::Display for BaselinePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaselinePolicy::Zero => write!(f, "zero"),
            BaselinePolicy::FirstReading => write!(f, "first-reading"),
        }
    }
}

impl FromStr for BaselinePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(BaselinePolicy::Zero),
            "first-reading" | "first_reading" => Ok(BaselinePolicy::FirstReading),
            other => Err(DomainError::ParseError {
                field: "baseline".to_string(),
                reason: format!("unknown policy '{other}' (expected zero or first-reading)"),
            }),
        }
    }
}

/// Outcome of observing one motion cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionVerdict {
    /// No axis on either bus moved by [`THRESHOLD`] or more.
    Quiet,

    /// A crossing happened and tripped the latch: alert, lock and notify.
    Tamper { bus: Bus, axis: Axis, delta: u32 },

    /// A crossing happened but the latch had already tripped.
    Suppressed { bus: Bus, axis: Axis, delta: u32 },
}

impl MotionVerdict {
    /// Returns true if this cycle should drive the actuators.
    pub fn is_tamper(&self) -> bool {
        matches!(self, MotionVerdict::Tamper { .. })
    }
}

/// Motion state owned by the motion monitor loop.
///
/// Holds the previous triplet for each bus and the alarm latch. It has a
/// single writer, so it needs no synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotionState {
    previous_a: AxisTriplet,
    previous_b: AxisTriplet,
    latch: AlarmLatch,
}

impl MotionState {
    /// Creates a state with zero baselines and an armed latch.
    pub fn new(policy: LatchPolicy) -> Self {
        Self::seeded(AxisTriplet::ZERO, AxisTriplet::ZERO, policy)
    }

    /// Creates a state with explicit baselines.
    pub fn seeded(previous_a: AxisTriplet, previous_b: AxisTriplet, policy: LatchPolicy) -> Self {
        Self {
            previous_a,
            previous_b,
            latch: AlarmLatch::new(policy),
        }
    }

    /// Returns the last triplet seen on a bus.
    pub fn previous(&self, bus: Bus) -> AxisTriplet {
        match bus {
            Bus::A => self.previous_a,
            Bus::B => self.previous_b,
        }
    }

    /// Returns true once the alarm has fired.
    pub fn alarm_triggered(&self) -> bool {
        self.latch.is_tripped()
    }

    /// Returns the alarm latch.
    pub fn latch(&self) -> &AlarmLatch {
        &self.latch
    }

    /// Re-arms the alarm latch.
    pub fn rearm(&mut self) {
        self.latch.rearm();
    }

    /// Compares a new pair of readings against the previous cycle.
    ///
    /// The previous triplets are replaced with `a` and `b` whatever the
    /// verdict, so the next cycle always compares against this one.
    pub fn observe(&mut self, a: AxisTriplet, b: AxisTriplet) -> MotionVerdict {
        let crossing = first_crossing(Bus::A, &a, &self.previous_a)
            .or_else(|| first_crossing(Bus::B, &b, &self.previous_b));

        let verdict = match crossing {
            None => MotionVerdict::Quiet,
            Some((bus, axis, delta)) => {
                if self.latch.is_armed() && self.latch.trip() {
                    MotionVerdict::Tamper { bus, axis, delta }
                } else {
                    MotionVerdict::Suppressed { bus, axis, delta }
                }
            }
        };

        self.previous_a = a;
        self.previous_b = b;

        verdict
    }
}

fn first_crossing(
    bus: Bus,
    current: &AxisTriplet,
    previous: &AxisTriplet,
) -> Option<(Bus, Axis, u32)> {
    current
        .deltas(previous)
        .into_iter()
        .find(|(_, delta)| *delta >= THRESHOLD)
        .map(|(axis, delta)| (bus, axis, delta))
}
