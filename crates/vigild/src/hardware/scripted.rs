//! Sensor bus that replays readings from a TOML script.
//!
//! ```toml
//! [[climate]]
//! temperature = 25
//! humidity = 35
//! repeat = 3
//!
//! [[climate]]
//! temperature = 31
//! humidity = 35
//!
//! # Raw accelerometer counts, scaled by 100 on read.
//! [[bus_a]]
//! x = 0
//! y = 0
//! z = 256
//! ```
//!
//! Each stream advances independently, one entry per read (an entry with
//! `repeat = n` is served `n` times). Once a stream runs out it keeps
//! returning its last entry. An empty stream returns nominal climate or
//! zero acceleration.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;
use vigil_core::{AxisTriplet, Bus, ClimateReading, DomainError};

use super::SensorBus;

/// Errors raised while loading a sensor script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Failed to read sensor script {path}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Invalid sensor script: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid {stream} entry {index}: {source}")]
    Domain {
        stream: &'static str,
        index: usize,
        #[source]
        source: DomainError,
    },
}

/// Deserialized form of a sensor script file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorScript {
    #[serde(default)]
    pub climate: Vec<ClimateEntry>,
    #[serde(default)]
    pub bus_a: Vec<RawTripletEntry>,
    #[serde(default)]
    pub bus_b: Vec<RawTripletEntry>,
}

/// One scripted climate reading.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClimateEntry {
    pub temperature: i32,
    pub humidity: i32,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

/// One scripted accelerometer reading in raw counts.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTripletEntry {
    pub x: i64,
    pub y: i64,
    pub z: i64,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

fn default_repeat() -> u32 {
    1
}

impl SensorScript {
    /// Parses a script from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ScriptError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a script file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ScriptError::Io {
                path: path.to_path_buf(),
                error: e.to_string(),
            })?;
        Self::from_toml_str(&text)
    }
}

/// A run-length stream of readings with a cursor that sticks at the end.
#[derive(Debug)]
struct Playback<T> {
    runs: Vec<(T, u32)>,
    position: usize,
    served: u32,
    fallback: T,
}

impl<T: Copy> Playback<T> {
    /// Runs with a zero count are dropped.
    fn new(runs: Vec<(T, u32)>, fallback: T) -> Self {
        Self {
            runs: runs.into_iter().filter(|&(_, count)| count > 0).collect(),
            position: 0,
            served: 0,
            fallback,
        }
    }

    fn next(&mut self) -> T {
        while let Some(&(value, count)) = self.runs.get(self.position) {
            if self.served < count {
                self.served += 1;
                return value;
            }
            self.position += 1;
            self.served = 0;
        }
        self.runs
            .last()
            .map(|&(value, _)| value)
            .unwrap_or(self.fallback)
    }
}

#[derive(Debug)]
struct Streams {
    climate: Playback<ClimateReading>,
    bus_a: Playback<AxisTriplet>,
    bus_b: Playback<AxisTriplet>,
}

/// Sensor bus driven by a [`SensorScript`].
#[derive(Debug)]
pub struct ScriptedSensorBus {
    streams: Mutex<Streams>,
}

impl ScriptedSensorBus {
    /// Builds a bus from a parsed script, validating raw counts.
    pub fn from_script(script: SensorScript) -> Result<Self, ScriptError> {
        let climate = script
            .climate
            .iter()
            .map(|entry| {
                (
                    ClimateReading::new(entry.temperature, entry.humidity),
                    entry.repeat,
                )
            })
            .collect();

        let bus_a = scale_triplets("bus_a", &script.bus_a)?;
        let bus_b = scale_triplets("bus_b", &script.bus_b)?;

        debug!(
            climate = script.climate.len(),
            bus_a = script.bus_a.len(),
            bus_b = script.bus_b.len(),
            "Sensor script loaded"
        );

        Ok(Self::from_runs(climate, bus_a, bus_b))
    }

    /// Builds a bus from already-scaled readings.
    pub fn from_readings(
        climate: Vec<ClimateReading>,
        bus_a: Vec<AxisTriplet>,
        bus_b: Vec<AxisTriplet>,
    ) -> Self {
        Self::from_runs(once_each(climate), once_each(bus_a), once_each(bus_b))
    }

    fn from_runs(
        climate: Vec<(ClimateReading, u32)>,
        bus_a: Vec<(AxisTriplet, u32)>,
        bus_b: Vec<(AxisTriplet, u32)>,
    ) -> Self {
        Self {
            streams: Mutex::new(Streams {
                climate: Playback::new(climate, ClimateReading::NOMINAL),
                bus_a: Playback::new(bus_a, AxisTriplet::ZERO),
                bus_b: Playback::new(bus_b, AxisTriplet::ZERO),
            }),
        }
    }

    /// Loads a script file and builds a bus from it.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        Self::from_script(SensorScript::load(path).await?)
    }
}

fn once_each<T>(readings: Vec<T>) -> Vec<(T, u32)> {
    readings.into_iter().map(|reading| (reading, 1)).collect()
}

fn scale_triplets(
    stream: &'static str,
    entries: &[RawTripletEntry],
) -> Result<Vec<(AxisTriplet, u32)>, ScriptError> {
    let mut triplets = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let triplet = AxisTriplet::try_from_raw(entry.x, entry.y, entry.z).map_err(|source| {
            ScriptError::Domain {
                stream,
                index,
                source,
            }
        })?;
        triplets.push((triplet, entry.repeat));
    }
    Ok(triplets)
}

#[async_trait]
impl SensorBus for ScriptedSensorBus {
    async fn read_climate(&self) -> ClimateReading {
        self.streams.lock().await.climate.next()
    }

    async fn read_axis_triplet(&self, bus: Bus) -> AxisTriplet {
        let mut streams = self.streams.lock().await;
        match bus {
            Bus::A => streams.bus_a.next(),
            Bus::B => streams.bus_b.next(),
        }
    }
}
