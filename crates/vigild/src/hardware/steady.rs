use async_trait::async_trait;
use vigil_core::{AxisTriplet, Bus, ClimateReading};

use super::SensorBus;

/// A sensor bus that reports the same readings forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SteadySensorBus {
    climate: ClimateReading,
    bus_a: AxisTriplet,
    bus_b: AxisTriplet,
}

impl SteadySensorBus {
    /// Creates a bus with fixed readings.
    pub fn new(climate: ClimateReading, bus_a: AxisTriplet, bus_b: AxisTriplet) -> Self {
        Self {
            climate,
            bus_a,
            bus_b,
        }
    }
}

#[async_trait]
impl SensorBus for SteadySensorBus {
    async fn read_climate(&self) -> ClimateReading {
        self.climate
    }

    async fn read_axis_triplet(&self, bus: Bus) -> AxisTriplet {
        match bus {
            Bus::A => self.bus_a,
            Bus::B => self.bus_b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_is_nominal_and_still() {
        let bus = SteadySensorBus::default();
        assert_eq!(bus.read_climate().await, ClimateReading::NOMINAL);
        assert_eq!(bus.read_axis_triplet(Bus::A).await, AxisTriplet::ZERO);
        assert_eq!(bus.read_axis_triplet(Bus::B).await, AxisTriplet::ZERO);
    }

    #[tokio::test]
    async fn test_buses_are_distinct() {
        let bus = SteadySensorBus::new(
            ClimateReading::new(18, 50),
            AxisTriplet::new(1, 2, 3),
            AxisTriplet::new(4, 5, 6),
        );
        assert_eq!(bus.read_axis_triplet(Bus::A).await, AxisTriplet::new(1, 2, 3));
        assert_eq!(bus.read_axis_triplet(Bus::B).await, AxisTriplet::new(4, 5, 6));
    }
}
