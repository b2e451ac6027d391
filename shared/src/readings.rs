//! Temperature samples and the sentinel values probes use to report faults.

/// Reported by a DS18B20 whose conversion never ran (power-on scratchpad value).
pub const READ_FAILURE: f32 = 85.0;

/// Reported when no probe answered at the requested slot.
pub const NO_SENSOR: f32 = -127.0;

/// Number of probes the device reads and displays.
pub const MAX_PROBES: usize = 2;

/// True for the two values that encode a probe fault rather than a measurement.
pub fn is_sentinel(temperature: f32) -> bool {
    temperature == READ_FAILURE || temperature == NO_SENSOR
}

/// One acquisition cycle: the probe readings plus how many probes answered.
///
/// Slots without a probe hold [`NO_SENSOR`], so `temperatures` may be longer
/// than `count` suggests.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureSample {
    pub temperatures: Vec<f32>,
    pub count: usize,
}

impl TemperatureSample {
    pub fn new(temperatures: Vec<f32>, count: usize) -> Self {
        Self {
            temperatures,
            count,
        }
    }

    /// A sample for a bus where no probe answered.
    pub fn empty() -> Self {
        Self {
            temperatures: vec![NO_SENSOR; MAX_PROBES],
            count: 0,
        }
    }

    /// Reading at `index`, or [`NO_SENSOR`] when the slot does not exist.
    pub fn reading(&self, index: usize) -> f32 {
        self.temperatures.get(index).copied().unwrap_or(NO_SENSOR)
    }

    /// The headline figure: the colder of the two probes when exactly two are
    /// connected, otherwise the first probe.
    ///
    /// Sentinels take part in the comparison unchanged, so a missing second
    /// probe (`-127.0`) wins the minimum and the caller must check
    /// [`is_sentinel`] before showing the value.
    pub fn lowest(&self) -> f32 {
        if self.count == 2 {
            self.reading(0).min(self.reading(1))
        } else {
            self.reading(0)
        }
    }

    pub fn has_sensors(&self) -> bool {
        self.count > 0
    }
}

/// Source of temperature data, read once per main-loop cycle.
pub trait ReadingSource {
    fn read_all(&mut self) -> TemperatureSample;
}
