//! DS18B20 probes on a shared 1-Wire bus.

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::onewire::{check_crc, search_roms, OneWire, OneWireError, MAX_BUS_DEVICES};
use crate::readings::{ReadingSource, TemperatureSample, MAX_PROBES, NO_SENSOR};

pub const FAMILY_CODE: u8 = 0x28;
pub const CONVERT_T: u8 = 0x44;
pub const READ_SCRATCHPAD: u8 = 0xBE;

/// Worst-case 12-bit conversion time.
pub const CONVERSION_TIME_MS: u32 = 750;

const SCRATCHPAD_LEN: usize = 9;

/// Temperature register (LSB, MSB) in 1/16 °C steps.
pub fn raw_to_celsius(lsb: u8, msb: u8) -> f32 {
    i16::from_le_bytes([lsb, msb]) as f32 / 16.0
}

/// Reads every probe on the bus once per call.
pub struct Ds18b20Array<B, D> {
    bus: B,
    delay: D,
}

impl<B: OneWire, D: DelayNs> Ds18b20Array<B, D> {
    pub fn new(bus: B, delay: D) -> Self {
        Self { bus, delay }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Starts a conversion on every probe at once.
    fn start_conversion(&mut self) -> Result<(), OneWireError> {
        self.bus.skip()?;
        self.bus.write_byte(CONVERT_T)
    }

    fn read_temperature(&mut self, rom: &[u8; 8]) -> Result<f32, OneWireError> {
        self.bus.select(rom)?;
        self.bus.write_byte(READ_SCRATCHPAD)?;

        let mut scratchpad = [0u8; SCRATCHPAD_LEN];
        for byte in scratchpad.iter_mut() {
            *byte = self.bus.read_byte()?;
        }

        // A shorted line reads all zeros, which also passes the CRC
        if scratchpad.iter().all(|b| *b == 0) {
            return Err(OneWireError::NoResponse);
        }
        check_crc(&scratchpad)?;

        Ok(raw_to_celsius(scratchpad[0], scratchpad[1]))
    }
}

impl<B: OneWire, D: DelayNs> ReadingSource for Ds18b20Array<B, D> {
    fn read_all(&mut self) -> TemperatureSample {
        let roms = match search_roms(&mut self.bus, MAX_BUS_DEVICES) {
            Ok(roms) => roms,
            Err(e) => {
                warn!("Probe search failed: {}", e);
                return TemperatureSample::empty();
            }
        };
        let probes: Vec<[u8; 8]> = roms.into_iter().filter(|rom| rom[0] == FAMILY_CODE).collect();
        if probes.is_empty() {
            return TemperatureSample::empty();
        }

        let mut temperatures = vec![NO_SENSOR; MAX_PROBES];
        if let Err(e) = self.start_conversion() {
            warn!("Could not start conversion: {}", e);
            return TemperatureSample::new(temperatures, probes.len());
        }
        self.delay.delay_ms(CONVERSION_TIME_MS);

        for (slot, rom) in probes.iter().take(MAX_PROBES).enumerate() {
            temperatures[slot] = match self.read_temperature(rom) {
                Ok(celsius) => celsius,
                Err(e) => {
                    warn!("Probe {} read failed: {}", slot, e);
                    NO_SENSOR
                }
            };
        }

        debug!("Read {} probe(s): {:?}", probes.len(), temperatures);
        TemperatureSample::new(temperatures, probes.len())
    }
}
