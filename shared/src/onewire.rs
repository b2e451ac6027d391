//! Dallas 1-Wire bus primitives.
//!
//! The bus itself is a platform capability ([`OneWire`]). Everything above
//! bit level (byte framing, ROM search, CRC-8) lives here so it can be
//! tested against a simulated bus.

use std::fmt;

pub const SEARCH_ROM: u8 = 0xF0;
pub const MATCH_ROM: u8 = 0x55;
pub const SKIP_ROM: u8 = 0xCC;

/// Addresses this many devices at most in one search.
pub const MAX_BUS_DEVICES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneWireError {
    /// Nobody pulled the line low after a reset pulse.
    NoPresence,
    /// Both the bit and its complement read 1 in the middle of a search.
    NoResponse,
    CrcMismatch { expected: u8, computed: u8 },
    /// The platform could not drive or sample the line.
    Bus(String),
}

impl fmt::Display for OneWireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OneWireError::NoPresence => write!(f, "No presence pulse on 1-Wire bus"),
            OneWireError::NoResponse => write!(f, "1-Wire device stopped responding"),
            OneWireError::CrcMismatch { expected, computed } => write!(
                f,
                "1-Wire CRC mismatch: expected 0x{:02X}, computed 0x{:02X}",
                expected, computed
            ),
            OneWireError::Bus(msg) => write!(f, "1-Wire bus error: {}", msg),
        }
    }
}

impl std::error::Error for OneWireError {}

/// Bit-level access to a 1-Wire bus. Bytes go out least significant bit first.
pub trait OneWire {
    /// Sends a reset pulse. Returns true when at least one device answered
    /// with a presence pulse.
    fn reset(&mut self) -> Result<bool, OneWireError>;
    fn write_bit(&mut self, bit: bool) -> Result<(), OneWireError>;
    fn read_bit(&mut self) -> Result<bool, OneWireError>;

    fn write_byte(&mut self, byte: u8) -> Result<(), OneWireError> {
        for i in 0..8 {
            self.write_bit(byte & (1 << i) != 0)?;
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, OneWireError> {
        let mut byte = 0;
        for i in 0..8 {
            if self.read_bit()? {
                byte |= 1 << i;
            }
        }
        Ok(byte)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), OneWireError> {
        bytes.iter().try_for_each(|b| self.write_byte(*b))
    }

    /// Reset followed by MATCH ROM, leaving only `rom` listening.
    fn select(&mut self, rom: &[u8; 8]) -> Result<(), OneWireError> {
        if !self.reset()? {
            return Err(OneWireError::NoPresence);
        }
        self.write_byte(MATCH_ROM)?;
        self.write_bytes(rom)
    }

    /// Reset followed by SKIP ROM, addressing every device at once.
    fn skip(&mut self) -> Result<(), OneWireError> {
        if !self.reset()? {
            return Err(OneWireError::NoPresence);
        }
        self.write_byte(SKIP_ROM)
    }
}

/// Dallas/Maxim CRC-8 (polynomial x^8 + x^5 + x^4 + 1, reflected).
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}

/// Checks the trailing CRC byte of a ROM code or scratchpad.
pub fn check_crc(data: &[u8]) -> Result<(), OneWireError> {
    let Some((&expected, body)) = data.split_last() else {
        return Ok(());
    };
    let computed = crc8(body);
    if computed == expected {
        Ok(())
    } else {
        Err(OneWireError::CrcMismatch { expected, computed })
    }
}

fn rom_bit(rom: &[u8; 8], index: usize) -> bool {
    rom[index / 8] & (1 << (index % 8)) != 0
}

fn set_rom_bit(rom: &mut [u8; 8], index: usize, value: bool) {
    if value {
        rom[index / 8] |= 1 << (index % 8);
    } else {
        rom[index / 8] &= !(1 << (index % 8));
    }
}

/// Enumerates device ROM codes with the binary-tree SEARCH ROM walk.
///
/// An empty bus gives an empty list. Stops after `limit` devices.
pub fn search_roms<B: OneWire + ?Sized>(bus: &mut B, limit: usize) -> Result<Vec<[u8; 8]>, OneWireError> {
    let mut roms = Vec::new();
    let mut rom = [0u8; 8];
    // 1-based bit position of the last branch where 0 was taken, 0 = none left
    let mut last_discrepancy = 0usize;

    while roms.len() < limit {
        if !bus.reset()? {
            break;
        }
        bus.write_byte(SEARCH_ROM)?;

        let mut last_zero = 0usize;
        for position in 1..=64 {
            let index = position - 1;
            let id_bit = bus.read_bit()?;
            let complement = bus.read_bit()?;

            let direction = match (id_bit, complement) {
                (true, true) => return Err(OneWireError::NoResponse),
                (bit, cmp) if bit != cmp => bit,
                _ => {
                    let take_one = if position < last_discrepancy {
                        rom_bit(&rom, index)
                    } else {
                        position == last_discrepancy
                    };
                    if !take_one {
                        last_zero = position;
                    }
                    take_one
                }
            };

            set_rom_bit(&mut rom, index, direction);
            bus.write_bit(direction)?;
        }

        check_crc(&rom)?;
        roms.push(rom);

        last_discrepancy = last_zero;
        if last_discrepancy == 0 {
            break;
        }
    }

    Ok(roms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mocks::{SimulatedBus, SimulatedProbe};

    #[test]
    fn crc8_matches_maxim_check_value() {
        assert_eq!(crc8(b"123456789"), 0xA1);
        assert_eq!(crc8(&[]), 0);
    }

    #[test]
    fn check_crc_accepts_own_checksum() {
        let mut data = vec![0x28, 0xFF, 0x4C, 0x6B, 0x61, 0x16, 0x04];
        data.push(crc8(&data));
        assert_eq!(check_crc(&data), Ok(()));

        data[2] ^= 0x01;
        assert!(matches!(check_crc(&data), Err(OneWireError::CrcMismatch { .. })));
    }

    #[test]
    fn search_on_empty_bus_finds_nothing() {
        let mut bus = SimulatedBus::default();
        assert_eq!(search_roms(&mut bus, MAX_BUS_DEVICES), Ok(Vec::new()));
    }

    #[test]
    fn search_finds_every_device_once() {
        let probes = [
            SimulatedProbe::new([0x01, 0x00, 0x00, 0x00, 0x00, 0x00], 0x0191),
            SimulatedProbe::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x00], 0x0191),
            SimulatedProbe::new([0x01, 0x80, 0x00, 0x00, 0x10, 0x00], 0x0191),
        ];
        let mut bus = SimulatedBus::with_probes(probes.to_vec());

        let mut found = search_roms(&mut bus, MAX_BUS_DEVICES).unwrap();
        found.sort();
        let mut expected: Vec<[u8; 8]> = probes.iter().map(|p| p.rom).collect();
        expected.sort();
        assert_eq!(found, expected);
    }

    #[test]
    fn search_respects_limit() {
        let probes = (1..=4u8)
            .map(|serial| SimulatedProbe::new([serial, 0, 0, 0, 0, 0], 0x0191))
            .collect();
        let mut bus = SimulatedBus::with_probes(probes);
        assert_eq!(search_roms(&mut bus, 2).unwrap().len(), 2);
    }
}
