// Bit-banged 1-Wire master on an open-drain GPIO
// Slot timings follow the standard-speed values from the Maxim application note

use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::{AnyIOPin, InputOutput, PinDriver, Pull};
use esp_idf_hal::interrupt;
use esp_idf_sys::EspError;

use tempreporter_shared::onewire::{OneWire, OneWireError};

const RESET_LOW_US: u32 = 480;
const PRESENCE_SAMPLE_US: u32 = 70;
const RESET_RECOVERY_US: u32 = 410;

const WRITE_ONE_LOW_US: u32 = 6;
const WRITE_ONE_RELEASE_US: u32 = 64;
const WRITE_ZERO_LOW_US: u32 = 60;
const WRITE_ZERO_RELEASE_US: u32 = 10;

const READ_LOW_US: u32 = 6;
const READ_SAMPLE_US: u32 = 9;
const READ_RECOVERY_US: u32 = 55;

pub struct GpioOneWire {
    pin: PinDriver<'static, AnyIOPin, InputOutput>,
}

impl GpioOneWire {
    /// The line needs a pull-up; the internal one is enough for short runs
    pub fn new(pin: AnyIOPin) -> anyhow::Result<Self> {
        let mut pin = PinDriver::input_output_od(pin)?;
        pin.set_pull(Pull::Up)?;
        pin.set_high()?;
        Ok(Self { pin })
    }
}

fn bus_error(e: EspError) -> OneWireError {
    OneWireError::Bus(e.to_string())
}

impl OneWire for GpioOneWire {
    fn reset(&mut self) -> Result<bool, OneWireError> {
        let pin = &mut self.pin;
        let present = interrupt::free(|| -> Result<bool, EspError> {
            pin.set_low()?;
            Ets::delay_us(RESET_LOW_US);
            pin.set_high()?;
            Ets::delay_us(PRESENCE_SAMPLE_US);
            Ok(pin.is_low())
        })
        .map_err(bus_error)?;
        Ets::delay_us(RESET_RECOVERY_US);
        Ok(present)
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), OneWireError> {
        let (low, release) = if bit {
            (WRITE_ONE_LOW_US, WRITE_ONE_RELEASE_US)
        } else {
            (WRITE_ZERO_LOW_US, WRITE_ZERO_RELEASE_US)
        };
        let pin = &mut self.pin;
        interrupt::free(|| -> Result<(), EspError> {
            pin.set_low()?;
            Ets::delay_us(low);
            pin.set_high()?;
            Ok(())
        })
        .map_err(bus_error)?;
        Ets::delay_us(release);
        Ok(())
    }

    fn read_bit(&mut self) -> Result<bool, OneWireError> {
        let pin = &mut self.pin;
        let bit = interrupt::free(|| -> Result<bool, EspError> {
            pin.set_low()?;
            Ets::delay_us(READ_LOW_US);
            pin.set_high()?;
            Ets::delay_us(READ_SAMPLE_US);
            Ok(pin.is_high())
        })
        .map_err(bus_error)?;
        Ets::delay_us(READ_RECOVERY_US);
        Ok(bit)
    }
}
