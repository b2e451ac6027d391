// Screen mode button on GPIO0 (BOOT)
// Active low with the internal pull-up; sampled from the main loop

use std::time::Instant;

use anyhow::{anyhow, Result};
use esp_idf_hal::gpio::{Gpio0, Input, PinDriver, Pull};
use log::{debug, info};

use tempreporter_shared::button::PressDetector;

pub struct ModeButton {
    pin: PinDriver<'static, Gpio0, Input>,
    detector: PressDetector,
}

impl ModeButton {
    pub fn new(gpio0: Gpio0) -> Result<Self> {
        let mut pin = PinDriver::input(gpio0)
            .map_err(|e| anyhow!("Failed to configure mode button GPIO: {}", e))?;
        pin.set_pull(Pull::Up)
            .map_err(|e| anyhow!("Failed to set pull-up on mode button GPIO: {}", e))?;

        info!("✅ Mode button ready on GPIO0");
        Ok(Self {
            pin,
            detector: PressDetector::default(),
        })
    }

    /// True once per debounced press
    pub fn was_pressed(&mut self, now: Instant) -> bool {
        let pressed = self.detector.update(self.pin.is_low(), now);
        if pressed {
            debug!("🔘 Mode button pressed");
        }
        pressed
    }
}
