// 64x48 SSD1306 OLED on I2C

use anyhow::anyhow;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use esp_idf_hal::i2c::I2cDriver;
use log::info;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

use tempreporter_shared::canvas::FrameSink;

type Driver = Ssd1306<
    I2CInterface<I2cDriver<'static>>,
    DisplaySize64x48,
    BufferedGraphicsMode<DisplaySize64x48>,
>;

/// Frame-buffered panel; drawing only touches RAM until `flush_frame`
pub struct Oled {
    driver: Driver,
}

impl Oled {
    pub fn new(i2c: I2cDriver<'static>) -> anyhow::Result<Self> {
        let interface = I2CDisplayInterface::new(i2c);
        let mut driver = Ssd1306::new(interface, DisplaySize64x48, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        driver
            .init()
            .map_err(|e| anyhow!("OLED init failed: {:?}", e))?;
        driver
            .clear(BinaryColor::Off)
            .map_err(|e| anyhow!("OLED clear failed: {:?}", e))?;
        info!("🖥️ OLED initialized");
        Ok(Self { driver })
    }
}

impl OriginDimensions for Oled {
    fn size(&self) -> Size {
        self.driver.size()
    }
}

impl DrawTarget for Oled {
    type Color = BinaryColor;
    type Error = <Driver as DrawTarget>::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.driver.draw_iter(pixels)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.driver.clear(color)
    }
}

impl FrameSink for Oled {
    fn flush_frame(&mut self) -> anyhow::Result<()> {
        self.driver
            .flush()
            .map_err(|e| anyhow!("OLED flush failed: {:?}", e))
    }
}
