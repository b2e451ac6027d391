// Text canvas for the monochrome OLED
// Cursor-based text output in the style of the classic Arduino GFX API,
// rendered through embedded-graphics so any BinaryColor draw target works

use embedded_graphics::mono_font::iso_8859_1::{FONT_10X20, FONT_5X8};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};

/// Drawing primitives the display controller needs. Everything is
/// fire-and-forget: the panel has no read-back and no error channel.
pub trait Canvas {
    fn clear(&mut self);
    fn set_cursor(&mut self, x: i32, y: i32);
    /// 1 = small font, 2 = large font.
    fn set_text_size(&mut self, size: u8);
    fn print(&mut self, text: &str);
    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32);
    /// Push the frame to the panel.
    fn flush(&mut self);

    fn println(&mut self, text: &str) {
        self.print(text);
        self.print("\n");
    }
}

/// Panels that buffer frames in RAM and need an explicit transfer.
pub trait FrameSink {
    fn flush_frame(&mut self) -> anyhow::Result<()>;
}

/// [`Canvas`] over an embedded-graphics draw target.
pub struct GraphicsCanvas<D> {
    target: D,
    cursor: Point,
    text_size: u8,
}

impl<D> GraphicsCanvas<D>
where
    D: DrawTarget<Color = BinaryColor> + FrameSink,
{
    pub fn new(target: D) -> Self {
        Self {
            target,
            cursor: Point::zero(),
            text_size: 1,
        }
    }

    pub fn cursor(&self) -> Point {
        self.cursor
    }

    pub fn target(&self) -> &D {
        &self.target
    }

    fn font(&self) -> &'static MonoFont<'static> {
        if self.text_size >= 2 {
            &FONT_10X20
        } else {
            &FONT_5X8
        }
    }

    fn newline(&mut self) {
        let line_height = self.font().character_size.height as i32;
        self.cursor = Point::new(0, self.cursor.y + line_height);
    }
}

impl<D> Canvas for GraphicsCanvas<D>
where
    D: DrawTarget<Color = BinaryColor> + FrameSink,
{
    fn clear(&mut self) {
        self.target.clear(BinaryColor::Off).ok();
        self.cursor = Point::zero();
    }

    fn set_cursor(&mut self, x: i32, y: i32) {
        self.cursor = Point::new(x, y);
    }

    fn set_text_size(&mut self, size: u8) {
        self.text_size = size.max(1);
    }

    fn print(&mut self, text: &str) {
        let font = self.font();
        let style = MonoTextStyle::new(font, BinaryColor::On);
        let advance = (font.character_size.width + font.character_spacing) as i32;
        let width = self.target.bounding_box().size.width as i32;
        let mut buf = [0u8; 4];

        for ch in text.chars() {
            match ch {
                '\n' => self.newline(),
                '\r' => {}
                _ => {
                    if self.cursor.x + advance > width {
                        self.newline();
                    }
                    let glyph = ch.encode_utf8(&mut buf);
                    Text::with_baseline(glyph, self.cursor, style, Baseline::Top)
                        .draw(&mut self.target)
                        .ok();
                    self.cursor.x += advance;
                }
            }
        }
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32) {
        Rectangle::new(Point::new(x, y), Size::new(width, height))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut self.target)
            .ok();
    }

    fn flush(&mut self) {
        if let Err(e) = self.target.flush_frame() {
            log::warn!("Display flush failed: {:?}", e);
        }
    }
}
