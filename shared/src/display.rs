//! Screen state machine for the 64x48 OLED.
//!
//! Every public render method is a terminal state: the driver loop decides
//! which screen to show by calling it, and the controller maps
//! (phase, data) to exactly one frame. The only state kept between calls is
//! the main-screen [`ScreenMode`] and the last values shown on the main
//! screen, so a mode toggle can be redrawn without new readings.

use log::{debug, info};

use crate::canvas::Canvas;
use crate::connectivity::ConnectivityObserver;
use crate::readings::{is_sentinel, TemperatureSample, MAX_PROBES};

// On-screen text (the product ships with Swedish UI text)
const BOOT_TEXT: &str = "Startar";
const CONNECTING_TEXT: &str = "Ansluter\ntill:";
const RECONNECT_FAILED_TEXT: &str = "Kunde inte\nansluta.\n";
const NOTHING_SAVED_TEXT: &str = "Inget WiFi\nsparat.\n";
const JOIN_AP_TEXT: &str = "Anslut\ntill:";
const ERROR_TITLE: &str = "FEL";
const NO_SENSOR_TEXT: &str = "Ingen\nsensor\nansluten.";
const WIFI_LABEL: &str = "WiFi: ";
const PIN_LABEL: &str = "Pin:";
const SENSOR_COUNT_LABEL: &str = "Sensorer:";
const CELSIUS: &str = "\u{b0}C";

// Signal bars sit in the top right corner: 6 px wide, 1 px apart,
// each bar 2 px taller than the one before
const BAR_RIGHT_EDGE: i32 = 61;
const BAR_PITCH: i32 = 7;
const BAR_WIDTH: u32 = 6;
const BAR_STEP: i32 = 2;
pub const MAX_SIGNAL_BARS: u8 = 4;

/// Presentation of the main screen, toggled by the user button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenMode {
    /// Lowest temperature only, large font.
    #[default]
    Standard,
    /// Signal bars, device pin, every probe and the probe count.
    MoreInfo,
}

impl ScreenMode {
    pub fn toggled(self) -> Self {
        match self {
            ScreenMode::Standard => ScreenMode::MoreInfo,
            ScreenMode::MoreInfo => ScreenMode::Standard,
        }
    }
}

/// Values the main screen was last rendered with.
#[derive(Debug, Clone, PartialEq)]
pub struct MainScreenFrame {
    pub signal_strength_percent: u8,
    pub sample: TemperatureSample,
    pub lowest_temperature: f32,
    pub pin: u32,
}

/// Number of signal bars for a 0..=100 signal strength, one bar per full
/// quartile.
pub fn signal_bars(signal_strength_percent: u8) -> u8 {
    (signal_strength_percent.min(100) / 25).min(MAX_SIGNAL_BARS)
}

/// `23.5 °C`, or `None` when the value is a sentinel.
pub fn format_temperature_line(temperature: f32) -> Option<String> {
    if is_sentinel(temperature) {
        return None;
    }
    Some(format!("{:.1} {}", temperature, CELSIUS))
}

/// Large-font headline: one decimal, padded with a leading space when
/// non-negative so it lines up with negative values.
pub fn format_headline(temperature: f32) -> Option<String> {
    if is_sentinel(temperature) {
        return None;
    }
    if temperature >= 0.0 {
        Some(format!(" {:.1}", temperature))
    } else {
        Some(format!("{:.1}", temperature))
    }
}

pub struct DisplayController<C> {
    canvas: C,
    mode: ScreenMode,
    last_frame: Option<MainScreenFrame>,
}

impl<C: Canvas> DisplayController<C> {
    pub fn new(mut canvas: C) -> Self {
        canvas.set_text_size(1);
        Self {
            canvas,
            mode: ScreenMode::Standard,
            last_frame: None,
        }
    }

    pub fn boot_screen(&mut self) {
        self.start_frame();
        self.canvas.println(BOOT_TEXT);
        self.canvas.flush();
    }

    pub fn connecting_screen(&mut self, ssid: &str) {
        self.start_frame();
        self.canvas.println(CONNECTING_TEXT);
        self.canvas.print(ssid);
        self.canvas.flush();
    }

    /// Tells the operator to join the provisioning network. The lead-in
    /// distinguishes "could not reach the saved network" from "nothing saved".
    pub fn provisioning_screen(&mut self, had_saved_network: bool, ssid: &str) {
        self.start_frame();
        if had_saved_network {
            self.canvas.print(RECONNECT_FAILED_TEXT);
        } else {
            self.canvas.print(NOTHING_SAVED_TEXT);
        }
        self.canvas.println(JOIN_AP_TEXT);
        self.canvas.println(ssid);
        self.canvas.flush();
    }

    /// Appends one dot to whatever is on screen.
    pub fn print_progress_dot(&mut self) {
        self.canvas.print(".");
        self.canvas.flush();
    }

    pub fn main_screen(&mut self, signal_strength_percent: u8, sample: &TemperatureSample, pin: u32) {
        if !sample.has_sensors() {
            self.no_sensors_error();
            return;
        }

        let frame = MainScreenFrame {
            signal_strength_percent: signal_strength_percent.min(100),
            sample: sample.clone(),
            lowest_temperature: sample.lowest(),
            pin,
        };
        self.render_frame(&frame);
        self.last_frame = Some(frame);
    }

    /// Redraws the main screen from the last values, e.g. after a mode toggle.
    /// Returns false when the main screen has not been shown yet.
    pub fn refresh_main_screen(&mut self) -> bool {
        match self.last_frame.take() {
            Some(frame) => {
                self.render_frame(&frame);
                self.last_frame = Some(frame);
                true
            }
            None => false,
        }
    }

    pub fn switch_screen_mode(&mut self) {
        self.mode = self.mode.toggled();
        info!("Screen mode: {:?}", self.mode);
    }

    pub fn is_in_screen_mode(&self, mode: ScreenMode) -> bool {
        self.mode == mode
    }

    pub fn screen_mode(&self) -> ScreenMode {
        self.mode
    }

    pub fn last_frame(&self) -> Option<&MainScreenFrame> {
        self.last_frame.as_ref()
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    fn start_frame(&mut self) {
        self.canvas.clear();
        self.canvas.set_cursor(0, 0);
        self.canvas.set_text_size(1);
    }

    fn render_frame(&mut self, frame: &MainScreenFrame) {
        match self.mode {
            ScreenMode::Standard => self.render_standard(frame),
            ScreenMode::MoreInfo => self.render_more_info(frame),
        }
    }

    fn render_standard(&mut self, frame: &MainScreenFrame) {
        self.start_frame();

        let Some(headline) = format_headline(frame.lowest_temperature) else {
            debug!("Lowest temperature is a sentinel, leaving body blank");
            self.canvas.println("");
            self.canvas.flush();
            return;
        };

        self.canvas.print("\n");
        self.canvas.set_text_size(2);
        self.canvas.println(&headline);
        self.canvas.set_text_size(1);
        self.canvas.set_cursor(40, 34);
        self.canvas.print(CELSIUS);
        self.canvas.flush();
    }

    fn render_more_info(&mut self, frame: &MainScreenFrame) {
        self.start_frame();
        self.print_signal_strength(frame.signal_strength_percent);
        self.canvas.println(PIN_LABEL);
        self.canvas.println(&frame.pin.to_string());
        for index in 0..MAX_PROBES {
            self.print_temperature(frame.sample.reading(index));
        }
        self.canvas
            .println(&format!("{}{}", SENSOR_COUNT_LABEL, frame.sample.count));
        self.canvas.flush();
    }

    fn no_sensors_error(&mut self) {
        self.start_frame();
        self.canvas.set_text_size(2);
        self.canvas.println(ERROR_TITLE);
        self.canvas.set_text_size(1);
        self.canvas.print(NO_SENSOR_TEXT);
        self.canvas.flush();
    }

    fn print_temperature(&mut self, temperature: f32) {
        match format_temperature_line(temperature) {
            Some(line) => self.canvas.println(&line),
            None => self.canvas.println(""),
        }
    }

    fn print_signal_strength(&mut self, signal_strength_percent: u8) {
        self.canvas.println(WIFI_LABEL);

        for i in 0..signal_bars(signal_strength_percent) as i32 {
            let height = BAR_STEP * (i + 1);
            self.canvas.fill_rect(
                BAR_RIGHT_EDGE - BAR_PITCH * (MAX_SIGNAL_BARS as i32 - i),
                BAR_STEP * MAX_SIGNAL_BARS as i32 - height,
                BAR_WIDTH,
                height as u32,
            );
        }
    }
}

impl<C: Canvas> ConnectivityObserver for DisplayController<C> {
    fn on_connecting(&mut self, ssid: &str) {
        self.connecting_screen(ssid);
    }

    fn on_progress(&mut self) {
        self.print_progress_dot();
    }

    fn on_provisioning(&mut self, had_saved_network: bool, ap_name: &str) {
        self.provisioning_screen(had_saved_network, ap_name);
    }

    fn on_connected(&mut self, ssid: &str) {
        info!("Display notified of connection to {}", ssid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readings::{NO_SENSOR, READ_FAILURE};
    use crate::tests::mocks::{CanvasOp, RecordingCanvas};

    fn controller() -> DisplayController<RecordingCanvas> {
        DisplayController::new(RecordingCanvas::default())
    }

    fn sample(temperatures: &[f32], count: usize) -> TemperatureSample {
        TemperatureSample::new(temperatures.to_vec(), count)
    }

    #[test]
    fn boot_screen_shows_startup_text() {
        let mut display = controller();
        display.boot_screen();
        assert_eq!(display.canvas().last_frame_text(), "Startar\n");
        assert!(display.canvas().flushes() >= 1);
    }

    #[test]
    fn connecting_screen_tolerates_empty_ssid() {
        let mut display = controller();
        display.connecting_screen("");
        assert_eq!(display.canvas().last_frame_text(), "Ansluter\ntill:\n");

        display.connecting_screen("Hemma");
        assert_eq!(display.canvas().last_frame_text(), "Ansluter\ntill:\nHemma");
    }

    #[test]
    fn provisioning_screen_lead_in_depends_on_saved_network() {
        let mut display = controller();
        display.provisioning_screen(true, "Temperatur.nu");
        assert_eq!(
            display.canvas().last_frame_text(),
            "Kunde inte\nansluta.\nAnslut\ntill:\nTemperatur.nu\n"
        );

        display.provisioning_screen(false, "Temperatur.nu");
        assert!(display
            .canvas()
            .last_frame_text()
            .starts_with("Inget WiFi\nsparat.\n"));
    }

    #[test]
    fn progress_dot_appends_without_clearing() {
        let mut display = controller();
        display.connecting_screen("Hemma");
        display.print_progress_dot();
        display.print_progress_dot();
        assert_eq!(display.canvas().last_frame_text(), "Ansluter\ntill:\nHemma..");
    }

    #[test]
    fn no_sensors_renders_error_and_keeps_cached_frame() {
        let mut display = controller();
        display.main_screen(80, &sample(&[21.0, NO_SENSOR], 1), 1234);
        let cached = display.last_frame().cloned();

        display.main_screen(10, &sample(&[], 0), 9999);

        assert_eq!(
            display.canvas().last_frame_text(),
            "FEL\nIngen\nsensor\nansluten."
        );
        assert_eq!(display.last_frame().cloned(), cached);
    }

    #[test]
    fn standard_mode_shows_lowest_of_two_probes() {
        let mut display = controller();
        display.main_screen(50, &sample(&[21.44, -3.06], 2), 42);

        let text = display.canvas().last_frame_text();
        assert!(text.contains("-3.1\n"), "{text:?}");
        assert!(!text.contains("21.4"));
        assert!(text.ends_with("\u{b0}C"));
    }

    #[test]
    fn standard_mode_pads_non_negative_values() {
        let mut display = controller();
        display.main_screen(50, &sample(&[7.31], 1), 42);
        assert!(display.canvas().last_frame_text().contains(" 7.3\n"));
    }

    #[test]
    fn standard_mode_leaves_body_blank_for_sentinels() {
        for sentinel in [READ_FAILURE, NO_SENSOR] {
            let mut display = controller();
            display.main_screen(50, &sample(&[sentinel], 1), 42);

            let text = display.canvas().last_frame_text();
            assert_eq!(text, "\n", "sentinel {sentinel}");
            assert!(!text.contains("85") && !text.contains("127"));
        }
    }

    #[test]
    fn more_info_lists_pin_probes_and_count() {
        let mut display = controller();
        display.switch_screen_mode();
        display.main_screen(60, &sample(&[19.5, READ_FAILURE], 2), 10_551_234);

        assert_eq!(
            display.canvas().last_frame_text(),
            "WiFi: \nPin:\n10551234\n19.5 \u{b0}C\n\nSensorer:2\n"
        );
    }

    #[test]
    fn more_info_blanks_every_sentinel() {
        let mut display = controller();
        display.switch_screen_mode();
        display.main_screen(0, &sample(&[NO_SENSOR, READ_FAILURE], 2), 1);

        let text = display.canvas().last_frame_text();
        assert_eq!(text, "WiFi: \nPin:\n1\n\n\nSensorer:2\n");
    }

    #[test]
    fn more_info_draws_one_bar_per_quartile() {
        let cases = [(0, 0), (24, 0), (25, 1), (49, 1), (50, 2), (74, 2), (75, 3), (99, 3), (100, 4)];
        for (percent, bars) in cases {
            let mut display = controller();
            display.switch_screen_mode();
            display.main_screen(percent, &sample(&[20.0], 1), 1);
            assert_eq!(display.canvas().rects_in_last_frame().len(), bars, "{percent}%");
        }
    }

    #[test]
    fn signal_bars_grow_towards_the_right() {
        let mut display = controller();
        display.switch_screen_mode();
        display.main_screen(100, &sample(&[20.0], 1), 1);

        let rects = display.canvas().rects_in_last_frame();
        assert_eq!(
            rects,
            vec![
                CanvasOp::FillRect(33, 6, 6, 2),
                CanvasOp::FillRect(40, 4, 6, 4),
                CanvasOp::FillRect(47, 2, 6, 6),
                CanvasOp::FillRect(54, 0, 6, 8),
            ]
        );
    }

    #[test]
    fn switch_screen_mode_is_a_toggle() {
        let mut display = controller();
        let original = display.screen_mode();

        display.switch_screen_mode();
        assert_ne!(display.screen_mode(), original);
        assert!(display.is_in_screen_mode(ScreenMode::MoreInfo));

        display.switch_screen_mode();
        assert_eq!(display.screen_mode(), original);
    }

    #[test]
    fn toggle_alone_does_not_render() {
        let mut display = controller();
        display.main_screen(50, &sample(&[20.0], 1), 1);
        let ops_before = display.canvas().ops().len();

        display.switch_screen_mode();
        assert_eq!(display.canvas().ops().len(), ops_before);

        assert!(display.refresh_main_screen());
        assert!(display.canvas().last_frame_text().starts_with("WiFi: \n"));
    }

    #[test]
    fn refresh_without_main_screen_is_a_no_op() {
        let mut display = controller();
        assert!(!display.refresh_main_screen());
    }
}
