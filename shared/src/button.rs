// Mode button debouncing
// The button is sampled from the main loop; a press counts once the level
// has been stable for the debounce period

use std::time::{Duration, Instant};

pub const BUTTON_DEBOUNCE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy)]
pub struct PressDetector {
    debounce: Duration,
    stable_pressed: bool,
    candidate: Option<(bool, Instant)>,
}

impl Default for PressDetector {
    fn default() -> Self {
        Self::new(BUTTON_DEBOUNCE)
    }
}

impl PressDetector {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            stable_pressed: false,
            candidate: None,
        }
    }

    /// Feeds one sample. Returns true exactly once per debounced press.
    pub fn update(&mut self, pressed: bool, now: Instant) -> bool {
        if pressed == self.stable_pressed {
            self.candidate = None;
            return false;
        }

        match self.candidate {
            Some((level, since)) if level == pressed => {
                if now.saturating_duration_since(since) < self.debounce {
                    return false;
                }
                self.stable_pressed = pressed;
                self.candidate = None;
                pressed
            }
            _ => {
                self.candidate = Some((pressed, now));
                false
            }
        }
    }
}
