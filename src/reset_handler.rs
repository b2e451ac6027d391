// Reset Handler Module
// Full chip restart, used whenever the device cannot continue safely

use std::thread;
use std::time::Duration;

use log::error;
use tempreporter_shared::connectivity::Restarter;

// Gives the UART a moment to drain the last log lines
const LOG_FLUSH_DELAY_MS: u64 = 100;

pub struct EspRestarter;

impl Restarter for EspRestarter {
    fn restart(&self) -> ! {
        error!("🔄 Restarting device");
        thread::sleep(Duration::from_millis(LOG_FLUSH_DELAY_MS));
        unsafe { esp_idf_sys::esp_restart() }
    }
}
