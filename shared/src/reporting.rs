//! Uploads to the temperature reporting server.
//!
//! One call makes one best-effort HTTP GET. There is no retry inside a call;
//! the next scheduled cycle is the retry. Wire format (must stay exact for
//! the server): `<base>?pin=<chip id>&t=<temperature>&n=<probe count>&u=<successful uploads>`.

use log::{debug, error, info, warn};

use crate::connectivity::LinkCheck;
use crate::watchdog::{Watchdog, WatchdogPause};

pub const HTTP_OK: u16 = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Blocking HTTP client. Errors are transport failures (no status received).
pub trait HttpTransport {
    fn get(&mut self, url: &str) -> anyhow::Result<HttpResponse>;
}

/// Temperature as the reporting server expects it: two decimals.
pub fn format_report_temperature(temperature: f32) -> String {
    format!("{:.2}", temperature)
}

pub struct ReportingClient<H, W> {
    transport: H,
    watchdog: W,
    base_url: String,
    pin: u32,
    // Starts at 1 so the first successful upload reports u=1; resets only on reboot
    successful_uploads: u64,
}

impl<H: HttpTransport, W: Watchdog> ReportingClient<H, W> {
    pub fn new(transport: H, watchdog: W, base_url: impl Into<String>, pin: u32) -> Self {
        let base_url = base_url.into();
        info!("Initialized reporting client for pin {} -> {}", pin, base_url);

        Self {
            transport,
            watchdog,
            base_url,
            pin,
            successful_uploads: 1,
        }
    }

    /// Uploads one reading. Returns true only on HTTP 200.
    ///
    /// Restarts the device instead of returning when the link is down.
    pub fn upload<L: LinkCheck + ?Sized>(&mut self, link: &L, temperature: f32, sensor_count: usize) -> bool {
        link.verify_connected_or_reboot();

        // The request can outlast the watchdog period
        let _pause = WatchdogPause::new(&self.watchdog);

        let url = self.upload_url(temperature, sensor_count);
        info!("📤 Uploading: {}", url);

        match self.transport.get(&url) {
            Ok(response) if response.status == HTTP_OK => {
                debug!("Server replied: {}", response.body.trim());
                info!("✅ Upload {} accepted", self.successful_uploads);
                self.successful_uploads += 1;
                true
            }
            Ok(response) => {
                warn!("⚠️ Upload rejected with HTTP {}", response.status);
                false
            }
            Err(e) => {
                error!("❌ Upload failed: {:?}", e);
                false
            }
        }
    }

    pub fn upload_url(&self, temperature: f32, sensor_count: usize) -> String {
        format!(
            "{}?pin={}&t={}&n={}&u={}",
            self.base_url,
            self.pin,
            format_report_temperature(temperature),
            sensor_count,
            self.successful_uploads
        )
    }

    /// Counter value the next upload will carry.
    pub fn successful_uploads(&self) -> u64 {
        self.successful_uploads
    }

    pub fn transport(&self) -> &H {
        &self.transport
    }
}
