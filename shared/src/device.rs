//! The device driver loop.
//!
//! [`Device`] owns one of each component and sequences them: boot screen,
//! connectivity, then repeated read-render-upload cycles. The platform
//! decides how often [`Device::run_cycle`] runs and when the mode button
//! fired; everything else is decided here.

use std::time::{Duration, Instant};

use log::{info, warn};

use crate::canvas::Canvas;
use crate::config::ReporterConfig;
use crate::connectivity::{ConnectivityManager, Restarter, WifiProvisioner};
use crate::display::DisplayController;
use crate::readings::{is_sentinel, ReadingSource, TemperatureSample};
use crate::reporting::{HttpTransport, ReportingClient};
use crate::watchdog::Watchdog;

/// Fixed-interval upload timer. The first check is always due.
#[derive(Debug, Clone, Copy)]
pub struct UploadSchedule {
    interval: Duration,
    next_due: Option<Instant>,
}

impl UploadSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_due.map_or(true, |due| now >= due)
    }

    pub fn advance(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    NotDue,
    Accepted,
    Failed,
}

pub struct Device<C, S, W, R, H, G> {
    display: DisplayController<C>,
    sensors: S,
    connectivity: ConnectivityManager<W, R>,
    reporting: ReportingClient<H, G>,
    schedule: UploadSchedule,
    ap_name: String,
}

impl<C, S, W, R, H, G> Device<C, S, W, R, H, G>
where
    C: Canvas,
    S: ReadingSource,
    W: WifiProvisioner,
    R: Restarter,
    H: HttpTransport,
    G: Watchdog,
{
    pub fn new(
        canvas: C,
        sensors: S,
        connectivity: ConnectivityManager<W, R>,
        transport: H,
        watchdog: G,
        config: &ReporterConfig,
    ) -> Self {
        let pin = connectivity.identity().chip_id();
        let connectivity = connectivity.with_portal_timeout(config.provisioning_timeout);

        Self {
            display: DisplayController::new(canvas),
            sensors,
            connectivity,
            reporting: ReportingClient::new(transport, watchdog, config.report_url.clone(), pin),
            schedule: UploadSchedule::new(config.upload_interval),
            ap_name: config.ap_name.clone(),
        }
    }

    /// Shows the boot screen and brings up WiFi. Returns connected or not at all.
    pub fn boot(&mut self) {
        info!("🚀 Booting device {}", self.connectivity.identity().hostname());
        self.display.boot_screen();
        self.connectivity
            .establish_connectivity(&self.ap_name, &mut self.display);
    }

    /// One read-render-upload pass.
    pub fn run_cycle(&mut self, now: Instant) -> UploadOutcome {
        let sample = self.sensors.read_all();
        let signal = self.connectivity.signal_strength_percent();
        let pin = self.connectivity.identity().chip_id();
        self.display.main_screen(signal, &sample, pin);

        if !self.schedule.is_due(now) {
            return UploadOutcome::NotDue;
        }
        // Failed uploads wait for the next slot like everything else
        self.schedule.advance(now);
        self.upload(&sample)
    }

    /// Toggles the main screen mode and redraws it straight away.
    pub fn switch_screen_mode(&mut self) {
        self.display.switch_screen_mode();
        self.display.refresh_main_screen();
    }

    pub fn display(&self) -> &DisplayController<C> {
        &self.display
    }

    pub fn connectivity(&self) -> &ConnectivityManager<W, R> {
        &self.connectivity
    }

    pub fn reporting(&self) -> &ReportingClient<H, G> {
        &self.reporting
    }

    pub fn sensors(&self) -> &S {
        &self.sensors
    }

    pub fn schedule(&self) -> &UploadSchedule {
        &self.schedule
    }

    /// Reports the headline figure and probe count as read. Faults go to the
    /// server unchanged; `n` tells it how many probes answered.
    fn upload(&mut self, sample: &TemperatureSample) -> UploadOutcome {
        let lowest = sample.lowest();
        if !sample.has_sensors() {
            warn!("No sensors connected, reporting n=0");
        } else if is_sentinel(lowest) {
            warn!("Lowest reading {} is a fault value", lowest);
        }

        if self.reporting.upload(&self.connectivity, lowest, sample.count) {
            UploadOutcome::Accepted
        } else {
            UploadOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_is_due_immediately_then_every_interval() {
        let start = Instant::now();
        let mut schedule = UploadSchedule::new(Duration::from_secs(300));
        assert!(schedule.is_due(start));

        schedule.advance(start);
        assert!(!schedule.is_due(start + Duration::from_secs(299)));
        assert!(schedule.is_due(start + Duration::from_secs(300)));
        assert_eq!(schedule.next_due(), Some(start + Duration::from_secs(300)));
    }
}
