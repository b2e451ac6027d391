// Device configuration
// Production values live in Default; builds can override single keys

use std::time::Duration;

use anyhow::{anyhow, Context};

use crate::connectivity::SAVED_NETWORK_PORTAL_TIMEOUT;

pub const DEFAULT_REPORT_URL: &str = "http://report.temperatur.nu/rapportera_v2.php";
pub const DEFAULT_AP_NAME: &str = "Temperatur.nu";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReporterConfig {
    pub report_url: String,
    /// SSID of the open provisioning access point.
    pub ap_name: String,
    /// Portal lifetime when a saved network exists.
    pub provisioning_timeout: Duration,
    pub upload_interval: Duration,
    pub poll_interval: Duration,
    pub watchdog_timeout: Duration,
    /// How long one station connect attempt may take before falling back to the portal.
    pub connect_timeout: Duration,
    /// Upper bound on one upload request.
    pub http_timeout: Duration,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            report_url: DEFAULT_REPORT_URL.to_string(),
            ap_name: DEFAULT_AP_NAME.to_string(),
            provisioning_timeout: SAVED_NETWORK_PORTAL_TIMEOUT,
            upload_interval: Duration::from_secs(5 * 60),
            poll_interval: Duration::from_secs(2),
            watchdog_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(15),
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl ReporterConfig {
    /// Applies one `KEY=value` override. Durations are whole seconds.
    pub fn apply_override(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let value = value.trim();
        match key {
            "REPORT_URL" => self.report_url = value.to_string(),
            "AP_NAME" => {
                if value.is_empty() || value.len() > 32 {
                    return Err(anyhow!("AP name must be 1-32 bytes, got {:?}", value));
                }
                self.ap_name = value.to_string();
            }
            "PROVISIONING_TIMEOUT_SECS" => self.provisioning_timeout = parse_secs(key, value)?,
            "UPLOAD_INTERVAL_SECS" => self.upload_interval = parse_secs(key, value)?,
            "POLL_INTERVAL_SECS" => self.poll_interval = parse_secs(key, value)?,
            "WATCHDOG_TIMEOUT_SECS" => self.watchdog_timeout = parse_secs(key, value)?,
            "CONNECT_TIMEOUT_SECS" => self.connect_timeout = parse_secs(key, value)?,
            "HTTP_TIMEOUT_SECS" => self.http_timeout = parse_secs(key, value)?,
            _ => return Err(anyhow!("Unknown config key {}", key)),
        }
        Ok(())
    }

    /// Applies every present override, logging and skipping bad ones.
    pub fn with_overrides<'a>(mut self, overrides: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) -> Self {
        for (key, value) in overrides {
            let Some(value) = value else { continue };
            match self.apply_override(key, value) {
                Ok(()) => log::info!("Config override {} = {}", key, value),
                Err(e) => log::warn!("Ignoring config override {}: {:?}", key, e),
            }
        }
        self
    }
}

fn parse_secs(key: &str, value: &str) -> anyhow::Result<Duration> {
    let secs: u64 = value
        .parse()
        .with_context(|| format!("{} must be a number of seconds", key))?;
    if secs == 0 {
        return Err(anyhow!("{} must be greater than zero", key));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production() {
        let config = ReporterConfig::default();
        assert_eq!(config.report_url, "http://report.temperatur.nu/rapportera_v2.php");
        assert_eq!(config.ap_name, "Temperatur.nu");
        assert_eq!(config.provisioning_timeout, Duration::from_secs(300));
    }

    #[test]
    fn overrides_replace_single_fields() {
        let config = ReporterConfig::default().with_overrides([
            ("REPORT_URL", Some("http://localhost:8080/report")),
            ("UPLOAD_INTERVAL_SECS", Some("60")),
            ("AP_NAME", None),
        ]);
        assert_eq!(config.report_url, "http://localhost:8080/report");
        assert_eq!(config.upload_interval, Duration::from_secs(60));
        assert_eq!(config.ap_name, DEFAULT_AP_NAME);
    }

    #[test]
    fn http_timeout_is_separate_from_wifi_connect() {
        let config = ReporterConfig::default()
            .with_overrides([("HTTP_TIMEOUT_SECS", Some("45"))]);
        assert_eq!(config.http_timeout, Duration::from_secs(45));
        assert_eq!(config.connect_timeout, Duration::from_secs(15));
    }

    #[test]
    fn bad_overrides_are_rejected() {
        let mut config = ReporterConfig::default();
        assert!(config.apply_override("POLL_INTERVAL_SECS", "soon").is_err());
        assert!(config.apply_override("POLL_INTERVAL_SECS", "0").is_err());
        assert!(config.apply_override("AP_NAME", "").is_err());
        assert!(config.apply_override("COLOUR", "blue").is_err());
        assert_eq!(config, ReporterConfig::default());

        let config = ReporterConfig::default().with_overrides([("WATCHDOG_TIMEOUT_SECS", Some("-5"))]);
        assert_eq!(config.watchdog_timeout, Duration::from_secs(30));
    }
}
