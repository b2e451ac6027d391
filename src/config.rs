// Build-time configuration
// Values come from TEMPREPORTER_* variables at compile time (see build.rs);
// anything unset keeps the production default

use tempreporter_shared::config::ReporterConfig;

pub fn load() -> ReporterConfig {
    ReporterConfig::default().with_overrides([
        ("REPORT_URL", option_env!("TEMPREPORTER_REPORT_URL")),
        ("AP_NAME", option_env!("TEMPREPORTER_AP_NAME")),
        (
            "PROVISIONING_TIMEOUT_SECS",
            option_env!("TEMPREPORTER_PROVISIONING_TIMEOUT_SECS"),
        ),
        ("UPLOAD_INTERVAL_SECS", option_env!("TEMPREPORTER_UPLOAD_INTERVAL_SECS")),
        ("POLL_INTERVAL_SECS", option_env!("TEMPREPORTER_POLL_INTERVAL_SECS")),
        ("WATCHDOG_TIMEOUT_SECS", option_env!("TEMPREPORTER_WATCHDOG_TIMEOUT_SECS")),
        ("CONNECT_TIMEOUT_SECS", option_env!("TEMPREPORTER_CONNECT_TIMEOUT_SECS")),
        ("HTTP_TIMEOUT_SECS", option_env!("TEMPREPORTER_HTTP_TIMEOUT_SECS")),
    ])
}
