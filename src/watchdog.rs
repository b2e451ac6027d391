// Task watchdog for the main loop
// Subscribes the calling task; must be used from the task that feeds it

use std::time::Duration;

use anyhow::anyhow;
use esp_idf_sys::{
    esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_delete, esp_task_wdt_init,
    esp_task_wdt_reconfigure, esp_task_wdt_reset, ESP_ERR_INVALID_STATE, ESP_OK,
};
use log::{info, warn};

use tempreporter_shared::watchdog::Watchdog;

pub struct TaskWatchdog {
    _private: (),
}

impl TaskWatchdog {
    /// Configures the task watchdog to panic (and so reboot) after `timeout`
    /// without a feed. The calling task is not subscribed until `enable`.
    pub fn configure(timeout: Duration) -> anyhow::Result<Self> {
        let config = esp_task_wdt_config_t {
            timeout_ms: timeout.as_millis().min(u32::MAX as u128) as u32,
            idle_core_mask: 0,
            trigger_panic: true,
        };

        let mut rc = unsafe { esp_task_wdt_init(&config) };
        if rc == ESP_ERR_INVALID_STATE {
            // Already started by the bootloader config
            rc = unsafe { esp_task_wdt_reconfigure(&config) };
        }
        if rc != ESP_OK {
            return Err(anyhow!("esp_task_wdt_init failed with code {}", rc));
        }

        info!("🐕 Task watchdog configured: {:?}", timeout);
        Ok(Self { _private: () })
    }
}

impl Watchdog for TaskWatchdog {
    fn enable(&self) {
        let rc = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
        if rc != ESP_OK && rc != ESP_ERR_INVALID_STATE {
            warn!("esp_task_wdt_add failed with code {}", rc);
        }
    }

    fn disable(&self) {
        let rc = unsafe { esp_task_wdt_delete(core::ptr::null_mut()) };
        if rc != ESP_OK && rc != ESP_ERR_INVALID_STATE {
            warn!("esp_task_wdt_delete failed with code {}", rc);
        }
    }

    fn feed(&self) {
        // Fails harmlessly while the task is unsubscribed
        let _ = unsafe { esp_task_wdt_reset() };
    }
}
