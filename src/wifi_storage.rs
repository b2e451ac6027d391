// Import ESP-IDF's NVS (Non-Volatile Storage) functionality
// Data stored in NVS survives reboots and power cycles
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

use anyhow::{Context, Result};
use log::{info, warn};

use tempreporter_shared::provisioning::{WifiCredentials, MAX_PASSWORD_LEN, MAX_SSID_LEN};

// NVS storage keys
const NVS_NAMESPACE: &str = "wifi_config";
const WIFI_CONFIG_KEY: &str = "wifi_creds";

// Worst case JSON record: every character of both fields escaped as \uXXXX
const MAX_RECORD_LEN: usize = 6 * (MAX_SSID_LEN + MAX_PASSWORD_LEN) + 32;

/// The one saved network, stored as a JSON record
pub struct WifiStorage {
    nvs: EspNvs<NvsDefault>,
}

impl WifiStorage {
    pub fn new(nvs_partition: EspDefaultNvsPartition) -> Result<Self> {
        let nvs = EspNvs::new(nvs_partition, NVS_NAMESPACE, true)
            .context("Failed to open WiFi config namespace")?;
        info!("WiFi storage initialized");
        Ok(Self { nvs })
    }

    /// Saved credentials, or None when nothing usable is stored
    pub fn load(&self) -> Option<WifiCredentials> {
        let mut buffer = vec![0u8; MAX_RECORD_LEN];
        let json = match self.nvs.get_str(WIFI_CONFIG_KEY, &mut buffer) {
            Ok(Some(json)) => json,
            Ok(None) => {
                info!("No WiFi credentials stored");
                return None;
            }
            Err(e) => {
                warn!("Error reading WiFi config: {:?}", e);
                return None;
            }
        };

        match serde_json::from_str::<WifiCredentials>(json) {
            Ok(credentials) if !credentials.ssid.is_empty() => {
                info!("Loaded WiFi config for SSID: {}", credentials.ssid);
                Some(credentials)
            }
            Ok(_) => {
                warn!("Stored WiFi config has an empty SSID");
                None
            }
            Err(e) => {
                warn!("Failed to parse stored WiFi config: {}", e);
                None
            }
        }
    }

    pub fn store(&mut self, credentials: &WifiCredentials) -> Result<()> {
        info!("Storing WiFi credentials for SSID: {}", credentials.ssid);
        let json = serde_json::to_string(credentials)?;
        self.nvs
            .set_str(WIFI_CONFIG_KEY, &json)
            .context("Failed to write WiFi config")?;
        Ok(())
    }
}
