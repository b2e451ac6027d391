// WiFi client and provisioning access point
// Implements the platform side of WifiProvisioner on the ESP32 radio

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use esp_idf_hal::modem::Modem;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi,
};
use log::{error, info, warn};

use tempreporter_shared::connectivity::{ConnectivityObserver, WifiProvisioner};
use tempreporter_shared::provisioning::{ProvisioningWindow, WifiCredentials};

use crate::portal::CredentialPortal;
use crate::wifi_storage::WifiStorage;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const PORTAL_CHANNEL: u8 = 1;
const PORTAL_REPORT_INTERVAL: Duration = Duration::from_secs(60);

pub struct EspWifiProvisioner {
    wifi: BlockingWifi<EspWifi<'static>>,
    storage: WifiStorage,
    saved: Option<WifiCredentials>,
    provisioning_timeout: Option<Duration>,
    connect_timeout: Duration,
}

impl EspWifiProvisioner {
    pub fn new(
        modem: impl Peripheral<P = Modem> + 'static,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        connect_timeout: Duration,
    ) -> Result<Self> {
        info!("Initializing WiFi client");

        let wifi = EspWifi::new(modem, sys_loop.clone(), Some(nvs.clone()))?;
        let wifi = BlockingWifi::wrap(wifi, sys_loop)?;
        let storage = WifiStorage::new(nvs)?;
        let saved = storage.load();

        Ok(Self {
            wifi,
            storage,
            saved,
            provisioning_timeout: None,
            connect_timeout,
        })
    }

    fn restart_radio(&mut self, configuration: &Configuration) -> Result<()> {
        if self.wifi.is_started()? {
            self.wifi.stop()?;
        }
        self.wifi.set_configuration(configuration)?;
        self.wifi.start()?;
        Ok(())
    }

    /// One station connect attempt, ticking the observer while it waits
    fn connect_station(
        &mut self,
        credentials: &WifiCredentials,
        observer: &mut dyn ConnectivityObserver,
    ) -> Result<()> {
        info!("Attempting to connect to WiFi network: {}", credentials.ssid);

        let auth_method = if credentials.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let configuration = Configuration::Client(ClientConfiguration {
            ssid: credentials
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| anyhow!("Invalid SSID format"))?,
            password: credentials
                .password
                .as_str()
                .try_into()
                .map_err(|_| anyhow!("Invalid password format"))?,
            auth_method,
            ..Default::default()
        });
        self.restart_radio(&configuration)?;

        // Non-blocking connect so progress can be shown
        self.wifi.wifi_mut().connect()?;
        let start = Instant::now();
        while !self.wifi.is_connected()? {
            if start.elapsed() >= self.connect_timeout {
                let _ = self.wifi.disconnect();
                return Err(anyhow!("Connection timeout reached"));
            }
            observer.on_progress();
            thread::sleep(POLL_INTERVAL);
        }

        self.wifi.wait_netif_up()?;
        let ip_info = self.wifi.wifi().sta_netif().get_ip_info()?;
        info!("Successfully connected to WiFi. IP: {}", ip_info.ip);
        Ok(())
    }

    fn try_connect(&mut self, credentials: &WifiCredentials, observer: &mut dyn ConnectivityObserver) -> bool {
        match self.connect_station(credentials, observer) {
            Ok(()) => {
                observer.on_connected(&credentials.ssid);
                true
            }
            Err(e) => {
                warn!("WiFi connection to {} failed: {:?}", credentials.ssid, e);
                false
            }
        }
    }

    fn start_access_point(&mut self, ap_name: &str) -> Result<()> {
        let configuration = Configuration::AccessPoint(AccessPointConfiguration {
            ssid: ap_name
                .try_into()
                .map_err(|_| anyhow!("Provisioning AP name too long"))?,
            auth_method: AuthMethod::None,
            channel: PORTAL_CHANNEL,
            ..Default::default()
        });
        self.restart_radio(&configuration)?;
        self.wifi.wait_netif_up()?;
        info!("Provisioning AP started on `{}`", ap_name);
        Ok(())
    }

    /// Serves the portal until credentials arrive or the window closes
    fn wait_for_credentials(&mut self, ap_name: &str) -> Result<Option<WifiCredentials>> {
        self.start_access_point(ap_name)?;
        let portal = CredentialPortal::start(ap_name)?;
        let window = ProvisioningWindow::open(Instant::now(), self.provisioning_timeout);
        let mut last_report = Instant::now();
        log_window(&window, last_report);

        loop {
            if let Some(credentials) = portal.take_submission() {
                return Ok(Some(credentials));
            }
            let now = Instant::now();
            if window.is_expired(now) {
                warn!("⏰ Provisioning portal timed out");
                return Ok(None);
            }
            if now.duration_since(last_report) >= PORTAL_REPORT_INTERVAL {
                log_window(&window, now);
                last_report = now;
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn run_portal(&mut self, ap_name: &str, observer: &mut dyn ConnectivityObserver) -> bool {
        observer.on_provisioning(self.saved.is_some(), ap_name);

        let credentials = match self.wait_for_credentials(ap_name) {
            Ok(Some(credentials)) => credentials,
            Ok(None) => return false,
            Err(e) => {
                error!("❌ Provisioning portal failed: {:?}", e);
                return false;
            }
        };

        // Kept even if the first attempt fails; the network may just be out of reach
        if let Err(e) = self.storage.store(&credentials) {
            error!("❌ Failed to save WiFi credentials: {:?}", e);
        }
        self.saved = Some(credentials.clone());

        self.try_connect(&credentials, observer)
    }
}

fn log_window(window: &ProvisioningWindow, now: Instant) {
    match window.remaining(now) {
        Some(remaining) => info!("Provisioning portal open, {}s left", remaining.as_secs()),
        None => info!("Provisioning portal open until configured"),
    }
}

impl WifiProvisioner for EspWifiProvisioner {
    fn has_saved_credential(&self) -> bool {
        self.saved.is_some()
    }

    fn saved_network_name(&self) -> String {
        self.saved
            .as_ref()
            .map(|credentials| credentials.ssid.clone())
            .unwrap_or_default()
    }

    fn set_hostname(&mut self, hostname: &str) -> Result<()> {
        self.wifi.wifi_mut().sta_netif_mut().set_hostname(hostname)?;
        info!("Hostname set to {}", hostname);
        Ok(())
    }

    fn set_provisioning_timeout(&mut self, timeout: Option<Duration>) {
        self.provisioning_timeout = timeout;
    }

    fn auto_connect(&mut self, ap_name: &str, observer: &mut dyn ConnectivityObserver) -> bool {
        if let Some(credentials) = self.saved.clone() {
            if self.try_connect(&credentials, observer) {
                return true;
            }
        }
        self.run_portal(ap_name, observer)
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    fn rssi(&self) -> Option<i32> {
        let mut record: esp_idf_sys::wifi_ap_record_t = unsafe { core::mem::zeroed() };
        let rc = unsafe { esp_idf_sys::esp_wifi_sta_get_ap_info(&mut record) };
        if rc == esp_idf_sys::ESP_OK {
            Some(record.rssi as i32)
        } else {
            None
        }
    }
}
