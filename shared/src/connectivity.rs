// Connectivity lifecycle
// Takes the device from power-on to a usable WiFi connection, or restarts it.
// Leaving establish_connectivity() means "connected" - the other outcome is a reboot.

use std::time::Duration;

use log::{error, info, warn};

use crate::device_id::DeviceIdentity;

/// How long the provisioning portal stays up when a saved network exists.
pub const SAVED_NETWORK_PORTAL_TIMEOUT: Duration = Duration::from_secs(5 * 60);

// RSSI band mapped onto 0..=100 %
const RSSI_FLOOR_DBM: i32 = -100;
const RSSI_CEILING_DBM: i32 = -50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Provisioning,
    Connected,
}

/// Side effects of the connection lifecycle, typically rendered on the display.
pub trait ConnectivityObserver {
    /// A saved network is being tried.
    fn on_connecting(&mut self, ssid: &str);
    /// One polling tick while waiting for the link.
    fn on_progress(&mut self);
    /// The device fell back to its provisioning access point.
    fn on_provisioning(&mut self, had_saved_network: bool, ap_name: &str);
    fn on_connected(&mut self, ssid: &str);
}

/// WiFi credential management and link status, owned by the platform.
pub trait WifiProvisioner {
    fn has_saved_credential(&self) -> bool;
    /// SSID of the saved network, empty when none is saved.
    fn saved_network_name(&self) -> String;
    fn set_hostname(&mut self, hostname: &str) -> anyhow::Result<()>;
    /// `None` keeps the portal open until an operator configures the device.
    fn set_provisioning_timeout(&mut self, timeout: Option<Duration>);
    /// Tries the saved network and falls back to a provisioning access point
    /// named `ap_name`. Returns once connected, once the portal timed out, or
    /// once submitted credentials have been tried.
    fn auto_connect(&mut self, ap_name: &str, observer: &mut dyn ConnectivityObserver) -> bool;
    fn is_connected(&self) -> bool;
    /// Received signal strength of the current link in dBm.
    fn rssi(&self) -> Option<i32>;
}

/// Full device restart. Never returns.
pub trait Restarter {
    fn restart(&self) -> !;
}

impl<T: Restarter + ?Sized> Restarter for &T {
    fn restart(&self) -> ! {
        (**self).restart()
    }
}

/// Gate for code that must only run while connected.
pub trait LinkCheck {
    /// Returns only when the link is up; otherwise the device restarts.
    fn verify_connected_or_reboot(&self);
}

impl<T: LinkCheck + ?Sized> LinkCheck for &T {
    fn verify_connected_or_reboot(&self) {
        (**self).verify_connected_or_reboot()
    }
}

/// Maps RSSI to a 0..=100 quality figure, linear between -100 and -50 dBm.
pub fn rssi_to_percent(rssi: i32) -> u8 {
    if rssi <= RSSI_FLOOR_DBM {
        0
    } else if rssi >= RSSI_CEILING_DBM {
        100
    } else {
        (2 * (rssi - RSSI_FLOOR_DBM)) as u8
    }
}

// Forwards lifecycle events while keeping the manager's state current
struct StateTracker<'a> {
    state: &'a mut ConnectionState,
    inner: &'a mut dyn ConnectivityObserver,
}

impl ConnectivityObserver for StateTracker<'_> {
    fn on_connecting(&mut self, ssid: &str) {
        self.inner.on_connecting(ssid);
    }

    fn on_progress(&mut self) {
        self.inner.on_progress();
    }

    fn on_provisioning(&mut self, had_saved_network: bool, ap_name: &str) {
        info!("📡 Entering provisioning mode, access point: {}", ap_name);
        *self.state = ConnectionState::Provisioning;
        self.inner.on_provisioning(had_saved_network, ap_name);
    }

    fn on_connected(&mut self, ssid: &str) {
        info!("✅ Connected to {}", ssid);
        *self.state = ConnectionState::Connected;
        self.inner.on_connected(ssid);
    }
}

pub struct ConnectivityManager<W, R> {
    wifi: W,
    restarter: R,
    identity: DeviceIdentity,
    state: ConnectionState,
    portal_timeout: Duration,
}

impl<W: WifiProvisioner, R: Restarter> ConnectivityManager<W, R> {
    pub fn new(wifi: W, restarter: R, identity: DeviceIdentity) -> Self {
        Self {
            wifi,
            restarter,
            identity,
            state: ConnectionState::Disconnected,
            portal_timeout: SAVED_NETWORK_PORTAL_TIMEOUT,
        }
    }

    /// Overrides how long the portal stays up when a saved network exists.
    pub fn with_portal_timeout(mut self, timeout: Duration) -> Self {
        self.portal_timeout = timeout;
        self
    }

    /// Connects to the saved network or runs provisioning. Returns only
    /// when connected; every other outcome restarts the device.
    pub fn establish_connectivity(&mut self, ap_name: &str, observer: &mut dyn ConnectivityObserver) {
        let hostname = self.identity.hostname();
        if let Err(e) = self.wifi.set_hostname(&hostname) {
            warn!("Failed to set hostname {}: {:?}", hostname, e);
        }

        let had_saved_network = self.wifi.has_saved_credential();
        if had_saved_network {
            // A known network may just be down for a while, so don't sit in the portal forever
            self.wifi.set_provisioning_timeout(Some(self.portal_timeout));
            let ssid = self.wifi.saved_network_name();
            info!("Saved network found: {}", ssid);
            observer.on_connecting(&ssid);
        } else {
            info!("No saved network, provisioning waits for the operator");
            self.wifi.set_provisioning_timeout(None);
        }

        let mut tracker = StateTracker {
            state: &mut self.state,
            inner: observer,
        };
        if !self.wifi.auto_connect(ap_name, &mut tracker) {
            warn!("Automatic connection and provisioning both failed");
        }

        self.verify_connected_or_reboot();
        self.state = ConnectionState::Connected;
    }

    /// Restarts the device unless the link is up.
    pub fn verify_connected_or_reboot(&self) {
        if !self.wifi.is_connected() {
            error!("❌ WiFi not connected, restarting device");
            self.restarter.restart();
        }
    }

    pub fn signal_strength_percent(&self) -> u8 {
        self.wifi.rssi().map(rssi_to_percent).unwrap_or(0)
    }

    pub fn has_saved_network(&self) -> bool {
        self.wifi.has_saved_credential()
    }

    pub fn saved_network_name(&self) -> String {
        self.wifi.saved_network_name()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn wifi(&self) -> &W {
        &self.wifi
    }
}

impl<W: WifiProvisioner, R: Restarter> LinkCheck for ConnectivityManager<W, R> {
    fn verify_connected_or_reboot(&self) {
        ConnectivityManager::verify_connected_or_reboot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mocks::{
        expect_restart, CountingRestarter, ObserverEvent, RecordingObserver, ScriptedWifi,
    };

    fn identity() -> DeviceIdentity {
        DeviceIdentity::from_mac([0x24, 0x0a, 0xc4, 0xa0, 0xff, 0x12])
    }

    #[test]
    fn rssi_maps_linearly_between_floor_and_ceiling() {
        assert_eq!(rssi_to_percent(-120), 0);
        assert_eq!(rssi_to_percent(-100), 0);
        assert_eq!(rssi_to_percent(-99), 2);
        assert_eq!(rssi_to_percent(-75), 50);
        assert_eq!(rssi_to_percent(-51), 98);
        assert_eq!(rssi_to_percent(-50), 100);
        assert_eq!(rssi_to_percent(-20), 100);
    }

    #[test]
    fn signal_strength_is_zero_without_rssi() {
        let wifi = ScriptedWifi::default();
        let restarter = CountingRestarter::default();
        let manager = ConnectivityManager::new(wifi, &restarter, identity());
        assert_eq!(manager.signal_strength_percent(), 0);
    }

    #[test]
    fn saved_network_connects_without_provisioning() {
        let wifi = ScriptedWifi::saved("Hemma").connects_after_polls(2);
        let restarter = CountingRestarter::default();
        let mut observer = RecordingObserver::default();
        let mut manager = ConnectivityManager::new(wifi, &restarter, identity());

        manager.establish_connectivity("Temperatur.nu", &mut observer);

        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(manager.wifi().hostname(), Some("Temperatur_10551058"));
        assert_eq!(
            manager.wifi().provisioning_timeout(),
            Some(Some(SAVED_NETWORK_PORTAL_TIMEOUT))
        );
        assert_eq!(
            observer.events,
            vec![
                ObserverEvent::Connecting("Hemma".into()),
                ObserverEvent::Progress,
                ObserverEvent::Progress,
                ObserverEvent::Connected("Hemma".into()),
            ]
        );
        assert_eq!(restarter.count(), 0);
    }

    #[test]
    fn no_saved_network_waits_for_operator_without_timeout() {
        let wifi = ScriptedWifi::default().provisioned_after_polls("Stuga", 10_000);
        let restarter = CountingRestarter::default();
        let mut observer = RecordingObserver::default();
        let mut manager = ConnectivityManager::new(wifi, &restarter, identity());

        manager.establish_connectivity("Temperatur.nu", &mut observer);

        assert_eq!(manager.wifi().provisioning_timeout(), Some(None));
        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(observer.events.first(), Some(&ObserverEvent::Provisioning(false, "Temperatur.nu".into())));
        assert_eq!(observer.events.last(), Some(&ObserverEvent::Connected("Stuga".into())));
        assert_eq!(restarter.count(), 0);
    }

    #[test]
    fn unreachable_saved_network_restarts_once_after_portal_timeout() {
        let wifi = ScriptedWifi::saved("Hemma").portal_times_out();
        let restarter = CountingRestarter::default();
        let mut observer = RecordingObserver::default();
        let mut manager = ConnectivityManager::new(wifi, &restarter, identity());

        expect_restart(|| manager.establish_connectivity("Temperatur.nu", &mut observer));

        assert_eq!(restarter.count(), 1);
        assert_eq!(manager.state(), ConnectionState::Provisioning);
        assert!(observer
            .events
            .contains(&ObserverEvent::Provisioning(true, "Temperatur.nu".into())));
    }

    #[test]
    fn portal_timeout_can_be_shortened() {
        let wifi = ScriptedWifi::saved("Hemma").connects_after_polls(0);
        let restarter = CountingRestarter::default();
        let mut manager = ConnectivityManager::new(wifi, &restarter, identity())
            .with_portal_timeout(Duration::from_secs(30));

        manager.establish_connectivity("Temperatur.nu", &mut RecordingObserver::default());
        assert_eq!(
            manager.wifi().provisioning_timeout(),
            Some(Some(Duration::from_secs(30)))
        );
    }

    #[test]
    fn verify_restarts_when_link_is_down() {
        let wifi = ScriptedWifi::default();
        let restarter = CountingRestarter::default();
        let manager = ConnectivityManager::new(wifi, &restarter, identity());

        expect_restart(|| manager.verify_connected_or_reboot());
        assert_eq!(restarter.count(), 1);
    }

    #[test]
    fn verify_returns_when_connected() {
        let wifi = ScriptedWifi::connected(-60);
        let restarter = CountingRestarter::default();
        let manager = ConnectivityManager::new(wifi, &restarter, identity());

        manager.verify_connected_or_reboot();
        assert_eq!(restarter.count(), 0);
        assert_eq!(manager.signal_strength_percent(), 80);
    }

    #[test]
    fn saved_network_queries_forward_to_provisioner() {
        let restarter = CountingRestarter::default();
        let manager = ConnectivityManager::new(ScriptedWifi::saved("Hemma"), &restarter, identity());
        assert!(manager.has_saved_network());
        assert_eq!(manager.saved_network_name(), "Hemma");

        let manager = ConnectivityManager::new(ScriptedWifi::default(), &restarter, identity());
        assert!(!manager.has_saved_network());
        assert_eq!(manager.saved_network_name(), "");
    }
}
