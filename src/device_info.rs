use log::info;
use tempreporter_shared::device_id::DeviceIdentity;

/// Read the factory-programmed base MAC address from eFuse
pub fn read_factory_mac() -> [u8; 6] {
    let mut mac = [0u8; 6];
    unsafe {
        esp_idf_sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Identity of this board, stable across reflashing
pub fn device_identity() -> DeviceIdentity {
    let identity = DeviceIdentity::from_mac(read_factory_mac());
    info!(
        "Device {} (MAC {}, pin {})",
        identity.hostname(),
        identity.mac_address(),
        identity.chip_id()
    );
    identity
}
