/// Per-device identity derived from the factory MAC address.
///
/// The chip id is the `pin` the reporting server knows the device by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdentity {
    mac: [u8; 6],
}

impl DeviceIdentity {
    pub fn from_mac(mac: [u8; 6]) -> Self {
        Self { mac }
    }

    /// Low 24 bits of the MAC, the NIC-specific part.
    pub fn chip_id(&self) -> u32 {
        u32::from_be_bytes([0, self.mac[3], self.mac[4], self.mac[5]])
    }

    pub fn hostname(&self) -> String {
        format!("Temperatur_{}", self.chip_id())
    }

    pub fn mac_address(&self) -> String {
        let m = self.mac;
        format!(
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            m[0], m[1], m[2], m[3], m[4], m[5]
        )
    }
}
