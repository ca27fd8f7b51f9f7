//! Device identity and entropy for client id generation.

pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// 64-bit seed from the hardware RNG. Real entropy once the radio is up.
#[cfg(target_os = "espidf")]
pub fn random_seed() -> u64 {
    let hi = u64::from(unsafe { esp_idf_sys::esp_random() });
    let lo = u64::from(unsafe { esp_idf_sys::esp_random() });
    ((hi << 32) | lo) ^ mac_bits(&read_mac())
}

/// Simulation: mixes the wall clock with the fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn random_seed() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    nanos ^ mac_bits(&read_mac())
}

fn mac_bits(mac: &MacAddress) -> u64 {
    mac.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}
