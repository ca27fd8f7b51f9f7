//! WiFi station-mode adapter.
//!
//! Implements [`LinkPort`]: local address and signal strength for the
//! `status` reply and the periodic RSSI report.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspWifi` wrapped in `BlockingWifi`.
//! - **all other targets**: a simulated link for host-side tests.
//!
//! ## Connection policy
//!
//! Association is tried up to [`WIFI_CONNECT_ATTEMPTS`] times,
//! [`WIFI_RETRY_DELAY_MS`] apart. Running out of attempts is reported as
//! [`CommsError::WifiConnectFailed`]; `main` restarts the device.

use core::net::Ipv4Addr;

use log::{info, warn};

use crate::app::ports::LinkPort;
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};

pub const WIFI_CONNECT_ATTEMPTS: u32 = 150;
pub const WIFI_RETRY_DELAY_MS: u64 = 500;

/// 802.11 limit; the settings field itself is longer.
const MAX_SSID_LEN: usize = 32;
const MAX_PASSWORD_LEN: usize = 64;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Credentials the radio can actually use.
pub fn validate_credentials(ssid: &str, password: &str) -> Result<(), CommsError> {
    if ssid.is_empty() || ssid.len() > MAX_SSID_LEN || !is_printable_ascii(ssid) {
        warn!("WiFi: SSID must be 1-{} printable ASCII bytes", MAX_SSID_LEN);
        return Err(CommsError::WifiConnectFailed);
    }
    if password.len() > MAX_PASSWORD_LEN {
        warn!("WiFi: password longer than {} bytes", MAX_PASSWORD_LEN);
        return Err(CommsError::WifiConnectFailed);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiLink {
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimLinkState,
}

/// Host-side stand-in for the radio.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone)]
pub struct SimLinkState {
    pub connected: bool,
    pub ip: Ipv4Addr,
    pub rssi: Option<i8>,
    /// Association attempts that fail before one succeeds.
    pub failures_before_connect: u32,
}

#[cfg(not(target_os = "espidf"))]
impl Default for SimLinkState {
    fn default() -> Self {
        Self {
            connected: false,
            ip: Ipv4Addr::new(192, 168, 4, 2),
            rssi: Some(-58),
            failures_before_connect: 0,
        }
    }
}

#[cfg(target_os = "espidf")]
impl WifiLink {
    pub fn new(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> Result<Self, CommsError> {
        let esp_wifi = EspWifi::new(modem, sys_loop.clone(), Some(nvs))
            .map_err(|_| CommsError::WifiConnectFailed)?;
        let wifi =
            BlockingWifi::wrap(esp_wifi, sys_loop).map_err(|_| CommsError::WifiConnectFailed)?;
        Ok(Self { wifi })
    }

    /// Associate and wait for an address.
    pub fn connect(&mut self, ssid: &str, password: &str) -> Result<(), CommsError> {
        validate_credentials(ssid, password)?;

        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPAWPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| CommsError::WifiConnectFailed)?,
            password: password
                .try_into()
                .map_err(|_| CommsError::WifiConnectFailed)?,
            auth_method,
            ..Default::default()
        });
        self.wifi
            .set_configuration(&config)
            .map_err(|_| CommsError::WifiConnectFailed)?;
        self.wifi
            .start()
            .map_err(|_| CommsError::WifiConnectFailed)?;
        info!("WiFi: connecting to '{}'", ssid);

        for attempt in 1..=WIFI_CONNECT_ATTEMPTS {
            let result = self.wifi.connect().and_then(|()| self.wifi.wait_netif_up());
            match result {
                Ok(()) => {
                    info!("WiFi: connected on attempt {}, IP {}", attempt, self.local_ip());
                    return Ok(());
                }
                Err(e) => {
                    warn!("WiFi: attempt {}/{} failed: {}", attempt, WIFI_CONNECT_ATTEMPTS, e);
                    let _ = self.wifi.disconnect();
                    std::thread::sleep(std::time::Duration::from_millis(WIFI_RETRY_DELAY_MS));
                }
            }
        }
        Err(CommsError::WifiConnectFailed)
    }

    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiLink {
    pub fn simulated(sim: SimLinkState) -> Self {
        Self { sim }
    }

    /// Same attempt policy as the device, without the delays.
    pub fn connect(&mut self, ssid: &str, password: &str) -> Result<(), CommsError> {
        validate_credentials(ssid, password)?;
        for attempt in 1..=WIFI_CONNECT_ATTEMPTS {
            if self.sim.failures_before_connect == 0 {
                self.sim.connected = true;
                info!("WiFi(sim): connected to '{}' on attempt {}", ssid, attempt);
                return Ok(());
            }
            self.sim.failures_before_connect -= 1;
        }
        warn!("WiFi(sim): gave up after {} attempts", WIFI_CONNECT_ATTEMPTS);
        Err(CommsError::WifiConnectFailed)
    }

    pub fn is_connected(&self) -> bool {
        self.sim.connected
    }
}

impl LinkPort for WifiLink {
    #[cfg(target_os = "espidf")]
    fn local_ip(&self) -> Ipv4Addr {
        self.wifi
            .wifi()
            .sta_netif()
            .get_ip_info()
            .map(|info| Ipv4Addr::from(info.ip.octets()))
            .unwrap_or(Ipv4Addr::UNSPECIFIED)
    }

    #[cfg(not(target_os = "espidf"))]
    fn local_ip(&self) -> Ipv4Addr {
        if self.sim.connected {
            self.sim.ip
        } else {
            Ipv4Addr::UNSPECIFIED
        }
    }

    #[cfg(target_os = "espidf")]
    fn rssi(&self) -> Option<i8> {
        let mut ap_info = esp_idf_svc::sys::wifi_ap_record_t::default();
        let rc = unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut ap_info) };
        (rc == esp_idf_svc::sys::ESP_OK).then_some(ap_info.rssi)
    }

    #[cfg(not(target_os = "espidf"))]
    fn rssi(&self) -> Option<i8> {
        if self.sim.connected { self.sim.rssi } else { None }
    }
}
