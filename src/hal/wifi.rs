//! Station-mode Wi-Fi join.
//!
//! Association happens at boot. Before each exchange the controller calls
//! [`NetworkLink::ensure_connected`], which makes one rejoin attempt if the
//! station dropped off the network since.

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::EspError;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};

use super::NetworkLink;
use crate::config::SatelliteConfig;
use crate::error::SatelliteError;

pub struct WifiLink {
    wifi: BlockingWifi<EspWifi<'static>>,
}

impl WifiLink {
    /// Bring up the station interface and try to join.
    ///
    /// Failing to join is not fatal; the link just reports down and each
    /// exchange is skipped until it comes up.
    pub fn start(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        config: &SatelliteConfig,
    ) -> Result<Self, SatelliteError> {
        let esp_err = |e: EspError| SatelliteError::Peripheral(format!("wifi: {}", e));

        let wifi = EspWifi::new(modem, sysloop.clone(), nvs).map_err(esp_err)?;
        let mut wifi = BlockingWifi::wrap(wifi, sysloop).map_err(esp_err)?;

        let net = &config.network;
        let client = ClientConfiguration {
            ssid: net
                .wifi_ssid
                .as_str()
                .try_into()
                .map_err(|_| SatelliteError::Peripheral("wifi: SSID too long".into()))?,
            password: net
                .wifi_password
                .as_str()
                .try_into()
                .map_err(|_| SatelliteError::Peripheral("wifi: password too long".into()))?,
            auth_method: if net.wifi_password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        };
        wifi.set_configuration(&Configuration::Client(client))
            .map_err(esp_err)?;
        wifi.start().map_err(esp_err)?;

        let mut link = Self { wifi };
        link.join(net.wifi_ssid.as_str(), config.wifi_connect_attempts, config.wifi_retry_delay_ms);
        Ok(link)
    }

    fn connect_once(&mut self) -> Result<(), EspError> {
        self.wifi.connect()?;
        self.wifi.wait_netif_up()?;
        match self.wifi.wifi().sta_netif().get_ip_info() {
            Ok(ip) => info!("[WIFI] Connected! IP: {}", ip.ip),
            Err(_) => info!("[WIFI] Connected!"),
        }
        Ok(())
    }

    fn join(&mut self, ssid: &str, attempts: u32, retry_delay_ms: u32) {
        info!("[WIFI] Connecting to {}", ssid);
        for attempt in 1..=attempts.max(1) {
            match self.connect_once() {
                Ok(()) => return,
                Err(e) => {
                    warn!("[WIFI] attempt {}/{} failed: {}", attempt, attempts, e);
                    FreeRtos::delay_ms(retry_delay_ms);
                }
            }
        }
        warn!("[WIFI] FAILED to connect. Check credentials.");
    }
}

impl NetworkLink for WifiLink {
    fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    fn ensure_connected(&mut self) -> bool {
        if self.is_connected() {
            return true;
        }
        warn!("[WIFI] Link down, reconnecting");
        match self.connect_once() {
            Ok(()) => true,
            Err(e) => {
                warn!("[WIFI] Reconnect failed: {}", e);
                false
            }
        }
    }
}
