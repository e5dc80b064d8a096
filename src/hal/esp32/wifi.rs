//! Station-mode WiFi for ESP32 boards.
//!
//! Wraps esp-idf-svc's `BlockingWifi`. Construction configures and starts
//! the driver; association happens in [`WifiLink::connect`], so the
//! connectivity manager owns the retry policy.
//!
//! # Example
//!
//! ```ignore
//! use rs_airmon::hal::esp32::Esp32Wifi;
//! use rs_airmon::config::WifiConfig;
//! use rs_airmon::traits::WifiLink;
//!
//! let config = WifiConfig::default()
//!     .with_ssid("MyNetwork")
//!     .with_password("secret123");
//!
//! let mut wifi = Esp32Wifi::new(modem, sysloop, nvs, &config)?;
//! wifi.connect()?;
//! log::info!("IP: {:?}", wifi.ip_addr());
//! ```

use crate::config::WifiConfig;
use crate::traits::WifiLink;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::EspError;
use esp_idf_svc::wifi::{
    AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi,
};
use log::{info, warn};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

/// WiFi station for ESP32.
pub struct Esp32Wifi<'a> {
    wifi: BlockingWifi<EspWifi<'a>>,
    connect_timeout: Duration,
}

impl<'a> Esp32Wifi<'a> {
    /// Initialize the driver in station mode with the configured credentials.
    ///
    /// Does not associate; call [`WifiLink::connect`].
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot be created or started.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        config: &WifiConfig,
    ) -> anyhow::Result<Self> {
        let esp_wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
        let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;

        // esp-idf limits: 32-byte SSID, 64-byte passphrase
        let ssid: heapless::String<32> = crate::config::truncated(&config.ssid);
        let password: heapless::String<64> = crate::config::truncated(&config.password);
        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid,
            password,
            auth_method,
            ..Default::default()
        }))?;

        wifi.start()?;
        info!("wifi: driver started");

        Ok(Self {
            wifi,
            connect_timeout: config.connect_timeout(),
        })
    }

    /// Get the current IP address, if connected.
    pub fn ip_addr(&self) -> Option<Ipv4Addr> {
        self.wifi
            .wifi()
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| info.ip)
    }
}

impl WifiLink for Esp32Wifi<'_> {
    type Error = EspError;

    fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    /// One association attempt. Association and DHCP together are bounded
    /// by `WifiConfig::connect_timeout_ms`.
    fn connect(&mut self) -> Result<(), EspError> {
        let deadline = Instant::now() + self.connect_timeout;
        self.wifi.wifi_mut().connect()?;

        let associated = self.wifi.wifi_wait_while(
            || self.wifi.is_connected().map(|up| !up),
            Some(self.connect_timeout),
        );
        if let Err(e) = associated {
            warn!("wifi: association timed out after {:?}", self.connect_timeout);
            let _ = self.wifi.disconnect();
            return Err(e);
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        self.wifi
            .ip_wait_while(|| self.wifi.is_up().map(|up| !up), Some(remaining))?;
        if let Some(ip) = self.ip_addr() {
            info!("wifi: got IP {}", ip);
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), EspError> {
        self.wifi.disconnect()
    }
}
