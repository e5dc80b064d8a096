//! Shared configuration system for desktop and ESP32.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`.
//!
//! # Example
//!
//! ```rust
//! use rs_airmon::config::{Config, DeviceConfig, DeviceProfile, MqttConfig};
//!
//! // Use defaults
//! let config = Config::default();
//!
//! // Or customize
//! let config = Config::default()
//!     .with_mqtt(MqttConfig::default().with_host("192.168.1.100"))
//!     .with_device(DeviceConfig::default().with_profile(DeviceProfile::Paper));
//! ```

use core::time::Duration;

use embedded_graphics::geometry::Size;
use heapless::String as HString;

/// Maximum length for short config strings (hostnames, client IDs)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum length for longer config strings (topics)
pub const MAX_LONG_STRING: usize = 128;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Type alias for longer config strings
pub type LongString = HString<MAX_LONG_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    truncated(s)
}

/// Create a LongString from a &str, truncating if too long
pub fn long_string(s: &str) -> LongString {
    truncated(s)
}

pub(crate) fn truncated<const N: usize>(s: &str) -> HString<N> {
    let mut hs = HString::new();
    // Stop at the last char boundary that still fits
    let end = s
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= N)
        .last()
        .unwrap_or(0);
    let _ = hs.push_str(&s[..end]);
    hs
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// WiFi connection configuration
    pub wifi: WifiConfig,
    /// MQTT / Home Assistant configuration
    pub mqtt: MqttConfig,
    /// Sensor polling and calibration
    pub sensor: SensorConfig,
    /// Device identification and hardware profile
    pub device: DeviceConfig,
}

impl Config {
    /// Set WiFi configuration
    pub fn with_wifi(mut self, wifi: WifiConfig) -> Self {
        self.wifi = wifi;
        self
    }

    /// Set MQTT configuration
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = mqtt;
        self
    }

    /// Set sensor configuration
    pub fn with_sensor(mut self, sensor: SensorConfig) -> Self {
        self.sensor = sensor;
        self
    }

    /// Set device configuration
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }
}

// ============================================================================
// MQTT Config
// ============================================================================

/// MQTT client and Home Assistant discovery configuration
#[derive(Clone, Debug)]
pub struct MqttConfig {
    /// Broker hostname or IP
    pub host: ShortString,
    /// Broker port
    pub port: u16,
    /// Client ID (empty = use the device ID)
    pub client_id: ShortString,
    /// Username for authentication (empty = no auth)
    pub username: ShortString,
    /// Password for authentication
    pub password: ShortString,
    /// Home Assistant discovery prefix
    pub discovery_prefix: ShortString,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// Minimum time between connection attempts in milliseconds
    pub reconnect_cooldown_ms: u32,
    /// Minimum time between state publishes in milliseconds
    pub publish_interval_ms: u32,
    /// Whether MQTT is enabled
    pub enabled: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: short_string("homeassistant.local"),
            port: 1883,
            client_id: ShortString::new(),
            username: ShortString::new(),
            password: ShortString::new(),
            discovery_prefix: short_string("homeassistant"),
            keep_alive_secs: 60,
            reconnect_cooldown_ms: 5_000,
            publish_interval_ms: 5_000,
            enabled: true,
        }
    }
}

impl MqttConfig {
    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = short_string(host);
        self
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the client ID
    pub fn with_client_id(mut self, id: &str) -> Self {
        self.client_id = short_string(id);
        self
    }

    /// Set authentication credentials
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.username = short_string(username);
        self.password = short_string(password);
        self
    }

    /// Set the discovery prefix
    pub fn with_discovery_prefix(mut self, prefix: &str) -> Self {
        self.discovery_prefix = short_string(prefix);
        self
    }

    /// Set the reconnect cooldown
    pub fn with_reconnect_cooldown_ms(mut self, ms: u32) -> Self {
        self.reconnect_cooldown_ms = ms;
        self
    }

    /// Set the minimum publish interval
    pub fn with_publish_interval_ms(mut self, ms: u32) -> Self {
        self.publish_interval_ms = ms;
        self
    }

    /// Enable or disable MQTT
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Check if authentication is configured
    pub fn has_auth(&self) -> bool {
        !self.username.is_empty()
    }

    /// Client ID to present to the broker, falling back to `device_id`.
    pub fn effective_client_id<'a>(&'a self, device_id: &'a str) -> &'a str {
        if self.client_id.is_empty() {
            device_id
        } else {
            self.client_id.as_str()
        }
    }
}

// ============================================================================
// WiFi Config
// ============================================================================

/// WiFi connection configuration
#[derive(Clone, Debug)]
pub struct WifiConfig {
    /// WiFi network SSID
    pub ssid: ShortString,
    /// WiFi password
    pub password: ShortString,
    /// Timeout for one association attempt in milliseconds
    pub connect_timeout_ms: u32,
    /// How often the link status is checked in milliseconds
    pub check_interval_ms: u32,
    /// Pause between reconnect attempts in milliseconds
    pub retry_delay_ms: u32,
    /// Maximum connection attempts per reconnect (at least one is made)
    pub max_retries: u8,
    /// Whether WiFi is enabled
    pub enabled: bool,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: ShortString::new(),
            password: ShortString::new(),
            connect_timeout_ms: 10_000,
            check_interval_ms: 30_000,
            retry_delay_ms: 500,
            max_retries: 20,
            enabled: true,
        }
    }
}

impl WifiConfig {
    /// Set the SSID
    pub fn with_ssid(mut self, ssid: &str) -> Self {
        self.ssid = short_string(ssid);
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = short_string(password);
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout_ms(mut self, ms: u32) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    /// Set the status check interval
    pub fn with_check_interval_ms(mut self, ms: u32) -> Self {
        self.check_interval_ms = ms;
        self
    }

    /// Set the pause between attempts
    pub fn with_retry_delay_ms(mut self, ms: u32) -> Self {
        self.retry_delay_ms = ms;
        self
    }

    /// Set the maximum retry count
    pub fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    /// Enable or disable WiFi
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Check if WiFi credentials are configured
    pub fn is_configured(&self) -> bool {
        !self.ssid.is_empty()
    }

    /// Deadline for one association attempt, including DHCP.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(u64::from(self.connect_timeout_ms))
    }
}

// ============================================================================
// Sensor Config
// ============================================================================

/// Sensor polling and calibration configuration
#[derive(Clone, Debug)]
pub struct SensorConfig {
    /// How often the sensor is polled for new data in milliseconds
    pub poll_interval_ms: u32,
    /// Temperature offset for self-heating compensation in °C
    pub temperature_offset_c: f32,
    /// Whether automatic self-calibration is enabled
    pub automatic_self_calibration: bool,
    /// Reference concentration for forced recalibration in ppm
    pub frc_target_ppm: u16,
    /// Countdown before a forced recalibration runs in milliseconds
    pub calibration_countdown_ms: u32,
    /// Age after which the last reading is considered stale in milliseconds
    pub stale_after_ms: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            temperature_offset_c: 4.0,
            automatic_self_calibration: true,
            frc_target_ppm: 400,
            calibration_countdown_ms: 15_000,
            stale_after_ms: 60_000,
        }
    }
}

impl SensorConfig {
    /// Set the poll interval
    pub fn with_poll_interval_ms(mut self, ms: u32) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set the temperature offset
    pub fn with_temperature_offset_c(mut self, offset: f32) -> Self {
        self.temperature_offset_c = offset;
        self
    }

    /// Enable or disable automatic self-calibration
    pub fn with_automatic_self_calibration(mut self, enabled: bool) -> Self {
        self.automatic_self_calibration = enabled;
        self
    }

    /// Set the forced recalibration reference
    pub fn with_frc_target_ppm(mut self, ppm: u16) -> Self {
        self.frc_target_ppm = ppm;
        self
    }

    /// Set the calibration countdown
    pub fn with_calibration_countdown_ms(mut self, ms: u32) -> Self {
        self.calibration_countdown_ms = ms;
        self
    }

    /// Set the staleness window
    pub fn with_stale_after_ms(mut self, ms: u32) -> Self {
        self.stale_after_ms = ms;
        self
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// M5Stack hardware variant.
///
/// The variants differ only in wiring and panel size; the monitoring logic
/// is shared.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DeviceProfile {
    /// M5CoreInk: 200x200 e-paper, ESP32.
    #[default]
    CoreInk,
    /// M5Paper: 540x960 e-paper, ESP32.
    Paper,
    /// M5Tab5: 1280x720 LCD, ESP32-P4.
    Tab5,
}

impl DeviceProfile {
    /// Panel resolution in pixels.
    pub const fn display_size(&self) -> Size {
        match self {
            DeviceProfile::CoreInk => Size::new(200, 200),
            DeviceProfile::Paper => Size::new(540, 960),
            DeviceProfile::Tab5 => Size::new(1280, 720),
        }
    }

    /// Grove port A pins as `(sda, scl)`.
    pub const fn i2c_pins(&self) -> (i32, i32) {
        match self {
            DeviceProfile::CoreInk => (32, 33),
            DeviceProfile::Paper => (25, 32),
            DeviceProfile::Tab5 => (53, 54),
        }
    }

    /// Model name reported to Home Assistant.
    pub const fn model(&self) -> &'static str {
        match self {
            DeviceProfile::CoreInk => "M5CoreInk + SCD40",
            DeviceProfile::Paper => "M5Paper + SCD40",
            DeviceProfile::Tab5 => "M5Tab5 + SCD40",
        }
    }

    /// Lower-case identifier accepted by [`DeviceProfile::from_name`].
    pub const fn slug(&self) -> &'static str {
        match self {
            DeviceProfile::CoreInk => "coreink",
            DeviceProfile::Paper => "m5paper",
            DeviceProfile::Tab5 => "tab5",
        }
    }

    /// Parse a profile name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        [DeviceProfile::CoreInk, DeviceProfile::Paper, DeviceProfile::Tab5]
            .into_iter()
            .find(|p| {
                p.slug().eq_ignore_ascii_case(name)
                    || (name.eq_ignore_ascii_case("paper") && *p == DeviceProfile::Paper)
            })
    }

    /// Profile for an optional build setting: unset means the default board,
    /// an unknown name is `None`.
    pub fn select(name: Option<&str>) -> Option<Self> {
        match name {
            Some(name) if !name.trim().is_empty() => Self::from_name(name),
            _ => Some(Self::default()),
        }
    }
}

/// Device identification configuration
#[derive(Clone, Debug)]
pub struct DeviceConfig {
    /// Human-readable device name
    pub name: ShortString,
    /// Device ID used in topics and unique IDs
    pub id: ShortString,
    /// Manufacturer reported to Home Assistant
    pub manufacturer: ShortString,
    /// Hardware variant
    pub profile: DeviceProfile,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: short_string("CO2 Monitor"),
            id: short_string("m5_co2_monitor"),
            manufacturer: short_string("M5Stack"),
            profile: DeviceProfile::default(),
        }
    }
}

impl DeviceConfig {
    /// Set the device name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }

    /// Set the device ID
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = short_string(id);
        self
    }

    /// Set the manufacturer
    pub fn with_manufacturer(mut self, manufacturer: &str) -> Self {
        self.manufacturer = short_string(manufacturer);
        self
    }

    /// Set the hardware profile
    pub fn with_profile(mut self, profile: DeviceProfile) -> Self {
        self.profile = profile;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.wifi.check_interval_ms, 30_000);
        assert_eq!(config.sensor.frc_target_ppm, 400);
        assert_eq!(config.device.profile, DeviceProfile::CoreInk);
    }

    #[test]
    fn mqtt_auth_detection() {
        let no_auth = MqttConfig::default();
        assert!(!no_auth.has_auth());

        let with_auth = MqttConfig::default().with_auth("user", "pass");
        assert!(with_auth.has_auth());
    }

    #[test]
    fn mqtt_client_id_falls_back_to_device_id() {
        let mqtt = MqttConfig::default();
        assert_eq!(mqtt.effective_client_id("coreink_office"), "coreink_office");

        let mqtt = MqttConfig::default().with_client_id("custom");
        assert_eq!(mqtt.effective_client_id("coreink_office"), "custom");
    }

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn long_string_truncation() {
        let long_input = "b".repeat(200);
        let s = long_string(&long_input);
        assert_eq!(s.len(), MAX_LONG_STRING);
    }

    #[test]
    fn string_helpers_utf8_boundary() {
        // 3-byte characters: 21 fit in 64 bytes, the 22nd would straddle
        let input = "€".repeat(30);
        let s = short_string(&input);
        assert_eq!(s.len(), 63);
        assert!(core::str::from_utf8(s.as_bytes()).is_ok());
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_mqtt(
                MqttConfig::default()
                    .with_host("broker.local")
                    .with_port(8883)
                    .with_discovery_prefix("ha"),
            )
            .with_device(DeviceConfig::default().with_name("Office CO2"));

        assert_eq!(config.mqtt.host.as_str(), "broker.local");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.discovery_prefix.as_str(), "ha");
        assert_eq!(config.device.name.as_str(), "Office CO2");
    }

    #[test]
    fn mqtt_config_default() {
        let mqtt = MqttConfig::default();
        assert_eq!(mqtt.discovery_prefix.as_str(), "homeassistant");
        assert_eq!(mqtt.reconnect_cooldown_ms, 5_000);
        assert_eq!(mqtt.publish_interval_ms, 5_000);
        assert!(mqtt.client_id.is_empty());
        assert!(mqtt.enabled);
    }

    #[test]
    fn wifi_config_default() {
        let wifi = WifiConfig::default();
        assert!(wifi.ssid.is_empty());
        assert_eq!(wifi.retry_delay_ms, 500);
        assert_eq!(wifi.max_retries, 20);
        assert!(wifi.enabled);
    }

    #[test]
    fn wifi_config_is_configured() {
        assert!(!WifiConfig::default().is_configured());
        assert!(WifiConfig::default().with_ssid("MyNetwork").is_configured());
        assert!(!WifiConfig::default().with_ssid("").is_configured());
    }

    #[test]
    fn wifi_config_builder() {
        let wifi = WifiConfig::default()
            .with_ssid("TestNetwork")
            .with_password("secret123")
            .with_connect_timeout_ms(15_000)
            .with_check_interval_ms(10_000)
            .with_retry_delay_ms(250)
            .with_max_retries(3)
            .with_enabled(false);

        assert_eq!(wifi.ssid.as_str(), "TestNetwork");
        assert_eq!(wifi.password.as_str(), "secret123");
        assert_eq!(wifi.connect_timeout_ms, 15_000);
        assert_eq!(wifi.connect_timeout(), Duration::from_secs(15));
        assert_eq!(wifi.check_interval_ms, 10_000);
        assert_eq!(wifi.retry_delay_ms, 250);
        assert_eq!(wifi.max_retries, 3);
        assert!(!wifi.enabled);
    }

    #[test]
    fn sensor_config_builder() {
        let sensor = SensorConfig::default()
            .with_poll_interval_ms(2_000)
            .with_temperature_offset_c(2.5)
            .with_automatic_self_calibration(false)
            .with_frc_target_ppm(420)
            .with_calibration_countdown_ms(3_000)
            .with_stale_after_ms(30_000);

        assert_eq!(sensor.poll_interval_ms, 2_000);
        assert_eq!(sensor.temperature_offset_c, 2.5);
        assert!(!sensor.automatic_self_calibration);
        assert_eq!(sensor.frc_target_ppm, 420);
        assert_eq!(sensor.calibration_countdown_ms, 3_000);
        assert_eq!(sensor.stale_after_ms, 30_000);
    }

    #[test]
    fn device_profiles() {
        assert_eq!(DeviceProfile::CoreInk.display_size(), Size::new(200, 200));
        assert_eq!(DeviceProfile::Paper.display_size(), Size::new(540, 960));
        assert_eq!(DeviceProfile::Tab5.i2c_pins(), (53, 54));
        assert_eq!(DeviceProfile::Paper.model(), "M5Paper + SCD40");
    }

    #[test]
    fn device_profile_from_name() {
        assert_eq!(DeviceProfile::from_name("coreink"), Some(DeviceProfile::CoreInk));
        assert_eq!(DeviceProfile::from_name(" M5Paper "), Some(DeviceProfile::Paper));
        assert_eq!(DeviceProfile::from_name("paper"), Some(DeviceProfile::Paper));
        assert_eq!(DeviceProfile::from_name("TAB5"), Some(DeviceProfile::Tab5));
        assert_eq!(DeviceProfile::from_name("core2"), None);
    }

    #[test]
    fn device_profile_select() {
        assert_eq!(DeviceProfile::select(None), Some(DeviceProfile::CoreInk));
        assert_eq!(DeviceProfile::select(Some("")), Some(DeviceProfile::CoreInk));
        assert_eq!(DeviceProfile::select(Some("m5paper")), Some(DeviceProfile::Paper));
        assert_eq!(DeviceProfile::select(Some("core2")), None);

        let paper = DeviceProfile::select(Some("paper")).unwrap();
        assert_eq!(paper.i2c_pins(), (25, 32));
    }

    #[test]
    fn device_config_builder() {
        let device = DeviceConfig::default()
            .with_name("Bedroom")
            .with_id("bedroom_co2")
            .with_manufacturer("Acme")
            .with_profile(DeviceProfile::Tab5);

        assert_eq!(device.name.as_str(), "Bedroom");
        assert_eq!(device.id.as_str(), "bedroom_co2");
        assert_eq!(device.manufacturer.as_str(), "Acme");
        assert_eq!(device.profile, DeviceProfile::Tab5);
    }
}
