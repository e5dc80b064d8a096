//! WiFi and MQTT link management for Home Assistant publishing.
//!
//! [`ConnectivityManager`] keeps two flags, `wifi_connected` and
//! `mqtt_connected`, and a few timestamp gates. It is driven from the main
//! loop with the current time, like [`crate::AirMonitor`].
//!
//! # Policy
//!
//! - WiFi is checked on the first poll and then every `check_interval_ms`.
//!   A dropped link is re-established with up to `max_retries` attempts,
//!   `retry_delay_ms` apart. This is the only blocking wait.
//! - Losing WiFi also marks MQTT as down.
//! - MQTT connects are attempted at most once per `reconnect_cooldown_ms`.
//!   Each session registers `offline` as a retained last will, then
//!   publishes `online` and one discovery config per metric, all retained.
//! - Readings are published at most once per `publish_interval_ms`, and only
//!   while both links are up. A failed publish marks MQTT as down so the
//!   next poll reconnects.
//!
//! # Example
//!
//! ```rust
//! use rs_airmon::connectivity::{ConnectivityManager, PublishOutcome};
//! use rs_airmon::hal::{MockDelay, MockMqtt, MockWifi};
//! use rs_airmon::{Config, Measurement, Reading, WifiConfig};
//!
//! let config = Config::default().with_wifi(WifiConfig::default().with_ssid("home"));
//! let mut links =
//!     ConnectivityManager::new(MockWifi::new(), MockMqtt::new(), MockDelay::new(), &config)
//!         .unwrap();
//!
//! let status = links.poll(0);
//! assert!(status.wifi_connected && status.mqtt_connected);
//!
//! let reading = Reading { measurement: Measurement::new(640, 21.0, 44.0), taken_at_ms: 0 };
//! assert_eq!(links.publish_reading(0, &reading), PublishOutcome::Published);
//! assert_eq!(links.publish_reading(1_000, &reading), PublishOutcome::Throttled);
//! ```

use core::fmt;

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::config::{Config, DeviceConfig, MqttConfig, WifiConfig};
use crate::discovery::{
    config_payload, state_payload, DiscoveryError, Metric, Topics, AVAILABILITY_OFFLINE,
    AVAILABILITY_ONLINE,
};
use crate::measurement::Reading;
use crate::traits::{ConnectOptions, LastWill, MqttClient, WifiLink};

/// Link state reported to the dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ConnectivityStatus {
    /// WiFi station associated.
    pub wifi_connected: bool,
    /// MQTT session up and discovery announced.
    pub mqtt_connected: bool,
    /// Time of the last successful state publish.
    pub last_publish_ms: Option<u64>,
}

impl ConnectivityStatus {
    /// Both links are up.
    pub fn online(&self) -> bool {
        self.wifi_connected && self.mqtt_connected
    }
}

/// Result of [`ConnectivityManager::publish_reading`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The state document was sent.
    Published,
    /// Skipped: the previous publish was too recent.
    Throttled,
    /// Skipped: WiFi or MQTT is down.
    Offline,
    /// The publish was attempted and failed; MQTT is now marked down.
    Failed,
}

impl PublishOutcome {
    /// True if the reading reached the broker.
    pub fn is_published(&self) -> bool {
        matches!(self, PublishOutcome::Published)
    }
}

/// Why a connection attempt did not complete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectError {
    /// No SSID configured.
    WifiNotConfigured,
    /// Every WiFi attempt failed.
    WifiExhausted {
        /// Attempts made.
        attempts: u8,
    },
    /// WiFi is down, so MQTT was not tried.
    WifiDown,
    /// The broker refused or did not answer.
    MqttRefused,
    /// Availability or discovery publish failed after connecting.
    Announce,
    /// A discovery topic or payload did not fit its buffer.
    Discovery(DiscoveryError),
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectError::WifiNotConfigured => write!(f, "WiFi SSID not configured"),
            ConnectError::WifiExhausted { attempts } => {
                write!(f, "WiFi connect failed after {} attempts", attempts)
            }
            ConnectError::WifiDown => write!(f, "WiFi is down"),
            ConnectError::MqttRefused => write!(f, "MQTT connect failed"),
            ConnectError::Announce => write!(f, "MQTT announce failed"),
            ConnectError::Discovery(e) => write!(f, "discovery: {}", e),
        }
    }
}

impl From<DiscoveryError> for ConnectError {
    fn from(e: DiscoveryError) -> Self {
        ConnectError::Discovery(e)
    }
}

/// WiFi + MQTT link manager.
///
/// # Type Parameters
///
/// - `W`: WiFi link ([`WifiLink`])
/// - `C`: MQTT client ([`MqttClient`])
/// - `D`: Delay used between WiFi attempts ([`DelayNs`])
pub struct ConnectivityManager<W: WifiLink, C: MqttClient, D: DelayNs> {
    wifi: W,
    mqtt: C,
    delay: D,
    wifi_config: WifiConfig,
    mqtt_config: MqttConfig,
    device: DeviceConfig,
    topics: Topics,
    wifi_connected: bool,
    mqtt_connected: bool,
    last_wifi_check_ms: Option<u64>,
    last_mqtt_attempt_ms: Option<u64>,
    last_publish_ms: Option<u64>,
}

impl<W: WifiLink, C: MqttClient, D: DelayNs> ConnectivityManager<W, C, D> {
    /// Create a manager. No connection is attempted until the first poll.
    ///
    /// Fails if any discovery topic, entity ID or config document would
    /// overflow its buffer.
    pub fn new(wifi: W, mqtt: C, delay: D, config: &Config) -> Result<Self, DiscoveryError> {
        let topics = Topics::new(&config.mqtt.discovery_prefix, &config.device.id)?;
        for metric in Metric::ALL {
            config_payload(&topics, &config.device, metric)?;
        }
        Ok(Self {
            wifi,
            mqtt,
            delay,
            wifi_config: config.wifi.clone(),
            mqtt_config: config.mqtt.clone(),
            device: config.device.clone(),
            topics,
            wifi_connected: false,
            mqtt_connected: false,
            last_wifi_check_ms: None,
            last_mqtt_attempt_ms: None,
            last_publish_ms: None,
        })
    }

    /// Run the connection policy. Call every loop iteration.
    pub fn poll(&mut self, now_ms: u64) -> ConnectivityStatus {
        if self.wifi_config.enabled && self.wifi_check_due(now_ms) {
            self.last_wifi_check_ms = Some(now_ms);
            self.check_wifi();
        }

        if self.mqtt_connected && !self.mqtt.is_connected() {
            warn!("mqtt: session lost");
            self.mqtt_connected = false;
        }

        if self.wifi_connected
            && !self.mqtt_connected
            && self.mqtt_config.enabled
            && self.mqtt_attempt_due(now_ms)
        {
            self.last_mqtt_attempt_ms = Some(now_ms);
            if let Err(e) = self.connect_mqtt() {
                warn!(
                    "mqtt: {} (retry in {} ms)",
                    e, self.mqtt_config.reconnect_cooldown_ms
                );
            }
        }

        self.status()
    }

    /// Bring WiFi up, retrying with the configured delay.
    ///
    /// Blocks for at most `max_retries * retry_delay_ms` plus the attempts
    /// themselves.
    pub fn ensure_wifi(&mut self) -> Result<(), ConnectError> {
        if self.wifi.is_connected() {
            self.wifi_connected = true;
            return Ok(());
        }
        self.wifi_connected = false;
        self.mqtt_connected = false;

        if !self.wifi_config.is_configured() {
            return Err(ConnectError::WifiNotConfigured);
        }

        let attempts = self.wifi_config.max_retries.max(1);
        info!("wifi: connecting to '{}'", self.wifi_config.ssid);
        for attempt in 1..=attempts {
            match self.wifi.connect() {
                Ok(()) if self.wifi.is_connected() => {
                    info!("wifi: connected (attempt {}/{})", attempt, attempts);
                    self.wifi_connected = true;
                    return Ok(());
                }
                Ok(()) => debug!("wifi: attempt {}/{} not associated", attempt, attempts),
                Err(e) => debug!("wifi: attempt {}/{} failed: {:?}", attempt, attempts, e),
            }
            if attempt < attempts {
                self.delay.delay_ms(self.wifi_config.retry_delay_ms);
            }
        }
        Err(ConnectError::WifiExhausted { attempts })
    }

    /// Open an MQTT session and announce the device.
    ///
    /// Ignores the reconnect cooldown; [`poll`](Self::poll) applies it.
    pub fn connect_mqtt(&mut self) -> Result<(), ConnectError> {
        if !self.wifi_connected {
            return Err(ConnectError::WifiDown);
        }
        self.mqtt_connected = false;

        let auth = self.mqtt_config.has_auth();
        let options = ConnectOptions {
            client_id: self.mqtt_config.effective_client_id(&self.device.id),
            username: auth.then_some(self.mqtt_config.username.as_str()),
            password: auth.then_some(self.mqtt_config.password.as_str()),
            keep_alive_secs: self.mqtt_config.keep_alive_secs,
            last_will: Some(LastWill {
                topic: &self.topics.availability,
                payload: AVAILABILITY_OFFLINE.as_bytes(),
                retain: true,
            }),
        };

        info!(
            "mqtt: connecting to {}:{} as '{}'",
            self.mqtt_config.host, self.mqtt_config.port, options.client_id
        );
        if let Err(e) = self.mqtt.connect(&options) {
            debug!("mqtt: connect error: {:?}", e);
            return Err(ConnectError::MqttRefused);
        }

        self.announce()?;
        self.mqtt_connected = true;
        info!("mqtt: connected, discovery published");
        Ok(())
    }

    /// Publish a reading if both links are up and the interval has passed.
    pub fn publish_reading(&mut self, now_ms: u64, reading: &Reading) -> PublishOutcome {
        if !(self.wifi_connected && self.mqtt_connected) {
            return PublishOutcome::Offline;
        }
        if let Some(last) = self.last_publish_ms {
            if now_ms.saturating_sub(last) < u64::from(self.mqtt_config.publish_interval_ms) {
                return PublishOutcome::Throttled;
            }
        }

        let payload = match state_payload(&reading.measurement) {
            Ok(p) => p,
            Err(e) => {
                warn!("mqtt: {}", e);
                return PublishOutcome::Failed;
            }
        };

        match self
            .mqtt
            .publish(&self.topics.state, payload.as_bytes(), false)
        {
            Ok(()) => {
                debug!("mqtt: {} <- {}", self.topics.state, payload);
                self.last_publish_ms = Some(now_ms);
                PublishOutcome::Published
            }
            Err(e) => {
                warn!("mqtt: publish failed, reconnecting: {:?}", e);
                self.mqtt_connected = false;
                PublishOutcome::Failed
            }
        }
    }

    /// Publish `offline` and close the MQTT session.
    pub fn shutdown(&mut self) {
        if self.mqtt_connected {
            if let Err(e) = self.mqtt.publish(
                &self.topics.availability,
                AVAILABILITY_OFFLINE.as_bytes(),
                true,
            ) {
                debug!("mqtt: offline publish failed: {:?}", e);
            }
        }
        if let Err(e) = self.mqtt.disconnect() {
            debug!("mqtt: disconnect failed: {:?}", e);
        }
        self.mqtt_connected = false;
    }

    /// Current link flags.
    pub fn status(&self) -> ConnectivityStatus {
        ConnectivityStatus {
            wifi_connected: self.wifi_connected,
            mqtt_connected: self.mqtt_connected,
            last_publish_ms: self.last_publish_ms,
        }
    }

    /// Topics this device publishes to.
    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Get a reference to the WiFi link.
    pub fn wifi(&self) -> &W {
        &self.wifi
    }

    /// Get a mutable reference to the WiFi link.
    pub fn wifi_mut(&mut self) -> &mut W {
        &mut self.wifi
    }

    /// Get a reference to the MQTT client.
    pub fn mqtt(&self) -> &C {
        &self.mqtt
    }

    /// Get a mutable reference to the MQTT client.
    pub fn mqtt_mut(&mut self) -> &mut C {
        &mut self.mqtt
    }

    /// Get a reference to the retry delay provider.
    pub fn delay(&self) -> &D {
        &self.delay
    }

    fn wifi_check_due(&self, now_ms: u64) -> bool {
        self.last_wifi_check_ms.map_or(true, |last| {
            now_ms.saturating_sub(last) >= u64::from(self.wifi_config.check_interval_ms)
        })
    }

    fn mqtt_attempt_due(&self, now_ms: u64) -> bool {
        self.last_mqtt_attempt_ms.map_or(true, |last| {
            now_ms.saturating_sub(last) >= u64::from(self.mqtt_config.reconnect_cooldown_ms)
        })
    }

    fn check_wifi(&mut self) {
        if self.wifi.is_connected() {
            if !self.wifi_connected {
                info!("wifi: link up");
            }
            self.wifi_connected = true;
            return;
        }

        if self.wifi_connected {
            warn!("wifi: link lost");
        }
        if let Err(e) = self.ensure_wifi() {
            warn!(
                "wifi: {} (next check in {} ms)",
                e, self.wifi_config.check_interval_ms
            );
        }
    }

    fn announce(&mut self) -> Result<(), ConnectError> {
        self.mqtt
            .publish(
                &self.topics.availability,
                AVAILABILITY_ONLINE.as_bytes(),
                true,
            )
            .map_err(|e| {
                debug!("mqtt: availability publish failed: {:?}", e);
                ConnectError::Announce
            })?;

        for metric in Metric::ALL {
            let topic = self.topics.config(metric)?;
            let payload = config_payload(&self.topics, &self.device, metric)?;
            self.mqtt
                .publish(&topic, payload.as_bytes(), true)
                .map_err(|e| {
                    debug!("mqtt: discovery publish to {} failed: {:?}", topic, e);
                    ConnectError::Announce
                })?;
            debug!("mqtt: announced {}", topic);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockDelay, MockMqtt, MockWifi};
    use crate::Measurement;

    type Links = ConnectivityManager<MockWifi, MockMqtt, MockDelay>;

    fn config() -> Config {
        Config::default()
            .with_wifi(WifiConfig::default().with_ssid("home").with_password("pw"))
            .with_device(DeviceConfig::default().with_id("office"))
    }

    fn links(wifi: MockWifi, mqtt: MockMqtt) -> Links {
        ConnectivityManager::new(wifi, mqtt, MockDelay::new(), &config()).unwrap()
    }

    fn reading(co2: u16) -> Reading {
        Reading {
            measurement: Measurement::new(co2, 21.5, 40.0),
            taken_at_ms: 0,
        }
    }

    #[test]
    fn first_poll_connects_both_links() {
        let mut links = links(MockWifi::new(), MockMqtt::new());
        let status = links.poll(0);

        assert!(status.online());
        assert_eq!(links.wifi().connect_attempts, 1);
        assert_eq!(links.mqtt().connect_calls, 1);
    }

    #[test]
    fn announce_order_and_retain() {
        let mut links = links(MockWifi::connected(), MockMqtt::new());
        links.poll(0);

        let published = &links.mqtt().published;
        assert_eq!(published.len(), 4);
        assert_eq!(published[0].0, "homeassistant/sensor/office/availability");
        assert_eq!(published[0].1, b"online");
        assert_eq!(published[1].0, "homeassistant/sensor/office_temperature/config");
        assert_eq!(published[2].0, "homeassistant/sensor/office_humidity/config");
        assert_eq!(published[3].0, "homeassistant/sensor/office_co2/config");
        assert!(published.iter().all(|(_, _, retain)| *retain));
    }

    #[test]
    fn last_will_is_offline_retained() {
        let mut links = links(MockWifi::connected(), MockMqtt::new());
        links.poll(0);

        let will = links.mqtt().last_will.clone().unwrap();
        assert_eq!(will.topic, "homeassistant/sensor/office/availability");
        assert_eq!(will.payload, b"offline");
        assert!(will.retain);
        assert_eq!(links.mqtt().client_id.as_deref(), Some("office"));
        assert_eq!(links.mqtt().username, None);
    }

    #[test]
    fn publish_gated_by_interval() {
        let mut links = links(MockWifi::connected(), MockMqtt::new());
        links.poll(0);

        assert_eq!(links.publish_reading(0, &reading(600)), PublishOutcome::Published);
        assert_eq!(
            links.publish_reading(4_999, &reading(610)),
            PublishOutcome::Throttled
        );
        assert_eq!(
            links.publish_reading(5_000, &reading(620)),
            PublishOutcome::Published
        );
        assert_eq!(
            links
                .mqtt()
                .published_to("homeassistant/sensor/office/state")
                .len(),
            2
        );
    }

    #[test]
    fn state_publish_is_not_retained() {
        let mut links = links(MockWifi::connected(), MockMqtt::new());
        links.poll(0);
        links.publish_reading(0, &reading(600));

        let state = links.mqtt().published_to("homeassistant/sensor/office/state");
        assert!(!state[0].2);
    }

    #[test]
    fn offline_publish_is_skipped() {
        let mut links = links(MockWifi::new(), MockMqtt::new());
        assert_eq!(links.publish_reading(0, &reading(600)), PublishOutcome::Offline);
        assert!(links.mqtt().published.is_empty());
    }

    #[test]
    fn wifi_not_configured() {
        let config = Config::default();
        let mut links =
            ConnectivityManager::new(MockWifi::new(), MockMqtt::new(), MockDelay::new(), &config)
                .unwrap();
        assert_eq!(links.ensure_wifi(), Err(ConnectError::WifiNotConfigured));
        assert_eq!(links.wifi().connect_attempts, 0);
    }

    #[test]
    fn shutdown_publishes_offline() {
        let mut links = links(MockWifi::connected(), MockMqtt::new());
        links.poll(0);
        links.shutdown();

        let last = links.mqtt().published.last().unwrap();
        assert_eq!(last.0, "homeassistant/sensor/office/availability");
        assert_eq!(last.1, b"offline");
        assert!(!links.mqtt().connected);
        assert!(!links.status().mqtt_connected);
    }

    #[test]
    fn connect_error_display() {
        assert_eq!(
            format!("{}", ConnectError::WifiExhausted { attempts: 20 }),
            "WiFi connect failed after 20 attempts"
        );
    }
}
