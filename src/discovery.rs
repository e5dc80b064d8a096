//! Home Assistant MQTT discovery topics and payloads.
//!
//! Each metric is announced as its own `sensor` entity with a retained
//! config message. All three entities read the same JSON state topic and
//! share one availability topic, which doubles as the MQTT last will.
//!
//! ```text
//! <prefix>/sensor/<id>_temperature/config   retained
//! <prefix>/sensor/<id>_humidity/config      retained
//! <prefix>/sensor/<id>_co2/config           retained
//! <prefix>/sensor/<id>/state                {"temperature":22.4,"humidity":41.0,"co2":612}
//! <prefix>/sensor/<id>/availability         online | offline (retained)
//! ```
//!
//! Payloads are built without allocation: config documents go through
//! `serde-json-core`, the state document is formatted directly.
//!
//! # Example
//!
//! ```
//! use rs_airmon::discovery::{state_payload, Topics};
//! use rs_airmon::Measurement;
//!
//! let topics = Topics::new("homeassistant", "coreink").unwrap();
//! assert_eq!(topics.state.as_str(), "homeassistant/sensor/coreink/state");
//!
//! let payload = state_payload(&Measurement::new(612, 22.43, 41.0)).unwrap();
//! assert_eq!(
//!     payload.as_str(),
//!     r#"{"temperature":22.4,"humidity":41.0,"co2":612}"#
//! );
//! ```

use core::fmt::{self, Write};

use heapless::String as HString;
use serde::Serialize;

use crate::config::{DeviceConfig, LongString, ShortString};
use crate::measurement::Measurement;

/// Availability payload published after connecting.
pub const AVAILABILITY_ONLINE: &str = "online";

/// Availability payload registered as the last will.
pub const AVAILABILITY_OFFLINE: &str = "offline";

/// Home Assistant component used for every entity.
pub const COMPONENT: &str = "sensor";

/// Firmware version reported in the device block.
pub const SW_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Capacity of a discovery config document.
///
/// Fits the longest device ID `Topics::new` accepts with a full-length
/// device name and manufacturer.
pub const MAX_CONFIG_PAYLOAD: usize = 1024;

/// Capacity of a state document.
pub const MAX_STATE_PAYLOAD: usize = 96;

/// Serialized discovery config document.
pub type ConfigPayload = HString<MAX_CONFIG_PAYLOAD>;

/// Serialized state document.
pub type StatePayload = HString<MAX_STATE_PAYLOAD>;

/// Failure to build a topic or payload within its fixed capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscoveryError {
    /// Prefix plus device ID do not fit in a topic buffer.
    TopicTooLong,
    /// Serialized document exceeds its buffer.
    PayloadTooLong,
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::TopicTooLong => write!(f, "MQTT topic too long"),
            DiscoveryError::PayloadTooLong => write!(f, "MQTT payload too long"),
        }
    }
}

// ============================================================================
// Metrics
// ============================================================================

/// A value published to Home Assistant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    /// Temperature in °C.
    Temperature,
    /// Relative humidity in %.
    Humidity,
    /// CO2 concentration in ppm.
    Co2,
}

impl Metric {
    /// All metrics, in announcement order.
    pub const ALL: [Metric; 3] = [Metric::Temperature, Metric::Humidity, Metric::Co2];

    /// JSON key in the state document and suffix in entity IDs.
    pub const fn key(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Co2 => "co2",
        }
    }

    /// Entity name shown in Home Assistant.
    pub const fn name(&self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::Humidity => "Humidity",
            Metric::Co2 => "CO2",
        }
    }

    /// Unit of measurement.
    pub const fn unit(&self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            Metric::Humidity => "%",
            Metric::Co2 => "ppm",
        }
    }

    /// Home Assistant device class.
    pub const fn device_class(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Co2 => "carbon_dioxide",
        }
    }

    /// Template extracting this metric from the state document.
    pub const fn value_template(&self) -> &'static str {
        match self {
            Metric::Temperature => "{{ value_json.temperature }}",
            Metric::Humidity => "{{ value_json.humidity }}",
            Metric::Co2 => "{{ value_json.co2 }}",
        }
    }

    /// Decimal places Home Assistant should display.
    pub const fn display_precision(&self) -> u8 {
        match self {
            Metric::Temperature | Metric::Humidity => 1,
            Metric::Co2 => 0,
        }
    }
}

// ============================================================================
// Topics
// ============================================================================

/// Topic set for one device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topics {
    /// JSON state topic.
    pub state: LongString,
    /// Availability / last-will topic.
    pub availability: LongString,
    prefix: ShortString,
    device_id: ShortString,
}

impl Topics {
    /// Build the topic set for `device_id` under a discovery prefix.
    pub fn new(prefix: &str, device_id: &str) -> Result<Self, DiscoveryError> {
        let mut state = LongString::new();
        write!(state, "{}/{}/{}/state", prefix, COMPONENT, device_id)
            .map_err(|_| DiscoveryError::TopicTooLong)?;

        let mut availability = LongString::new();
        write!(
            availability,
            "{}/{}/{}/availability",
            prefix, COMPONENT, device_id
        )
        .map_err(|_| DiscoveryError::TopicTooLong)?;

        let topics = Self {
            state,
            availability,
            prefix: ShortString::try_from(prefix).map_err(|_| DiscoveryError::TopicTooLong)?,
            device_id: ShortString::try_from(device_id)
                .map_err(|_| DiscoveryError::TopicTooLong)?,
        };

        // Every derived topic and entity ID must fit too, or announce fails later
        for metric in Metric::ALL {
            topics.config(metric)?;
            topics.unique_id(metric)?;
        }
        Ok(topics)
    }

    /// Entity ID for one metric, `<device_id>_<key>`.
    pub fn unique_id(&self, metric: Metric) -> Result<ShortString, DiscoveryError> {
        let mut id = ShortString::new();
        write!(id, "{}_{}", self.device_id, metric.key())
            .map_err(|_| DiscoveryError::TopicTooLong)?;
        Ok(id)
    }

    /// Discovery config topic for one metric.
    pub fn config(&self, metric: Metric) -> Result<LongString, DiscoveryError> {
        let mut topic = LongString::new();
        write!(
            topic,
            "{}/{}/{}_{}/config",
            self.prefix,
            COMPONENT,
            self.device_id,
            metric.key()
        )
        .map_err(|_| DiscoveryError::TopicTooLong)?;
        Ok(topic)
    }

    /// Device ID the topics were built for.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Serialize)]
struct DeviceBlock<'a> {
    identifiers: [&'a str; 1],
    name: &'a str,
    manufacturer: &'a str,
    model: &'a str,
    sw_version: &'a str,
}

#[derive(Serialize)]
struct SensorConfigDoc<'a> {
    name: &'a str,
    unique_id: &'a str,
    object_id: &'a str,
    state_topic: &'a str,
    availability_topic: &'a str,
    unit_of_measurement: &'a str,
    device_class: &'a str,
    state_class: &'a str,
    value_template: &'a str,
    suggested_display_precision: u8,
    device: DeviceBlock<'a>,
}

/// Build the retained discovery config for one metric.
pub fn config_payload(
    topics: &Topics,
    device: &DeviceConfig,
    metric: Metric,
) -> Result<ConfigPayload, DiscoveryError> {
    let unique_id = topics.unique_id(metric)?;

    let doc = SensorConfigDoc {
        name: metric.name(),
        unique_id: &unique_id,
        object_id: &unique_id,
        state_topic: &topics.state,
        availability_topic: &topics.availability,
        unit_of_measurement: metric.unit(),
        device_class: metric.device_class(),
        state_class: "measurement",
        value_template: metric.value_template(),
        suggested_display_precision: metric.display_precision(),
        device: DeviceBlock {
            identifiers: [topics.device_id.as_str()],
            name: &device.name,
            manufacturer: &device.manufacturer,
            model: device.profile.model(),
            sw_version: SW_VERSION,
        },
    };

    serde_json_core::to_string(&doc).map_err(|_| DiscoveryError::PayloadTooLong)
}

/// Build the JSON state document for a reading.
///
/// Temperature and humidity carry one decimal place.
pub fn state_payload(measurement: &Measurement) -> Result<StatePayload, DiscoveryError> {
    let mut payload = StatePayload::new();
    write!(
        payload,
        "{{\"temperature\":{:.1},\"humidity\":{:.1},\"co2\":{}}}",
        measurement.temperature_c, measurement.humidity_pct, measurement.co2_ppm
    )
    .map_err(|_| DiscoveryError::PayloadTooLong)?;
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceProfile;

    fn device() -> DeviceConfig {
        DeviceConfig::default()
            .with_name("Office CO2")
            .with_id("office")
            .with_profile(DeviceProfile::Paper)
    }

    #[test]
    fn topic_layout() {
        let topics = Topics::new("homeassistant", "office").unwrap();
        assert_eq!(topics.state, "homeassistant/sensor/office/state");
        assert_eq!(
            topics.availability,
            "homeassistant/sensor/office/availability"
        );
        assert_eq!(
            topics.config(Metric::Co2).unwrap(),
            "homeassistant/sensor/office_co2/config"
        );
        assert_eq!(
            topics.config(Metric::Temperature).unwrap(),
            "homeassistant/sensor/office_temperature/config"
        );
    }

    #[test]
    fn custom_prefix() {
        let topics = Topics::new("ha", "kitchen").unwrap();
        assert_eq!(
            topics.config(Metric::Humidity).unwrap(),
            "ha/sensor/kitchen_humidity/config"
        );
    }

    #[test]
    fn oversized_topic_is_rejected() {
        let id = "x".repeat(120);
        assert_eq!(
            Topics::new("homeassistant", &id),
            Err(DiscoveryError::TopicTooLong)
        );
    }

    #[test]
    fn longest_entity_id_must_fit() {
        // "_temperature" is the longest suffix; 52 + 12 fills a ShortString
        let fits = "d".repeat(52);
        let topics = Topics::new("homeassistant", &fits).unwrap();
        assert_eq!(topics.unique_id(Metric::Temperature).unwrap().len(), 64);
        for metric in Metric::ALL {
            assert!(config_payload(&topics, &device(), metric).is_ok());
        }

        let too_long = "d".repeat(53);
        assert_eq!(
            Topics::new("homeassistant", &too_long),
            Err(DiscoveryError::TopicTooLong)
        );
    }

    #[test]
    fn co2_config_document() {
        let topics = Topics::new("homeassistant", "office").unwrap();
        let payload = config_payload(&topics, &device(), Metric::Co2).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&payload).unwrap();

        assert_eq!(doc["name"], "CO2");
        assert_eq!(doc["unique_id"], "office_co2");
        assert_eq!(doc["state_topic"], "homeassistant/sensor/office/state");
        assert_eq!(
            doc["availability_topic"],
            "homeassistant/sensor/office/availability"
        );
        assert_eq!(doc["unit_of_measurement"], "ppm");
        assert_eq!(doc["device_class"], "carbon_dioxide");
        assert_eq!(doc["state_class"], "measurement");
        assert_eq!(doc["value_template"], "{{ value_json.co2 }}");
        assert_eq!(doc["suggested_display_precision"], 0);
    }

    #[test]
    fn device_block_is_shared() {
        let topics = Topics::new("homeassistant", "office").unwrap();
        for metric in Metric::ALL {
            let payload = config_payload(&topics, &device(), metric).unwrap();
            let doc: serde_json::Value = serde_json::from_str(&payload).unwrap();
            let dev = &doc["device"];
            assert_eq!(dev["identifiers"][0], "office");
            assert_eq!(dev["name"], "Office CO2");
            assert_eq!(dev["manufacturer"], "M5Stack");
            assert_eq!(dev["model"], "M5Paper + SCD40");
            assert_eq!(dev["sw_version"], SW_VERSION);
        }
    }

    #[test]
    fn temperature_unit_is_celsius() {
        let topics = Topics::new("homeassistant", "office").unwrap();
        let payload = config_payload(&topics, &device(), Metric::Temperature).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(doc["unit_of_measurement"], "°C");
        assert_eq!(doc["device_class"], "temperature");
    }

    #[test]
    fn state_document_rounds_to_one_decimal() {
        let payload = state_payload(&Measurement::new(1_034, 21.96, 48.04)).unwrap();
        assert_eq!(
            payload.as_str(),
            r#"{"temperature":22.0,"humidity":48.0,"co2":1034}"#
        );
        let doc: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(doc["co2"], 1034);
    }

    #[test]
    fn negative_temperature() {
        let payload = state_payload(&Measurement::new(420, -5.25, 80.0)).unwrap();
        assert!(payload.starts_with(r#"{"temperature":-5.2"#)
            || payload.starts_with(r#"{"temperature":-5.3"#));
    }

    #[test]
    fn metric_keys_match_state_document() {
        let payload = state_payload(&Measurement::new(500, 20.0, 40.0)).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&payload).unwrap();
        for metric in Metric::ALL {
            assert!(doc.get(metric.key()).is_some(), "{}", metric.key());
            assert!(metric.value_template().contains(metric.key()));
        }
    }
}
