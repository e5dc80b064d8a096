//! Network abstraction traits for WiFi and MQTT.
//!
//! This module defines the two links the monitor depends on for Home
//! Assistant integration.
//!
//! # Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`WifiLink`] | Station-mode WiFi association |
//! | [`MqttClient`] | Broker session with last will and retained publishes |
//!
//! Retry timing is deliberately absent from both traits: implementations make
//! one attempt per call and [`crate::connectivity::ConnectivityManager`]
//! decides when to call again.
//!
//! # Topics
//!
//! ```text
//! homeassistant/sensor/<id>_<metric>/config   - discovery (retained)
//! homeassistant/sensor/<id>/state             - JSON readings
//! homeassistant/sensor/<id>/availability      - online/offline (last will)
//! ```

// ============================================================================
// WiFi Link
// ============================================================================

/// Station-mode WiFi link.
///
/// # Implementation Notes
///
/// - `connect` makes a single association attempt and may block until the
///   attempt resolves (including DHCP)
/// - `is_connected` must be cheap; it is polled from the main loop
pub trait WifiLink {
    /// Error type for WiFi operations.
    type Error: core::fmt::Debug;

    /// Returns true if associated and holding an IP address.
    fn is_connected(&self) -> bool;

    /// Make one connection attempt.
    fn connect(&mut self) -> Result<(), Self::Error>;

    /// Drop the association.
    fn disconnect(&mut self) -> Result<(), Self::Error>;
}

// ============================================================================
// MQTT Client
// ============================================================================

/// Message the broker publishes on our behalf when the session drops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LastWill<'a> {
    /// Topic the will is published to.
    pub topic: &'a str,
    /// Will payload.
    pub payload: &'a [u8],
    /// Whether the broker retains the will message.
    pub retain: bool,
}

/// Parameters for opening an MQTT session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectOptions<'a> {
    /// Client identifier (unique per device).
    pub client_id: &'a str,
    /// Username, if the broker requires authentication.
    pub username: Option<&'a str>,
    /// Password, paired with `username`.
    pub password: Option<&'a str>,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Last will registered with the broker at connect time.
    pub last_will: Option<LastWill<'a>>,
}

/// MQTT client trait.
///
/// Sync-first: `connect` and `publish` block on embedded targets and are
/// bridged onto an async runtime on desktop (see `services::RumqttBridge`).
///
/// # Example
///
/// ```rust,ignore
/// use rs_airmon::traits::MqttClient;
///
/// fn announce<M: MqttClient>(client: &mut M, topic: &str) {
///     client.publish(topic, b"online", true).unwrap();
/// }
/// ```
pub trait MqttClient {
    /// Error type for MQTT operations.
    type Error: core::fmt::Debug;

    /// Open a session with the broker.
    ///
    /// Returns once the broker has acknowledged the session or the attempt
    /// has failed. Any previous session is replaced.
    fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), Self::Error>;

    /// Publish a message to a topic.
    ///
    /// # Arguments
    /// - `topic`: MQTT topic path
    /// - `payload`: Message bytes
    /// - `retain`: If true, broker keeps message for new subscribers
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error>;

    /// Check if the session is up.
    fn is_connected(&self) -> bool;

    /// Close the session cleanly (the last will is not published).
    fn disconnect(&mut self) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_options_carry_last_will() {
        let will = LastWill {
            topic: "homeassistant/sensor/coreink/availability",
            payload: b"offline",
            retain: true,
        };
        let options = ConnectOptions {
            client_id: "coreink",
            username: None,
            password: None,
            keep_alive_secs: 60,
            last_will: Some(will),
        };

        let will = options.last_will.unwrap();
        assert_eq!(will.payload, b"offline");
        assert!(will.retain);
        assert!(options.username.is_none());
    }
}
