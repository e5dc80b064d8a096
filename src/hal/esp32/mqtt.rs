//! MQTT client for ESP32 boards.
//!
//! Wraps esp-idf-svc's `EspMqttClient`. A background thread drains the
//! connection's event stream and mirrors the session state into an atomic
//! flag, which `is_connected` reads.
//!
//! # Example
//!
//! ```ignore
//! use rs_airmon::hal::esp32::Esp32Mqtt;
//! use rs_airmon::config::MqttConfig;
//!
//! let config = MqttConfig::default().with_host("192.168.1.100");
//! let mqtt = Esp32Mqtt::new(&config);
//! // Hand it to ConnectivityManager, which calls connect() with the last will
//! ```

use crate::config::MqttConfig;
use crate::traits::{ConnectOptions, MqttClient};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttConnection, EventPayload, LwtConfiguration, MqttClientConfiguration,
    QoS,
};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How long `connect` waits for the broker's CONNACK.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// MQTT session for ESP32.
pub struct Esp32Mqtt {
    broker_url: String,
    client: Option<EspMqttClient<'static>>,
    connected: Arc<AtomicBool>,
}

impl Esp32Mqtt {
    /// Create a client for the configured broker. Nothing is opened yet.
    pub fn new(config: &MqttConfig) -> Self {
        Self {
            broker_url: format!("mqtt://{}:{}", config.host.as_str(), config.port),
            client: None,
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Broker URL in `mqtt://host:port` form.
    pub fn broker_url(&self) -> &str {
        &self.broker_url
    }
}

/// Error type for ESP32 MQTT operations.
#[derive(Debug)]
pub struct Esp32MqttError(pub String);

impl core::fmt::Display for Esp32MqttError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "MQTT error: {}", self.0)
    }
}

impl std::error::Error for Esp32MqttError {}

impl MqttClient for Esp32Mqtt {
    type Error = Esp32MqttError;

    fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), Self::Error> {
        // Dropping the old client ends its event thread; it keeps its own flag
        self.client = None;
        self.connected.store(false, Ordering::SeqCst);
        self.connected = Arc::new(AtomicBool::new(false));

        let mqtt_config = MqttClientConfiguration {
            client_id: Some(options.client_id),
            username: options.username,
            password: options.password,
            keep_alive_interval: Some(Duration::from_secs(u64::from(options.keep_alive_secs))),
            lwt: options.last_will.map(|will| LwtConfiguration {
                topic: will.topic,
                payload: will.payload,
                qos: QoS::AtLeastOnce,
                retain: will.retain,
            }),
            ..Default::default()
        };

        let (client, mut connection) = EspMqttClient::new(&self.broker_url, &mqtt_config)
            .map_err(|e| Esp32MqttError(format!("{:?}", e)))?;

        let flag = Arc::clone(&self.connected);
        thread::Builder::new()
            .stack_size(6 * 1024)
            .spawn(move || track_session(&mut connection, &flag))
            .map_err(|e| Esp32MqttError(e.to_string()))?;

        self.client = Some(client);

        let started = Instant::now();
        while !self.connected.load(Ordering::SeqCst) {
            if started.elapsed() > CONNECT_TIMEOUT {
                self.client = None;
                return Err(Esp32MqttError(format!(
                    "no CONNACK from {} within {:?}",
                    self.broker_url, CONNECT_TIMEOUT
                )));
            }
            FreeRtos::delay_ms(50);
        }
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error> {
        let client = self
            .client
            .as_mut()
            .ok_or_else(|| Esp32MqttError("not connected".into()))?;
        let qos = if retain {
            QoS::AtLeastOnce
        } else {
            QoS::AtMostOnce
        };
        client
            .publish(topic, qos, retain, payload)
            .map_err(|e| Esp32MqttError(format!("{:?}", e)))?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.is_some() && self.connected.load(Ordering::SeqCst)
    }

    fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.client = None;
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

fn track_session(connection: &mut EspMqttConnection, connected: &AtomicBool) {
    loop {
        match connection.next() {
            Ok(event) => match event.payload() {
                EventPayload::Connected(_) => {
                    debug!("mqtt: session established");
                    connected.store(true, Ordering::SeqCst);
                }
                EventPayload::Disconnected => {
                    warn!("mqtt: broker disconnected");
                    connected.store(false, Ordering::SeqCst);
                }
                _ => {}
            },
            Err(_) => {
                // Client dropped
                connected.store(false, Ordering::SeqCst);
                break;
            }
        }
    }
}
