//! `rumqttc` bridge for desktop hosts.
//!
//! `rumqttc` is async: its event loop must be polled for anything to reach
//! the broker. [`RumqttBridge`] spawns that loop on a tokio runtime and
//! exposes the blocking [`MqttClient`] trait the connectivity manager uses.
//! Session state crosses from the event-loop task through an atomic flag.
//!
//! # Example
//!
//! ```ignore
//! use rs_airmon::services::{MqttRuntimeConfig, RumqttBridge};
//!
//! let runtime = tokio::runtime::Runtime::new()?;
//! let mqtt = RumqttBridge::new(runtime.handle().clone(), MqttRuntimeConfig::new("localhost", 1883));
//!
//! // Drive from a plain thread, never from inside the runtime
//! let mut links = ConnectivityManager::new(HostWifi::new(), mqtt, StdDelay, &config)?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, MqttOptions, Outgoing, Packet, QoS};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::MqttConfig;
use crate::traits::{ConnectOptions, MqttClient};

// ============================================================================
// Configuration
// ============================================================================

/// Runtime MQTT client configuration for `rumqttc`.
///
/// This struct uses `String` for runtime compatibility with the `rumqttc` library.
/// For embedded/no-alloc contexts, use [`crate::config::MqttConfig`] which uses
/// fixed-size `ShortString` types and convert with [`MqttRuntimeConfig::from_config`].
#[derive(Debug, Clone)]
pub struct MqttRuntimeConfig {
    /// MQTT broker hostname
    pub host: String,
    /// MQTT broker port
    pub port: u16,
    /// How long `connect` waits for the CONNACK
    pub connect_timeout: Duration,
    /// How long `disconnect` waits for queued packets to be flushed
    pub disconnect_timeout: Duration,
    /// Capacity of the outgoing request queue
    pub queue_capacity: usize,
}

impl Default for MqttRuntimeConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            connect_timeout: Duration::from_secs(5),
            disconnect_timeout: Duration::from_secs(1),
            queue_capacity: 10,
        }
    }
}

impl MqttRuntimeConfig {
    /// Create a new config with the given broker address
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Create from shared MqttConfig
    pub fn from_config(config: &MqttConfig) -> Self {
        Self::new(config.host.as_str(), config.port)
    }

    /// Set the CONNACK timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set how long a graceful disconnect may take
    pub fn disconnect_timeout(mut self, timeout: Duration) -> Self {
        self.disconnect_timeout = timeout;
        self
    }
}

// ============================================================================
// Errors
// ============================================================================

/// MQTT bridge errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MqttBridgeError {
    /// The broker refused the session or the network failed
    Connect(String),
    /// No CONNACK within the configured timeout
    Timeout,
    /// The request queue rejected a publish
    Publish(String),
    /// No session is open
    NotConnected,
}

impl std::fmt::Display for MqttBridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect(e) => write!(f, "MQTT connect error: {}", e),
            Self::Timeout => write!(f, "MQTT connect timed out"),
            Self::Publish(e) => write!(f, "MQTT publish error: {}", e),
            Self::NotConnected => write!(f, "MQTT not connected"),
        }
    }
}

impl std::error::Error for MqttBridgeError {}

// ============================================================================
// Bridge
// ============================================================================

/// Blocking [`MqttClient`] over a `rumqttc` event loop.
///
/// Methods block the calling thread and must not be called from inside the
/// tokio runtime the bridge spawns onto.
pub struct RumqttBridge {
    config: MqttRuntimeConfig,
    runtime: Handle,
    client: Option<AsyncClient>,
    event_loop: Option<JoinHandle<()>>,
    connected: Arc<AtomicBool>,
    /// Set by the event loop when the broker refused or the socket failed
    failure: Arc<std::sync::Mutex<Option<String>>>,
}

impl RumqttBridge {
    /// Create a bridge that spawns its event loop on `runtime`.
    pub fn new(runtime: Handle, config: MqttRuntimeConfig) -> Self {
        Self {
            config,
            runtime,
            client: None,
            event_loop: None,
            connected: Arc::new(AtomicBool::new(false)),
            failure: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    /// Broker address this bridge connects to.
    pub fn config(&self) -> &MqttRuntimeConfig {
        &self.config
    }

    fn teardown(&mut self) {
        if let Some(task) = self.event_loop.take() {
            task.abort();
        }
        self.client = None;
        self.connected.store(false, Ordering::SeqCst);
    }

    fn event_loop_alive(&self) -> bool {
        self.event_loop
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    fn take_failure(&self) -> Option<String> {
        self.failure.lock().ok().and_then(|mut f| f.take())
    }
}

impl Drop for RumqttBridge {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl MqttClient for RumqttBridge {
    type Error = MqttBridgeError;

    fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), Self::Error> {
        self.teardown();
        self.take_failure();
        // A previous event loop may still be winding down
        self.connected = Arc::new(AtomicBool::new(false));

        let mut mqtt_options =
            MqttOptions::new(options.client_id, &self.config.host, self.config.port);
        mqtt_options.set_keep_alive(Duration::from_secs(u64::from(
            options.keep_alive_secs.max(1),
        )));
        if let (Some(username), Some(password)) = (options.username, options.password) {
            mqtt_options.set_credentials(username, password);
        }
        if let Some(will) = options.last_will {
            mqtt_options.set_last_will(rumqttc::LastWill::new(
                will.topic,
                will.payload.to_vec(),
                QoS::AtLeastOnce,
                will.retain,
            ));
        }

        let (client, mut eventloop) = AsyncClient::new(mqtt_options, self.config.queue_capacity);
        let connected = Arc::clone(&self.connected);
        let failure = Arc::clone(&self.failure);

        let task = self.runtime.spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        if ack.code == ConnectReturnCode::Success {
                            connected.store(true, Ordering::SeqCst);
                        } else {
                            record_failure(&failure, format!("{:?}", ack.code));
                            break;
                        }
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        record_failure(&failure, "broker sent DISCONNECT".to_string());
                        break;
                    }
                    // Everything queued before it has been written
                    Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                        debug!("mqtt: disconnected");
                        break;
                    }
                    Ok(event) => debug!("mqtt: {:?}", event),
                    Err(e) => {
                        record_failure(&failure, e.to_string());
                        break;
                    }
                }
            }
            connected.store(false, Ordering::SeqCst);
        });

        self.client = Some(client);
        self.event_loop = Some(task);

        let started = Instant::now();
        loop {
            if self.connected.load(Ordering::SeqCst) {
                return Ok(());
            }
            if !self.event_loop_alive() {
                let reason = self.take_failure().unwrap_or_default();
                self.teardown();
                return Err(MqttBridgeError::Connect(reason));
            }
            if started.elapsed() >= self.config.connect_timeout {
                self.teardown();
                return Err(MqttBridgeError::Timeout);
            }
            thread::sleep(Duration::from_millis(20));
        }
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error> {
        if !self.is_connected() {
            return Err(MqttBridgeError::NotConnected);
        }
        let client = self.client.as_ref().ok_or(MqttBridgeError::NotConnected)?;
        let qos = if retain {
            QoS::AtLeastOnce
        } else {
            QoS::AtMostOnce
        };
        client
            .try_publish(topic, qos, retain, payload.to_vec())
            .map_err(|e| MqttBridgeError::Publish(e.to_string()))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst) && self.event_loop_alive()
    }

    fn disconnect(&mut self) -> Result<(), Self::Error> {
        if let Some(client) = self.client.as_ref() {
            match client.try_disconnect() {
                Ok(()) => {
                    // Let the event loop flush pending publishes and the DISCONNECT
                    let started = Instant::now();
                    while self.event_loop_alive()
                        && started.elapsed() < self.config.disconnect_timeout
                    {
                        thread::sleep(Duration::from_millis(10));
                    }
                }
                Err(e) => debug!("mqtt: disconnect request dropped: {}", e),
            }
        }
        self.teardown();
        Ok(())
    }
}

fn record_failure(slot: &std::sync::Mutex<Option<String>>, reason: String) {
    warn!("mqtt: connection ended: {}", reason);
    if let Ok(mut slot) = slot.lock() {
        *slot = Some(reason);
    }
}

// ============================================================================
// Tests
// ============================================================================
