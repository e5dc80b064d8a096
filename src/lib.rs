//! # rs-airmon
//!
//! An indoor air-quality monitor for M5Stack boards with a Sensirion SCD40:
//! CO2, temperature and humidity on a local dashboard, published to Home
//! Assistant over MQTT.
//!
//! ## Features
//!
//! - **Hardware abstraction**: Traits for the sensor, button, clock, WiFi and MQTT
//! - **SCD40 driver**: CRC-checked I2C commands over `embedded-hal` 1.0
//! - **Validated readings**: Implausible samples never replace the last good one
//! - **Forced recalibration**: Button-triggered, with a non-blocking countdown
//! - **Home Assistant discovery**: Retained config per metric, availability last will
//! - **Retry with cooldown**: WiFi checked periodically, MQTT reconnects rate-limited
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware and network abstractions
//! - `scd4x` - SCD40 I2C driver
//! - `monitor` - Sensor polling, validation and calibration
//! - `connectivity` - WiFi/MQTT link policy
//! - `discovery` - Home Assistant topics and payloads
//! - `dashboard` - Screen model and `embedded-graphics` rendering
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use rs_airmon::{
//!     AirMonitor, Config, ConnectivityManager, DashboardState, Measurement, WifiConfig,
//!     hal::{MockDelay, MockMqtt, MockSensor, MockWifi},
//! };
//!
//! let config = Config::default().with_wifi(WifiConfig::default().with_ssid("home"));
//!
//! let mut sensor = MockSensor::new();
//! sensor.queue_measurement(Measurement::new(820, 23.1, 47.5));
//! let mut monitor = AirMonitor::new(sensor, config.sensor.clone());
//! monitor.start().unwrap();
//!
//! let mut links =
//!     ConnectivityManager::new(MockWifi::new(), MockMqtt::new(), MockDelay::new(), &config)
//!         .unwrap();
//!
//! // Main loop body
//! let now = 0;
//! let links_status = links.poll(now);
//! if let Some(reading) = monitor.update(now) {
//!     links.publish_reading(now, &reading);
//! }
//! let screen = DashboardState::new(&monitor.state(now), &links_status, &config.device.name);
//! assert_eq!(screen.lines()[1], "CO2 820 ppm");
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// Home Assistant link management with retry and cooldown.
pub mod connectivity;
/// Dashboard model and rendering.
pub mod dashboard;
/// Home Assistant MQTT discovery topics and payloads.
pub mod discovery;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Measurement types, validation and air-quality bands.
pub mod measurement;
/// Sensor polling controller with calibration.
pub mod monitor;
/// Sensirion SCD4x driver.
pub mod scd4x;
/// Core traits for hardware and network abstraction.
pub mod traits;

/// Shared configuration system for desktop and ESP32.
pub mod config;

/// Desktop network services (feature-gated).
#[cfg(feature = "mqtt")]
pub mod services;

// Re-exports for convenience
pub use connectivity::{ConnectError, ConnectivityManager, ConnectivityStatus, PublishOutcome};
pub use dashboard::{render_dashboard, render_message, DashboardState};
pub use discovery::{DiscoveryError, Metric, Topics};
pub use measurement::{AirQuality, InvalidMeasurement, Measurement, Reading};
pub use monitor::{AirMonitor, CalibrationStatus, MonitorState};
pub use scd4x::{Scd4x, SensorError};
pub use traits::{
    // Hardware
    ButtonInput,
    Clock,
    Co2Sensor,
    // Network
    ConnectOptions,
    // Display
    DashboardDisplay,
    LastWill,
    MqttClient,
    WifiLink,
};

// Config re-exports
pub use config::{Config, DeviceConfig, DeviceProfile, MqttConfig, SensorConfig, WifiConfig};
