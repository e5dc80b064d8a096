//! Trait definitions for hardware and network abstraction.
//!
//! This module defines the core abstractions that allow rs-airmon to:
//! - Run on different hardware (ESP32-based M5Stack devices, desktop mocks)
//! - Use different network stacks (ESP-IDF, rumqttc)
//! - Drive different panels (e-paper, OLED)
//!
//! # Submodules
//!
//! - `sensor`: CO2 sensor commands
//! - `hardware`: Clock and button input
//! - `network`: WiFi link and MQTT client
//! - `display`: Dashboard rendering
//!
//! # Hardware Abstraction
//!
//! - [`Co2Sensor`]: SCD4x-class CO2/temperature/humidity sensor
//! - [`Clock`]: Time source for `no_std` environments
//! - [`ButtonInput`]: Front-panel button
//! - [`WifiLink`]: Station-mode WiFi
//! - [`MqttClient`]: Broker session
//! - [`DashboardDisplay`]: Panel rendering

pub mod display;
pub mod hardware;
pub mod network;
pub mod sensor;

pub use display::*;
pub use hardware::*;
pub use network::*;
pub use sensor::*;
