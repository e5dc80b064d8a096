//! Desktop network services.
//!
//! - `mqtt` feature: [`RumqttBridge`], a `rumqttc`-backed [`crate::traits::MqttClient`]
//!   that lets [`crate::ConnectivityManager`] run unchanged on a desktop host
//!
//! The ESP32 build uses [`crate::hal::esp32`] instead.

#[cfg(feature = "mqtt")]
pub mod mqtt;

#[cfg(feature = "mqtt")]
pub use mqtt::*;
