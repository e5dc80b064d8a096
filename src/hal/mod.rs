//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`] for various platforms.
//!
//! # Available Implementations
//!
//! - `mock`: Test implementations for desktop development
//! - `host`: Standard-library clock, delay and WiFi stand-in (requires `std` feature)
//! - `esp32`: M5Stack ESP32 boards with an SCD40 on the Grove port (requires `esp32` feature)

pub mod mock;

#[cfg(feature = "std")]
pub mod host;

#[cfg(feature = "esp32")]
pub mod esp32;

pub use mock::*;

#[cfg(feature = "std")]
pub use host::*;

#[cfg(feature = "esp32")]
pub use esp32::*;
