//! M5Stack ESP32 hardware abstraction layer for the CO2 monitor.
//!
//! # Hardware Configuration
//!
//! - **Boards**: M5CoreInk, M5Paper (ESP32), M5Tab5 (ESP32-P4)
//! - **Sensor**: Sensirion SCD40 on the Grove port (I2C, 0x62)
//! - **Button**: front-panel push button, active low
//! - **Display**: SSD1306 128x64 OLED (I2C), optional
//!
//! The SCD40 driver itself is hardware-agnostic ([`crate::scd4x::Scd4x`])
//! and runs on esp-idf-hal's `I2cDriver` and `FreeRtos` delay directly.
//!
//! # Pin Assignments
//!
//! See the [`pins`] module for GPIO assignments (M5CoreInk defaults).

mod button;
mod clock;

pub use button::Esp32Button;
pub use clock::Esp32Clock;

#[cfg(feature = "display")]
mod display;
#[cfg(feature = "display")]
pub use display::{DisplayError, Esp32Display};

#[cfg(feature = "wifi")]
mod wifi;
#[cfg(feature = "wifi")]
pub use wifi::Esp32Wifi;

#[cfg(feature = "esp32-mqtt")]
mod mqtt;
#[cfg(feature = "esp32-mqtt")]
pub use mqtt::{Esp32Mqtt, Esp32MqttError};

/// Pin assignments for the M5CoreInk.
///
/// Other boards: see [`crate::config::DeviceProfile::i2c_pins`] for the
/// Grove port.
pub mod pins {
    // =========================================================================
    // Grove Port A (SCD40)
    // =========================================================================

    // SDA/SCL differ per board: DeviceProfile::i2c_pins

    /// SCD40 bus speed in Hz
    pub const SENSOR_I2C_HZ: u32 = 100_000;

    // =========================================================================
    // Buttons
    // =========================================================================

    /// Dial/middle button (input-only GPIO, external pull-up)
    pub const BUTTON: i32 = 38;

    // =========================================================================
    // I2C Display (SSD1306)
    // =========================================================================

    /// Display I2C data line
    pub const OLED_SDA: i32 = 21;

    /// Display I2C clock line
    pub const OLED_SCL: i32 = 22;

    /// Default I2C address for SSD1306 OLED
    pub const OLED_I2C_ADDR: u8 = 0x3C;
}
