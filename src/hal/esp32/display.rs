//! SSD1306 OLED dashboard for ESP32 boards.
//!
//! Drives a 128x64 SSD1306 on its own I2C bus and draws with the shared
//! [`render_dashboard`] layout, which picks the compact line set at this
//! size.
//!
//! # Wiring
//!
//! - SDA → GPIO21
//! - SCL → GPIO22
//! - VCC → 3.3V
//! - GND → GND

use crate::dashboard::{render_dashboard, render_message, DashboardState};
use crate::traits::DashboardDisplay;
use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};
use esp_idf_hal::i2c::I2cDriver;
use ssd1306::{mode::BufferedGraphicsMode, prelude::*, I2CDisplayInterface, Ssd1306};

/// SSD1306 display type alias for cleaner code.
type DisplayDriver<'d> = Ssd1306<
    I2CInterface<I2cDriver<'d>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

/// SSD1306 OLED display for ESP32.
///
/// # Display Layout
///
/// ```text
/// ┌────────────────────────────┐
/// │ CO2 612 ppm                │
/// │ 22.4C  41.0%               │
/// │ Good                       │
/// │ WiFi OK  MQTT OK           │
/// │ [calibration / stale]      │
/// └────────────────────────────┘
/// ```
pub struct Esp32Display<'d> {
    display: DisplayDriver<'d>,
}

impl<'d> Esp32Display<'d> {
    /// Creates a new display instance.
    ///
    /// # Arguments
    ///
    /// * `i2c` - I2C driver for the display bus
    pub fn new(i2c: I2cDriver<'d>) -> Self {
        let interface = I2CDisplayInterface::new(i2c);
        let display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        Self { display }
    }
}

impl DashboardDisplay for Esp32Display<'_> {
    type Error = DisplayError;

    fn init(&mut self) -> Result<(), Self::Error> {
        self.display.init()?;
        self.clear()
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.display.clear(BinaryColor::Off)?;
        self.display.flush()?;
        Ok(())
    }

    fn render(&mut self, state: &DashboardState) -> Result<(), Self::Error> {
        render_dashboard(&mut self.display, state)?;
        self.display.flush()?;
        Ok(())
    }

    fn show_message(&mut self, line1: &str, line2: Option<&str>) -> Result<(), Self::Error> {
        render_message(&mut self.display, line1, line2)?;
        self.display.flush()?;
        Ok(())
    }
}

/// Display error type.
#[derive(Debug)]
pub struct DisplayError;

impl From<display_interface::DisplayError> for DisplayError {
    fn from(_: display_interface::DisplayError) -> Self {
        DisplayError
    }
}
