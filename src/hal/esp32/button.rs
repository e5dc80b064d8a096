//! Front-panel push button for M5Stack boards.
//!
//! The M5CoreInk and M5Paper buttons pull the GPIO low when pressed and
//! have external pull-ups, so the pin is used as a plain input. GPIO34-39
//! on the ESP32 are input-only and could not enable an internal pull-up
//! anyway.

use crate::traits::ButtonInput;
use esp_idf_hal::gpio::{Input, InputPin, PinDriver};
use esp_idf_hal::peripheral::Peripheral;

/// Active-low push button with edge detection.
///
/// # Example
///
/// ```ignore
/// use rs_airmon::hal::esp32::Esp32Button;
/// use rs_airmon::traits::ButtonInput;
///
/// let peripherals = Peripherals::take()?;
/// let mut button = Esp32Button::new(peripherals.pins.gpio38)?;
///
/// loop {
///     if button.button_just_pressed() {
///         monitor.begin_calibration(clock.now_ms());
///     }
/// }
/// ```
pub struct Esp32Button<'d, P: InputPin> {
    pin: PinDriver<'d, P, Input>,
    /// Level seen by the previous `button_just_pressed` call
    was_pressed: bool,
}

impl<'d, P: InputPin> Esp32Button<'d, P> {
    /// Configure `pin` as the button input.
    ///
    /// # Errors
    ///
    /// Returns an error if GPIO initialization fails.
    pub fn new(pin: impl Peripheral<P = P> + 'd) -> Result<Self, esp_idf_hal::sys::EspError> {
        let pin = PinDriver::input(pin)?;
        let was_pressed = pin.is_low();
        Ok(Self { pin, was_pressed })
    }
}

impl<P: InputPin> ButtonInput for Esp32Button<'_, P> {
    fn button_pressed(&self) -> bool {
        self.pin.is_low()
    }

    fn button_just_pressed(&mut self) -> bool {
        let pressed = self.pin.is_low();
        let edge = pressed && !self.was_pressed;
        self.was_pressed = pressed;
        edge
    }
}
