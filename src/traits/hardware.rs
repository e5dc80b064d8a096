//! Hardware abstraction traits for timekeeping and user input.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`Clock`] | Monotonic millisecond time source |
//! | [`ButtonInput`] | Front-panel button with edge detection |
//!
//! Blocking waits use [`embedded_hal::delay::DelayNs`] directly rather than a
//! crate-specific trait, so ESP-IDF's `FreeRtos` and any other embedded-hal
//! delay provider plug in unchanged.
//!
//! # Example
//!
//! ```rust
//! use rs_airmon::traits::{ButtonInput, Clock};
//! use rs_airmon::hal::{MockButton, MockClock};
//!
//! let mut clock = MockClock::new();
//! clock.advance(250);
//! assert_eq!(clock.now_ms(), 250);
//!
//! let mut button = MockButton::new();
//! button.press();
//! assert!(button.button_just_pressed());
//! assert!(!button.button_just_pressed());
//! ```

/// Monotonic time source.
///
/// Every scheduling decision in the crate takes `now_ms` as a parameter;
/// the main loop reads it from a `Clock` once per iteration.
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed starting point (usually boot).
    fn now_ms(&self) -> u64;
}

/// Push button input.
///
/// Used to start a sensor calibration from the device's front panel.
pub trait ButtonInput {
    /// Returns true while the button is held down.
    fn button_pressed(&self) -> bool;

    /// Returns true once per press (edge detection).
    ///
    /// Default implementation just returns `button_pressed()`.
    /// Override for proper edge detection.
    fn button_just_pressed(&mut self) -> bool {
        self.button_pressed()
    }
}
