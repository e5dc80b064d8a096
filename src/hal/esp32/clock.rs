//! Boot-relative clock for ESP32 boards.

use crate::traits::Clock;

/// Millisecond clock backed by the ESP-IDF high-resolution timer.
///
/// `esp_timer_get_time()` counts microseconds since boot and does not wrap
/// for the lifetime of the device.
///
/// # Example
///
/// ```ignore
/// use rs_airmon::hal::esp32::Esp32Clock;
/// use rs_airmon::traits::Clock;
///
/// let clock = Esp32Clock::new();
/// let boot_ms = clock.now_ms();
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct Esp32Clock;

impl Esp32Clock {
    /// Creates a new clock handle.
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for Esp32Clock {
    #[inline]
    fn now_ms(&self) -> u64 {
        // Read-only query of the system timer
        let micros = unsafe { esp_idf_hal::sys::esp_timer_get_time() };
        (micros / 1000) as u64
    }
}
