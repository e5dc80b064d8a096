//! CO2 sensor abstraction.
//!
//! [`Co2Sensor`] covers the small command set the monitor needs from an
//! SCD4x-class sensor. The concrete I2C implementation lives in
//! [`crate::scd4x`]; tests use [`crate::hal::MockSensor`].
//!
//! # Example
//!
//! ```rust
//! use rs_airmon::traits::Co2Sensor;
//! use rs_airmon::hal::MockSensor;
//! use rs_airmon::Measurement;
//!
//! let mut sensor = MockSensor::new();
//! sensor.queue_measurement(Measurement::new(612, 22.5, 41.0));
//!
//! sensor.start_periodic_measurement().unwrap();
//! if sensor.data_ready().unwrap() {
//!     let m = sensor.read_measurement().unwrap();
//!     assert_eq!(m.co2_ppm, 612);
//! }
//! ```

use crate::measurement::Measurement;

/// CO2 / temperature / humidity sensor with periodic measurement mode.
///
/// Implementations are expected to block for the command execution times the
/// sensor requires (a few milliseconds, 500 ms for stop, 400 ms for forced
/// recalibration). No method should block for a full measurement period.
pub trait Co2Sensor {
    /// Error type for sensor operations.
    type Error: core::fmt::Debug;

    /// Start periodic measurement (one sample every ~5 seconds on the SCD40).
    fn start_periodic_measurement(&mut self) -> Result<(), Self::Error>;

    /// Stop periodic measurement and return the sensor to idle.
    ///
    /// Configuration commands (calibration, offsets) are only accepted
    /// while idle.
    fn stop_periodic_measurement(&mut self) -> Result<(), Self::Error>;

    /// Returns `true` when a new measurement can be read.
    fn data_ready(&mut self) -> Result<bool, Self::Error>;

    /// Read the latest measurement.
    ///
    /// The value is returned as the sensor reported it; sanity checks are
    /// the caller's concern (see [`Measurement::validate`]).
    fn read_measurement(&mut self) -> Result<Measurement, Self::Error>;

    /// Run a forced recalibration against a known CO2 concentration.
    ///
    /// Must be called while idle, after at least three minutes of operation
    /// in the reference atmosphere. Returns the applied correction in ppm.
    fn perform_forced_recalibration(&mut self, target_ppm: u16) -> Result<i16, Self::Error>;

    /// Enable or disable automatic self-calibration (idle only).
    fn set_automatic_self_calibration(&mut self, enabled: bool) -> Result<(), Self::Error>;

    /// Set the temperature offset in degrees Celsius (idle only).
    ///
    /// Compensates self-heating from the enclosure and nearby electronics.
    fn set_temperature_offset(&mut self, offset_c: f32) -> Result<(), Self::Error>;
}
