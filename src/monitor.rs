//! Sensor polling and calibration.
//!
//! [`AirMonitor`] owns the CO2 sensor and turns its raw output into
//! validated [`Reading`]s on a fixed polling schedule. It never blocks the
//! main loop for longer than a single sensor command.
//!
//! # Overview
//!
//! - Polls the sensor at most once per `poll_interval_ms`
//! - Skips the tick on I2C errors and counts consecutive failures
//! - Rejects implausible samples (CO2 of 0 ppm, out-of-range values)
//! - Runs forced recalibration after a non-blocking countdown
//!
//! # Example
//!
//! ```rust
//! use rs_airmon::{AirMonitor, Measurement, SensorConfig};
//! use rs_airmon::hal::MockSensor;
//!
//! let mut sensor = MockSensor::new();
//! sensor.queue_measurement(Measurement::new(780, 22.0, 45.0));
//!
//! let mut monitor = AirMonitor::new(sensor, SensorConfig::default());
//! monitor.start().unwrap();
//!
//! // Main loop
//! let reading = monitor.update(0).expect("first poll reads immediately");
//! assert_eq!(reading.measurement.co2_ppm, 780);
//!
//! let state = monitor.state(1_000);
//! assert!(!state.stale);
//! ```

use log::{debug, error, info, warn};

use crate::config::SensorConfig;
use crate::measurement::{AirQuality, Reading};
use crate::traits::Co2Sensor;

/// Progress of a forced recalibration, as shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CalibrationStatus {
    /// No calibration requested.
    #[default]
    Idle,
    /// Waiting for the reference atmosphere to settle.
    CountingDown {
        /// Time left before the recalibration command is sent.
        remaining_ms: u32,
    },
    /// The last calibration succeeded.
    Completed {
        /// Correction applied by the sensor, in ppm.
        correction_ppm: i16,
    },
    /// The last calibration was rejected or hit a bus error.
    Failed,
}

impl CalibrationStatus {
    /// True while the countdown is running.
    pub fn is_pending(&self) -> bool {
        matches!(self, CalibrationStatus::CountingDown { .. })
    }

    /// Whole seconds left in the countdown, rounded up.
    pub fn remaining_secs(&self) -> Option<u32> {
        match self {
            CalibrationStatus::CountingDown { remaining_ms } => Some(remaining_ms.div_ceil(1000)),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Calibration {
    Idle,
    CountingDown { started_ms: u64 },
    Completed { correction_ppm: i16 },
    Failed,
}

/// Snapshot of monitor state for display and diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct MonitorState {
    /// Last accepted reading, if any.
    pub reading: Option<Reading>,
    /// Air-quality band of the last reading.
    pub air_quality: Option<AirQuality>,
    /// Whether the last reading is older than the staleness window.
    pub stale: bool,
    /// Sensor errors since the last successful read.
    pub consecutive_errors: u32,
    /// Samples rejected by validation since start.
    pub rejected_readings: u32,
    /// Calibration progress.
    pub calibration: CalibrationStatus,
}

/// Sensor polling controller.
///
/// # Type Parameter
///
/// - `S`: The sensor implementation ([`Co2Sensor`] trait)
pub struct AirMonitor<S: Co2Sensor> {
    sensor: S,
    config: SensorConfig,
    last_reading: Option<Reading>,
    last_poll_ms: Option<u64>,
    consecutive_errors: u32,
    rejected_readings: u32,
    calibration: Calibration,
}

impl<S: Co2Sensor> AirMonitor<S> {
    /// Create a new monitor. Call [`start`](Self::start) before polling.
    pub fn new(sensor: S, config: SensorConfig) -> Self {
        Self {
            sensor,
            config,
            last_reading: None,
            last_poll_ms: None,
            consecutive_errors: 0,
            rejected_readings: 0,
            calibration: Calibration::Idle,
        }
    }

    /// Configure the sensor and start periodic measurement.
    ///
    /// The sensor may still be measuring from before an MCU reset, so it is
    /// stopped first. Configuration failures are logged and do not prevent
    /// measurement from starting.
    pub fn start(&mut self) -> Result<(), S::Error> {
        if let Err(e) = self.sensor.stop_periodic_measurement() {
            warn!("sensor: stop before configure failed: {:?}", e);
        }
        if let Err(e) = self
            .sensor
            .set_temperature_offset(self.config.temperature_offset_c)
        {
            warn!("sensor: temperature offset not applied: {:?}", e);
        }
        if let Err(e) = self
            .sensor
            .set_automatic_self_calibration(self.config.automatic_self_calibration)
        {
            warn!("sensor: self-calibration setting not applied: {:?}", e);
        }
        self.sensor.start_periodic_measurement()?;
        info!(
            "sensor: periodic measurement started (poll every {} ms)",
            self.config.poll_interval_ms
        );
        Ok(())
    }

    /// Advance the monitor. Call every loop iteration.
    ///
    /// Returns the new reading when one was accepted on this tick.
    pub fn update(&mut self, now_ms: u64) -> Option<Reading> {
        if let Calibration::CountingDown { started_ms } = self.calibration {
            if now_ms.saturating_sub(started_ms) >= u64::from(self.config.calibration_countdown_ms)
            {
                self.run_calibration();
                self.last_poll_ms = Some(now_ms);
                return None;
            }
        }

        if !self.poll_due(now_ms) {
            return None;
        }
        self.last_poll_ms = Some(now_ms);

        match self.sensor.data_ready() {
            Ok(true) => {}
            Ok(false) => {
                debug!("sensor: no new data");
                return None;
            }
            Err(e) => {
                self.record_error("data-ready query", &e);
                return None;
            }
        }

        let measurement = match self.sensor.read_measurement() {
            Ok(m) => m,
            Err(e) => {
                self.record_error("read", &e);
                return None;
            }
        };
        self.consecutive_errors = 0;

        if let Err(reason) = measurement.validate() {
            self.rejected_readings += 1;
            warn!("sensor: reading rejected ({}): {:?}", reason, measurement);
            return None;
        }

        let reading = Reading {
            measurement,
            taken_at_ms: now_ms,
        };
        info!(
            "sensor: CO2 {} ppm, {:.1} C, {:.1} %RH",
            measurement.co2_ppm, measurement.temperature_c, measurement.humidity_pct
        );
        self.last_reading = Some(reading);
        Some(reading)
    }

    /// Start the forced-recalibration countdown.
    ///
    /// Returns `false` if a countdown is already running.
    pub fn begin_calibration(&mut self, now_ms: u64) -> bool {
        if matches!(self.calibration, Calibration::CountingDown { .. }) {
            return false;
        }
        info!(
            "calibration: starting in {} ms (target {} ppm)",
            self.config.calibration_countdown_ms, self.config.frc_target_ppm
        );
        self.calibration = Calibration::CountingDown { started_ms: now_ms };
        true
    }

    /// Abort a pending calibration countdown.
    pub fn cancel_calibration(&mut self) {
        if matches!(self.calibration, Calibration::CountingDown { .. }) {
            info!("calibration: cancelled");
        }
        self.calibration = Calibration::Idle;
    }

    /// Calibration progress at `now_ms`.
    pub fn calibration_status(&self, now_ms: u64) -> CalibrationStatus {
        match self.calibration {
            Calibration::Idle => CalibrationStatus::Idle,
            Calibration::CountingDown { started_ms } => {
                let elapsed = now_ms.saturating_sub(started_ms);
                let remaining =
                    u64::from(self.config.calibration_countdown_ms).saturating_sub(elapsed);
                CalibrationStatus::CountingDown {
                    remaining_ms: remaining as u32,
                }
            }
            Calibration::Completed { correction_ppm } => {
                CalibrationStatus::Completed { correction_ppm }
            }
            Calibration::Failed => CalibrationStatus::Failed,
        }
    }

    /// Whether the last reading is older than the staleness window.
    ///
    /// Returns `false` before the first reading.
    pub fn is_stale(&self, now_ms: u64) -> bool {
        self.last_reading
            .is_some_and(|r| r.age_ms(now_ms) > u64::from(self.config.stale_after_ms))
    }

    /// Get the last accepted reading.
    #[inline]
    pub fn last_reading(&self) -> Option<Reading> {
        self.last_reading
    }

    /// Sensor errors since the last successful read.
    #[inline]
    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// Get a state snapshot.
    pub fn state(&self, now_ms: u64) -> MonitorState {
        MonitorState {
            reading: self.last_reading,
            air_quality: self.last_reading.map(|r| r.measurement.air_quality()),
            stale: self.is_stale(now_ms),
            consecutive_errors: self.consecutive_errors,
            rejected_readings: self.rejected_readings,
            calibration: self.calibration_status(now_ms),
        }
    }

    /// Get a reference to the sensor.
    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    /// Get a mutable reference to the sensor.
    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    /// Get the configuration.
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    fn poll_due(&self, now_ms: u64) -> bool {
        match self.last_poll_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= u64::from(self.config.poll_interval_ms),
        }
    }

    fn record_error(&mut self, what: &str, e: &S::Error) {
        self.consecutive_errors += 1;
        error!(
            "sensor: {} failed ({} in a row): {:?}",
            what, self.consecutive_errors, e
        );
    }

    fn run_calibration(&mut self) {
        let target = self.config.frc_target_ppm;
        info!("calibration: forcing recalibration to {} ppm", target);

        self.calibration = match self.sensor.stop_periodic_measurement() {
            Err(e) => {
                error!("calibration: could not stop measurement: {:?}", e);
                Calibration::Failed
            }
            Ok(()) => match self.sensor.perform_forced_recalibration(target) {
                Ok(correction_ppm) => {
                    info!("calibration: done, correction {} ppm", correction_ppm);
                    Calibration::Completed { correction_ppm }
                }
                Err(e) => {
                    error!("calibration: rejected: {:?}", e);
                    Calibration::Failed
                }
            },
        };

        if let Err(e) = self.sensor.start_periodic_measurement() {
            self.record_error("restart after calibration", &e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockSensor, SensorCall};
    use crate::Measurement;

    fn monitor_with(sensor: MockSensor) -> AirMonitor<MockSensor> {
        let config = SensorConfig::default()
            .with_poll_interval_ms(5_000)
            .with_calibration_countdown_ms(15_000)
            .with_stale_after_ms(60_000);
        AirMonitor::new(sensor, config)
    }

    #[test]
    fn start_configures_then_starts() {
        let mut monitor = monitor_with(MockSensor::new());
        monitor.start().unwrap();

        let calls = &monitor.sensor().calls;
        assert_eq!(calls.first(), Some(&SensorCall::Stop));
        assert!(calls.contains(&SensorCall::SetTemperatureOffset(4.0)));
        assert!(calls.contains(&SensorCall::SetAsc(true)));
        assert_eq!(calls.last(), Some(&SensorCall::Start));
        assert!(monitor.sensor().running);
    }

    #[test]
    fn start_tolerates_configuration_errors() {
        let mut sensor = MockSensor::new();
        sensor.fail_configuration = true;
        let mut monitor = monitor_with(sensor);

        assert!(monitor.start().is_ok());
        assert!(monitor.sensor().running);
    }

    #[test]
    fn start_propagates_start_failure() {
        let mut sensor = MockSensor::new();
        sensor.fail_start = true;
        let mut monitor = monitor_with(sensor);
        assert!(monitor.start().is_err());
    }

    #[test]
    fn polls_on_interval() {
        let mut sensor = MockSensor::new();
        sensor.queue_measurement(Measurement::new(500, 21.0, 40.0));
        sensor.queue_measurement(Measurement::new(510, 21.0, 40.0));
        let mut monitor = monitor_with(sensor);
        monitor.start().unwrap();

        assert!(monitor.update(0).is_some());
        assert!(monitor.update(4_999).is_none());
        let second = monitor.update(5_000).unwrap();
        assert_eq!(second.measurement.co2_ppm, 510);
        assert_eq!(second.taken_at_ms, 5_000);
    }

    #[test]
    fn not_ready_skips_tick() {
        let mut sensor = MockSensor::new();
        sensor.data_ready = false;
        let mut monitor = monitor_with(sensor);

        assert!(monitor.update(0).is_none());
        assert_eq!(monitor.consecutive_errors(), 0);
    }

    #[test]
    fn zero_co2_is_rejected_and_previous_kept() {
        let mut sensor = MockSensor::new();
        sensor.queue_measurement(Measurement::new(650, 21.0, 40.0));
        sensor.queue_measurement(Measurement::new(0, 21.0, 40.0));
        let mut monitor = monitor_with(sensor);

        monitor.update(0).unwrap();
        assert!(monitor.update(5_000).is_none());

        let state = monitor.state(5_000);
        assert_eq!(state.reading.unwrap().measurement.co2_ppm, 650);
        assert_eq!(state.rejected_readings, 1);
        assert_eq!(state.consecutive_errors, 0);
    }

    #[test]
    fn read_errors_are_counted_and_reset() {
        let mut sensor = MockSensor::new();
        sensor.queue_error();
        sensor.queue_error();
        sensor.queue_measurement(Measurement::new(700, 22.0, 50.0));
        let mut monitor = monitor_with(sensor);

        assert!(monitor.update(0).is_none());
        assert!(monitor.update(5_000).is_none());
        assert_eq!(monitor.consecutive_errors(), 2);

        assert!(monitor.update(10_000).is_some());
        assert_eq!(monitor.consecutive_errors(), 0);
    }

    #[test]
    fn staleness() {
        let mut sensor = MockSensor::new();
        sensor.queue_measurement(Measurement::new(700, 22.0, 50.0));
        let mut monitor = monitor_with(sensor);

        assert!(!monitor.is_stale(100_000));
        monitor.update(0).unwrap();
        assert!(!monitor.is_stale(60_000));
        assert!(monitor.is_stale(60_001));
    }

    #[test]
    fn calibration_countdown_then_frc() {
        let mut sensor = MockSensor::new();
        sensor.frc_correction = Some(-12);
        let mut monitor = monitor_with(sensor);
        monitor.start().unwrap();

        assert!(monitor.begin_calibration(1_000));
        assert_eq!(
            monitor.calibration_status(6_000),
            CalibrationStatus::CountingDown {
                remaining_ms: 10_000
            }
        );

        monitor.update(15_999);
        assert!(monitor.calibration_status(15_999).is_pending());

        monitor.update(16_000);
        assert_eq!(
            monitor.calibration_status(16_000),
            CalibrationStatus::Completed { correction_ppm: -12 }
        );

        let calls = &monitor.sensor().calls;
        let frc = calls
            .iter()
            .position(|c| *c == SensorCall::ForcedRecalibration(400))
            .unwrap();
        assert_eq!(calls[frc - 1], SensorCall::Stop);
        assert_eq!(calls[frc + 1], SensorCall::Start);
        assert!(monitor.sensor().running);
    }

    #[test]
    fn calibration_failure_restarts_measurement() {
        let mut sensor = MockSensor::new();
        sensor.frc_correction = None;
        let mut monitor = monitor_with(sensor);
        monitor.start().unwrap();

        monitor.begin_calibration(0);
        monitor.update(15_000);

        assert_eq!(monitor.calibration_status(15_000), CalibrationStatus::Failed);
        assert!(monitor.sensor().running);
    }

    #[test]
    fn begin_calibration_twice_keeps_first_countdown() {
        let mut monitor = monitor_with(MockSensor::new());
        assert!(monitor.begin_calibration(0));
        assert!(!monitor.begin_calibration(10_000));
        assert_eq!(
            monitor.calibration_status(10_000),
            CalibrationStatus::CountingDown {
                remaining_ms: 5_000
            }
        );
    }

    #[test]
    fn cancel_calibration() {
        let mut monitor = monitor_with(MockSensor::new());
        monitor.begin_calibration(0);
        monitor.cancel_calibration();
        monitor.update(20_000);

        assert_eq!(monitor.calibration_status(20_000), CalibrationStatus::Idle);
        assert!(!monitor
            .sensor()
            .calls
            .iter()
            .any(|c| matches!(c, SensorCall::ForcedRecalibration(_))));
    }

    #[test]
    fn remaining_secs_rounds_up() {
        let status = CalibrationStatus::CountingDown { remaining_ms: 14_001 };
        assert_eq!(status.remaining_secs(), Some(15));
        let status = CalibrationStatus::CountingDown { remaining_ms: 0 };
        assert_eq!(status.remaining_secs(), Some(0));
        assert_eq!(CalibrationStatus::Idle.remaining_secs(), None);
    }
}
