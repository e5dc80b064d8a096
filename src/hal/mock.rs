//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all hardware and network traits,
//! enabling development and testing on desktop without an M5Stack or a
//! broker.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockSensor`] | [`Co2Sensor`] | Queued measurements, command log |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockButton`] | [`ButtonInput`] | Simulated presses |
//! | [`MockDelay`] | [`DelayNs`] | Records requested waits |
//! | [`MockWifi`] | [`WifiLink`] | Scripted association results |
//! | [`MockMqtt`] | [`MqttClient`] | Captures connects and publishes |
//! | [`MockDisplay`] | [`DashboardDisplay`] | Tracks render calls |
//!
//! # Example
//!
//! ```rust
//! use rs_airmon::{AirMonitor, Measurement, SensorConfig};
//! use rs_airmon::hal::MockSensor;
//!
//! let mut sensor = MockSensor::new();
//! sensor.queue_measurement(Measurement::new(1_250, 24.0, 55.0));
//!
//! let mut monitor = AirMonitor::new(sensor, SensorConfig::default());
//! monitor.start().unwrap();
//! monitor.update(0);
//!
//! let state = monitor.state(0);
//! assert!(state.air_quality.unwrap().needs_ventilation());
//! ```
//!
//! [`Co2Sensor`]: crate::traits::Co2Sensor
//! [`Clock`]: crate::traits::Clock
//! [`ButtonInput`]: crate::traits::ButtonInput
//! [`WifiLink`]: crate::traits::WifiLink
//! [`MqttClient`]: crate::traits::MqttClient
//! [`DashboardDisplay`]: crate::traits::DashboardDisplay

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;

use crate::dashboard::DashboardState;
use crate::measurement::Measurement;
use crate::traits::{
    ButtonInput, Clock, Co2Sensor, ConnectOptions, DashboardDisplay, MqttClient, WifiLink,
};

// ============================================================================
// Sensor Mock
// ============================================================================

/// Error returned by the mock sensor and links.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockError;

/// A command sent to [`MockSensor`].
///
/// Data-ready polls and reads are not logged; they are observable through
/// the measurement queue.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SensorCall {
    /// `start_periodic_measurement`
    Start,
    /// `stop_periodic_measurement`
    Stop,
    /// `perform_forced_recalibration(target)`
    ForcedRecalibration(u16),
    /// `set_automatic_self_calibration(enabled)`
    SetAsc(bool),
    /// `set_temperature_offset(offset)`
    SetTemperatureOffset(f32),
}

/// Mock CO2 sensor for testing.
///
/// Queue measurements (or errors) to be returned in FIFO order. The sensor
/// reports data ready whenever the queue is non-empty and
/// [`data_ready`](Self::data_ready) is set.
///
/// # Example
///
/// ```rust
/// use rs_airmon::hal::{MockSensor, SensorCall};
/// use rs_airmon::traits::Co2Sensor;
/// use rs_airmon::Measurement;
///
/// let mut sensor = MockSensor::new();
/// sensor.queue_measurement(Measurement::new(480, 20.0, 35.0));
///
/// assert!(sensor.data_ready().unwrap());
/// assert_eq!(sensor.read_measurement().unwrap().co2_ppm, 480);
/// assert!(!sensor.data_ready().unwrap()); // Queue drained
///
/// sensor.set_automatic_self_calibration(false).unwrap();
/// assert_eq!(sensor.calls, vec![SensorCall::SetAsc(false)]);
/// ```
#[derive(Debug)]
pub struct MockSensor {
    /// Results returned by `read_measurement`, oldest first.
    pub queue: VecDeque<Result<Measurement, MockError>>,
    /// Master switch for data-ready reporting.
    pub data_ready: bool,
    /// Whether periodic measurement is running.
    pub running: bool,
    /// Correction returned by forced recalibration (`None` = failure).
    pub frc_correction: Option<i16>,
    /// Make configuration commands fail.
    pub fail_configuration: bool,
    /// Make `start_periodic_measurement` fail.
    pub fail_start: bool,
    /// Commands received, in order.
    pub calls: Vec<SensorCall>,
}

impl Default for MockSensor {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            data_ready: true,
            running: false,
            frc_correction: Some(0),
            fail_configuration: false,
            fail_start: false,
            calls: Vec::new(),
        }
    }
}

impl MockSensor {
    /// Creates a new mock sensor with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a measurement to be returned by the next read.
    pub fn queue_measurement(&mut self, measurement: Measurement) {
        self.queue.push_back(Ok(measurement));
    }

    /// Queue a bus error for the next read.
    pub fn queue_error(&mut self) {
        self.queue.push_back(Err(MockError));
    }

    fn configure(&mut self, call: SensorCall) -> Result<(), MockError> {
        self.calls.push(call);
        if self.fail_configuration {
            Err(MockError)
        } else {
            Ok(())
        }
    }
}

impl Co2Sensor for MockSensor {
    type Error = MockError;

    fn start_periodic_measurement(&mut self) -> Result<(), MockError> {
        self.calls.push(SensorCall::Start);
        if self.fail_start {
            return Err(MockError);
        }
        self.running = true;
        Ok(())
    }

    fn stop_periodic_measurement(&mut self) -> Result<(), MockError> {
        self.calls.push(SensorCall::Stop);
        self.running = false;
        Ok(())
    }

    fn data_ready(&mut self) -> Result<bool, MockError> {
        Ok(self.data_ready && !self.queue.is_empty())
    }

    fn read_measurement(&mut self) -> Result<Measurement, MockError> {
        self.queue.pop_front().unwrap_or(Err(MockError))
    }

    fn perform_forced_recalibration(&mut self, target_ppm: u16) -> Result<i16, MockError> {
        self.calls.push(SensorCall::ForcedRecalibration(target_ppm));
        self.frc_correction.ok_or(MockError)
    }

    fn set_automatic_self_calibration(&mut self, enabled: bool) -> Result<(), MockError> {
        self.configure(SensorCall::SetAsc(enabled))
    }

    fn set_temperature_offset(&mut self, offset_c: f32) -> Result<(), MockError> {
        self.configure(SensorCall::SetTemperatureOffset(offset_c))
    }
}

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Mock clock for testing.
///
/// Provides a controllable time source for testing time-dependent behavior.
///
/// # Example
///
/// ```rust
/// use rs_airmon::hal::MockClock;
/// use rs_airmon::traits::Clock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.set(1000);
/// assert_eq!(clock.now_ms(), 1000);
///
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_ms: u64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms = ms;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms += ms;
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms
    }
}

/// Mock front-panel button.
///
/// `press` makes `button_just_pressed` true once; the button then reads as
/// held until `release`.
#[derive(Debug, Default)]
pub struct MockButton {
    held: bool,
    edge: bool,
}

impl MockButton {
    /// Creates a released button.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a press.
    pub fn press(&mut self) {
        self.held = true;
        self.edge = true;
    }

    /// Release the button.
    pub fn release(&mut self) {
        self.held = false;
    }
}

impl ButtonInput for MockButton {
    fn button_pressed(&self) -> bool {
        self.held
    }

    fn button_just_pressed(&mut self) -> bool {
        core::mem::take(&mut self.edge)
    }
}

/// Delay provider that returns immediately and records the total requested.
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Sum of all requested delays in nanoseconds.
    pub total_ns: u64,
    /// Number of delay calls.
    pub calls: usize,
}

impl MockDelay {
    /// Creates a new mock delay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total requested delay in milliseconds.
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
        self.calls += 1;
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

/// Mock WiFi link.
///
/// Each `connect` call consumes one scripted result; once the script is
/// exhausted, attempts succeed.
///
/// # Example
///
/// ```rust
/// use rs_airmon::hal::MockWifi;
/// use rs_airmon::traits::WifiLink;
///
/// let mut wifi = MockWifi::new();
/// wifi.fail_next(2);
///
/// assert!(wifi.connect().is_err());
/// assert!(wifi.connect().is_err());
/// assert!(wifi.connect().is_ok());
/// assert!(wifi.is_connected());
/// assert_eq!(wifi.connect_attempts, 3);
/// ```
#[derive(Debug, Default)]
pub struct MockWifi {
    /// Whether the station is associated.
    pub connected: bool,
    /// Number of `connect` calls.
    pub connect_attempts: usize,
    /// Number of `disconnect` calls.
    pub disconnects: usize,
    /// Scripted results for upcoming `connect` calls (`true` = success).
    pub script: VecDeque<bool>,
    /// Fail every attempt regardless of the script.
    pub always_fail: bool,
}

impl MockWifi {
    /// Creates a disconnected link whose attempts succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an already associated link.
    pub fn connected() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    /// Make the next `n` attempts fail.
    pub fn fail_next(&mut self, n: usize) {
        self.script.extend(core::iter::repeat(false).take(n));
    }

    /// Simulate the access point going away.
    pub fn drop_link(&mut self) {
        self.connected = false;
    }
}

impl WifiLink for MockWifi {
    type Error = MockError;

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self) -> Result<(), MockError> {
        self.connect_attempts += 1;
        let ok = !self.always_fail && self.script.pop_front().unwrap_or(true);
        self.connected = ok;
        if ok {
            Ok(())
        } else {
            Err(MockError)
        }
    }

    fn disconnect(&mut self) -> Result<(), MockError> {
        self.disconnects += 1;
        self.connected = false;
        Ok(())
    }
}

/// Owned copy of a last-will registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedWill {
    /// Will topic.
    pub topic: String,
    /// Will payload.
    pub payload: Vec<u8>,
    /// Will retain flag.
    pub retain: bool,
}

/// Mock MQTT client for testing.
///
/// Records connection attempts and all publishes.
///
/// # Example
///
/// ```rust
/// use rs_airmon::hal::MockMqtt;
/// use rs_airmon::traits::{ConnectOptions, MqttClient};
///
/// let mut mqtt = MockMqtt::new();
/// let options = ConnectOptions {
///     client_id: "coreink",
///     username: None,
///     password: None,
///     keep_alive_secs: 60,
///     last_will: None,
/// };
/// mqtt.connect(&options).unwrap();
///
/// mqtt.publish("air/state", b"{}", false).unwrap();
/// assert_eq!(mqtt.published_to("air/state").len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockMqtt {
    /// Messages that have been published (topic, payload, retain).
    pub published: Vec<(String, Vec<u8>, bool)>,
    /// Whether the session is up.
    pub connected: bool,
    /// Number of `connect` calls.
    pub connect_calls: usize,
    /// Client ID from the last `connect`.
    pub client_id: Option<String>,
    /// Username from the last `connect`.
    pub username: Option<String>,
    /// Last will from the last `connect`.
    pub last_will: Option<RecordedWill>,
    /// Number of upcoming `connect` calls that fail.
    pub fail_connects: usize,
    /// Make every publish fail and drop the session.
    pub fail_publish: bool,
}

impl MockMqtt {
    /// Creates a new disconnected mock client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get published messages for a topic
    pub fn published_to(&self, topic: &str) -> Vec<&(String, Vec<u8>, bool)> {
        self.published
            .iter()
            .filter(|(t, _, _)| t == topic)
            .collect()
    }

    /// Simulate the broker dropping the session.
    pub fn drop_connection(&mut self) {
        self.connected = false;
    }
}

impl MqttClient for MockMqtt {
    type Error = MockError;

    fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), MockError> {
        self.connect_calls += 1;
        self.client_id = Some(options.client_id.into());
        self.username = options.username.map(Into::into);
        self.last_will = options.last_will.map(|w| RecordedWill {
            topic: w.topic.into(),
            payload: w.payload.to_vec(),
            retain: w.retain,
        });
        if self.fail_connects > 0 {
            self.fail_connects -= 1;
            self.connected = false;
            return Err(MockError);
        }
        self.connected = true;
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), MockError> {
        if !self.connected || self.fail_publish {
            self.connected = false;
            return Err(MockError);
        }
        self.published.push((topic.into(), payload.to_vec(), retain));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn disconnect(&mut self) -> Result<(), MockError> {
        self.connected = false;
        Ok(())
    }
}

// ============================================================================
// Display Mocks
// ============================================================================

/// Mock display for testing UI rendering.
///
/// Tracks render calls and stores the last rendered state for verification.
///
/// # Example
///
/// ```
/// use rs_airmon::hal::MockDisplay;
/// use rs_airmon::traits::DashboardDisplay;
///
/// let mut display = MockDisplay::new();
/// display.init().unwrap();
/// assert!(display.initialized);
/// assert_eq!(display.render_count, 0);
/// ```
#[derive(Debug, Default)]
pub struct MockDisplay {
    /// The last state that was rendered.
    pub last_state: Option<DashboardState>,
    /// Number of times render() was called.
    pub render_count: usize,
    /// Last message shown via show_message().
    pub last_message: Option<(String, Option<String>)>,
    /// Whether init() was called.
    pub initialized: bool,
}

impl MockDisplay {
    /// Creates a new mock display.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DashboardDisplay for MockDisplay {
    type Error = ();

    fn init(&mut self) -> Result<(), ()> {
        self.initialized = true;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ()> {
        self.last_state = None;
        Ok(())
    }

    fn render(&mut self, state: &DashboardState) -> Result<(), ()> {
        self.last_state = Some(state.clone());
        self.render_count += 1;
        Ok(())
    }

    fn show_message(&mut self, line1: &str, line2: Option<&str>) -> Result<(), ()> {
        self.last_message = Some((line1.into(), line2.map(Into::into)));
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // MockSensor Tests
    // =========================================================================

    #[test]
    fn mock_sensor_fifo() {
        let mut sensor = MockSensor::new();
        sensor.queue_measurement(Measurement::new(400, 20.0, 30.0));
        sensor.queue_error();
        sensor.queue_measurement(Measurement::new(500, 20.0, 30.0));

        assert_eq!(sensor.read_measurement().unwrap().co2_ppm, 400);
        assert_eq!(sensor.read_measurement(), Err(MockError));
        assert_eq!(sensor.read_measurement().unwrap().co2_ppm, 500);
        assert_eq!(sensor.read_measurement(), Err(MockError));
    }

    #[test]
    fn mock_sensor_data_ready_switch() {
        let mut sensor = MockSensor::new();
        sensor.queue_measurement(Measurement::new(400, 20.0, 30.0));
        sensor.data_ready = false;
        assert!(!sensor.data_ready().unwrap());
        sensor.data_ready = true;
        assert!(sensor.data_ready().unwrap());
    }

    #[test]
    fn mock_sensor_frc_failure() {
        let mut sensor = MockSensor::new();
        sensor.frc_correction = None;
        assert!(sensor.perform_forced_recalibration(400).is_err());
        assert_eq!(sensor.calls, vec![SensorCall::ForcedRecalibration(400)]);
    }

    #[test]
    fn mock_sensor_start_stop() {
        let mut sensor = MockSensor::new();
        sensor.start_periodic_measurement().unwrap();
        assert!(sensor.running);
        sensor.stop_periodic_measurement().unwrap();
        assert!(!sensor.running);
    }

    // =========================================================================
    // Hardware Mock Tests
    // =========================================================================

    #[test]
    fn mock_button_edge_consumed() {
        let mut button = MockButton::new();
        assert!(!button.button_just_pressed());
        button.press();
        assert!(button.button_pressed());
        assert!(button.button_just_pressed());
        assert!(!button.button_just_pressed());
        button.release();
        assert!(!button.button_pressed());
    }

    #[test]
    fn mock_delay_accumulates() {
        let mut delay = MockDelay::new();
        delay.delay_ms(500);
        delay.delay_ms(250);
        assert_eq!(delay.total_ms(), 750);
    }

    // =========================================================================
    // Network Mock Tests
    // =========================================================================

    #[test]
    fn mock_wifi_always_fail() {
        let mut wifi = MockWifi::new();
        wifi.always_fail = true;
        assert!(wifi.connect().is_err());
        assert!(!wifi.is_connected());
    }

    #[test]
    fn mock_mqtt_records_will() {
        let mut mqtt = MockMqtt::new();
        let options = ConnectOptions {
            client_id: "dev",
            username: Some("user"),
            password: Some("pass"),
            keep_alive_secs: 30,
            last_will: Some(crate::traits::LastWill {
                topic: "dev/availability",
                payload: b"offline",
                retain: true,
            }),
        };
        mqtt.connect(&options).unwrap();

        let will = mqtt.last_will.as_ref().unwrap();
        assert_eq!(will.topic, "dev/availability");
        assert_eq!(will.payload, b"offline");
        assert!(will.retain);
        assert_eq!(mqtt.username.as_deref(), Some("user"));
    }

    #[test]
    fn mock_mqtt_publish_requires_session() {
        let mut mqtt = MockMqtt::new();
        assert!(mqtt.publish("t", b"x", false).is_err());
        assert!(mqtt.published.is_empty());
    }

    #[test]
    fn mock_mqtt_failed_connect() {
        let mut mqtt = MockMqtt::new();
        mqtt.fail_connects = 1;
        let options = ConnectOptions {
            client_id: "dev",
            username: None,
            password: None,
            keep_alive_secs: 60,
            last_will: None,
        };
        assert!(mqtt.connect(&options).is_err());
        assert!(!mqtt.is_connected());
        assert!(mqtt.connect(&options).is_ok());
        assert_eq!(mqtt.connect_calls, 2);
    }

    // =========================================================================
    // MockDisplay Tests
    // =========================================================================

    #[test]
    fn mock_display_message() {
        let mut display = MockDisplay::new();
        display.show_message("Calibrating", Some("15 s")).unwrap();
        assert_eq!(
            display.last_message,
            Some(("Calibrating".into(), Some("15 s".into())))
        );
    }
}
