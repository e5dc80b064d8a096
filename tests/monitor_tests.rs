//! Integration tests for the monitor loop: sensor, links and dashboard together

use rs_airmon::{
    hal::{MockButton, MockClock, MockDelay, MockDisplay, MockMqtt, MockSensor, MockWifi, SensorCall},
    traits::{ButtonInput, Clock, DashboardDisplay},
    AirMonitor, AirQuality, CalibrationStatus, Config, ConnectivityManager, ConnectivityStatus,
    DashboardState, DeviceConfig, Measurement, PublishOutcome, SensorConfig, WifiConfig,
};

type Links = ConnectivityManager<MockWifi, MockMqtt, MockDelay>;

/// One device: everything the firmware main loop owns.
struct Device {
    monitor: AirMonitor<MockSensor>,
    links: Links,
    display: MockDisplay,
    button: MockButton,
    clock: MockClock,
    config: Config,
    last_screen: Option<DashboardState>,
}

impl Device {
    fn new(sensor: MockSensor) -> Self {
        let config = Config::default()
            .with_wifi(WifiConfig::default().with_ssid("home"))
            .with_device(DeviceConfig::default().with_name("Bedroom").with_id("bedroom"));
        let mut monitor = AirMonitor::new(sensor, config.sensor.clone());
        monitor.start().unwrap();
        let links =
            ConnectivityManager::new(MockWifi::new(), MockMqtt::new(), MockDelay::new(), &config)
                .unwrap();
        let mut display = MockDisplay::new();
        display.init().unwrap();
        Self {
            monitor,
            links,
            display,
            button: MockButton::new(),
            clock: MockClock::new(),
            config,
            last_screen: None,
        }
    }

    /// Run one loop iteration at the current clock time.
    fn tick(&mut self) -> Option<PublishOutcome> {
        let now = self.clock.now_ms();
        if self.button.button_just_pressed() {
            self.monitor.begin_calibration(now);
        }
        let status = self.links.poll(now);
        let outcome = self
            .monitor
            .update(now)
            .map(|reading| self.links.publish_reading(now, &reading));
        let screen = DashboardState::new(&self.monitor.state(now), &status, &self.config.device.name);
        if self.last_screen.as_ref() != Some(&screen) {
            self.display.render(&screen).unwrap();
            self.last_screen = Some(screen);
        }
        outcome
    }

    fn screen(&self) -> &DashboardState {
        self.display.last_state.as_ref().unwrap()
    }

    fn state_publishes(&self) -> usize {
        self.links
            .mqtt()
            .published_to(&self.links.topics().state)
            .len()
    }
}

#[test]
fn readings_flow_to_dashboard_and_broker() {
    let mut sensor = MockSensor::new();
    sensor.queue_measurement(Measurement::new(612, 22.4, 41.0));
    let mut device = Device::new(sensor);

    assert_eq!(device.tick(), Some(PublishOutcome::Published));

    let lines = device.screen().lines();
    assert_eq!(lines[0], "Bedroom");
    assert_eq!(lines[1], "CO2 612 ppm");
    assert_eq!(lines[2], "Temp 22.4 C");
    assert_eq!(lines[3], "Hum 41.0 %");
    assert_eq!(lines[4], "Good");
    assert_eq!(lines[5], "WiFi OK  MQTT OK");
    assert_eq!(device.state_publishes(), 1);
}

#[test]
fn dashboard_redraws_only_on_change() {
    let mut sensor = MockSensor::new();
    sensor.queue_measurement(Measurement::new(700, 21.0, 40.0));
    let mut device = Device::new(sensor);

    device.tick();
    assert_eq!(device.display.render_count, 1);

    // Nothing new for several ticks
    for _ in 0..10 {
        device.clock.advance(100);
        device.tick();
    }
    assert_eq!(device.display.render_count, 1);

    // Next sample arrives
    device
        .monitor
        .sensor_mut()
        .queue_measurement(Measurement::new(705, 21.0, 40.0));
    device.clock.set(5_000);
    device.tick();
    assert_eq!(device.display.render_count, 2);
    assert_eq!(device.screen().lines()[1], "CO2 705 ppm");
}

#[test]
fn readings_before_network_are_not_queued() {
    let mut sensor = MockSensor::new();
    sensor.queue_measurement(Measurement::new(820, 23.0, 50.0));
    sensor.queue_measurement(Measurement::new(830, 23.0, 50.0));
    let mut device = Device::new(sensor);
    device.links.wifi_mut().always_fail = true;

    assert_eq!(device.tick(), Some(PublishOutcome::Offline));
    assert_eq!(device.screen().lines()[5], "WiFi --  MQTT --");

    // WiFi returns at the next check
    device.links.wifi_mut().always_fail = false;
    device.clock.set(30_000);
    assert_eq!(device.tick(), Some(PublishOutcome::Published));

    let published = device.links.mqtt().published_to(&device.links.topics().state);
    assert_eq!(published.len(), 1);
    let doc: serde_json::Value = serde_json::from_slice(&published[0].1).unwrap();
    assert_eq!(doc["co2"], 830);
}

#[test]
fn ventilation_hint_for_high_co2() {
    let mut sensor = MockSensor::new();
    sensor.queue_measurement(Measurement::new(1650, 24.0, 55.0));
    let mut device = Device::new(sensor);

    device.tick();

    assert_eq!(device.screen().air_quality, Some(AirQuality::Bad));
    assert_eq!(device.screen().lines()[4], "Bad - ventilate");
}

#[test]
fn button_runs_forced_recalibration() {
    let mut sensor = MockSensor::new();
    sensor.queue_measurement(Measurement::new(480, 20.0, 40.0));
    sensor.frc_correction = Some(-23);
    let mut device = Device::new(sensor);
    device.tick();

    device.clock.set(1_000);
    device.button.press();
    device.tick();
    device.button.release();
    assert_eq!(
        device.screen().calibration,
        CalibrationStatus::CountingDown { remaining_ms: 15_000 }
    );
    assert_eq!(device.screen().lines()[6], "Calibrating in 15 s");

    device.clock.set(10_500);
    device.tick();
    assert_eq!(device.screen().lines()[6], "Calibrating in 6 s");

    device.clock.set(16_000);
    assert_eq!(device.tick(), None);
    assert_eq!(
        device.screen().calibration,
        CalibrationStatus::Completed { correction_ppm: -23 }
    );
    assert_eq!(device.screen().lines()[6], "Calibrated -23 ppm");

    let calls = &device.monitor.sensor().calls;
    let frc = calls
        .iter()
        .position(|c| *c == SensorCall::ForcedRecalibration(400))
        .unwrap();
    assert_eq!(calls[frc - 1], SensorCall::Stop);
    assert_eq!(calls[frc + 1], SensorCall::Start);
    assert!(device.monitor.sensor().running);
}

#[test]
fn countdown_redraws_once_per_second() {
    let mut sensor = MockSensor::new();
    sensor.queue_measurement(Measurement::new(480, 20.0, 40.0));
    let mut device = Device::new(sensor);
    device.tick();

    device.button.press();
    device.tick();
    device.button.release();
    let after_press = device.display.render_count;

    // Ten ticks inside the same displayed second
    for _ in 0..9 {
        device.clock.advance(100);
        device.tick();
    }
    assert_eq!(device.display.render_count, after_press);
    assert_eq!(device.screen().lines()[6], "Calibrating in 15 s");

    device.clock.advance(100);
    device.tick();
    assert_eq!(device.display.render_count, after_press + 1);
    assert_eq!(device.screen().lines()[6], "Calibrating in 14 s");
}

#[test]
fn sensor_errors_then_stale_on_dashboard() {
    let mut sensor = MockSensor::new();
    sensor.queue_measurement(Measurement::new(550, 21.0, 38.0));
    let mut device = Device::new(sensor);
    device.tick();

    // Bus errors on the next two polls
    device.monitor.sensor_mut().queue_error();
    device.clock.set(5_000);
    device.tick();
    device.monitor.sensor_mut().queue_error();
    device.clock.set(10_000);
    device.tick();

    assert_eq!(device.screen().sensor_errors, 2);
    assert_eq!(device.screen().lines()[6], "Sensor errors: 2");
    // Last good value stays on screen
    assert_eq!(device.screen().lines()[1], "CO2 550 ppm");

    // No more data; the reading ages out
    device.clock.set(60_001);
    device.tick();
    assert!(device.screen().stale);
    assert_eq!(device.screen().lines()[6], "Stale reading");
}

#[test]
fn invalid_samples_never_reach_broker() {
    let mut sensor = MockSensor::new();
    sensor.queue_measurement(Measurement::new(0, 21.0, 38.0));
    sensor.queue_measurement(Measurement::new(600, f32::NAN, 38.0));
    sensor.queue_measurement(Measurement::new(600, 21.0, 120.0));
    sensor.queue_measurement(Measurement::new(640, 21.0, 38.0));
    let mut device = Device::new(sensor);

    for step in 0..4 {
        device.clock.set(step * 5_000);
        device.tick();
    }

    assert_eq!(device.state_publishes(), 1);
    assert_eq!(device.monitor.state(15_000).rejected_readings, 3);
    assert_eq!(device.screen().lines()[1], "CO2 640 ppm");
}

#[test]
fn start_sequence_configures_sensor() {
    let sensor = MockSensor::new();
    let config = SensorConfig::default()
        .with_temperature_offset_c(2.5)
        .with_automatic_self_calibration(false);
    let mut monitor = AirMonitor::new(sensor, config);
    monitor.start().unwrap();

    assert_eq!(
        monitor.sensor().calls,
        vec![
            SensorCall::Stop,
            SensorCall::SetTemperatureOffset(2.5),
            SensorCall::SetAsc(false),
            SensorCall::Start,
        ]
    );
}

#[test]
fn offline_dashboard_without_network() {
    let mut sensor = MockSensor::new();
    sensor.queue_measurement(Measurement::new(950, 22.0, 44.0));
    let mut monitor = AirMonitor::new(sensor, SensorConfig::default());
    monitor.start().unwrap();
    monitor.update(0);

    let screen = DashboardState::new(&monitor.state(0), &ConnectivityStatus::default(), "Desk");
    let lines = screen.lines();
    assert_eq!(lines[4], "Fair");
    assert_eq!(lines[5], "WiFi --  MQTT --");
    assert_eq!(lines.len(), 6);
}
