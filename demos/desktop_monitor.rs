//! Desktop monitor for testing Home Assistant discovery without hardware.
//!
//! Runs the full monitor loop against a simulated SCD40 whose CO2 level
//! rises and falls like an occupied room, and publishes to a real MQTT
//! broker. The dashboard is printed to the log whenever it changes.
//!
//! # Usage
//!
//! ```sh
//! RUST_LOG=info cargo run --example desktop_monitor --features mqtt
//! ```
//!
//! With a broker elsewhere:
//! ```sh
//! MQTT_HOST=192.168.1.10 MQTT_PORT=1883 \
//!     cargo run --example desktop_monitor --features mqtt
//! ```
//!
//! The three sensors appear in Home Assistant under the device name
//! "Air Monitor" once the broker accepts the session.

use std::convert::Infallible;
use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};
use rs_airmon::hal::{HostWifi, StdClock, StdDelay};
use rs_airmon::services::{MqttRuntimeConfig, RumqttBridge};
use rs_airmon::traits::{Clock, Co2Sensor};
use rs_airmon::{
    AirMonitor, Config, ConnectivityManager, DashboardState, DeviceConfig, Measurement,
    MqttConfig, SensorConfig,
};

/// Seconds between simulated samples (the SCD40 period)
const SAMPLE_PERIOD: Duration = Duration::from_secs(5);

/// Simulated SCD40: CO2 follows a slow occupancy cycle between ~450 and
/// ~1450 ppm, temperature and humidity drift with it.
struct SimulatedScd40 {
    started: Option<Instant>,
    last_sample: Option<Instant>,
    samples: u32,
    offset_c: f32,
}

impl SimulatedScd40 {
    fn new() -> Self {
        Self {
            started: None,
            last_sample: None,
            samples: 0,
            offset_c: 0.0,
        }
    }
}

impl Co2Sensor for SimulatedScd40 {
    type Error = Infallible;

    fn start_periodic_measurement(&mut self) -> Result<(), Infallible> {
        let now = Instant::now();
        self.started = Some(now);
        self.last_sample = Some(now);
        Ok(())
    }

    fn stop_periodic_measurement(&mut self) -> Result<(), Infallible> {
        self.started = None;
        Ok(())
    }

    fn data_ready(&mut self) -> Result<bool, Infallible> {
        Ok(match (self.started, self.last_sample) {
            (Some(_), Some(last)) => last.elapsed() >= SAMPLE_PERIOD,
            _ => false,
        })
    }

    fn read_measurement(&mut self) -> Result<Measurement, Infallible> {
        self.last_sample = Some(Instant::now());
        self.samples += 1;

        // One full cycle every 120 samples (10 minutes)
        let phase = (self.samples % 120) as f32 / 120.0 * core::f32::consts::TAU;
        let level = (1.0 - phase.cos()) / 2.0;
        Ok(Measurement::new(
            450 + (level * 1000.0) as u16,
            21.0 + level * 2.5 - self.offset_c,
            38.0 + level * 12.0,
        ))
    }

    fn perform_forced_recalibration(&mut self, target_ppm: u16) -> Result<i16, Infallible> {
        info!("sim: forced recalibration to {} ppm", target_ppm);
        Ok(-12)
    }

    fn set_automatic_self_calibration(&mut self, _enabled: bool) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_temperature_offset(&mut self, offset_c: f32) -> Result<(), Infallible> {
        self.offset_c = offset_c;
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("=================================");
    info!("  rs-airmon Desktop Monitor");
    info!("=================================");

    let host = std::env::var("MQTT_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(1883);

    let config = Config::default()
        .with_mqtt(MqttConfig::default().with_host(&host).with_port(port))
        .with_sensor(SensorConfig::default().with_temperature_offset_c(1.5))
        .with_device(DeviceConfig::default().with_id("airmon_desktop"));

    // The bridge's event loop lives on this runtime; the monitor loop stays
    // on the main thread.
    let runtime = tokio::runtime::Runtime::new()?;
    let mqtt = RumqttBridge::new(
        runtime.handle().clone(),
        MqttRuntimeConfig::from_config(&config.mqtt),
    );

    let mut links = ConnectivityManager::new(HostWifi::new(), mqtt, StdDelay, &config)
        .map_err(|e| anyhow::anyhow!("discovery topics: {}", e))?;
    info!("state topic: {}", links.topics().state);

    let mut monitor = AirMonitor::new(SimulatedScd40::new(), config.sensor.clone());
    monitor
        .start()
        .map_err(|e| anyhow::anyhow!("sensor start failed: {:?}", e))?;

    let clock = StdClock::new();
    let mut last_screen: Option<DashboardState> = None;

    // Run for two hours
    let deadline = Duration::from_secs(2 * 60 * 60);
    let started = Instant::now();

    while started.elapsed() < deadline {
        let now = clock.now_ms();
        let status = links.poll(now);

        if let Some(reading) = monitor.update(now) {
            let outcome = links.publish_reading(now, &reading);
            if !outcome.is_published() {
                warn!("publish: {:?}", outcome);
            }
        }

        let screen = DashboardState::new(&monitor.state(now), &status, &config.device.name);
        if last_screen.as_ref() != Some(&screen) {
            for line in screen.lines().iter() {
                info!("| {}", line);
            }
            last_screen = Some(screen);
        }

        thread::sleep(Duration::from_millis(250));
    }

    links.shutdown();
    info!("done");
    Ok(())
}
