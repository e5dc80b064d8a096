//! M5Stack SCD40 air-quality monitor.
//!
//! Main entry point for the physical device. It runs a 10Hz loop that:
//! - Polls the SCD40 for new samples (one every ~5 seconds)
//! - Watches the front button to start a forced recalibration
//! - Keeps WiFi and the MQTT session alive (if enabled)
//! - Publishes readings to Home Assistant (if enabled)
//! - Redraws the dashboard when anything on it changed (if enabled)
//!
//! # Build
//!
//! ```bash
//! # Sensor only (log output)
//! cargo build --release --features esp32
//!
//! # With display
//! cargo build --release --features display
//!
//! # For an M5Paper (default: coreink)
//! DEVICE_PROFILE=m5paper cargo build --release --features esp32
//!
//! # With WiFi + MQTT
//! WIFI_SSID=home WIFI_PASSWORD=secret MQTT_HOST=192.168.1.10 \
//!     cargo build --release --features esp32-mqtt
//!
//! # Full
//! cargo build --release --features display,esp32-mqtt
//! ```

use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyIOPin, IOPin};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use log::{info, warn};
use rs_airmon::hal::esp32::{pins, Esp32Button, Esp32Clock};
use rs_airmon::traits::{ButtonInput, Clock};
use rs_airmon::{
    AirMonitor, CalibrationStatus, Config, ConnectivityStatus, DashboardState, DeviceConfig,
    DeviceProfile, MqttConfig, Scd4x, WifiConfig,
};

/// Main loop interval in milliseconds (10Hz)
const LOOP_INTERVAL_MS: u64 = 100;

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_hal::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("rs-airmon {} starting", env!("CARGO_PKG_VERSION"));

    // =========================================================================
    // Configuration
    // =========================================================================
    let mut mqtt = MqttConfig::default().with_host(option_env!("MQTT_HOST").unwrap_or(""));
    if let Some(port) = option_env!("MQTT_PORT").and_then(|p| p.parse().ok()) {
        mqtt = mqtt.with_port(port);
    }
    if let (Some(user), Some(pass)) = (option_env!("MQTT_USER"), option_env!("MQTT_PASSWORD")) {
        mqtt = mqtt.with_auth(user, pass);
    }
    let profile = DeviceProfile::select(option_env!("DEVICE_PROFILE"))
        .ok_or_else(|| anyhow!("unknown DEVICE_PROFILE (coreink, m5paper, tab5)"))?;
    let mut device = DeviceConfig::default().with_profile(profile);
    if let Some(id) = option_env!("DEVICE_ID") {
        device = device.with_id(id);
    }
    let config = Config::default()
        .with_wifi(
            WifiConfig::default()
                .with_ssid(option_env!("WIFI_SSID").unwrap_or(""))
                .with_password(option_env!("WIFI_PASSWORD").unwrap_or("")),
        )
        .with_mqtt(mqtt)
        .with_device(device);

    let peripherals = Peripherals::take()?;

    // =========================================================================
    // Initialize SCD40 (Grove port, I2C0)
    // =========================================================================
    let panel = profile.display_size();
    info!(
        "profile: {} ({}x{} panel)",
        profile.model(),
        panel.width,
        panel.height
    );
    let (sda, scl): (AnyIOPin, AnyIOPin) = match profile {
        DeviceProfile::CoreInk => (
            peripherals.pins.gpio32.downgrade(),
            peripherals.pins.gpio33.downgrade(),
        ),
        DeviceProfile::Paper => (
            peripherals.pins.gpio25.downgrade(),
            peripherals.pins.gpio32.downgrade(),
        ),
        DeviceProfile::Tab5 => bail!("{} needs an ESP32-P4 build", profile.model()),
    };
    let sensor_i2c = I2cDriver::new(
        peripherals.i2c0,
        sda,
        scl,
        &I2cConfig::new().baudrate(pins::SENSOR_I2C_HZ.Hz()),
    )?;
    let mut monitor = AirMonitor::new(Scd4x::new(sensor_i2c, FreeRtos), config.sensor.clone());
    monitor
        .start()
        .map_err(|e| anyhow!("SCD40 start failed: {:?}", e))?;
    let (sda_gpio, scl_gpio) = profile.i2c_pins();
    info!("sensor: SCD40 measuring (GPIO{}/{})", sda_gpio, scl_gpio);

    // =========================================================================
    // Initialize Button
    // =========================================================================
    let mut button = Esp32Button::new(peripherals.pins.gpio38)?;
    info!("button: GPIO{}", pins::BUTTON);

    // =========================================================================
    // Initialize Display (SSD1306, I2C1) - Optional
    // =========================================================================
    #[cfg(feature = "display")]
    let mut display = {
        use rs_airmon::hal::esp32::Esp32Display;
        use rs_airmon::traits::DashboardDisplay;

        let i2c = I2cDriver::new(
            peripherals.i2c1,
            peripherals.pins.gpio21, // SDA
            peripherals.pins.gpio22, // SCL
            &I2cConfig::new().baudrate(400.kHz().into()),
        )?;
        let mut disp = Esp32Display::new(i2c);
        disp.init()
            .map_err(|e| anyhow!("Display init failed: {:?}", e))?;
        if let Err(e) = disp.show_message(&config.device.name, Some("Starting...")) {
            warn!("display: splash failed: {:?}", e);
        }
        info!("display: SSD1306 ready");
        disp
    };

    // =========================================================================
    // Initialize WiFi + MQTT (Home Assistant) - Optional
    // =========================================================================
    #[cfg(feature = "esp32-mqtt")]
    let mut links = {
        use esp_idf_svc::eventloop::EspSystemEventLoop;
        use esp_idf_svc::nvs::EspDefaultNvsPartition;
        use rs_airmon::hal::esp32::{Esp32Mqtt, Esp32Wifi};
        use rs_airmon::ConnectivityManager;

        if config.wifi.is_configured() && config.mqtt.enabled {
            let sysloop = EspSystemEventLoop::take()?;
            let nvs = EspDefaultNvsPartition::take()?;
            let wifi = Esp32Wifi::new(peripherals.modem, sysloop, Some(nvs), &config.wifi)?;
            let mqtt = Esp32Mqtt::new(&config.mqtt);
            let manager = ConnectivityManager::new(wifi, mqtt, FreeRtos, &config)
                .map_err(|e| anyhow!("discovery topics: {}", e))?;
            Some(manager)
        } else {
            info!("network: skipped (set WIFI_SSID and MQTT_HOST)");
            None
        }
    };

    let clock = Esp32Clock::new();
    let mut last_screen: Option<DashboardState> = None;
    let mut last_calibration = CalibrationStatus::Idle;

    info!("place the monitor in fresh air and press the button to recalibrate");

    // =========================================================================
    // Main Loop
    // =========================================================================
    loop {
        let now = clock.now_ms();

        // ---------------------------------------------------------------------
        // Forced recalibration via button
        // ---------------------------------------------------------------------
        if button.button_just_pressed() {
            if monitor.calibration_status(now).is_pending() {
                monitor.cancel_calibration();
                info!("calibration: cancelled");
            } else if monitor.begin_calibration(now) {
                info!("calibration: countdown started");
            }
        }

        // ---------------------------------------------------------------------
        // Sensor
        // ---------------------------------------------------------------------
        let reading = monitor.update(now);
        if let Some(r) = reading {
            info!(
                "reading: {} ppm, {:.1} C, {:.1} %",
                r.measurement.co2_ppm, r.measurement.temperature_c, r.measurement.humidity_pct
            );
        }
        let calibration = monitor.calibration_status(now);
        if calibration != last_calibration {
            match calibration {
                CalibrationStatus::Completed { correction_ppm } => {
                    info!("calibration: done, correction {} ppm", correction_ppm)
                }
                CalibrationStatus::Failed => warn!("calibration: failed"),
                _ => {}
            }
            last_calibration = calibration;
        }

        // ---------------------------------------------------------------------
        // Network
        // ---------------------------------------------------------------------
        #[cfg(feature = "esp32-mqtt")]
        let links_status = match links.as_mut() {
            Some(manager) => {
                let status = manager.poll(now);
                if let Some(ref r) = reading {
                    manager.publish_reading(now, r);
                }
                status
            }
            None => ConnectivityStatus::default(),
        };
        #[cfg(not(feature = "esp32-mqtt"))]
        let links_status = ConnectivityStatus::default();

        // ---------------------------------------------------------------------
        // Dashboard (redrawn only on change)
        // ---------------------------------------------------------------------
        let screen = DashboardState::new(&monitor.state(now), &links_status, &config.device.name);
        if last_screen.as_ref() != Some(&screen) {
            #[cfg(feature = "display")]
            {
                use rs_airmon::traits::DashboardDisplay;
                if let Err(e) = display.render(&screen) {
                    warn!("display: render failed: {:?}", e);
                }
            }
            #[cfg(not(feature = "display"))]
            for line in screen.lines().iter() {
                info!("| {}", line);
            }
            last_screen = Some(screen);
        }

        thread::sleep(Duration::from_millis(LOOP_INTERVAL_MS));
    }
}
