//! Sensirion SCD4x (SCD40/SCD41) CO2 sensor over I2C.
//!
//! A thin command layer on top of `embedded-hal` 1.0. Every 16-bit word
//! exchanged with the sensor is followed by a CRC-8 byte, which is generated
//! for writes and verified for reads.
//!
//! # Example
//!
//! ```ignore
//! use rs_airmon::scd4x::Scd4x;
//! use rs_airmon::traits::Co2Sensor;
//!
//! let mut sensor = Scd4x::new(i2c, delay);
//! sensor.start_periodic_measurement()?;
//! loop {
//!     if sensor.data_ready()? {
//!         let m = sensor.read_measurement()?;
//!         log::info!("{} ppm", m.co2_ppm);
//!     }
//! }
//! ```

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::measurement::Measurement;
use crate::traits::Co2Sensor;

/// Fixed I2C address of the SCD4x family.
pub const SCD4X_I2C_ADDRESS: u8 = 0x62;

/// Command words from the SCD4x datasheet.
pub mod cmd {
    /// Start periodic measurement (5 s interval).
    pub const START_PERIODIC_MEASUREMENT: u16 = 0x21B1;
    /// Read the latest CO2, temperature and humidity words.
    pub const READ_MEASUREMENT: u16 = 0xEC05;
    /// Stop periodic measurement.
    pub const STOP_PERIODIC_MEASUREMENT: u16 = 0x3F86;
    /// Query whether a new sample is available.
    pub const GET_DATA_READY_STATUS: u16 = 0xE4B8;
    /// Forced recalibration against a reference concentration.
    pub const PERFORM_FORCED_RECALIBRATION: u16 = 0x362F;
    /// Enable/disable automatic self-calibration.
    pub const SET_AUTOMATIC_SELF_CALIBRATION: u16 = 0x2416;
    /// Temperature offset compensation.
    pub const SET_TEMPERATURE_OFFSET: u16 = 0x241D;
    /// 48-bit serial number.
    pub const GET_SERIAL_NUMBER: u16 = 0x3682;
    /// Reload settings from EEPROM.
    pub const REINIT: u16 = 0x3646;
}

const CRC8_POLYNOMIAL: u8 = 0x31;
const CRC8_INIT: u8 = 0xFF;

/// Response word the sensor returns when forced recalibration fails.
const FRC_FAILED: u16 = 0xFFFF;

/// Largest temperature offset the sensor accepts, in °C.
const MAX_TEMPERATURE_OFFSET_C: f32 = 20.0;

/// Errors from the SCD4x driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError<E> {
    /// Underlying I2C bus error.
    I2c(E),
    /// A response word failed its CRC check.
    Crc,
    /// The sensor rejected a forced recalibration.
    CalibrationFailed,
}

impl<E: fmt::Debug> fmt::Display for SensorError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::I2c(e) => write!(f, "I2C error: {:?}", e),
            SensorError::Crc => write!(f, "CRC mismatch in sensor response"),
            SensorError::CalibrationFailed => write!(f, "forced recalibration failed"),
        }
    }
}

/// Sensirion CRC-8 (polynomial 0x31, init 0xFF, no reflection).
///
/// # Examples
///
/// ```
/// // Datasheet example
/// assert_eq!(rs_airmon::scd4x::crc8(&[0xBE, 0xEF]), 0x92);
/// ```
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = CRC8_INIT;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ CRC8_POLYNOMIAL;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Convert a raw temperature word to °C.
#[inline]
pub fn temperature_from_raw(raw: u16) -> f32 {
    -45.0 + 175.0 * raw as f32 / 65536.0
}

/// Convert a raw humidity word to %RH.
#[inline]
pub fn humidity_from_raw(raw: u16) -> f32 {
    100.0 * raw as f32 / 65536.0
}

/// SCD4x driver.
pub struct Scd4x<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
}

impl<I2C, D> Scd4x<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    /// Create a driver at the default address.
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: SCD4X_I2C_ADDRESS,
        }
    }

    /// Give back the bus and delay.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    /// Read the 48-bit serial number (idle only).
    pub fn serial_number(&mut self) -> Result<u64, SensorError<I2C::Error>> {
        self.send(cmd::GET_SERIAL_NUMBER, None, 1)?;
        let mut words = [0u16; 3];
        self.read_response(&mut words)?;
        Ok(words
            .iter()
            .fold(0u64, |acc, &w| (acc << 16) | u64::from(w)))
    }

    /// Reload user settings from EEPROM (idle only).
    pub fn reinit(&mut self) -> Result<(), SensorError<I2C::Error>> {
        self.send(cmd::REINIT, None, 30)
    }

    /// Write a command, optionally with one argument word, then wait for
    /// the command's execution time.
    fn send(
        &mut self,
        command: u16,
        arg: Option<u16>,
        exec_ms: u32,
    ) -> Result<(), SensorError<I2C::Error>> {
        let [c_hi, c_lo] = command.to_be_bytes();
        match arg {
            Some(value) => {
                let [a_hi, a_lo] = value.to_be_bytes();
                let crc = crc8(&[a_hi, a_lo]);
                self.i2c
                    .write(self.address, &[c_hi, c_lo, a_hi, a_lo, crc])
                    .map_err(SensorError::I2c)?;
            }
            None => {
                self.i2c
                    .write(self.address, &[c_hi, c_lo])
                    .map_err(SensorError::I2c)?;
            }
        }
        if exec_ms > 0 {
            self.delay.delay_ms(exec_ms);
        }
        Ok(())
    }

    /// Read up to three CRC-protected words.
    fn read_response(&mut self, words: &mut [u16]) -> Result<(), SensorError<I2C::Error>> {
        let mut buf = [0u8; 9];
        let len = words.len() * 3;
        let buf = &mut buf[..len];
        self.i2c.read(self.address, buf).map_err(SensorError::I2c)?;
        decode_words(buf, words).map_err(|_| SensorError::Crc)
    }
}

/// Split a response into words, checking each CRC.
fn decode_words(buf: &[u8], words: &mut [u16]) -> Result<(), ()> {
    for (chunk, word) in buf.chunks_exact(3).zip(words.iter_mut()) {
        if crc8(&chunk[..2]) != chunk[2] {
            return Err(());
        }
        *word = u16::from_be_bytes([chunk[0], chunk[1]]);
    }
    Ok(())
}

impl<I2C, D> Co2Sensor for Scd4x<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    type Error = SensorError<I2C::Error>;

    fn start_periodic_measurement(&mut self) -> Result<(), Self::Error> {
        self.send(cmd::START_PERIODIC_MEASUREMENT, None, 0)
    }

    fn stop_periodic_measurement(&mut self) -> Result<(), Self::Error> {
        self.send(cmd::STOP_PERIODIC_MEASUREMENT, None, 500)
    }

    fn data_ready(&mut self) -> Result<bool, Self::Error> {
        self.send(cmd::GET_DATA_READY_STATUS, None, 1)?;
        let mut word = [0u16; 1];
        self.read_response(&mut word)?;
        Ok(word[0] & 0x07FF != 0)
    }

    fn read_measurement(&mut self) -> Result<Measurement, Self::Error> {
        self.send(cmd::READ_MEASUREMENT, None, 1)?;
        let mut words = [0u16; 3];
        self.read_response(&mut words)?;
        Ok(Measurement::new(
            words[0],
            temperature_from_raw(words[1]),
            humidity_from_raw(words[2]),
        ))
    }

    fn perform_forced_recalibration(&mut self, target_ppm: u16) -> Result<i16, Self::Error> {
        self.send(cmd::PERFORM_FORCED_RECALIBRATION, Some(target_ppm), 400)?;
        let mut word = [0u16; 1];
        self.read_response(&mut word)?;
        if word[0] == FRC_FAILED {
            return Err(SensorError::CalibrationFailed);
        }
        Ok((i32::from(word[0]) - 0x8000) as i16)
    }

    fn set_automatic_self_calibration(&mut self, enabled: bool) -> Result<(), Self::Error> {
        self.send(cmd::SET_AUTOMATIC_SELF_CALIBRATION, Some(enabled as u16), 1)
    }

    fn set_temperature_offset(&mut self, offset_c: f32) -> Result<(), Self::Error> {
        let offset = offset_c.clamp(0.0, MAX_TEMPERATURE_OFFSET_C);
        let word = (offset * 65536.0 / 175.0) as u16;
        self.send(cmd::SET_TEMPERATURE_OFFSET, Some(word), 1)
    }
}
