//! Sensor readings, sanity checks and air-quality bands.

use core::fmt;

/// Lowest temperature the SCD40 is specified for, in °C.
pub const MIN_TEMPERATURE_C: f32 = -10.0;

/// Highest temperature the SCD40 is specified for, in °C.
pub const MAX_TEMPERATURE_C: f32 = 60.0;

/// One CO2 / temperature / humidity sample.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Measurement {
    /// CO2 concentration in ppm.
    pub co2_ppm: u16,
    /// Temperature in degrees Celsius.
    pub temperature_c: f32,
    /// Relative humidity in percent.
    pub humidity_pct: f32,
}

/// Reason a measurement was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidMeasurement {
    /// CO2 reads 0 ppm, which the SCD40 reports until its first valid sample.
    ZeroCo2,
    /// Temperature is NaN, infinite, or outside the operating range.
    Temperature,
    /// Humidity is NaN, infinite, or outside 0..=100 %.
    Humidity,
}

impl fmt::Display for InvalidMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidMeasurement::ZeroCo2 => write!(f, "CO2 reading is zero"),
            InvalidMeasurement::Temperature => write!(f, "temperature out of range"),
            InvalidMeasurement::Humidity => write!(f, "humidity out of range"),
        }
    }
}

impl Measurement {
    /// Create a measurement from already-converted values.
    pub const fn new(co2_ppm: u16, temperature_c: f32, humidity_pct: f32) -> Self {
        Self {
            co2_ppm,
            temperature_c,
            humidity_pct,
        }
    }

    /// Check the values are plausible.
    ///
    /// # Examples
    ///
    /// ```
    /// use rs_airmon::{InvalidMeasurement, Measurement};
    ///
    /// assert!(Measurement::new(650, 21.5, 40.0).validate().is_ok());
    /// assert_eq!(
    ///     Measurement::new(0, 21.5, 40.0).validate(),
    ///     Err(InvalidMeasurement::ZeroCo2)
    /// );
    /// ```
    pub fn validate(&self) -> Result<(), InvalidMeasurement> {
        if self.co2_ppm == 0 {
            return Err(InvalidMeasurement::ZeroCo2);
        }
        let t = self.temperature_c;
        if !t.is_finite() || !(MIN_TEMPERATURE_C..=MAX_TEMPERATURE_C).contains(&t) {
            return Err(InvalidMeasurement::Temperature);
        }
        let h = self.humidity_pct;
        if !h.is_finite() || !(0.0..=100.0).contains(&h) {
            return Err(InvalidMeasurement::Humidity);
        }
        Ok(())
    }

    /// Air-quality band for this sample's CO2 level.
    #[inline]
    pub fn air_quality(&self) -> AirQuality {
        AirQuality::from_ppm(self.co2_ppm)
    }
}

/// An accepted measurement and when it was taken.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// The validated sample.
    pub measurement: Measurement,
    /// Monotonic timestamp of the sample, in milliseconds.
    pub taken_at_ms: u64,
}

impl Reading {
    /// Age of the reading at `now_ms`.
    #[inline]
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.taken_at_ms)
    }
}

/// Indoor air-quality band derived from CO2 concentration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AirQuality {
    /// Below 600 ppm: outdoor-like air.
    Excellent,
    /// 600 to 799 ppm.
    Good,
    /// 800 to 999 ppm: ventilation recommended soon.
    Fair,
    /// 1000 to 1499 ppm: ventilate.
    Poor,
    /// 1500 ppm and above.
    Bad,
}

impl AirQuality {
    /// Classify a CO2 concentration.
    ///
    /// # Examples
    ///
    /// ```
    /// use rs_airmon::AirQuality;
    ///
    /// assert_eq!(AirQuality::from_ppm(420), AirQuality::Excellent);
    /// assert_eq!(AirQuality::from_ppm(800), AirQuality::Fair);
    /// assert_eq!(AirQuality::from_ppm(2400), AirQuality::Bad);
    /// ```
    pub const fn from_ppm(ppm: u16) -> Self {
        match ppm {
            0..=599 => AirQuality::Excellent,
            600..=799 => AirQuality::Good,
            800..=999 => AirQuality::Fair,
            1000..=1499 => AirQuality::Poor,
            _ => AirQuality::Bad,
        }
    }

    /// Short label for the dashboard.
    pub const fn label(&self) -> &'static str {
        match self {
            AirQuality::Excellent => "Excellent",
            AirQuality::Good => "Good",
            AirQuality::Fair => "Fair",
            AirQuality::Poor => "Poor",
            AirQuality::Bad => "Bad",
        }
    }

    /// Whether the room should be ventilated.
    pub const fn needs_ventilation(&self) -> bool {
        matches!(self, AirQuality::Poor | AirQuality::Bad)
    }
}
