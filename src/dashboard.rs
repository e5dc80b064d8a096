//! Dashboard model and `embedded-graphics` rendering.
//!
//! [`DashboardState`] collects everything the screen shows. It is built once
//! per loop iteration from the monitor and connectivity snapshots, and the
//! panel is only redrawn when it changes (e-paper refreshes are slow).
//!
//! # Layout
//!
//! ```text
//! ┌──────────────────────────┐
//! │ CO2 Monitor              │  title
//! │ CO2 612 ppm              │
//! │ [██████░░░░░░░░░░░░░░░]  │  gauge, 0..2000 ppm
//! │ Temp 22.4 C              │
//! │ Hum 41.0 %               │
//! │ Good                     │  air-quality band
//! │ WiFi OK  MQTT OK         │
//! │ Calibrating in 12 s      │  status (optional)
//! └──────────────────────────┘
//! ```
//!
//! Panels 128 px wide or less get a compact five-line layout without title
//! or gauge.

use core::fmt::{self, Write};

use embedded_graphics::{
    geometry::{Point, Size},
    mono_font::{
        ascii::{FONT_10X20, FONT_6X10, FONT_9X15},
        MonoFont, MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use heapless::{String as HString, Vec as HVec};

use crate::config::{truncated, ShortString};
use crate::connectivity::ConnectivityStatus;
use crate::measurement::{AirQuality, Measurement};
use crate::monitor::{CalibrationStatus, MonitorState};

/// CO2 level at which the gauge is full.
pub const GAUGE_MAX_PPM: u16 = 2_000;

/// Maximum characters per dashboard line.
pub const MAX_LINE: usize = 32;

/// One line of dashboard text.
pub type Line = HString<MAX_LINE>;

/// Dashboard text, top to bottom.
pub type Lines = HVec<Line, 8>;

/// Everything the dashboard shows.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct DashboardState {
    /// Latest accepted sample.
    pub reading: Option<Measurement>,
    /// Band of the latest sample.
    pub air_quality: Option<AirQuality>,
    /// WiFi link flag.
    pub wifi_connected: bool,
    /// MQTT session flag.
    pub mqtt_connected: bool,
    /// Calibration progress. A countdown is held in whole displayed
    /// seconds so that the state only changes when its text does.
    pub calibration: CalibrationStatus,
    /// Latest sample is older than the staleness window.
    pub stale: bool,
    /// Consecutive sensor failures.
    pub sensor_errors: u32,
    /// Title line.
    pub device_name: ShortString,
}

impl DashboardState {
    /// Combine monitor and link snapshots.
    ///
    /// Offline builds pass `ConnectivityStatus::default()`.
    pub fn new(monitor: &MonitorState, links: &ConnectivityStatus, device_name: &str) -> Self {
        Self {
            reading: monitor.reading.map(|r| r.measurement),
            air_quality: monitor.air_quality,
            wifi_connected: links.wifi_connected,
            mqtt_connected: links.mqtt_connected,
            calibration: displayed_calibration(monitor.calibration),
            stale: monitor.stale,
            sensor_errors: monitor.consecutive_errors,
            device_name: truncated(device_name),
        }
    }

    /// Full layout text.
    pub fn lines(&self) -> Lines {
        let mut lines = Lines::new();
        let _ = lines.push(truncated(&self.device_name));
        self.push_co2(&mut lines);
        match self.reading {
            Some(m) => {
                push_line(&mut lines, format_args!("Temp {:.1} C", m.temperature_c));
                push_line(&mut lines, format_args!("Hum {:.1} %", m.humidity_pct));
            }
            None => {
                push_line(&mut lines, format_args!("Temp --.- C"));
                push_line(&mut lines, format_args!("Hum --.- %"));
            }
        }
        self.push_quality(&mut lines);
        self.push_links(&mut lines);
        self.push_status(&mut lines);
        lines
    }

    /// Compact layout text for small panels.
    pub fn compact_lines(&self) -> Lines {
        let mut lines = Lines::new();
        self.push_co2(&mut lines);
        match self.reading {
            Some(m) => push_line(
                &mut lines,
                format_args!("{:.1}C  {:.1}%", m.temperature_c, m.humidity_pct),
            ),
            None => push_line(&mut lines, format_args!("--.-C  --.-%")),
        }
        self.push_quality(&mut lines);
        self.push_links(&mut lines);
        self.push_status(&mut lines);
        lines
    }

    fn push_co2(&self, lines: &mut Lines) {
        match self.reading {
            Some(m) => push_line(lines, format_args!("CO2 {} ppm", m.co2_ppm)),
            None => push_line(lines, format_args!("CO2 --- ppm")),
        }
    }

    fn push_quality(&self, lines: &mut Lines) {
        match self.air_quality {
            Some(q) if q.needs_ventilation() => {
                push_line(lines, format_args!("{} - ventilate", q.label()))
            }
            Some(q) => push_line(lines, format_args!("{}", q.label())),
            None => push_line(lines, format_args!("Warming up")),
        }
    }

    fn push_links(&self, lines: &mut Lines) {
        push_line(
            lines,
            format_args!(
                "WiFi {}  MQTT {}",
                link_label(self.wifi_connected),
                link_label(self.mqtt_connected)
            ),
        );
    }

    fn push_status(&self, lines: &mut Lines) {
        match self.calibration {
            CalibrationStatus::CountingDown { .. } => {
                let secs = self.calibration.remaining_secs().unwrap_or(0);
                push_line(lines, format_args!("Calibrating in {} s", secs));
            }
            CalibrationStatus::Completed { correction_ppm } => {
                push_line(lines, format_args!("Calibrated {:+} ppm", correction_ppm));
            }
            CalibrationStatus::Failed => push_line(lines, format_args!("Calibration failed")),
            CalibrationStatus::Idle if self.stale => {
                push_line(lines, format_args!("Stale reading"))
            }
            CalibrationStatus::Idle if self.sensor_errors > 0 => {
                push_line(lines, format_args!("Sensor errors: {}", self.sensor_errors))
            }
            CalibrationStatus::Idle => {}
        }
    }
}

fn displayed_calibration(status: CalibrationStatus) -> CalibrationStatus {
    match status.remaining_secs() {
        Some(secs) => CalibrationStatus::CountingDown {
            remaining_ms: secs.saturating_mul(1_000),
        },
        None => status,
    }
}

fn link_label(up: bool) -> &'static str {
    if up {
        "OK"
    } else {
        "--"
    }
}

fn push_line(lines: &mut Lines, args: fmt::Arguments<'_>) {
    let mut line = Line::new();
    // Formatted pieces that overflow the line are dropped
    let _ = line.write_fmt(args);
    let _ = lines.push(line);
}

// ============================================================================
// Rendering
// ============================================================================

/// Font and spacing chosen for a panel size.
#[derive(Clone, Copy)]
pub struct DashboardStyle {
    /// Font for the title and CO2 line.
    pub heading_font: &'static MonoFont<'static>,
    /// Font for the remaining lines.
    pub body_font: &'static MonoFont<'static>,
    /// Margin around the content in pixels.
    pub margin: i32,
    /// Extra space between lines in pixels.
    pub line_gap: i32,
    /// Gauge height in pixels (0 = no gauge).
    pub gauge_height: u32,
    /// Use the compact line set.
    pub compact: bool,
}

impl DashboardStyle {
    /// Pick a style for a panel of `size` pixels.
    pub fn for_size(size: Size) -> Self {
        if size.width <= 128 {
            Self {
                heading_font: &FONT_6X10,
                body_font: &FONT_6X10,
                margin: 2,
                line_gap: 2,
                gauge_height: 0,
                compact: true,
            }
        } else if size.width < 400 {
            Self {
                heading_font: &FONT_10X20,
                body_font: &FONT_9X15,
                margin: 6,
                line_gap: 4,
                gauge_height: 10,
                compact: false,
            }
        } else {
            Self {
                heading_font: &FONT_10X20,
                body_font: &FONT_10X20,
                margin: 24,
                line_gap: 12,
                gauge_height: 24,
                compact: false,
            }
        }
    }
}

/// Width of the filled part of a gauge `inner_width` pixels wide.
pub fn gauge_fill_width(co2_ppm: u16, inner_width: u32) -> u32 {
    let ppm = u32::from(co2_ppm.min(GAUGE_MAX_PPM));
    inner_width * ppm / u32::from(GAUGE_MAX_PPM)
}

/// Draw the dashboard onto any monochrome draw target.
pub fn render_dashboard<D>(target: &mut D, state: &DashboardState) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let bounds = target.bounding_box();
    let style = DashboardStyle::for_size(bounds.size);
    target.clear(BinaryColor::Off)?;

    let lines = if style.compact {
        state.compact_lines()
    } else {
        state.lines()
    };
    let headings = if style.compact { 0 } else { 2 };
    let content_width = bounds
        .size
        .width
        .saturating_sub(2 * style.margin as u32);

    let mut y = bounds.top_left.y + style.margin;
    let x = bounds.top_left.x + style.margin;
    for (i, line) in lines.iter().enumerate() {
        let font = if i < headings {
            style.heading_font
        } else {
            style.body_font
        };
        Text::with_baseline(
            line,
            Point::new(x, y),
            MonoTextStyle::new(font, BinaryColor::On),
            Baseline::Top,
        )
        .draw(target)?;
        y += font.character_size.height as i32 + style.line_gap;

        // Gauge sits under the CO2 line
        if i == 1 && style.gauge_height > 0 {
            draw_gauge(target, state, Point::new(x, y), content_width, style.gauge_height)?;
            y += style.gauge_height as i32 + style.line_gap;
        }
    }
    Ok(())
}

fn draw_gauge<D>(
    target: &mut D,
    state: &DashboardState,
    origin: Point,
    width: u32,
    height: u32,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Rectangle::new(origin, Size::new(width, height))
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(target)?;

    let fill = state
        .reading
        .map(|m| gauge_fill_width(m.co2_ppm, width.saturating_sub(4)))
        .unwrap_or(0);
    if fill > 0 {
        Rectangle::new(origin + Point::new(2, 2), Size::new(fill, height.saturating_sub(4)))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(target)?;
    }
    Ok(())
}

/// Draw one or two centred lines (startup and status screens).
pub fn render_message<D>(target: &mut D, line1: &str, line2: Option<&str>) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let bounds = target.bounding_box();
    let style = DashboardStyle::for_size(bounds.size);
    target.clear(BinaryColor::Off)?;

    let text_style = TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(Baseline::Middle)
        .build();
    let center = bounds.center();
    let offset = style.heading_font.character_size.height as i32;

    let first = if line2.is_some() {
        center - Point::new(0, offset / 2 + style.line_gap)
    } else {
        center
    };
    Text::with_text_style(
        line1,
        first,
        MonoTextStyle::new(style.heading_font, BinaryColor::On),
        text_style,
    )
    .draw(target)?;

    if let Some(line2) = line2 {
        Text::with_text_style(
            line2,
            center + Point::new(0, offset / 2 + style.line_gap),
            MonoTextStyle::new(style.body_font, BinaryColor::On),
            text_style,
        )
        .draw(target)?;
    }
    Ok(())
}
