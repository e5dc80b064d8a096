//! Display abstraction for the air-quality dashboard.
//!
//! This module defines the [`DashboardDisplay`] trait for presenting
//! [`DashboardState`] on e-paper, OLED or LCD panels. Panels that expose an
//! `embedded-graphics` draw target can implement it in a few lines with
//! [`crate::dashboard::render_dashboard`].

use crate::dashboard::DashboardState;

/// Display trait for rendering the dashboard.
///
/// # Example
///
/// ```ignore
/// use rs_airmon::traits::DashboardDisplay;
/// use rs_airmon::DashboardState;
///
/// struct MyPanel { /* ... */ }
///
/// impl DashboardDisplay for MyPanel {
///     type Error = ();
///
///     fn init(&mut self) -> Result<(), ()> { Ok(()) }
///     fn clear(&mut self) -> Result<(), ()> { Ok(()) }
///     fn render(&mut self, state: &DashboardState) -> Result<(), ()> {
///         // Draw CO2, temperature, humidity, link status...
///         Ok(())
///     }
///     fn show_message(&mut self, line1: &str, line2: Option<&str>) -> Result<(), ()> {
///         Ok(())
///     }
/// }
/// ```
pub trait DashboardDisplay {
    /// Error type for display operations.
    type Error;

    /// Initializes the display hardware.
    ///
    /// Called once at startup.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Clears the display.
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Renders the dashboard.
    ///
    /// E-paper panels are slow to refresh; callers should only invoke this
    /// when [`DashboardState`] has changed.
    fn render(&mut self, state: &DashboardState) -> Result<(), Self::Error>;

    /// Shows a simple message (e.g., for startup or errors).
    ///
    /// # Arguments
    ///
    /// * `line1` - First line of text
    /// * `line2` - Optional second line of text
    fn show_message(&mut self, line1: &str, line2: Option<&str>) -> Result<(), Self::Error>;
}
