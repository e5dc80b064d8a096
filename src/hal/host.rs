//! Desktop implementations backed by the standard library.
//!
//! Used by the desktop demo, where the network is already up and time comes
//! from the OS.

use std::thread;
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;

use crate::traits::{Clock, WifiLink};

/// Monotonic clock counting from construction.
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    start: Instant,
}

impl StdClock {
    /// Creates a clock reading 0 ms now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Delay that sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// WiFi stand-in for hosts whose network is managed by the OS.
///
/// Always reports connected; `connect` and `disconnect` only flip the flag
/// so the reconnect path can be exercised by hand.
#[derive(Debug)]
pub struct HostWifi {
    connected: bool,
}

impl HostWifi {
    /// Creates a connected link.
    pub fn new() -> Self {
        Self { connected: true }
    }
}

impl Default for HostWifi {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiLink for HostWifi {
    type Error = core::convert::Infallible;

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn connect(&mut self) -> Result<(), Self::Error> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.connected = false;
        Ok(())
    }
}
