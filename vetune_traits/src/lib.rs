//! Seams shared by telemetry producers and the VE engine.
//!
//! Kept dependency-free so a poller, a log replayer, or a test script can
//! feed the engine without pulling in the engine itself.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// One engine operating point as reported by the ECU / wideband.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OperatingPoint {
    pub rpm: f64,
    /// Manifold absolute pressure in kPa.
    pub map_kpa: f64,
    /// Measured air-fuel ratio (mass air / mass fuel).
    pub afr: f64,
}

impl OperatingPoint {
    pub const fn new(rpm: f64, map_kpa: f64, afr: f64) -> Self {
        Self { rpm, map_kpa, afr }
    }
}

/// A telemetry sample plus the caller-owned live gate.
///
/// When `live` is false the engine must not mutate any state for this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub point: OperatingPoint,
    pub live: bool,
}

impl Tick {
    pub const fn live(point: OperatingPoint) -> Self {
        Self { point, live: true }
    }

    pub const fn paused(point: OperatingPoint) -> Self {
        Self { point, live: false }
    }
}

/// A source of telemetry ticks.
///
/// - `Ok(Some(tick))`: a fresh sample.
/// - `Ok(None)`: the stream has ended (log exhausted, poller closed).
/// - `Err(_)`: a transient read failure; callers may retry.
pub trait Telemetry {
    fn read(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Option<Tick>, Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Telemetry + ?Sized> Telemetry for Box<T> {
    fn read(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Option<Tick>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read(timeout)
    }
}
