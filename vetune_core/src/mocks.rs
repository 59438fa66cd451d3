//! Test and helper mocks for vetune_core

use std::time::Duration;
use vetune_traits::{Telemetry, Tick};

/// A source that always errors on read; drives the stall watchdog in tests.
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn read(
        &mut self,
        _timeout: Duration,
    ) -> Result<Option<Tick>, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("noop telemetry")))
    }
}
