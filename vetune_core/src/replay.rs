//! In-memory telemetry replay.

use std::collections::VecDeque;
use std::time::Duration;
use vetune_config::TelemetryRow;
use vetune_traits::{Telemetry, Tick};

/// Plays back a fixed sequence of ticks, then reports end of stream.
#[derive(Debug, Clone, Default)]
pub struct ReplayTelemetry {
    ticks: VecDeque<Tick>,
}

impl ReplayTelemetry {
    pub fn new(ticks: impl IntoIterator<Item = Tick>) -> Self {
        Self {
            ticks: ticks.into_iter().collect(),
        }
    }

    pub fn from_rows(rows: &[TelemetryRow]) -> Self {
        Self::new(rows.iter().map(crate::conversions::tick_from_row))
    }
}

impl Telemetry for ReplayTelemetry {
    fn read(
        &mut self,
        _timeout: Duration,
    ) -> Result<Option<Tick>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.ticks.pop_front())
    }
}
