use crate::error::{Result as CoreResult, VeError};
use crate::sampler::{Recv, Sampler};
use crate::session::{SessionStats, VeSession};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use vetune_traits::Telemetry;
use vetune_traits::clock::MonotonicClock;

/// How telemetry reads are orchestrated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    /// Read inside the tick loop using `Telemetry::read(timeout)`.
    Direct,
    /// Poller thread relying on the source's own blocking read for pacing.
    Event,
    /// Poller thread reading at the given rate in Hz.
    Paced(u32),
}

#[derive(Debug, Clone)]
pub struct RunParams {
    pub mode: SamplingMode,
    pub read_timeout_ms: u64,
    /// Rate used for idle back-off and stall math in direct/event modes.
    pub poll_hz: u32,
    /// Checked once per loop iteration; setting it ends the run cleanly.
    pub shutdown: Arc<AtomicBool>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            mode: SamplingMode::Paced(20),
            read_timeout_ms: 200,
            poll_hz: 20,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// The source reported end of stream.
    EndOfStream,
    /// The shutdown flag was raised.
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub end: RunEnd,
    pub stats: SessionStats,
    pub elapsed_ms: u64,
}

/// Stall watchdog threshold in milliseconds.
///
/// Starts from four read timeouts so a slow sensor is not mistaken for a dead
/// one, and never drops below two poll periods so a single missed sample
/// cannot trip it.
#[inline]
pub fn stall_threshold_ms(read_timeout_ms: u64, period_ms: u64) -> u64 {
    read_timeout_ms.saturating_mul(4).max(period_ms.saturating_mul(2)).max(1)
}

#[inline]
fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Drive `session` from `source` until end of stream or shutdown.
///
/// Fails with `VeError::Telemetry` when no tick has arrived for longer than
/// [`stall_threshold_ms`].
pub fn run<T>(source: T, session: &mut VeSession, params: RunParams) -> CoreResult<RunSummary>
where
    T: Telemetry + Send + 'static,
{
    let start = Instant::now();
    tracing::info!(
        preset = %session.config().name,
        mode = ?params.mode,
        "telemetry run start"
    );
    let end = match params.mode {
        SamplingMode::Direct => run_direct(source, session, &params)?,
        SamplingMode::Event | SamplingMode::Paced(_) => run_with_sampler(source, session, &params)?,
    };
    let summary = RunSummary {
        end,
        stats: session.stats(),
        elapsed_ms: elapsed_ms(start),
    };
    tracing::info!(
        end = ?summary.end,
        ticks = summary.stats.ticks,
        accumulated = summary.stats.accumulated,
        total_hits = session.total_hits(),
        "telemetry run finished"
    );
    Ok(summary)
}

fn run_direct<T: Telemetry>(
    mut source: T,
    session: &mut VeSession,
    params: &RunParams,
) -> CoreResult<RunEnd> {
    let timeout = Duration::from_millis(params.read_timeout_ms);
    let period = Duration::from_micros(crate::util::period_us(params.poll_hz));
    let threshold =
        stall_threshold_ms(params.read_timeout_ms, crate::util::period_ms(params.poll_hz));
    let mut last_ok = Instant::now();

    loop {
        if params.shutdown.load(Ordering::Relaxed) {
            return Ok(RunEnd::Shutdown);
        }
        match source.read(timeout) {
            Ok(Some(tick)) => {
                last_ok = Instant::now();
                session.tick(&tick);
            }
            Ok(None) => return Ok(RunEnd::EndOfStream),
            Err(e) => {
                let stalled = elapsed_ms(last_ok);
                if stalled > threshold {
                    tracing::error!(error = %e, stalled_ms = stalled, "telemetry stalled");
                    return Err(VeError::Telemetry(format!(
                        "no telemetry for {stalled} ms (last error: {e})"
                    ))
                    .into());
                }
                tracing::debug!(error = %e, "telemetry read failed; retrying");
                std::thread::sleep(period);
            }
        }
    }
}

fn run_with_sampler<T>(source: T, session: &mut VeSession, params: &RunParams) -> CoreResult<RunEnd>
where
    T: Telemetry + Send + 'static,
{
    let timeout = Duration::from_millis(params.read_timeout_ms);
    let hz = match params.mode {
        SamplingMode::Paced(hz) => hz,
        _ => params.poll_hz,
    };
    let period = Duration::from_micros(crate::util::period_us(hz));
    let threshold = stall_threshold_ms(params.read_timeout_ms, crate::util::period_ms(hz));

    let sampler = match params.mode {
        SamplingMode::Paced(hz) => Sampler::spawn(source, hz, timeout, MonotonicClock::new()),
        _ => Sampler::spawn_event(source, timeout, MonotonicClock::new()),
    };

    loop {
        if params.shutdown.load(Ordering::Relaxed) {
            return Ok(RunEnd::Shutdown);
        }
        match sampler.recv_timeout(period) {
            Recv::Tick(tick) => {
                session.tick(&tick);
            }
            Recv::Closed => return Ok(RunEnd::EndOfStream),
            Recv::Empty => {
                let stalled = sampler.stalled_for_now();
                if stalled > threshold {
                    tracing::error!(stalled_ms = stalled, "telemetry stalled");
                    return Err(
                        VeError::Telemetry(format!("no telemetry for {stalled} ms")).into()
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::stall_threshold_ms;

    #[test]
    fn threshold_is_four_timeouts_when_that_dominates() {
        assert_eq!(stall_threshold_ms(150, 50), 600);
    }

    #[test]
    fn threshold_spans_two_periods_at_low_rates() {
        assert_eq!(stall_threshold_ms(10, 1000), 2000);
    }

    #[test]
    fn threshold_never_zero() {
        assert_eq!(stall_threshold_ms(0, 0), 1);
    }
}
