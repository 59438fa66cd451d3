//! Background telemetry polling.
//!
//! Spawns one thread that owns the `Telemetry` source and forwards every tick
//! through a bounded channel to a single consumer (the session owner). Ticks
//! are never coalesced: accumulation needs all of them, in order. The thread
//! tracks the last-ok timestamp for stall detection.
//!
//! Each `Sampler` spawns exactly one thread that exits on drop, on consumer
//! disconnect, or when the source reports end of stream.
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use vetune_traits::clock::Clock;
use vetune_traits::{Telemetry, Tick};

/// Ticks buffered between the poller and the consumer before the poller waits.
pub const CHANNEL_CAPACITY: usize = 256;

/// How long a blocked send waits before re-checking the shutdown flag.
const SEND_RETRY: Duration = Duration::from_millis(20);

/// Result of waiting on the sampler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Recv {
    Tick(Tick),
    /// Nothing arrived within the timeout.
    Empty,
    /// The poller is gone (end of stream or shutdown) and the buffer is drained.
    Closed,
}

pub struct Sampler {
    rx: xch::Receiver<Tick>,
    last_ok: Arc<AtomicU64>,
    epoch: Instant,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Sampler {
    /// Rate-paced poller: one read every `1/hz` seconds.
    pub fn spawn<T: Telemetry + Send + 'static, C: Clock + Send + Sync + 'static>(
        source: T,
        hz: u32,
        timeout: Duration,
        clock: C,
    ) -> Self {
        let period = Duration::from_micros(crate::util::period_us(hz));
        Self::spawn_inner(source, Some(period), timeout, clock)
    }

    /// Event-driven poller: the source's own `read(timeout)` blocks until a
    /// sample is ready, so no extra sleep is added.
    pub fn spawn_event<T: Telemetry + Send + 'static, C: Clock + Send + Sync + 'static>(
        source: T,
        timeout: Duration,
        clock: C,
    ) -> Self {
        Self::spawn_inner(source, None, timeout, clock)
    }

    fn spawn_inner<T: Telemetry + Send + 'static, C: Clock + Send + Sync + 'static>(
        mut source: T,
        period: Option<Duration>,
        timeout: Duration,
        clock: C,
    ) -> Self {
        let (tx, rx) = xch::bounded(CHANNEL_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let last_ok = Arc::new(AtomicU64::new(0));
        let last_ok_clone = last_ok.clone();
        let epoch = clock.now();

        let join_handle = std::thread::spawn(move || {
            'poll: loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("telemetry sampler received shutdown signal");
                    break;
                }

                match source.read(timeout) {
                    Ok(Some(tick)) => {
                        last_ok_clone.store(clock.ms_since(epoch), Ordering::Relaxed);
                        let mut pending = tick;
                        loop {
                            match tx.send_timeout(pending, SEND_RETRY) {
                                Ok(()) => break,
                                Err(xch::SendTimeoutError::Timeout(t)) => {
                                    if shutdown_clone.load(Ordering::Relaxed) {
                                        break 'poll;
                                    }
                                    pending = t;
                                }
                                Err(xch::SendTimeoutError::Disconnected(_)) => {
                                    tracing::debug!("telemetry consumer disconnected, exiting");
                                    break 'poll;
                                }
                            }
                        }
                    }
                    Ok(None) => {
                        tracing::debug!("telemetry source reached end of stream");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "telemetry read failed");
                    }
                }

                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                if let Some(p) = period {
                    clock.sleep(p);
                }
            }
            tracing::trace!("telemetry sampler thread exiting");
        });

        Self {
            rx,
            last_ok,
            epoch,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Wait up to `timeout` for the next tick.
    pub fn recv_timeout(&self, timeout: Duration) -> Recv {
        match self.rx.recv_timeout(timeout) {
            Ok(t) => Recv::Tick(t),
            Err(xch::RecvTimeoutError::Timeout) => Recv::Empty,
            Err(xch::RecvTimeoutError::Disconnected) => Recv::Closed,
        }
    }

    /// All ticks buffered right now, oldest first.
    pub fn drain(&self) -> impl Iterator<Item = Tick> + '_ {
        self.rx.try_iter()
    }

    pub fn stalled_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }

    /// Stall time using this sampler's epoch and the real monotonic clock.
    pub fn stalled_for_now(&self) -> u64 {
        let ms = Instant::now().saturating_duration_since(self.epoch).as_millis();
        self.stalled_for(u64::try_from(ms).unwrap_or(u64::MAX))
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread exits between reads, after a blocked send retries, or
        // once the in-flight read() returns (bounded by the read timeout).
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("telemetry sampler joined"),
                Err(e) => tracing::warn!(?e, "telemetry sampler panicked during shutdown"),
            }
        }
    }
}
