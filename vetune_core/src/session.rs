//! A live tuning session: the active preset, accumulated statistics, and the
//! per-tick pipeline (trace -> accumulate -> recompute).

use vetune_traits::Tick;

use crate::accumulator::AccumulatorStore;
use crate::config::TuningCfg;
use crate::correction::CorrectionEngine;
use crate::error::{BuildError, RejectReason, Result};
use crate::grid::Grid;
use crate::preset::{EngineConfig, EnginePreset};
use crate::status::TickStatus;
use crate::target::AfrTargetTable;
use crate::trace::{CellTrace, trace_with};

/// Running tallies of how ticks were handled since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub ticks: u64,
    pub idle: u64,
    pub traced_only: u64,
    pub rejected: u64,
    pub accumulated: u64,
}

/// Owned copy of everything a renderer needs. Taking one never blocks or
/// aliases the live grid.
#[derive(Debug, Clone, PartialEq)]
pub struct VeSnapshot {
    pub preset: String,
    pub rpm_bins: Vec<f64>,
    pub map_bins: Vec<f64>,
    pub correction: Grid<f64>,
    pub hits: Grid<u32>,
    pub active_trace: Option<CellTrace>,
    pub total_hits: u64,
    pub stats: SessionStats,
}

pub struct VeSession {
    engine: EngineConfig,
    targets: AfrTargetTable,
    tuning: TuningCfg,
    corrections: CorrectionEngine,
    store: AccumulatorStore,
    active_trace: Option<CellTrace>,
    stats: SessionStats,
}

impl core::fmt::Debug for VeSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VeSession")
            .field("preset", &self.engine.name)
            .field("dims", &self.store.dims())
            .field("total_hits", &self.store.total_hits())
            .field("stats", &self.stats)
            .finish()
    }
}

impl VeSession {
    pub fn builder() -> VeSessionBuilder {
        VeSessionBuilder::default()
    }

    /// Session on a preset with default tuning and an empty target table.
    pub fn new(preset: EnginePreset) -> Self {
        Self::from_parts(
            EngineConfig::from_preset(preset),
            AfrTargetTable::default(),
            TuningCfg::default(),
        )
    }

    fn from_parts(engine: EngineConfig, targets: AfrTargetTable, tuning: TuningCfg) -> Self {
        let (rows, cols) = engine.dims();
        Self {
            store: AccumulatorStore::with_tuning(rows, cols, &tuning),
            corrections: CorrectionEngine::new(tuning.min_effective_samples),
            engine,
            targets,
            tuning,
            active_trace: None,
            stats: SessionStats::default(),
        }
    }

    /// Feed one telemetry tick through the pipeline.
    pub fn tick(&mut self, tick: &Tick) -> TickStatus {
        self.stats.ticks += 1;
        let p = &tick.point;

        // A non-finite RPM or MAP has no place on the grid.
        if !tick.live
            || !p.rpm.is_finite()
            || !p.map_kpa.is_finite()
            || p.rpm < self.tuning.live_rpm_floor
        {
            self.active_trace = None;
            self.stats.idle += 1;
            return TickStatus::Idle;
        }

        let trace = trace_with(&self.engine, p, self.tuning.corner_weight_min);

        let status = if p.rpm < self.tuning.accumulate_rpm_floor {
            self.stats.traced_only += 1;
            TickStatus::Traced
        } else if !self.store.update(&trace, p.afr) {
            self.stats.rejected += 1;
            TickStatus::Rejected(RejectReason::AfrOutOfRange)
        } else {
            self.stats.accumulated += 1;
            let cells_updated =
                self.corrections
                    .recompute(&mut self.store, &self.targets, &self.engine);
            TickStatus::Accumulated { cells_updated }
        };

        tracing::debug!(
            rpm = p.rpm,
            map_kpa = p.map_kpa,
            afr = p.afr,
            rpm_idx = trace.rpm_idx,
            map_idx = trace.map_idx,
            ?status,
            "tick"
        );
        self.active_trace = Some(trace);
        status
    }

    /// Switch engine geometry. Always resets, even when re-selecting the
    /// current preset; indices from the old grid mean nothing on the new one.
    pub fn select_engine(&mut self, engine: EngineConfig) {
        let (rows, cols) = engine.dims();
        tracing::info!(
            from = %self.engine.name,
            to = %engine.name,
            rows,
            cols,
            "engine preset selected"
        );
        self.engine = engine;
        self.store.resize(rows, cols);
        self.active_trace = None;
        self.stats = SessionStats::default();
    }

    pub fn select_preset(&mut self, preset: EnginePreset) {
        self.select_engine(EngineConfig::from_preset(preset));
    }

    /// Clear all accumulated state on the current grid.
    pub fn reset(&mut self) {
        tracing::info!(preset = %self.engine.name, hits = self.store.total_hits(), "session reset");
        self.store.reset();
        self.active_trace = None;
        self.stats = SessionStats::default();
    }

    /// Replace the target table. Accumulated samples are kept; corrections
    /// pick up the new targets on the next accumulating tick.
    pub fn set_targets(&mut self, targets: AfrTargetTable) {
        self.targets = targets;
    }

    /// Recompute corrections now, e.g. right after `set_targets`.
    pub fn recompute(&mut self) -> usize {
        self.corrections
            .recompute(&mut self.store, &self.targets, &self.engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.engine
    }

    pub fn targets(&self) -> &AfrTargetTable {
        &self.targets
    }

    pub fn tuning(&self) -> &TuningCfg {
        &self.tuning
    }

    pub fn store(&self) -> &AccumulatorStore {
        &self.store
    }

    pub fn active_trace(&self) -> Option<&CellTrace> {
        self.active_trace.as_ref()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn correction_grid(&self) -> Grid<f64> {
        self.store.correction_grid()
    }

    pub fn hit_grid(&self) -> Grid<u32> {
        self.store.hit_grid()
    }

    pub fn total_hits(&self) -> u64 {
        self.store.total_hits()
    }

    pub fn snapshot(&self) -> VeSnapshot {
        VeSnapshot {
            preset: self.engine.name.clone(),
            rpm_bins: self.engine.rpm_axis.as_slice().to_vec(),
            map_bins: self.engine.map_axis.as_slice().to_vec(),
            correction: self.store.correction_grid(),
            hits: self.store.hit_grid(),
            active_trace: self.active_trace.clone(),
            total_hits: self.store.total_hits(),
            stats: self.stats,
        }
    }
}

/// Builder for `VeSession`; the engine config is the only required piece.
#[derive(Default)]
pub struct VeSessionBuilder {
    engine: Option<EngineConfig>,
    targets: Option<AfrTargetTable>,
    tuning: Option<TuningCfg>,
}

impl VeSessionBuilder {
    pub fn with_config(mut self, engine: EngineConfig) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_preset(self, preset: EnginePreset) -> Self {
        self.with_config(EngineConfig::from_preset(preset))
    }

    pub fn with_targets(mut self, targets: AfrTargetTable) -> Self {
        self.targets = Some(targets);
        self
    }

    pub fn with_tuning(mut self, tuning: TuningCfg) -> Self {
        self.tuning = Some(tuning);
        self
    }

    pub fn build(self) -> Result<VeSession> {
        let engine = self
            .engine
            .ok_or_else(|| eyre::Report::new(BuildError::MissingEngine))?;
        let tuning = self.tuning.unwrap_or_default();
        validate_tuning(&tuning)?;
        Ok(VeSession::from_parts(
            engine,
            self.targets.unwrap_or_default(),
            tuning,
        ))
    }
}

fn validate_tuning(t: &TuningCfg) -> Result<()> {
    let bad = |msg: &'static str| -> Result<()> {
        Err(eyre::Report::new(BuildError::InvalidConfig(msg)))
    };
    if !(t.live_rpm_floor.is_finite() && t.live_rpm_floor >= 0.0) {
        return bad("live_rpm_floor must be >= 0");
    }
    if !(t.accumulate_rpm_floor.is_finite() && t.accumulate_rpm_floor >= t.live_rpm_floor) {
        return bad("accumulate_rpm_floor must be >= live_rpm_floor");
    }
    if !(t.afr_min.is_finite() && t.afr_max.is_finite() && t.afr_min < t.afr_max) {
        return bad("afr_min must be below afr_max");
    }
    if !(0.0..1.0).contains(&t.corner_weight_min) || !(0.0..1.0).contains(&t.significance_weight)
    {
        return bad("weight thresholds must be in [0, 1)");
    }
    if !(t.min_effective_samples.is_finite() && t.min_effective_samples > 0.0) {
        return bad("min_effective_samples must be > 0");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vetune_traits::OperatingPoint;

    #[test]
    fn builder_requires_engine() {
        let err = VeSession::builder().build().expect_err("no engine");
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::MissingEngine)
        ));
    }

    #[test]
    fn builder_rejects_inverted_floors() {
        let tuning = TuningCfg {
            live_rpm_floor: 900.0,
            accumulate_rpm_floor: 800.0,
            ..TuningCfg::default()
        };
        let err = VeSession::builder()
            .with_preset(EnginePreset::Custom)
            .with_tuning(tuning)
            .build()
            .expect_err("inverted floors");
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rpm_between_floors_traces_without_accumulating() {
        let mut s = VeSession::new(EnginePreset::Custom);
        let st = s.tick(&Tick::live(OperatingPoint::new(650.0, 30.0, 13.0)));
        assert_eq!(st, TickStatus::Traced);
        assert!(s.active_trace().is_some());
        assert_eq!(s.total_hits(), 0);
    }

    #[test]
    fn nan_rpm_is_idle() {
        let mut s = VeSession::new(EnginePreset::Custom);
        let st = s.tick(&Tick::live(OperatingPoint::new(f64::NAN, 30.0, 13.0)));
        assert_eq!(st, TickStatus::Idle);
    }

    #[test]
    fn rejected_afr_still_shows_trace() {
        let mut s = VeSession::new(EnginePreset::Custom);
        let st = s.tick(&Tick::live(OperatingPoint::new(3000.0, 50.0, 25.0)));
        assert_eq!(st, TickStatus::Rejected(RejectReason::AfrOutOfRange));
        assert!(s.active_trace().is_some());
        assert_eq!(s.stats().rejected, 1);
    }
}
