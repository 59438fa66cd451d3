//! Ratio model: measured mean AFR over target AFR, clamped to a safety band.
//!
//! A ratio above 1 means the cell ran lean of target and needs more fuel;
//! below 1 means rich. The band is fixed regardless of how far off a cell is.

use crate::accumulator::AccumulatorStore;
use crate::preset::EngineConfig;
use crate::target::AfrTargetTable;

pub const CORRECTION_MIN: f64 = 0.85;
pub const CORRECTION_MAX: f64 = 1.15;

/// Effective samples a cell needs before its correction moves.
pub const MIN_EFFECTIVE_SAMPLES: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionEngine {
    min_effective_samples: f64,
}

impl Default for CorrectionEngine {
    fn default() -> Self {
        Self {
            min_effective_samples: MIN_EFFECTIVE_SAMPLES,
        }
    }
}

impl CorrectionEngine {
    pub fn new(min_effective_samples: f64) -> Self {
        Self {
            min_effective_samples,
        }
    }

    pub fn min_effective_samples(&self) -> f64 {
        self.min_effective_samples
    }

    /// Refresh the correction of every cell with enough effective samples.
    ///
    /// Cells below the threshold keep whatever correction they had. Returns
    /// the number of cells written.
    pub fn recompute(
        &self,
        store: &mut AccumulatorStore,
        targets: &AfrTargetTable,
        cfg: &EngineConfig,
    ) -> usize {
        let map_bins = cfg.map_axis.as_slice();
        let cols = store.dims().1;
        let mut updated = 0;
        for (i, cell) in store.cells_mut().as_mut_slice().iter_mut().enumerate() {
            if cell.afr_weight_sum < self.min_effective_samples {
                continue;
            }
            let Some(&map_kpa) = map_bins.get(i % cols) else {
                continue;
            };
            let mean_afr = cell.afr_weighted_sum / cell.afr_weight_sum;
            let target_afr = targets.resolve(map_kpa);
            let ratio = mean_afr / target_afr;
            if !ratio.is_finite() {
                tracing::warn!(
                    rpm_idx = i / cols,
                    map_idx = i % cols,
                    mean_afr,
                    target_afr,
                    "skipping non-finite correction"
                );
                continue;
            }
            cell.correction = clamp_correction(ratio);
            updated += 1;
        }
        updated
    }
}

#[inline]
pub fn clamp_correction(ratio: f64) -> f64 {
    ratio.clamp(CORRECTION_MIN, CORRECTION_MAX)
}
