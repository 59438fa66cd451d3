//! Per-cell running AFR statistics.

use crate::config::TuningCfg;
use crate::grid::Grid;
use crate::trace::CellTrace;

/// Default correction for a cell without enough samples.
pub const NEUTRAL_CORRECTION: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// Significant samples seen, independent of their weight.
    pub hit_count: u32,
    pub afr_weighted_sum: f64,
    /// Sum of weights; the effective sample count.
    pub afr_weight_sum: f64,
    pub correction: f64,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            hit_count: 0,
            afr_weighted_sum: 0.0,
            afr_weight_sum: 0.0,
            correction: NEUTRAL_CORRECTION,
        }
    }
}

impl Cell {
    /// Weighted mean AFR, or `None` before the first accepted sample.
    pub fn mean_afr(&self) -> Option<f64> {
        (self.afr_weight_sum > 0.0).then(|| self.afr_weighted_sum / self.afr_weight_sum)
    }
}

/// Weighted AFR sums and hit counts for every cell of the active grid.
#[derive(Debug, Clone)]
pub struct AccumulatorStore {
    cells: Grid<Cell>,
    afr_min: f64,
    afr_max: f64,
    significance_weight: f64,
}

impl AccumulatorStore {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::with_tuning(rows, cols, &TuningCfg::default())
    }

    pub fn with_tuning(rows: usize, cols: usize, tuning: &TuningCfg) -> Self {
        Self {
            cells: Grid::filled(rows, cols, Cell::default()),
            afr_min: tuning.afr_min,
            afr_max: tuning.afr_max,
            significance_weight: tuning.significance_weight,
        }
    }

    /// Fold one AFR sample into the traced cells.
    ///
    /// Returns false (and changes nothing) when `afr` is outside the open
    /// accepted interval. Cells whose weight is not above the significance
    /// threshold are skipped.
    pub fn update(&mut self, trace: &CellTrace, afr: f64) -> bool {
        if !(afr > self.afr_min && afr < self.afr_max) {
            return false;
        }
        for ac in &trace.active_cells {
            if ac.weight <= self.significance_weight {
                continue;
            }
            if let Some(cell) = self.cells.get_mut(ac.rpm_idx, ac.map_idx) {
                cell.hit_count = cell.hit_count.saturating_add(1);
                cell.afr_weighted_sum += afr * ac.weight;
                cell.afr_weight_sum += ac.weight;
            }
        }
        true
    }

    /// Drop all accumulated state. The grid is replaced wholesale, never
    /// cleared cell by cell.
    pub fn reset(&mut self) {
        let (rows, cols) = self.cells.dims();
        self.resize(rows, cols);
    }

    /// Reset onto a grid of new dimensions (used on preset change).
    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.cells = Grid::filled(rows, cols, Cell::default());
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        self.cells.dims()
    }

    #[inline]
    pub fn cell(&self, rpm_idx: usize, map_idx: usize) -> Option<&Cell> {
        self.cells.get(rpm_idx, map_idx)
    }

    pub fn mean_afr(&self, rpm_idx: usize, map_idx: usize) -> Option<f64> {
        self.cell(rpm_idx, map_idx).and_then(Cell::mean_afr)
    }

    pub fn cells(&self) -> &Grid<Cell> {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut Grid<Cell> {
        &mut self.cells
    }

    pub fn hit_grid(&self) -> Grid<u32> {
        self.cells.map(|c| c.hit_count)
    }

    pub fn correction_grid(&self) -> Grid<f64> {
        self.cells.map(|c| c.correction)
    }

    pub fn total_hits(&self) -> u64 {
        self.cells.iter().map(|c| u64::from(c.hit_count)).sum()
    }
}
