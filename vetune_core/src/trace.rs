//! Bilinear cell tracing: which grid cells an operating point touches, and how much.

use vetune_traits::OperatingPoint;

use crate::axis::locate;
use crate::preset::EngineConfig;

/// Corners at or below this weight are left out of a trace.
pub const CORNER_WEIGHT_MIN: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveCell {
    pub rpm_idx: usize,
    pub map_idx: usize,
    /// Bilinear weight in `[0, 1]`.
    pub weight: f64,
}

/// Where an operating point falls on the grid.
///
/// `(rpm_idx, map_idx)` is the floor cell and the fractions give the position
/// inside it. Weights in `active_cells` are not renormalized after dropping
/// out-of-range or negligible corners, so near the grid edges they sum to
/// less than 1.
#[derive(Debug, Clone, PartialEq)]
pub struct CellTrace {
    pub rpm_idx: usize,
    pub map_idx: usize,
    pub rpm_frac: f64,
    pub map_frac: f64,
    pub active_cells: Vec<ActiveCell>,
}

impl CellTrace {
    pub fn total_weight(&self) -> f64 {
        self.active_cells.iter().map(|c| c.weight).sum()
    }
}

/// Trace with the standard corner threshold.
pub fn trace(cfg: &EngineConfig, point: &OperatingPoint) -> CellTrace {
    trace_with(cfg, point, CORNER_WEIGHT_MIN)
}

pub fn trace_with(cfg: &EngineConfig, point: &OperatingPoint, corner_min: f64) -> CellTrace {
    let (rpm_idx, rpm_frac) = locate(&cfg.rpm_axis, point.rpm);
    let (map_idx, map_frac) = locate(&cfg.map_axis, point.map_kpa);
    let rpm_last = cfg.rpm_axis.last_index();
    let map_last = cfg.map_axis.last_index();

    let corners = [
        (0, 0, (1.0 - rpm_frac) * (1.0 - map_frac)),
        (0, 1, (1.0 - rpm_frac) * map_frac),
        (1, 0, rpm_frac * (1.0 - map_frac)),
        (1, 1, rpm_frac * map_frac),
    ];

    let mut active_cells = Vec::with_capacity(4);
    for (dr, dm, weight) in corners {
        let (r, m) = (rpm_idx + dr, map_idx + dm);
        if weight > corner_min && r <= rpm_last && m <= map_last {
            active_cells.push(ActiveCell {
                rpm_idx: r,
                map_idx: m,
                weight,
            });
        }
    }

    CellTrace {
        rpm_idx,
        map_idx,
        rpm_frac,
        map_frac,
        active_cells,
    }
}
