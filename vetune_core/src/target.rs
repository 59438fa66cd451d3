//! Target AFR lookup keyed by manifold pressure.

use crate::error::{Result, VeError};

/// Fallback target when no table has been supplied.
pub const DEFAULT_FALLBACK_AFR: f64 = 14.0;

/// Sparse `MAP (kPa) -> target AFR` table.
///
/// Points are kept in ascending MAP order. Every target is finite and
/// strictly positive, so a correction ratio against it is always finite.
#[derive(Debug, Clone, PartialEq)]
pub struct AfrTargetTable {
    points: Vec<(f64, f64)>,
    fallback_afr: f64,
}

impl Default for AfrTargetTable {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            fallback_afr: DEFAULT_FALLBACK_AFR,
        }
    }
}

impl AfrTargetTable {
    /// Validate and sort `(map_kpa, afr)` points. Duplicate MAP keys keep the
    /// last value supplied.
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Result<Self> {
        let mut out: Vec<(f64, f64)> = Vec::new();
        for (map_kpa, afr) in points {
            if !map_kpa.is_finite() || !afr.is_finite() || afr <= 0.0 {
                return Err(VeError::InvalidTarget { map_kpa, afr }.into());
            }
            match out.iter_mut().find(|(k, _)| *k == map_kpa) {
                Some(existing) => existing.1 = afr,
                None => out.push((map_kpa, afr)),
            }
        }
        out.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self {
            points: out,
            fallback_afr: DEFAULT_FALLBACK_AFR,
        })
    }

    /// Column-average a full RPM x MAP target grid down to one target per MAP key.
    ///
    /// Non-finite cells are ignored; a column with no finite cell is left out.
    pub fn from_grid<R: AsRef<[f64]>>(map_keys: &[f64], rows: &[R]) -> Result<Self> {
        let mut points = Vec::with_capacity(map_keys.len());
        for (col, &map_kpa) in map_keys.iter().enumerate() {
            let (sum, n) = rows
                .iter()
                .filter_map(|r| r.as_ref().get(col).copied())
                .filter(|v| v.is_finite())
                .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
            if n > 0 {
                points.push((map_kpa, sum / n as f64));
            }
        }
        Self::new(points)
    }

    pub fn with_fallback(mut self, fallback_afr: f64) -> Result<Self> {
        if !(fallback_afr.is_finite() && fallback_afr > 0.0) {
            return Err(VeError::Config(format!(
                "fallback target AFR must be > 0, got {fallback_afr}"
            ))
            .into());
        }
        self.fallback_afr = fallback_afr;
        Ok(self)
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn fallback_afr(&self) -> f64 {
        self.fallback_afr
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// See [`resolve`].
    #[inline]
    pub fn resolve(&self, map_kpa: f64) -> f64 {
        resolve(self, map_kpa)
    }
}

/// Target AFR for `map_kpa`: the value at the nearest MAP key.
///
/// An empty table yields the fallback. On an exact tie the first key seen in
/// ascending order (the lower MAP) wins.
pub fn resolve(table: &AfrTargetTable, map_kpa: f64) -> f64 {
    let mut best: Option<(f64, f64)> = None;
    for &(key, afr) in &table.points {
        let d = (key - map_kpa).abs();
        match best {
            Some((best_d, _)) if d >= best_d => {}
            _ => best = Some((d, afr)),
        }
    }
    best.map_or(table.fallback_afr, |(_, afr)| afr)
}
