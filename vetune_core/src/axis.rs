//! Calibration breakpoints and floor-index search.

use crate::error::{Result, VeError};

/// Ordered, strictly increasing breakpoints for one grid dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct BinAxis {
    bins: Vec<f64>,
}

impl BinAxis {
    /// Build an axis, rejecting empty, non-finite, or non-increasing input.
    pub fn new(bins: Vec<f64>) -> Result<Self> {
        if bins.is_empty() {
            return Err(VeError::InvalidAxis("axis needs at least one breakpoint".into()).into());
        }
        if let Some(i) = bins.iter().position(|b| !b.is_finite()) {
            return Err(VeError::InvalidAxis(format!("breakpoint {i} is not finite")).into());
        }
        if let Some(i) = bins.windows(2).position(|w| w[1] <= w[0]) {
            return Err(VeError::InvalidAxis(format!(
                "breakpoints must be strictly increasing ({} then {})",
                bins[i],
                bins[i + 1]
            ))
            .into());
        }
        Ok(Self { bins })
    }

    /// Preset tables are strictly increasing by construction.
    pub(crate) fn from_static(bins: Vec<f64>) -> Self {
        debug_assert!(!bins.is_empty());
        debug_assert!(bins.windows(2).all(|w| w[0] < w[1]));
        Self { bins }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Always false for a constructed axis; present for clippy's `len_without_is_empty`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<f64> {
        self.bins.get(idx).copied()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.bins
    }

    #[inline]
    pub fn last_index(&self) -> usize {
        self.bins.len() - 1
    }

    /// Convenience wrapper for [`locate`].
    #[inline]
    pub fn locate(&self, value: f64) -> (usize, f64) {
        locate(self, value)
    }
}

/// Floor-index search with clamping.
///
/// Returns `(i, fraction)` where `axis[i] <= value < axis[i + 1]` and
/// `fraction` is the position inside that span in `[0, 1]`. Values at or
/// outside the ends clamp to the end index with fraction 0, and an exact
/// breakpoint snaps to its own index with fraction 0. NaN clamps low.
pub fn locate(axis: &BinAxis, value: f64) -> (usize, f64) {
    let bins = axis.as_slice();
    let last = bins.len() - 1;
    if value.is_nan() || value <= bins[0] {
        return (0, 0.0);
    }
    if value >= bins[last] {
        return (last, 0.0);
    }

    // First index whose breakpoint is > value; the floor bin sits right before it.
    let upper = bins.partition_point(|b| *b <= value);
    let i = upper - 1;
    let span = bins[i + 1] - bins[i];
    if span <= 0.0 {
        return (i, 0.0);
    }
    (i, ((value - bins[i]) / span).clamp(0.0, 1.0))
}
