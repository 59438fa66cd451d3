//! Outcome of feeding one tick to a session.

use crate::error::RejectReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// Not live, below the live RPM floor, or a non-finite RPM/MAP reading;
    /// nothing traced or changed.
    Idle,
    /// Traced for display only (below the accumulation RPM floor).
    Traced,
    /// Traced but the sample was filtered out before accumulation.
    Rejected(RejectReason),
    /// Sample accumulated; `cells_updated` cells had their correction refreshed.
    Accumulated { cells_updated: usize },
}

impl TickStatus {
    pub fn is_accumulated(&self) -> bool {
        matches!(self, TickStatus::Accumulated { .. })
    }
}
