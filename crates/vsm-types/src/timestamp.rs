//! # Hybrid Logical Clock Timestamps
//!
//! The stamp every event carries. Combines wall-clock milliseconds with a
//! logical tie-breaking counter and the producing node's id, giving a total
//! order that respects causality within a node and across merged clocks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A hybrid logical clock timestamp.
///
/// Ordering is lexicographic over `(physical, logical, node_id)`. Two stamps
/// from the same clock never compare equal; stamps from different nodes in
/// the same millisecond with the same counter are tie-broken by node id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HlcTimestamp {
    /// Milliseconds since the Unix epoch, monotonic non-decreasing per clock.
    pub physical: u64,
    /// Logical counter, reset to 0 whenever `physical` advances.
    pub logical: u64,
    /// Stable identifier of the producing clock, used as tiebreaker.
    pub node_id: String,
}

impl HlcTimestamp {
    /// Create a timestamp from its parts.
    #[must_use]
    pub fn new(physical: u64, logical: u64, node_id: impl Into<String>) -> Self {
        Self {
            physical,
            logical,
            node_id: node_id.into(),
        }
    }

    /// Check whether this stamp's physical component is within
    /// `tolerance_ms` of the given wall-clock reading.
    ///
    /// Stamps further in the future than the tolerance are treated as
    /// untrusted by the clock's merge path.
    #[must_use]
    pub fn is_within_drift(&self, wall_clock_ms: u64, tolerance_ms: u64) -> bool {
        self.physical <= wall_clock_ms.saturating_add(tolerance_ms)
    }
}

impl fmt::Display for HlcTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HLC({}:{}:{})", self.physical, self.logical, self.node_id)
    }
}
