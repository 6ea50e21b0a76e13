//! # Error Types
//!
//! Error enums shared across the bus. The publish path is total; these
//! surface only on the clock's merge boundary and the subscribe control
//! path, never to publishers.

use thiserror::Error;

/// Errors from the hybrid logical clock service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClockError {
    /// The clock actor cannot be reached. Callers retry with backoff and
    /// then degrade to a wall-clock stamp; this never fails a publish.
    #[error("clock service unavailable")]
    Unavailable,

    /// A remote timestamp is implausibly far in the future; the merge was
    /// rejected rather than poisoning local ordering.
    #[error("remote physical time {remote_physical} exceeds drift tolerance (local now {local_now}, tolerance {tolerance_ms}ms)")]
    DriftExceeded {
        /// Physical component of the rejected remote stamp.
        remote_physical: u64,
        /// Local wall clock at the time of the merge attempt.
        local_now: u64,
        /// Configured tolerance.
        tolerance_ms: u64,
    },
}

/// Errors surfaced synchronously on the subscribe control path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubscribeError {
    /// Malformed subscription options; the one call site where immediate
    /// rejection is acceptable since it is off the hot publish path.
    #[error("invalid subscription options: {reason}")]
    InvalidOptions {
        /// What was wrong with the options.
        reason: String,
    },
}
