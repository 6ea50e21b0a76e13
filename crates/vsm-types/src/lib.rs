//! # VSM Types
//!
//! Shared value types for the VSM event bus.
//!
//! ## Clusters
//!
//! - **Time**: `HlcTimestamp`, the hybrid logical clock stamp every event
//!   carries, totally ordered by `(physical, logical, node_id)`
//! - **Events**: `Event`, `SubsystemId`, `EventPriority`
//! - **Errors**: `ClockError`, `SubscribeError`

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod errors;
pub mod event;
pub mod timestamp;

// Re-export main types
pub use errors::{ClockError, SubscribeError};
pub use event::{Event, EventPriority, SubsystemId};
pub use timestamp::HlcTimestamp;

/// Node identifier used by degraded timestamps when the clock service is
/// unreachable. Events stamped with this node id sort behind nothing special;
/// the marker only makes degradation observable.
pub const FALLBACK_NODE_ID: &str = "fallback";
