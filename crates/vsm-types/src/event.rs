//! # Events
//!
//! The immutable record delivered to subscribers. An event is stamped once
//! by the factory and never mutated afterwards; ordering between two events
//! uses the HLC total order on `timestamp`.

use crate::timestamp::HlcTimestamp;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Logical producer tag for an event.
///
/// The five operational systems of the viable system model, plus the
/// algedonic channel and a catch-all for external producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubsystemId {
    /// S1: operations.
    System1,
    /// S2: coordination.
    System2,
    /// S3: control and resource bargaining.
    System3,
    /// S4: intelligence and environment scanning.
    System4,
    /// S5: policy and identity.
    System5,
    /// The pain/pleasure channel; its events are implicitly urgent.
    Algedonic,
    /// Producers outside the five-system model.
    External,
}

impl SubsystemId {
    /// Stable string form used in logs and serialized events.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System1 => "system1",
            Self::System2 => "system2",
            Self::System3 => "system3",
            Self::System4 => "system4",
            Self::System5 => "system5",
            Self::Algedonic => "algedonic",
            Self::External => "external",
        }
    }
}

impl fmt::Display for SubsystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery priority attached to an event at creation time.
///
/// `Critical` events take the algedonic bypass path in ordered delivery:
/// they are handed to the subscriber immediately instead of waiting out the
/// reordering window.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum EventPriority {
    /// Normal delivery through the configured path.
    #[default]
    Routine,
    /// Above-normal interest; still buffered when ordering is requested.
    Elevated,
    /// Urgent pain/pleasure-style signal; never waits behind the window.
    Critical,
}

/// An immutable event record.
///
/// Subscribers receive the full record, not just `data`, so downstream
/// consumers can reason about causal order themselves if they need to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Globally unique event id.
    pub id: Uuid,
    /// Logical producer tag.
    pub subsystem: SubsystemId,
    /// Routing key subscribers filter on (e.g. `"coordination.sync"`).
    pub event_type: String,
    /// Opaque payload; the bus never inspects its shape beyond the optional
    /// bypass fields (`intensity` / `confidence`).
    pub data: serde_json::Value,
    /// HLC stamp used for ordering.
    pub timestamp: HlcTimestamp,
    /// Human-readable ISO-8601 rendering of `timestamp.physical`.
    pub created_at: String,
    /// Delivery priority.
    pub priority: EventPriority,
}

impl Event {
    /// True if this event is causally ordered before `other` under the HLC
    /// total order.
    #[must_use]
    pub fn causally_precedes(&self, other: &Event) -> bool {
        self.timestamp < other.timestamp
    }
}
