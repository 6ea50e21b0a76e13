//! # Event Factory
//!
//! Stamps `(subsystem, type, data)` triples into immutable events. Creation
//! is total: when the clock service is degraded the factory falls back to a
//! wall-clock stamp, so event creation can never fail the publish path.

use crate::clock::ClockHandle;
use crate::stats::BusStats;
use chrono::{DateTime, Utc};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use uuid::Uuid;
use vsm_types::{Event, EventPriority, HlcTimestamp, SubsystemId, FALLBACK_NODE_ID};

/// Builds stamped events on behalf of the bus.
#[derive(Debug, Clone)]
pub struct EventFactory {
    clock: ClockHandle,
    stats: Arc<BusStats>,
}

impl EventFactory {
    /// Create a factory bound to a clock service.
    #[must_use]
    pub fn new(clock: ClockHandle, stats: Arc<BusStats>) -> Self {
        Self { clock, stats }
    }

    /// Stamp an event with routine priority.
    pub async fn create(
        &self,
        subsystem: SubsystemId,
        event_type: &str,
        data: serde_json::Value,
    ) -> Event {
        self.create_with_priority(subsystem, event_type, data, EventPriority::default())
            .await
    }

    /// Stamp an event with an explicit priority.
    ///
    /// Uses the clock's retry-then-degrade path; a degraded stamp is
    /// counted but still produces a usable event.
    pub async fn create_with_priority(
        &self,
        subsystem: SubsystemId,
        event_type: &str,
        data: serde_json::Value,
        priority: EventPriority,
    ) -> Event {
        let timestamp = self.clock.now_or_fallback().await;
        if timestamp.node_id == FALLBACK_NODE_ID {
            self.stats.clock_fallbacks.fetch_add(1, Ordering::Relaxed);
        }

        Event {
            id: Uuid::new_v4(),
            subsystem,
            event_type: event_type.to_string(),
            created_at: iso8601(&timestamp),
            timestamp,
            data,
            priority,
        }
    }
}

/// ISO-8601 rendering of the stamp's physical component.
fn iso8601(timestamp: &HlcTimestamp) -> String {
    DateTime::<Utc>::from_timestamp_millis(timestamp.physical as i64)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}
