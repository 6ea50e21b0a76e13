//! # Delivery Statistics
//!
//! Best-effort observability counters. These are side channels for
//! diagnosis (a subscriber that never receives events should be explainable
//! from here), never part of the correctness contract.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters owned by the bus as a whole.
#[derive(Debug, Default)]
pub struct BusStats {
    /// Events stamped and fanned out (attempted, not necessarily received).
    pub events_published: AtomicU64,
    /// Deliveries handed to a subscriber queue or ordered buffer.
    pub events_delivered: AtomicU64,
    /// Deliveries dropped because a subscriber queue was at capacity.
    pub dropped_queue_full: AtomicU64,
    /// Deliveries dropped because the subscriber was dead; each one also
    /// triggers registry cleanup.
    pub dropped_dead_subscriber: AtomicU64,
    /// Events stamped with a degraded wall-clock timestamp because the
    /// clock actor was unreachable.
    pub clock_fallbacks: AtomicU64,
}

impl BusStats {
    /// Point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> BusStatsSnapshot {
        BusStatsSnapshot {
            events_published: self.events_published.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            dropped_queue_full: self.dropped_queue_full.load(Ordering::Relaxed),
            dropped_dead_subscriber: self.dropped_dead_subscriber.load(Ordering::Relaxed),
            clock_fallbacks: self.clock_fallbacks.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of `BusStats` for introspection and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusStatsSnapshot {
    /// Events stamped and fanned out.
    pub events_published: u64,
    /// Deliveries handed off successfully.
    pub events_delivered: u64,
    /// Drops due to full subscriber queues.
    pub dropped_queue_full: u64,
    /// Drops due to dead subscribers.
    pub dropped_dead_subscriber: u64,
    /// Degraded timestamps issued.
    pub clock_fallbacks: u64,
}

/// Counters owned by one ordered-delivery instance.
#[derive(Debug, Default)]
pub struct OrderedStats {
    /// Events delivered to the subscriber (buffered and bypassed).
    pub delivered: AtomicU64,
    /// Events that took the algedonic bypass.
    pub bypassed: AtomicU64,
    /// Forced flushes caused by the buffer reaching its bound.
    pub overflow_flushes: AtomicU64,
    /// Buffered events whose flush position differed from arrival order.
    pub reordered: AtomicU64,
    /// Completed flush cycles (timer and overflow).
    pub flushes: AtomicU64,
    /// Events dropped because the subscriber died or its queue was full.
    pub dropped: AtomicU64,
    /// Current adaptive flush window in milliseconds.
    pub window_ms: AtomicU64,
}

impl OrderedStats {
    /// Point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> OrderedStatsSnapshot {
        OrderedStatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
            overflow_flushes: self.overflow_flushes.load(Ordering::Relaxed),
            reordered: self.reordered.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            window_ms: self.window_ms.load(Ordering::Relaxed),
        }
    }
}

/// Plain copy of `OrderedStats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderedStatsSnapshot {
    /// Events delivered to the subscriber.
    pub delivered: u64,
    /// Events that took the bypass path.
    pub bypassed: u64,
    /// Forced flushes from buffer overflow.
    pub overflow_flushes: u64,
    /// Events delivered out of arrival position.
    pub reordered: u64,
    /// Completed flush cycles.
    pub flushes: u64,
    /// Events dropped at the subscriber boundary.
    pub dropped: u64,
    /// Current flush window.
    pub window_ms: u64,
}
