//! # Bus and Subscription Configuration
//!
//! Plain config structs with defaults; subscription options are validated
//! synchronously on `subscribe` so the hot publish path never sees them.

use vsm_types::SubscribeError;

/// Default flush window for ordered subscriptions.
pub const DEFAULT_BUFFER_WINDOW_MS: u32 = 50;

/// Lower clamp for the adaptive window.
pub const DEFAULT_MIN_WINDOW_MS: u32 = 10;

/// Upper clamp for the adaptive window.
pub const DEFAULT_MAX_WINDOW_MS: u32 = 100;

/// Default bound on a reordering buffer before a forced flush.
pub const DEFAULT_MAX_BUFFER_SIZE: u32 = 10_000;

/// Default payload intensity/confidence at which an event takes the
/// algedonic bypass.
pub const DEFAULT_BYPASS_THRESHOLD: f64 = 0.95;

/// Default tolerance for remote clock drift on merge.
pub const DEFAULT_CLOCK_DRIFT_TOLERANCE_MS: u64 = 1_000;

/// Bus-wide configuration.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Stable identifier for this bus's clock, used as the HLC tiebreaker.
    pub node_id: String,

    /// Remote timestamps further than this in the future are rejected on
    /// merge instead of being adopted.
    pub clock_drift_tolerance_ms: u64,

    /// Event-type prefixes treated as implicitly urgent: events of these
    /// types bypass the reordering buffer regardless of configured window.
    pub urgent_type_prefixes: Vec<String>,

    /// Queue capacity for direct (unordered) subscribers and for the
    /// command queue of each ordered-delivery actor.
    pub channel_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            node_id: format!("node-{}", uuid::Uuid::new_v4().simple()),
            clock_drift_tolerance_ms: DEFAULT_CLOCK_DRIFT_TOLERANCE_MS,
            urgent_type_prefixes: vec![
                "algedonic.".to_string(),
                "pain".to_string(),
                "emergency".to_string(),
            ],
            channel_capacity: crate::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl BusConfig {
    /// Config with an explicit node id and the remaining defaults.
    #[must_use]
    pub fn with_node_id(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            ..Self::default()
        }
    }
}

/// Per-subscription options recognized by `EventBus::subscribe`.
#[derive(Debug, Clone)]
pub struct SubscriptionOptions {
    /// Route through a reordering buffer that delivers in HLC order.
    pub ordered_delivery: bool,

    /// Initial flush window for ordered delivery.
    pub buffer_window_ms: u32,

    /// Lower clamp for the adaptive window.
    pub min_window_ms: u32,

    /// Upper clamp for the adaptive window.
    pub max_window_ms: u32,

    /// Buffer bound; exceeding it forces an immediate flush.
    pub max_buffer_size: u32,

    /// Deliver each flush as one batch message instead of single events.
    pub batch_delivery: bool,

    /// Widen/narrow the window from the observed reorder fraction.
    pub adaptive_window: bool,

    /// Payload intensity/confidence at which an event bypasses the buffer.
    pub algedonic_bypass_threshold: f64,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            ordered_delivery: false,
            buffer_window_ms: DEFAULT_BUFFER_WINDOW_MS,
            min_window_ms: DEFAULT_MIN_WINDOW_MS,
            max_window_ms: DEFAULT_MAX_WINDOW_MS,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
            batch_delivery: false,
            adaptive_window: true,
            algedonic_bypass_threshold: DEFAULT_BYPASS_THRESHOLD,
        }
    }
}

impl SubscriptionOptions {
    /// Options for an ordered subscription with the given initial window.
    #[must_use]
    pub fn ordered(buffer_window_ms: u32) -> Self {
        Self {
            ordered_delivery: true,
            buffer_window_ms,
            ..Self::default()
        }
    }

    /// Validate option combinations.
    ///
    /// # Errors
    ///
    /// `SubscribeError::InvalidOptions` when the window clamps are inverted,
    /// the initial window falls outside them, the buffer bound is zero, or
    /// the bypass threshold is outside `(0, 1]`.
    pub fn validate(&self) -> Result<(), SubscribeError> {
        if self.min_window_ms > self.max_window_ms {
            return Err(SubscribeError::InvalidOptions {
                reason: format!(
                    "min_window_ms {} exceeds max_window_ms {}",
                    self.min_window_ms, self.max_window_ms
                ),
            });
        }

        if self.buffer_window_ms < self.min_window_ms || self.buffer_window_ms > self.max_window_ms
        {
            return Err(SubscribeError::InvalidOptions {
                reason: format!(
                    "buffer_window_ms {} outside [{}, {}]",
                    self.buffer_window_ms, self.min_window_ms, self.max_window_ms
                ),
            });
        }

        if self.max_buffer_size == 0 {
            return Err(SubscribeError::InvalidOptions {
                reason: "max_buffer_size must be at least 1".to_string(),
            });
        }

        if !(self.algedonic_bypass_threshold > 0.0 && self.algedonic_bypass_threshold <= 1.0) {
            return Err(SubscribeError::InvalidOptions {
                reason: format!(
                    "algedonic_bypass_threshold {} outside (0, 1]",
                    self.algedonic_bypass_threshold
                ),
            });
        }

        Ok(())
    }
}
