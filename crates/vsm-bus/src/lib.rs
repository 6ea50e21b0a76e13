//! # VSM Bus - Causally-Ordered Event Bus
//!
//! Publish/subscribe bus for inter-subsystem communication, built on a
//! hybrid logical clock. Publishers stamp events through a process-wide
//! HLC; subscribers choose between immediate arrival-order delivery and
//! bounded-delay causal order through a per-subscription reordering buffer.
//!
//! ## Data Flow
//!
//! ```text
//! ┌────────────┐ publish()  ┌────────────┐ lookup  ┌────────────────────┐
//! │ Subsystem  │ ─────────► │ Event Bus  │ ──────► │ direct subscriber  │
//! └────────────┘            │  (stamps   │         └────────────────────┘
//!                           │  via HLC)  │ submit  ┌────────────────────┐
//!                           │            │ ──────► │ OrderedDelivery    │
//!                           └────────────┘         │ buffer ─ flush ──► │
//!                                                  └────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - `publish` never blocks on delivery and never fails the caller; clock
//!   loss degrades to wall-clock stamps.
//! - Ordered subscribers receive non-decreasing HLC order among events that
//!   arrived within the same buffering window (bounded, not absolute,
//!   causal ordering).
//! - Algedonic/urgent events bypass the window entirely.
//! - Buffers are bounded; overflow forces a flush and increments a visible
//!   counter. Data loss is never silent.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod bus;
pub mod clock;
pub mod config;
pub mod factory;
pub mod ordered;
pub mod registry;
pub mod stats;
pub mod subscriber;

// Re-export main types
pub use bus::{EventBus, EventPublisher};
pub use clock::{spawn_clock, ClockHandle, ClockState};
pub use config::{BusConfig, SubscriptionOptions};
pub use factory::EventFactory;
pub use ordered::{spawn_ordered, OrderedConfig, OrderedHandle};
pub use registry::{DeliveryTarget, SubscriptionRegistry};
pub use stats::{BusStatsSnapshot, OrderedStatsSnapshot};
pub use subscriber::{Delivery, DeliveryError, SubscriberHandle};

/// Maximum deliveries queued per subscriber before drops kick in.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
