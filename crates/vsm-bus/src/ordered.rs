//! # Ordered Delivery
//!
//! Converts best-effort arrival order into bounded-delay causal order for
//! one subscription. Each ordered subscription owns one actor: events are
//! buffered in arrival order, sorted by HLC timestamp on flush, and handed
//! to the subscriber ascending. Urgent (algedonic) events bypass the buffer
//! entirely.
//!
//! The flush timer is a re-armed `sleep_until`, not a busy poll. A crash or
//! stop of one instance never affects the bus or other subscriptions; a
//! stopped instance discards its buffer (no durability goal).

use crate::config::SubscriptionOptions;
use crate::stats::{OrderedStats, OrderedStatsSnapshot};
use crate::subscriber::{Delivery, DeliveryError, SubscriberHandle};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;
use vsm_types::{Event, EventPriority};

/// Reorder fraction above which the window widens.
const REORDER_WIDEN_FRACTION: f64 = 0.3;

/// Step by which the adaptive window widens or narrows.
const WINDOW_STEP: Duration = Duration::from_millis(10);

/// Consecutive fully-in-order flushes before the window narrows.
const CLEAN_FLUSHES_TO_NARROW: u32 = 3;

/// Resolved configuration for one ordered-delivery instance.
#[derive(Debug, Clone)]
pub struct OrderedConfig {
    /// Initial flush window.
    pub window: Duration,
    /// Lower clamp for the adaptive window.
    pub min_window: Duration,
    /// Upper clamp for the adaptive window.
    pub max_window: Duration,
    /// Buffer bound; reaching it forces a flush before the next insert.
    pub max_buffer_size: usize,
    /// Deliver each flush as one `Delivery::Batch`.
    pub batch_delivery: bool,
    /// Drive the window from the observed reorder fraction.
    pub adaptive_window: bool,
    /// Payload intensity/confidence at which an event bypasses the buffer.
    pub bypass_threshold: f64,
    /// Event-type prefixes that are implicitly urgent.
    pub urgent_type_prefixes: Arc<Vec<String>>,
    /// Command queue depth for the actor.
    pub channel_capacity: usize,
}

impl OrderedConfig {
    /// Resolve per-subscription options against the bus's urgent-type list.
    #[must_use]
    pub fn from_options(
        options: &SubscriptionOptions,
        urgent_type_prefixes: Arc<Vec<String>>,
        channel_capacity: usize,
    ) -> Self {
        Self {
            window: Duration::from_millis(u64::from(options.buffer_window_ms)),
            min_window: Duration::from_millis(u64::from(options.min_window_ms)),
            max_window: Duration::from_millis(u64::from(options.max_window_ms)),
            max_buffer_size: options.max_buffer_size as usize,
            batch_delivery: options.batch_delivery,
            adaptive_window: options.adaptive_window,
            bypass_threshold: options.algedonic_bypass_threshold,
            urgent_type_prefixes,
            channel_capacity,
        }
    }
}

/// Commands accepted by an ordered-delivery actor.
enum OrderedCommand {
    Submit(Event),
    Stop,
}

/// Handle to one ordered-delivery actor. Held by the bus as the registry
/// target for an ordered subscription.
#[derive(Debug, Clone)]
pub struct OrderedHandle {
    subscriber_id: Uuid,
    tx: mpsc::Sender<OrderedCommand>,
    stats: Arc<OrderedStats>,
}

impl OrderedHandle {
    /// Identity of the subscriber this instance delivers to.
    #[must_use]
    pub fn subscriber_id(&self) -> Uuid {
        self.subscriber_id
    }

    /// Hand an event to the actor without blocking.
    ///
    /// # Errors
    ///
    /// - `DeliveryError::Full` - command queue at capacity; the event was
    ///   dropped and counted
    /// - `DeliveryError::Closed` - the actor has stopped
    pub fn submit(&self, event: Event) -> Result<(), DeliveryError> {
        self.tx.try_send(OrderedCommand::Submit(event)).map_err(|e| {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    DeliveryError::Full
                }
                mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
            }
        })
    }

    /// Stop the actor, discarding its buffer. Idempotent: stopping a
    /// stopped instance is a no-op.
    pub async fn stop(&self) {
        let _ = self.tx.send(OrderedCommand::Stop).await;
    }

    /// True once the actor has stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.tx.is_closed()
    }

    /// Point-in-time counters for this instance.
    #[must_use]
    pub fn stats(&self) -> OrderedStatsSnapshot {
        self.stats.snapshot()
    }
}

/// Spawn an ordered-delivery actor for one subscriber.
#[must_use]
pub fn spawn_ordered(subscriber: SubscriberHandle, config: OrderedConfig) -> OrderedHandle {
    let stats = Arc::new(OrderedStats::default());
    stats
        .window_ms
        .store(config.window.as_millis() as u64, Ordering::Relaxed);

    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let handle = OrderedHandle {
        subscriber_id: subscriber.id(),
        tx,
        stats: stats.clone(),
    };

    let actor = OrderedDelivery {
        window: AdaptiveWindow::new(&config),
        subscriber,
        config,
        buffer: Vec::new(),
        stats,
    };
    tokio::spawn(actor.run(rx));

    handle
}

/// Why a flush fired; shows up in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushReason {
    Window,
    Overflow,
}

/// Window controller: widen on observed reordering, narrow after several
/// consecutive fully-ordered flushes, clamp to the configured range.
#[derive(Debug)]
struct AdaptiveWindow {
    current: Duration,
    min: Duration,
    max: Duration,
    clean_flushes: u32,
    enabled: bool,
}

impl AdaptiveWindow {
    fn new(config: &OrderedConfig) -> Self {
        Self {
            current: config.window.clamp(config.min_window, config.max_window),
            min: config.min_window,
            max: config.max_window,
            clean_flushes: 0,
            enabled: config.adaptive_window,
        }
    }

    fn current(&self) -> Duration {
        self.current
    }

    /// Feed one flush observation into the control law.
    fn observe(&mut self, reordered: usize, total: usize) -> Duration {
        if !self.enabled || total == 0 {
            return self.current;
        }

        let fraction = reordered as f64 / total as f64;
        if fraction > REORDER_WIDEN_FRACTION {
            self.current = (self.current + WINDOW_STEP).min(self.max);
            self.clean_flushes = 0;
        } else if reordered == 0 {
            self.clean_flushes += 1;
            if self.clean_flushes >= CLEAN_FLUSHES_TO_NARROW {
                self.current = self.current.saturating_sub(WINDOW_STEP).max(self.min);
                self.clean_flushes = 0;
            }
        } else {
            self.clean_flushes = 0;
        }
        self.current
    }
}

/// Actor state: owned exclusively by its task.
struct OrderedDelivery {
    subscriber: SubscriberHandle,
    config: OrderedConfig,
    buffer: Vec<Event>,
    window: AdaptiveWindow,
    stats: Arc<OrderedStats>,
}

impl OrderedDelivery {
    async fn run(mut self, mut rx: mpsc::Receiver<OrderedCommand>) {
        let mut next_flush = Instant::now() + self.window.current();

        loop {
            let sleep = tokio::time::sleep_until(next_flush);
            tokio::pin!(sleep);

            tokio::select! {
                command = rx.recv() => match command {
                    Some(OrderedCommand::Submit(event)) => {
                        if !self.accept(event) {
                            break;
                        }
                    }
                    Some(OrderedCommand::Stop) | None => break,
                },
                () = &mut sleep => {
                    if !self.flush(FlushReason::Window) {
                        break;
                    }
                    next_flush = Instant::now() + self.window.current();
                }
            }
        }

        if !self.buffer.is_empty() {
            debug!(
                subscriber = %self.subscriber.id(),
                discarded = self.buffer.len(),
                "Ordered delivery stopped, buffer discarded"
            );
        }
    }

    /// Take in one event. Returns `false` when the subscriber is gone and
    /// the actor should stop.
    fn accept(&mut self, event: Event) -> bool {
        if is_urgent(&event, &self.config) {
            return self.deliver_bypass(event);
        }

        if self.buffer.len() >= self.config.max_buffer_size {
            self.stats.overflow_flushes.fetch_add(1, Ordering::Relaxed);
            warn!(
                subscriber = %self.subscriber.id(),
                buffered = self.buffer.len(),
                "Reorder buffer full, forcing flush"
            );
            if !self.flush(FlushReason::Overflow) {
                return false;
            }
        }

        self.buffer.push(event);
        true
    }

    /// Immediate delivery for urgent events; never waits behind the window.
    fn deliver_bypass(&mut self, event: Event) -> bool {
        match self.subscriber.try_deliver(Delivery::Single(event)) {
            Ok(()) => {
                self.stats.bypassed.fetch_add(1, Ordering::Relaxed);
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(DeliveryError::Full) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(DeliveryError::Closed) => false,
        }
    }

    /// Drain the buffer in ascending timestamp order.
    ///
    /// Returns `false` when the subscriber is gone.
    fn flush(&mut self, reason: FlushReason) -> bool {
        if self.buffer.is_empty() {
            return true;
        }

        let reordered = reorder_count(&self.buffer);
        let mut events = std::mem::take(&mut self.buffer);
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        let total = events.len();

        debug!(
            subscriber = %self.subscriber.id(),
            events = total,
            reordered,
            reason = ?reason,
            "Flushing ordered buffer"
        );

        let alive = if self.config.batch_delivery {
            match self.subscriber.try_deliver(Delivery::Batch(events)) {
                Ok(()) => {
                    self.stats.delivered.fetch_add(total as u64, Ordering::Relaxed);
                    true
                }
                Err(DeliveryError::Full) => {
                    self.stats.dropped.fetch_add(total as u64, Ordering::Relaxed);
                    true
                }
                Err(DeliveryError::Closed) => false,
            }
        } else {
            let mut alive = true;
            for (index, event) in events.into_iter().enumerate() {
                match self.subscriber.try_deliver(Delivery::Single(event)) {
                    Ok(()) => {
                        self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(DeliveryError::Full) => {
                        self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(DeliveryError::Closed) => {
                        // Remaining events are lost with the subscriber.
                        self.stats
                            .dropped
                            .fetch_add((total - index) as u64, Ordering::Relaxed);
                        alive = false;
                        break;
                    }
                }
            }
            alive
        };

        self.stats.flushes.fetch_add(1, Ordering::Relaxed);
        self.stats.reordered.fetch_add(reordered as u64, Ordering::Relaxed);

        let window = self.window.observe(reordered, total);
        self.stats
            .window_ms
            .store(window.as_millis() as u64, Ordering::Relaxed);

        alive
    }
}

/// How many buffered events sit at a different position once sorted by
/// timestamp, the reordering signal the adaptive window feeds on.
fn reorder_count(buffer: &[Event]) -> usize {
    let mut order: Vec<usize> = (0..buffer.len()).collect();
    order.sort_by(|&a, &b| buffer[a].timestamp.cmp(&buffer[b].timestamp));
    order
        .iter()
        .enumerate()
        .filter(|(position, &arrival)| *position != arrival)
        .count()
}

/// The cross-cutting priority rule: an event is urgent if its priority says
/// so, its type is algedonic-labelled, or its payload carries an intensity
/// or confidence at the bypass threshold.
fn is_urgent(event: &Event, config: &OrderedConfig) -> bool {
    if event.priority == EventPriority::Critical {
        return true;
    }

    if config
        .urgent_type_prefixes
        .iter()
        .any(|prefix| event.event_type.starts_with(prefix.as_str()))
    {
        return true;
    }

    ["intensity", "confidence"]
        .iter()
        .filter_map(|key| event.data.get(key))
        .filter_map(serde_json::Value::as_f64)
        .any(|value| value >= config.bypass_threshold)
}
