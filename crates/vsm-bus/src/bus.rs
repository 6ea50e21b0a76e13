//! # Event Bus
//!
//! The root orchestrator. Owns the subscription registry, the clock actor,
//! and the lifecycle of ordered-delivery instances. `publish` is
//! fire-and-forget: it stamps the event, looks up targets, and fans out
//! with non-blocking sends. A slow or dead subscriber can never stall the
//! publisher or other subscribers.

use crate::clock::{spawn_clock, ClockHandle};
use crate::config::{BusConfig, SubscriptionOptions};
use crate::factory::EventFactory;
use crate::ordered::{spawn_ordered, OrderedConfig, OrderedHandle};
use crate::registry::{DeliveryTarget, SubscriptionRegistry};
use crate::stats::{BusStats, BusStatsSnapshot, OrderedStatsSnapshot};
use crate::subscriber::{Delivery, DeliveryError, SubscriberHandle};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;
use vsm_types::{ClockError, Event, EventPriority, HlcTimestamp, SubscribeError, SubsystemId};

/// Trait for publishing events to the bus.
///
/// Downstream components depend on this seam; `EventBus` is the in-memory
/// implementation. Distributed deployments would substitute another.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a pre-built event. Returns the number of targets the event
    /// was handed to (best-effort count, not a delivery guarantee).
    async fn publish_event(&self, event: Event) -> usize;

    /// Total events published through this bus.
    fn events_published(&self) -> u64;
}

/// In-process causally-ordered event bus.
pub struct EventBus {
    config: BusConfig,
    clock: ClockHandle,
    factory: EventFactory,
    registry: SubscriptionRegistry,
    /// `(event_type, subscriber id) -> ordered instance`, kept separately
    /// from the registry for teardown on unsubscribe and death.
    ordered: RwLock<HashMap<(String, Uuid), OrderedHandle>>,
    urgent_type_prefixes: Arc<Vec<String>>,
    stats: Arc<BusStats>,
}

impl EventBus {
    /// Create a bus and spawn its clock actor.
    #[must_use]
    pub fn new(config: BusConfig) -> Self {
        let clock = spawn_clock(config.node_id.clone(), config.clock_drift_tolerance_ms);
        let stats = Arc::new(BusStats::default());
        let factory = EventFactory::new(clock.clone(), stats.clone());
        let urgent_type_prefixes = Arc::new(config.urgent_type_prefixes.clone());

        info!(node_id = %config.node_id, "Event bus started");

        Self {
            config,
            clock,
            factory,
            registry: SubscriptionRegistry::new(),
            ordered: RwLock::new(HashMap::new()),
            urgent_type_prefixes,
            stats,
        }
    }

    /// Register a subscriber for an event type.
    ///
    /// With `ordered_delivery` set, an ordered-delivery actor is spawned
    /// and registered in the subscriber's place; the subscriber then
    /// receives events in HLC order per its window. Subscribing the same
    /// subscriber to the same type twice is a no-op.
    ///
    /// # Errors
    ///
    /// `SubscribeError::InvalidOptions` for malformed options; the control
    /// path is the one place immediate rejection is acceptable.
    pub fn subscribe(
        &self,
        event_type: &str,
        subscriber: SubscriberHandle,
        options: SubscriptionOptions,
    ) -> Result<(), SubscribeError> {
        options.validate()?;
        let subscriber_id = subscriber.id();

        if options.ordered_delivery {
            let ordered_config = OrderedConfig::from_options(
                &options,
                self.urgent_type_prefixes.clone(),
                self.config.channel_capacity,
            );
            let handle = spawn_ordered(subscriber, ordered_config);

            if self
                .registry
                .insert(event_type, DeliveryTarget::Ordered(handle.clone()))
            {
                if let Ok(mut ordered) = self.ordered.write() {
                    ordered.insert((event_type.to_string(), subscriber_id), handle);
                }
            } else {
                // Duplicate subscription: the freshly spawned actor is
                // surplus and must not leak a timer.
                let surplus = handle;
                tokio::spawn(async move { surplus.stop().await });
            }
        } else {
            self.registry
                .insert(event_type, DeliveryTarget::Direct(subscriber));
        }

        debug!(
            event_type,
            subscriber = %subscriber_id,
            ordered = options.ordered_delivery,
            "Subscription created"
        );
        Ok(())
    }

    /// Remove a subscriber's registration for one event type, stopping its
    /// ordered-delivery instance (and discarding that buffer) if present.
    pub async fn unsubscribe(&self, event_type: &str, subscriber_id: Uuid) {
        self.registry.remove(event_type, subscriber_id);

        let handle = self
            .ordered
            .write()
            .ok()
            .and_then(|mut map| map.remove(&(event_type.to_string(), subscriber_id)));
        if let Some(handle) = handle {
            handle.stop().await;
        }

        debug!(event_type, subscriber = %subscriber_id, "Subscription removed");
    }

    /// Publish with the default producer tag and routine priority.
    /// Fire-and-forget: total, never blocks on delivery.
    pub async fn publish(&self, event_type: &str, data: serde_json::Value) -> usize {
        self.publish_from(SubsystemId::External, event_type, data, EventPriority::default())
            .await
    }

    /// Publish on behalf of a subsystem with an explicit priority.
    pub async fn publish_from(
        &self,
        subsystem: SubsystemId,
        event_type: &str,
        data: serde_json::Value,
        priority: EventPriority,
    ) -> usize {
        let event = self
            .factory
            .create_with_priority(subsystem, event_type, data, priority)
            .await;
        self.fan_out(event)
    }

    /// Merge a remote HLC timestamp into this bus's clock, e.g. when an
    /// event crosses in from another node.
    ///
    /// # Errors
    ///
    /// - `ClockError::DriftExceeded` - remote stamp failed the drift check
    /// - `ClockError::Unavailable` - clock actor is gone
    pub async fn merge_remote_timestamp(
        &self,
        remote: HlcTimestamp,
    ) -> Result<HlcTimestamp, ClockError> {
        self.clock.merge(remote).await
    }

    /// Introspection: event type → subscriber ids.
    #[must_use]
    pub fn subscriptions(&self) -> HashMap<String, Vec<Uuid>> {
        self.registry.snapshot()
    }

    /// Bus-wide counters.
    #[must_use]
    pub fn stats(&self) -> BusStatsSnapshot {
        self.stats.snapshot()
    }

    /// Counters for one ordered subscription, if it exists.
    #[must_use]
    pub fn ordered_stats(
        &self,
        event_type: &str,
        subscriber_id: Uuid,
    ) -> Option<OrderedStatsSnapshot> {
        self.ordered
            .read()
            .ok()?
            .get(&(event_type.to_string(), subscriber_id))
            .map(OrderedHandle::stats)
    }

    /// Handle to the bus's clock, for producers that stamp their own data.
    #[must_use]
    pub fn clock(&self) -> &ClockHandle {
        &self.clock
    }

    /// Stop every ordered-delivery actor and the clock actor. No timers
    /// survive shutdown; later publishes still complete (degraded stamps,
    /// zero targets).
    pub async fn shutdown(&self) {
        let handles: Vec<OrderedHandle> = self
            .ordered
            .write()
            .map(|mut map| map.drain().map(|(_, handle)| handle).collect())
            .unwrap_or_default();
        for handle in handles {
            handle.stop().await;
        }

        let removed: Vec<Uuid> = self
            .subscriptions()
            .into_values()
            .flatten()
            .collect();
        for subscriber_id in removed {
            self.registry.remove_all_for(subscriber_id);
        }

        self.clock.shutdown().await;
        info!(node_id = %self.config.node_id, "Event bus shut down");
    }

    /// Stamp-free fan-out of an already-built event.
    fn fan_out(&self, event: Event) -> usize {
        self.stats.events_published.fetch_add(1, Ordering::Relaxed);

        let targets = self.registry.lookup(&event.event_type);
        if targets.is_empty() {
            debug!(event_type = %event.event_type, "Event published with no subscribers");
            return 0;
        }

        let mut handed_off = 0;
        let mut dead: Vec<Uuid> = Vec::new();

        for target in &targets {
            let result = match target {
                DeliveryTarget::Direct(subscriber) => {
                    subscriber.try_deliver(Delivery::Single(event.clone()))
                }
                DeliveryTarget::Ordered(ordered) => ordered.submit(event.clone()),
            };

            match result {
                Ok(()) => {
                    handed_off += 1;
                    self.stats.events_delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(DeliveryError::Full) => {
                    self.stats.dropped_queue_full.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        event_type = %event.event_type,
                        subscriber = %target.subscriber_id(),
                        "Subscriber queue full, event dropped"
                    );
                }
                Err(DeliveryError::Closed) => {
                    self.stats
                        .dropped_dead_subscriber
                        .fetch_add(1, Ordering::Relaxed);
                    dead.push(target.subscriber_id());
                }
            }
        }

        for subscriber_id in dead {
            self.cleanup_subscriber(subscriber_id);
        }

        handed_off
    }

    /// Dead-subscriber garbage collection: remove every registry entry and
    /// stop any ordered instances owned by the subscriber.
    fn cleanup_subscriber(&self, subscriber_id: Uuid) {
        let removed = self.registry.remove_all_for(subscriber_id);
        if removed.is_empty() {
            return;
        }

        debug!(
            subscriber = %subscriber_id,
            subscriptions = removed.len(),
            "Cleaning up dead subscriber"
        );

        if let Ok(mut ordered) = self.ordered.write() {
            ordered.retain(|(_, id), _| *id != subscriber_id);
        }

        for (_, target) in removed {
            if let DeliveryTarget::Ordered(handle) = target {
                tokio::spawn(async move { handle.stop().await });
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish_event(&self, event: Event) -> usize {
        self.fan_out(event)
    }

    fn events_published(&self) -> u64 {
        self.stats.events_published.load(Ordering::Relaxed)
    }
}
