//! # Subscription Registry
//!
//! The type→targets multi-map consulted on every publish. Reads are short
//! clone-outs under a `RwLock` so concurrent fan-outs see consistent
//! snapshots without holding the lock across delivery.

use crate::ordered::OrderedHandle;
use crate::subscriber::SubscriberHandle;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Where a registered event type routes to.
#[derive(Debug, Clone)]
pub enum DeliveryTarget {
    /// Deliver straight to the subscriber queue, arrival order.
    Direct(SubscriberHandle),
    /// Hand off to the subscriber's ordered-delivery actor.
    Ordered(OrderedHandle),
}

impl DeliveryTarget {
    /// Identity of the subscriber behind this target.
    #[must_use]
    pub fn subscriber_id(&self) -> Uuid {
        match self {
            Self::Direct(handle) => handle.id(),
            Self::Ordered(handle) => handle.subscriber_id(),
        }
    }
}

/// Concurrent multi-map from event type to delivery targets.
///
/// Insert de-duplicates on `(event_type, subscriber id)`: subscribing the
/// same subscriber to the same type twice is a no-op rather than a source
/// of double delivery.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    inner: RwLock<HashMap<String, Vec<DeliveryTarget>>>,
}

impl SubscriptionRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target for an event type.
    ///
    /// Returns `false` (and leaves the registry unchanged) if the subscriber
    /// already has a target for this type.
    pub fn insert(&self, event_type: &str, target: DeliveryTarget) -> bool {
        let Ok(mut map) = self.inner.write() else {
            return false;
        };
        let targets = map.entry(event_type.to_string()).or_default();
        if targets
            .iter()
            .any(|t| t.subscriber_id() == target.subscriber_id())
        {
            return false;
        }
        targets.push(target);
        true
    }

    /// Remove the subscriber's target for one event type.
    ///
    /// Returns the removed target, if any.
    pub fn remove(&self, event_type: &str, subscriber_id: Uuid) -> Option<DeliveryTarget> {
        let Ok(mut map) = self.inner.write() else {
            return None;
        };
        let targets = map.get_mut(event_type)?;
        let position = targets
            .iter()
            .position(|t| t.subscriber_id() == subscriber_id)?;
        let removed = targets.swap_remove(position);
        if targets.is_empty() {
            map.remove(event_type);
        }
        Some(removed)
    }

    /// Remove every target belonging to a subscriber, across all event
    /// types. Used on dead-subscriber cleanup.
    ///
    /// Returns the removed `(event_type, target)` pairs so the caller can
    /// stop any ordered-delivery actors among them.
    pub fn remove_all_for(&self, subscriber_id: Uuid) -> Vec<(String, DeliveryTarget)> {
        let Ok(mut map) = self.inner.write() else {
            return Vec::new();
        };
        let mut removed = Vec::new();
        map.retain(|event_type, targets| {
            let mut index = 0;
            while index < targets.len() {
                if targets[index].subscriber_id() == subscriber_id {
                    removed.push((event_type.clone(), targets.swap_remove(index)));
                } else {
                    index += 1;
                }
            }
            !targets.is_empty()
        });
        removed
    }

    /// Current targets for an event type, as an owned snapshot for fan-out.
    #[must_use]
    pub fn lookup(&self, event_type: &str) -> Vec<DeliveryTarget> {
        let Ok(map) = self.inner.read() else {
            return Vec::new();
        };
        map.get(event_type).cloned().unwrap_or_default()
    }

    /// Introspection view: event type → subscriber ids.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, Vec<Uuid>> {
        let Ok(map) = self.inner.read() else {
            return HashMap::new();
        };
        map.iter()
            .map(|(event_type, targets)| {
                (
                    event_type.clone(),
                    targets.iter().map(DeliveryTarget::subscriber_id).collect(),
                )
            })
            .collect()
    }

    /// Total number of `(event_type, target)` pairs.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        let Ok(map) = self.inner.read() else {
            return 0;
        };
        map.values().map(Vec::len).sum()
    }
}
