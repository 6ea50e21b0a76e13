//! Subscriber death, unsubscribe, bus shutdown, and degraded-clock
//! operation.

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use tokio::time::timeout;
    use vsm_bus::{Delivery, EventBus, SubscriberHandle, SubscriptionOptions};
    use vsm_types::{ClockError, HlcTimestamp, FALLBACK_NODE_ID};

    /// A direct subscriber that drops its receiver is garbage-collected on
    /// the next publish; later publishes see zero targets.
    #[tokio::test]
    async fn test_dead_direct_subscriber_is_cleaned_up() {
        let bus = EventBus::default();
        let (subscriber, rx) = SubscriberHandle::channel(16);
        bus.subscribe("operations.tick", subscriber, SubscriptionOptions::default())
            .unwrap();
        drop(rx);

        let handed = bus.publish("operations.tick", serde_json::json!({})).await;
        assert_eq!(handed, 0);
        assert!(bus.subscriptions().is_empty());
        assert_eq!(bus.stats().dropped_dead_subscriber, 1);
    }

    /// An ordered subscriber's death is noticed by its delivery actor at
    /// flush time; the bus then drops the registration once the stopped
    /// actor rejects a submit.
    #[tokio::test]
    async fn test_dead_ordered_subscriber_is_cleaned_up() {
        let bus = EventBus::default();
        let (subscriber, rx) = SubscriberHandle::channel(16);
        bus.subscribe("operations.tick", subscriber, SubscriptionOptions::ordered(10))
            .unwrap();
        drop(rx);

        bus.publish("operations.tick", serde_json::json!({})).await;

        timeout(Duration::from_secs(2), async {
            loop {
                bus.publish("operations.tick", serde_json::json!({})).await;
                if bus.subscriptions().is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("dead ordered subscriber should be cleaned up");
    }

    /// One subscriber registered for several types dies once; every
    /// registration goes with it.
    #[tokio::test]
    async fn test_death_removes_all_subscriptions_of_the_subscriber() {
        let bus = EventBus::default();
        let (subscriber, rx) = SubscriberHandle::channel(16);
        bus.subscribe("operations.tick", subscriber.clone(), SubscriptionOptions::default())
            .unwrap();
        bus.subscribe("policy.update", subscriber, SubscriptionOptions::default())
            .unwrap();
        drop(rx);

        bus.publish("operations.tick", serde_json::json!({})).await;

        assert!(bus.subscriptions().is_empty());
    }

    /// Unsubscribing an ordered subscription discards whatever its buffer
    /// still holds.
    #[tokio::test]
    async fn test_unsubscribe_discards_buffered_events() {
        let bus = EventBus::default();
        let (subscriber, mut rx) = SubscriberHandle::channel(16);
        let subscriber_id = subscriber.id();
        bus.subscribe(
            "operations.tick",
            subscriber,
            SubscriptionOptions {
                ordered_delivery: true,
                buffer_window_ms: 5_000,
                min_window_ms: 5_000,
                max_window_ms: 5_000,
                ..SubscriptionOptions::default()
            },
        )
        .unwrap();

        bus.publish("operations.tick", serde_json::json!({})).await;
        bus.unsubscribe("operations.tick", subscriber_id).await;

        let next = timeout(Duration::from_millis(300), rx.recv()).await;
        assert!(
            matches!(next, Ok(None) | Err(_)),
            "buffered event must not be delivered after unsubscribe"
        );
        assert!(bus.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_then_publish_degrades_gracefully() {
        let bus = EventBus::default();
        let (subscriber, _rx) = SubscriberHandle::channel(16);
        bus.subscribe("operations.tick", subscriber, SubscriptionOptions::ordered(50))
            .unwrap();

        bus.shutdown().await;

        let handed = bus.publish("operations.tick", serde_json::json!({})).await;
        assert_eq!(handed, 0);
        assert!(bus.stats().clock_fallbacks > 0);
    }

    /// With the clock actor gone, publishing still works on wall-clock
    /// fallback stamps and subscribers keep receiving events.
    #[tokio::test]
    async fn test_clock_loss_degrades_to_fallback_stamps() {
        let bus = EventBus::default();
        let (subscriber, mut rx) = SubscriberHandle::channel(16);
        bus.subscribe("operations.tick", subscriber, SubscriptionOptions::default())
            .unwrap();

        bus.clock().shutdown().await;

        let handed = bus.publish("operations.tick", serde_json::json!({})).await;
        assert_eq!(handed, 1);

        let event = match timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed")
        {
            Delivery::Single(event) => event,
            Delivery::Batch(_) => panic!("expected single delivery"),
        };
        assert_eq!(event.timestamp.node_id, FALLBACK_NODE_ID);
        assert!(event.timestamp.physical > 0);
        assert!(bus.stats().clock_fallbacks > 0);
    }

    /// A remote stamp too far in the future is rejected and leaves the
    /// local clock untouched.
    #[tokio::test]
    async fn test_remote_drift_is_rejected() {
        let bus = EventBus::default();

        let before = bus.clock().now().await.unwrap();
        let far_future = HlcTimestamp::new(before.physical + 60_000, 0, "remote");

        let result = bus.merge_remote_timestamp(far_future).await;
        assert!(matches!(result, Err(ClockError::DriftExceeded { .. })));

        let after = bus.clock().now().await.unwrap();
        assert!(
            after.physical < before.physical + 30_000,
            "rejected stamp must not advance the clock"
        );
    }

    #[tokio::test]
    async fn test_remote_merge_within_tolerance_advances_clock() {
        let bus = EventBus::default();

        let before = bus.clock().now().await.unwrap();
        let remote = HlcTimestamp::new(before.physical + 500, 3, "remote");

        let merged = bus.merge_remote_timestamp(remote.clone()).await.unwrap();
        assert!(merged > remote, "merged stamp must dominate the remote");
        assert!(merged > before);
    }
}
