//! End-to-end ordering contracts: ordered subscribers see non-decreasing
//! HLC order within a window, unordered subscribers see arrival order.

#[cfg(test)]
mod tests {
    use super::super::fixtures::stamped_event;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use vsm_bus::{Delivery, EventBus, EventPublisher, SubscriberHandle, SubscriptionOptions};

    async fn collect(rx: &mut mpsc::Receiver<Delivery>, count: usize) -> Vec<vsm_types::Event> {
        let mut events = Vec::new();
        while events.len() < count {
            match timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("timeout waiting for delivery")
                .expect("channel closed")
            {
                Delivery::Single(event) => events.push(event),
                Delivery::Batch(batch) => events.extend(batch),
            }
        }
        events
    }

    /// Three events published in wall order E1, E2, E3 but stamped so that
    /// E2 causally precedes E1. An ordered subscriber receives E2, E1, E3.
    #[tokio::test]
    async fn test_out_of_order_arrival_delivered_in_causal_order() {
        let bus = EventBus::default();
        let (subscriber, mut rx) = SubscriberHandle::channel(16);
        bus.subscribe("operations.tick", subscriber, SubscriptionOptions::ordered(50))
            .unwrap();

        let e1 = stamped_event("operations.tick", 100, 0);
        let e2 = stamped_event("operations.tick", 50, 0);
        let e3 = stamped_event("operations.tick", 150, 0);
        let expected = vec![e2.id, e1.id, e3.id];

        for event in [e1, e2, e3] {
            bus.publish_event(event).await;
        }

        let received: Vec<_> = collect(&mut rx, 3).await.iter().map(|e| e.id).collect();
        assert_eq!(received, expected);
    }

    #[tokio::test]
    async fn test_randomized_arrival_is_sorted_per_window() {
        use rand::seq::SliceRandom;

        let bus = EventBus::default();
        let (subscriber, mut rx) = SubscriberHandle::channel(256);
        bus.subscribe(
            "operations.tick",
            subscriber,
            SubscriptionOptions {
                adaptive_window: false,
                ..SubscriptionOptions::ordered(100)
            },
        )
        .unwrap();

        let mut physicals: Vec<u64> = (1..=40).collect();
        physicals.shuffle(&mut rand::thread_rng());
        for physical in physicals {
            bus.publish_event(stamped_event("operations.tick", physical, 0))
                .await;
        }

        // Every event lands in the same window, so the full sequence is
        // globally sorted, not just per-flush.
        let received: Vec<_> = collect(&mut rx, 40)
            .await
            .iter()
            .map(|e| e.timestamp.clone())
            .collect();
        let mut sorted = received.clone();
        sorted.sort();
        assert_eq!(received, sorted);
    }

    /// The same publish stream feeds both subscriber kinds: the unordered
    /// one sees arrival order immediately, the ordered one sees HLC order.
    #[tokio::test]
    async fn test_mixed_ordered_and_unordered_subscribers() {
        let bus = EventBus::default();

        let (ordered_sub, mut ordered_rx) = SubscriberHandle::channel(16);
        bus.subscribe("operations.tick", ordered_sub, SubscriptionOptions::ordered(50))
            .unwrap();

        let (direct_sub, mut direct_rx) = SubscriberHandle::channel(16);
        bus.subscribe("operations.tick", direct_sub, SubscriptionOptions::default())
            .unwrap();

        let arrivals = vec![
            stamped_event("operations.tick", 30, 0),
            stamped_event("operations.tick", 10, 0),
            stamped_event("operations.tick", 20, 0),
        ];
        let arrival_ids: Vec<_> = arrivals.iter().map(|e| e.id).collect();
        for event in arrivals {
            bus.publish_event(event).await;
        }

        let direct: Vec<_> = collect(&mut direct_rx, 3).await.iter().map(|e| e.id).collect();
        assert_eq!(direct, arrival_ids, "direct delivery preserves arrival order");

        let ordered: Vec<_> = collect(&mut ordered_rx, 3)
            .await
            .iter()
            .map(|e| e.timestamp.physical)
            .collect();
        assert_eq!(ordered, vec![10, 20, 30], "ordered delivery sorts by HLC");
    }

    /// Live-clock stamps are strictly increasing per publisher, so an
    /// ordered subscriber never sees them regress even across flushes.
    #[tokio::test]
    async fn test_live_clock_publishes_never_regress() {
        let bus = EventBus::default();
        let (subscriber, mut rx) = SubscriberHandle::channel(64);
        bus.subscribe("operations.tick", subscriber, SubscriptionOptions::ordered(10))
            .unwrap();

        for sequence in 0..30 {
            bus.publish("operations.tick", serde_json::json!({"sequence": sequence}))
                .await;
        }

        let received: Vec<_> = collect(&mut rx, 30)
            .await
            .iter()
            .map(|e| e.timestamp.clone())
            .collect();
        for pair in received.windows(2) {
            assert!(pair[0] < pair[1], "stamps must be strictly increasing");
        }
    }

    #[tokio::test]
    async fn test_batch_subscription_receives_sorted_batches() {
        let bus = EventBus::default();
        let (subscriber, mut rx) = SubscriberHandle::channel(16);
        bus.subscribe(
            "operations.tick",
            subscriber,
            SubscriptionOptions {
                batch_delivery: true,
                ..SubscriptionOptions::ordered(50)
            },
        )
        .unwrap();

        bus.publish_event(stamped_event("operations.tick", 300, 0)).await;
        bus.publish_event(stamped_event("operations.tick", 100, 0)).await;
        bus.publish_event(stamped_event("operations.tick", 200, 0)).await;

        match timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed")
        {
            Delivery::Batch(batch) => {
                let physicals: Vec<_> = batch.iter().map(|e| e.timestamp.physical).collect();
                assert_eq!(physicals, vec![100, 200, 300]);
            }
            Delivery::Single(_) => panic!("batch subscription must receive batches"),
        }
    }
}
