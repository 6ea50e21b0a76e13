//! Bypass-path scenarios: urgent events skip the reordering buffer and
//! reach ordered subscribers ahead of anything still waiting on a window.

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use tokio::time::timeout;
    use vsm_bus::{Delivery, EventBus, SubscriberHandle, SubscriptionOptions};
    use vsm_types::{EventPriority, SubsystemId};

    /// An ordered subscription whose window is far longer than the test, so
    /// anything that arrives must have taken the bypass.
    fn slow_window() -> SubscriptionOptions {
        SubscriptionOptions {
            ordered_delivery: true,
            buffer_window_ms: 5_000,
            min_window_ms: 5_000,
            max_window_ms: 5_000,
            ..SubscriptionOptions::default()
        }
    }

    async fn recv_single(
        rx: &mut tokio::sync::mpsc::Receiver<Delivery>,
        wait: Duration,
    ) -> vsm_types::Event {
        match timeout(wait, rx.recv())
            .await
            .expect("timeout waiting for bypass delivery")
            .expect("channel closed")
        {
            Delivery::Single(event) => event,
            Delivery::Batch(_) => panic!("bypass must deliver single events"),
        }
    }

    #[tokio::test]
    async fn test_critical_priority_bypasses_window() {
        let bus = EventBus::default();
        let (subscriber, mut rx) = SubscriberHandle::channel(16);
        let subscriber_id = subscriber.id();
        bus.subscribe("operations.alert", subscriber, slow_window())
            .unwrap();

        bus.publish("operations.alert", serde_json::json!({"routine": true}))
            .await;
        bus.publish_from(
            SubsystemId::System1,
            "operations.alert",
            serde_json::json!({"reactor": "overheat"}),
            EventPriority::Critical,
        )
        .await;

        let event = recv_single(&mut rx, Duration::from_millis(500)).await;
        assert_eq!(event.priority, EventPriority::Critical);
        assert_eq!(event.data["reactor"], "overheat");
        assert!(rx.try_recv().is_err(), "routine event must stay buffered");

        let stats = bus
            .ordered_stats("operations.alert", subscriber_id)
            .expect("ordered stats should exist");
        assert_eq!(stats.bypassed, 1);
    }

    #[tokio::test]
    async fn test_algedonic_type_prefix_bypasses_window() {
        let bus = EventBus::default();
        let (subscriber, mut rx) = SubscriberHandle::channel(16);
        bus.subscribe("algedonic.pain", subscriber, slow_window())
            .unwrap();

        bus.publish_from(
            SubsystemId::Algedonic,
            "algedonic.pain",
            serde_json::json!({"source": "s1"}),
            EventPriority::Routine,
        )
        .await;

        // Urgent by type alone, even at routine priority.
        let event = recv_single(&mut rx, Duration::from_millis(500)).await;
        assert_eq!(event.event_type, "algedonic.pain");
        assert_eq!(event.subsystem, SubsystemId::Algedonic);
    }

    #[tokio::test]
    async fn test_payload_intensity_at_threshold_bypasses() {
        let bus = EventBus::default();
        let (subscriber, mut rx) = SubscriberHandle::channel(16);
        bus.subscribe("operations.reading", subscriber, slow_window())
            .unwrap();

        bus.publish("operations.reading", serde_json::json!({"intensity": 0.5}))
            .await;
        bus.publish("operations.reading", serde_json::json!({"intensity": 0.97}))
            .await;

        let event = recv_single(&mut rx, Duration::from_millis(500)).await;
        assert_eq!(event.data["intensity"], 0.97);
        assert!(rx.try_recv().is_err(), "sub-threshold event must stay buffered");
    }

    #[tokio::test]
    async fn test_custom_bypass_threshold_is_honored() {
        let bus = EventBus::default();
        let (subscriber, mut rx) = SubscriberHandle::channel(16);
        bus.subscribe(
            "operations.reading",
            subscriber,
            SubscriptionOptions {
                algedonic_bypass_threshold: 0.5,
                ..slow_window()
            },
        )
        .unwrap();

        bus.publish("operations.reading", serde_json::json!({"confidence": 0.6}))
            .await;

        let event = recv_single(&mut rx, Duration::from_millis(500)).await;
        assert_eq!(event.data["confidence"], 0.6);
    }

    /// Direct subscribers need no bypass: they receive urgent events the
    /// same way as everything else, immediately.
    #[tokio::test]
    async fn test_direct_subscriber_receives_urgent_immediately() {
        let bus = EventBus::default();
        let (subscriber, mut rx) = SubscriberHandle::channel(16);
        bus.subscribe("algedonic.pain", subscriber, SubscriptionOptions::default())
            .unwrap();

        bus.publish_from(
            SubsystemId::Algedonic,
            "algedonic.pain",
            serde_json::json!({}),
            EventPriority::Critical,
        )
        .await;

        let event = recv_single(&mut rx, Duration::from_millis(500)).await;
        assert_eq!(event.priority, EventPriority::Critical);
    }
}
