//! # Subscriber Handles
//!
//! The delivery side of the bus. A subscriber is a bounded mpsc channel;
//! the bus holds the sending half, the subscriber consumes the receiving
//! half. Dropping the receiver closes the channel, and that closure is the
//! liveness signal the bus uses to garbage-collect dead subscriptions.

use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;
use vsm_types::Event;

/// What a subscriber receives on its channel.
#[derive(Debug, Clone)]
pub enum Delivery {
    /// One event. The normal shape for direct subscribers, bypassed events,
    /// and ordered subscriptions without batch delivery.
    Single(Event),
    /// One flush of an ordered buffer, sorted ascending by HLC timestamp.
    /// Only produced when the subscription asked for `batch_delivery`.
    Batch(Vec<Event>),
}

/// Errors from a non-blocking delivery attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The subscriber's queue is full; the event was dropped (counted by
    /// the bus, never blocks the publisher).
    #[error("subscriber queue full")]
    Full,

    /// The subscriber dropped its receiver; it is dead and its
    /// subscriptions will be cleaned up.
    #[error("subscriber channel closed")]
    Closed,
}

/// The bus-side handle to one subscriber.
#[derive(Debug, Clone)]
pub struct SubscriberHandle {
    id: Uuid,
    sender: mpsc::Sender<Delivery>,
}

impl SubscriberHandle {
    /// Create a subscriber channel with the given queue capacity.
    ///
    /// Returns the handle to register with the bus and the receiver the
    /// subscriber consumes.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Delivery>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (
            Self {
                id: Uuid::new_v4(),
                sender,
            },
            receiver,
        )
    }

    /// The subscriber's stable identity.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Attempt a non-blocking delivery.
    ///
    /// # Errors
    ///
    /// - `DeliveryError::Full` - queue at capacity, event dropped
    /// - `DeliveryError::Closed` - subscriber is gone
    pub fn try_deliver(&self, delivery: Delivery) -> Result<(), DeliveryError> {
        self.sender.try_send(delivery).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// True once the subscriber has dropped its receiver.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
