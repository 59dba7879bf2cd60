//! Broadcast channel for settlement events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. The settlement
//! service and the side-effect orchestrator publish through it; the audit
//! logger (and tests) subscribe.

use tokio::sync::broadcast;

use super::SettlementEvent;

/// Broadcast bus for [`SettlementEvent`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity.
/// When the ring buffer is full, the oldest events are dropped for lagging
/// receivers; nothing in the pipeline depends on delivery.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SettlementEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    /// If there are no active receivers, the event is silently dropped.
    pub fn publish(&self, event: SettlementEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver that will receive all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SettlementEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{OrderId, OrderStatus, SettlementSource};
    use chrono::Utc;

    fn make_event(order_id: OrderId) -> SettlementEvent {
        SettlementEvent::OrderTransitioned {
            order_id,
            from: OrderStatus::Pending,
            to: OrderStatus::Paid,
            payment_id: Some("pay_1".to_string()),
            source: SettlementSource::Verification,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn publish_without_receivers_returns_zero() {
        let bus = EventBus::new(16);
        assert_eq!(bus.publish(make_event(OrderId::new())), 0);
    }

    #[tokio::test]
    async fn subscriber_receives_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let id = OrderId::new();
        bus.publish(make_event(id));

        let Ok(event) = rx.recv().await else {
            panic!("expected to receive event");
        };
        assert_eq!(event.order_id(), Some(id));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let id = OrderId::new();
        assert_eq!(bus.publish(make_event(id)), 2);

        let (Ok(e1), Ok(e2)) = (rx1.recv().await, rx2.recv().await) else {
            panic!("receivers failed");
        };
        assert_eq!(e1.order_id(), e2.order_id());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let bus = EventBus::new(0);
        let _rx = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);
    }
}
