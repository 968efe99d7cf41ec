//! Lifecycle bus for subscriptions.
//!
//! The connection manager publishes a [`LifecycleEvent`] whenever a
//! subscription connects, starts or finishes a reconnect, is evicted, or is
//! torn down. The stdio server turns each one into a `notification` line.
//! Subscribers that fall more than [`BUS_CAPACITY`] events behind see
//! `Lagged` and skip ahead.

use tokio::sync::broadcast;
use tracing::debug;

use tap_types::subscription::LifecycleEvent;

pub const BUS_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }

    /// Returns how many receivers saw the event; zero is not an error.
    pub fn publish(&self, event: LifecycleEvent) -> usize {
        debug!(key = event.key(), "lifecycle {event:?}");
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_sees_each_event_in_order() {
        let bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let connected = LifecycleEvent::Connected {
            key: "@a".into(),
            room_id: "r1".into(),
        };
        let evicted = LifecycleEvent::Evicted {
            key: "@a".into(),
            attempts: 5,
        };
        assert_eq!(bus.publish(connected.clone()), 2);
        bus.publish(evicted.clone());

        for rx in [&mut first, &mut second] {
            assert_eq!(rx.recv().await.unwrap(), connected);
            assert_eq!(rx.recv().await.unwrap(), evicted);
        }
    }

    #[test]
    fn publishing_with_no_subscribers_reaches_nobody() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(LifecycleEvent::Disconnected { key: "@a".into() }), 0);
    }
}
