//! Broadcast event bus for distributing `AgentEvent` to multiple subscribers.
//!
//! Built on `tokio::sync::broadcast`, the `EventBus` supports multiple
//! concurrent subscribers. Publishing with no active subscribers is a no-op.
//! Because a turn's events are published from a single worker task, per-turn
//! fragment ordering is preserved for every subscriber.

use tokio::sync::broadcast;
use valet_types::event::AgentEvent;

/// Multi-consumer event bus for turn lifecycle events.
///
/// Wraps a `tokio::sync::broadcast` channel. Cloning the bus clones the
/// sender, allowing multiple producers and consumers.
pub struct EventBus {
    sender: broadcast::Sender<AgentEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no subscribers, the event is silently dropped.
    pub fn publish(&self, event: AgentEvent) {
        let _ = self.sender.send(event);
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample_event() -> AgentEvent {
        AgentEvent::StreamEnd {
            conversation_id: Uuid::now_v7(),
            channel: "webchat".to_string(),
        }
    }

    #[tokio::test]
    async fn publish_and_subscribe_delivers_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(sample_event());

        let received = rx.recv().await.unwrap();
        assert!(matches!(received, AgentEvent::StreamEnd { .. }));
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive_event() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(sample_event());

        assert!(matches!(rx1.recv().await.unwrap(), AgentEvent::StreamEnd { .. }));
        assert!(matches!(rx2.recv().await.unwrap(), AgentEvent::StreamEnd { .. }));
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new(16);
        bus.publish(sample_event());
        bus.publish(sample_event());
    }

    #[tokio::test]
    async fn fragment_ordering_preserved_per_subscriber() {
        let bus = EventBus::new(64);
        let mut rx = bus.subscribe();
        let conversation_id = Uuid::now_v7();

        for i in 0..10 {
            bus.publish(AgentEvent::StreamFragment {
                conversation_id,
                channel: "webchat".to_string(),
                text: format!("{i}"),
            });
        }

        for i in 0..10 {
            match rx.recv().await.unwrap() {
                AgentEvent::StreamFragment { text, .. } => assert_eq!(text, format!("{i}")),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[test]
    fn clone_shares_channel() {
        let bus = EventBus::new(16);
        let bus2 = bus.clone();
        let mut rx = bus.subscribe();

        bus2.publish(sample_event());

        assert!(rx.try_recv().is_ok());
    }
}
