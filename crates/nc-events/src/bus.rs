//! In-process fanout: every producer publishes through one shared
//! `EventBus`; every admin-API SSE connection gets its own receiver.
//! Mirrors the teacher's `StreamProcessor`/watcher split, with a
//! `tokio::sync::broadcast` channel standing in for the Mongo change
//! stream the teacher actually watches.

use crate::event::PipelineEvent;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 1024;

pub struct EventBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes to every current subscriber. A slow or absent subscriber
    /// never blocks the publisher — `send` only fails when there are zero
    /// subscribers, which is the expected idle state and not an error.
    pub fn publish(&self, event: PipelineEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("published event with no active subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_event() -> PipelineEvent {
        PipelineEvent::HealthChanged { component: "db".to_string(), healthy: true, detail: None, at: Utc::now() }
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(sample_event());
        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind(), "health_changed");
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new(8);
        bus.publish(sample_event());
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn multiple_subscribers_each_get_a_copy() {
        let bus = EventBus::new(8);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        bus.publish(sample_event());
        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }
}
