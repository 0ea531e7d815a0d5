use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::ContentEvent;

/// In-process event bus backed by `tokio::broadcast`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<ContentEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: ContentEvent) -> Result<usize, broadcast::error::SendError<ContentEvent>> {
        self.sender.send(event)
    }

    /// Publish and ignore the "no subscribers" case. Writes never fail on
    /// account of nobody listening.
    pub fn emit(&self, event: ContentEvent) {
        if let Err(err) = self.publish(event) {
            tracing::debug!(event = ?err.0, "no subscribers for content event");
        }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ContentEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::content::{ContentKind, ContentRef};

    fn insight() -> ContentRef {
        ContentRef::new(ContentKind::Insight, 1)
    }

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(ContentEvent::EntrySaved { content: insight() }).unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event, ContentEvent::EntrySaved { content: insight() });
    }

    #[tokio::test]
    async fn multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.subscriber_count(), 2);

        let link_id = Uuid::now_v7();
        bus.publish(ContentEvent::PreviewLinkRevoked { link_id }).unwrap();

        assert!(matches!(rx1.recv().await.unwrap(), ContentEvent::PreviewLinkRevoked { .. }));
        assert!(matches!(rx2.recv().await.unwrap(), ContentEvent::PreviewLinkRevoked { .. }));
    }

    #[test]
    fn emit_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.emit(ContentEvent::EntrySaved { content: insight() });
        assert_eq!(bus.subscriber_count(), 0);
    }
}
