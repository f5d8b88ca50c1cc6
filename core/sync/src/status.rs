//! Status events emitted to listeners after successful sync work.

use std::fmt;

use tokio::sync::broadcast;
use tracing::trace;

use gasp_common::{EntityId, EntityKind};

use crate::engine::SyncResult;

/// Outcome of a completed pass or targeted update.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// A bulk pass finished.
    Synced(SyncResult),
    /// A single record was fetched and stored.
    Updated { kind: EntityKind, id: EntityId },
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusEvent::Synced(result) => write!(f, "{}", result),
            StatusEvent::Updated { kind, id } => write!(f, "Loaded {}: {}", kind.label(), id),
        }
    }
}

/// Destination for status events.
///
/// The sync core only produces events; rendering them is up to the sink.
pub trait StatusSink: Send + Sync {
    fn publish(&self, event: StatusEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl StatusSink for NullSink {
    fn publish(&self, _event: StatusEvent) {}
}

/// Fans status events out to any number of subscribers.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<StatusEvent>,
}

impl BroadcastSink {
    /// Create a sink buffering up to `capacity` events per lagging subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.tx.subscribe()
    }
}

impl StatusSink for BroadcastSink {
    fn publish(&self, event: StatusEvent) {
        if self.tx.send(event).is_err() {
            trace!("No status subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updated_message() {
        let event = StatusEvent::Updated {
            kind: EntityKind::Review,
            id: EntityId::new(42),
        };
        assert_eq!(event.to_string(), "Loaded review: 42");
    }

    #[tokio::test]
    async fn test_broadcast_delivers_to_subscribers() {
        let sink = BroadcastSink::new(8);
        let mut first = sink.subscribe();
        let mut second = sink.subscribe();

        let event = StatusEvent::Updated {
            kind: EntityKind::User,
            id: EntityId::new(3),
        };
        sink.publish(event.clone());

        assert_eq!(first.recv().await.unwrap(), event);
        assert_eq!(second.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let sink = BroadcastSink::new(1);
        sink.publish(StatusEvent::Updated {
            kind: EntityKind::User,
            id: EntityId::new(1),
        });
    }
}
