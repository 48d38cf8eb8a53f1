//! Chunk lifecycle events.
//!
//! [`EventBus`] wraps a `tokio::sync::broadcast` channel so any number of
//! observers (a storage monitor, a UI showing the buffered range) can follow
//! chunks being finished and evicted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::ids::ChunkId;

/// What happened to a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChunkEventKind {
    /// The chunk's write access was finalized with a successor.
    Finished,
    /// The chunk was released and its backing file removed.
    Deleted,
}

/// A timestamped chunk lifecycle event ready for broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The chunk concerned.
    pub chunk_id: ChunkId,
    /// Backing file of the chunk.
    pub path: PathBuf,
    /// Stream time of the chunk's first sample.
    pub start_position_us: i64,
    /// Bytes written to the chunk.
    pub size: u64,
    /// What happened.
    pub kind: ChunkEventKind,
}

impl ChunkEvent {
    /// Create a new event with a fresh UUID and the current timestamp.
    pub fn new(
        kind: ChunkEventKind,
        chunk_id: ChunkId,
        path: PathBuf,
        start_position_us: i64,
        size: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            chunk_id,
            path,
            start_position_us,
            size,
            kind,
        }
    }
}

/// Broadcast channel for chunk lifecycle events.
pub struct EventBus {
    tx: broadcast::Sender<ChunkEvent>,
}

impl EventBus {
    /// Create a new event bus. Subscribers lagging more than `capacity`
    /// events behind lose the oldest ones.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<ChunkEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Broadcast an event to all current subscribers.
    pub fn publish(&self, event: ChunkEvent) {
        tracing::trace!(chunk = %event.chunk_id, kind = ?event.kind, "publishing chunk event");
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(start: i64) -> ChunkEvent {
        ChunkEvent::new(
            ChunkEventKind::Finished,
            ChunkId::new(),
            PathBuf::from("/tmp/chunk"),
            start,
            83,
        )
    }

    #[test]
    fn publish_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let event = finished(0);
        let chunk_id = event.chunk_id;
        bus.publish(event);

        let received = rx.try_recv().unwrap();
        assert_eq!(received.chunk_id, chunk_id);
        assert_eq!(received.kind, ChunkEventKind::Finished);
        assert_eq!(received.size, 83);
    }

    #[test]
    fn every_subscriber_sees_each_event() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        for i in 0..3 {
            bus.publish(finished(i * 1_000_000));
        }
        for rx in [&mut a, &mut b] {
            let starts: Vec<i64> = (0..3)
                .map(|_| rx.try_recv().unwrap().start_position_us)
                .collect();
            assert_eq!(starts, vec![0, 1_000_000, 2_000_000]);
        }
    }

    #[test]
    fn slow_subscriber_lags() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for i in 0..4 {
            bus.publish(finished(i));
        }
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(2))
        ));
        assert_eq!(rx.try_recv().unwrap().start_position_us, 2);
    }

    #[test]
    fn no_subscribers_does_not_panic() {
        let bus = EventBus::new(4);
        bus.publish(finished(0));
    }

    #[test]
    fn event_serde_roundtrip() {
        let event = ChunkEvent::new(
            ChunkEventKind::Deleted,
            ChunkId::new(),
            PathBuf::from("/buffer/0001"),
            33_000,
            0,
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"deleted\""));
        let back: ChunkEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, event.id);
        assert_eq!(back.kind, ChunkEventKind::Deleted);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let bus = EventBus::new(0);
        let mut rx = bus.subscribe();
        bus.publish(finished(0));
        assert!(rx.try_recv().is_ok());
    }
}
