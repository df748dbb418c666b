//! Per-room broadcast channels feeding the SSE streams.

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Fan-out hub holding one broadcast channel per room.
///
/// Channels are created lazily on first use and dropped when the room
/// closes; subscribers of a dropped channel drain what is buffered and then
/// see their stream end.
pub struct RoomEventHub {
    channels: DashMap<String, broadcast::Sender<ServerEvent>>,
    capacity: usize,
}

impl RoomEventHub {
    /// Build a hub whose per-room channels buffer `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity,
        }
    }

    /// Register a subscriber for the room's events.
    pub fn subscribe(&self, code: &str) -> broadcast::Receiver<ServerEvent> {
        self.channels
            .entry(code.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Send an event to every current subscriber of the room, ignoring
    /// delivery errors. A room nobody listens to drops events on the floor.
    pub fn broadcast(&self, code: &str, event: ServerEvent) {
        if let Some(sender) = self.channels.get(code) {
            let _ = sender.send(event);
        }
    }

    /// Tear down the room's channel so subscriber streams terminate.
    pub fn close_room(&self, code: &str) {
        self.channels.remove(code);
    }
}
