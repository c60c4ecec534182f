//! Tracks live, authenticated connections and owns the fan-out set.

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::engine::ServerEvent;

/// Identifier for one WebSocket connection, unique for the process lifetime.
pub type ConnectionId = Uuid;

/// Outbound channel half handed over at registration time.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Handshake gate: accept only an exact match with the process-wide shared
/// secret. Rejected connections are terminated before any event handling.
pub fn authenticate(token: &str, shared_secret: &str) -> bool {
    token == shared_secret
}

/// Fan-out set of open, authenticated connections.
///
/// Register and unregister are idempotent and non-blocking. Broadcasts
/// snapshot the current membership before sending, so concurrent joins and
/// leaves never disturb a delivery pass in progress.
#[derive(Default)]
pub struct ConnectionRegistry {
    peers: DashMap<ConnectionId, EventSender>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            peers: DashMap::new(),
        }
    }

    /// Add an authenticated connection. Re-registering an id replaces its
    /// sender; deliveries are never duplicated.
    pub fn register(&self, id: ConnectionId, sender: EventSender) {
        self.peers.insert(id, sender);
    }

    /// Remove a connection. Unknown ids are ignored.
    pub fn unregister(&self, id: &ConnectionId) {
        self.peers.remove(id);
    }

    /// Number of open connections, for diagnostics.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Deliver an event to every registered connection, returning how many
    /// accepted it. A connection whose receiver is gone is skipped; its
    /// socket task unregisters it on teardown.
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        let targets: Vec<(ConnectionId, EventSender)> = self
            .peers
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let mut delivered = 0;
        for (id, sender) in targets {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(connection = %id, "Skipping closed connection");
            }
        }
        delivered
    }

    /// Deliver an event to a single connection, if still registered.
    pub fn send_to(&self, id: &ConnectionId, event: ServerEvent) {
        if let Some(sender) = self.peers.get(id) {
            let _ = sender.send(event);
        }
    }
}
