//! Broadcast engine: the per-message path between an authenticated
//! connection and the message store.
//!
//! An inbound message moves through Received → Validated → Persisted →
//! Broadcast, with two exit states reported to the sender only: invalid
//! input (checked before any store access) and an unreachable store
//! (probed before the write is attempted). Persist and fan-out run under
//! one lock so every connection observes broadcasts in commit order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::ChatError;
use crate::models::{validate_message, ChatMessage};
use crate::store::MessageStore;

use super::registry::{ConnectionId, ConnectionRegistry};

/// How many messages a history replay returns.
pub const HISTORY_LIMIT: usize = 50;

/// Client-to-server events, carried as JSON text frames.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Publish a chat message to everyone.
    Message { author: String, body: String },
    /// Request the recent-history snapshot. `request_id` is the optional
    /// completion handback, echoed on the reply when present.
    LoadHistory {
        #[serde(default, rename = "requestId")]
        request_id: Option<String>,
    },
}

/// Server-to-client events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// An accepted message, fanned out to every connection.
    Message {
        #[serde(flatten)]
        message: ChatMessage,
    },
    /// A rejection, delivered to the offending sender only.
    Error { reason: String },
    /// Recent-history snapshot, delivered to the requester only.
    HistoryLoaded {
        #[serde(
            default,
            rename = "requestId",
            skip_serializing_if = "Option::is_none"
        )]
        request_id: Option<String>,
        messages: Vec<ChatMessage>,
    },
}

/// Coordinates validation, persistence, and fan-out. Owns no persistent
/// state of its own; the store owns message identity and the registry owns
/// connection membership.
pub struct BroadcastEngine {
    store: Arc<dyn MessageStore>,
    registry: Arc<ConnectionRegistry>,
    /// Serializes append commit and fan-out, making commit order the
    /// broadcast order. Validation and liveness probes stay outside.
    publish_lock: Mutex<()>,
}

impl BroadcastEngine {
    pub fn new(store: Arc<dyn MessageStore>, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            store,
            registry,
            publish_lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn store(&self) -> &dyn MessageStore {
        self.store.as_ref()
    }

    /// Run one inbound message through the state machine. On success the
    /// accepted message has already been fanned out, sender included; on
    /// rejection the error is returned for the transport to report to the
    /// sender alone.
    pub async fn publish(
        &self,
        sender: ConnectionId,
        author: &str,
        body: &str,
    ) -> Result<ChatMessage, ChatError> {
        // Received → Validated: malformed input never reaches the store.
        let (author, body) = validate_message(author, body).map_err(|err| {
            debug!(connection = %sender, error = %err, "Rejected invalid message");
            ChatError::from(err)
        })?;

        // Probe liveness before attempting the write, so a dead store is a
        // clean rejection rather than a hung append.
        if !self.store.ping().await {
            warn!(connection = %sender, "Rejected message, store unreachable");
            return Err(ChatError::Unavailable);
        }

        // Persisted → Broadcast: at most one message sits between append
        // commit and fan-out completion.
        let _guard = self.publish_lock.lock().await;
        let message = self.store.append(&author, &body).await?;
        let delivered = self.registry.broadcast(&ServerEvent::Message {
            message: message.clone(),
        });

        debug!(
            message_id = %message.id,
            author = %message.author,
            delivered,
            "Message broadcast"
        );

        Ok(message)
    }

    /// Best-effort recent-history read for one requester. An unreachable or
    /// failing store degrades to an empty snapshot, never an error.
    pub async fn replay(&self, limit: usize) -> Vec<ChatMessage> {
        if !self.store.ping().await {
            warn!("History requested while store unreachable, returning empty");
            return Vec::new();
        }

        match self.store.recent(limit).await {
            Ok(messages) => messages,
            Err(err) => {
                warn!(error = %err, "History query failed, returning empty");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_client_event_parsing() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"message","author":"Ana","body":"gl furia"}"#).unwrap();
        assert!(matches!(event, ClientEvent::Message { .. }));

        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"loadHistory","requestId":"req-1"}"#).unwrap();
        match event {
            ClientEvent::LoadHistory { request_id } => {
                assert_eq!(request_id.as_deref(), Some("req-1"))
            }
            other => panic!("unexpected event: {:?}", other),
        }

        // The handback is optional.
        let event: ClientEvent = serde_json::from_str(r#"{"type":"loadHistory"}"#).unwrap();
        assert!(matches!(
            event,
            ClientEvent::LoadHistory { request_id: None }
        ));
    }

    #[test]
    fn test_message_event_flattens_fields() {
        let event = ServerEvent::Message {
            message: ChatMessage {
                id: Uuid::nil(),
                author: "Ana".to_string(),
                body: "gl furia".to_string(),
                created_at: Utc::now(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["author"], "Ana");
        assert_eq!(json["body"], "gl furia");
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn test_history_reply_omits_absent_handback() {
        let event = ServerEvent::HistoryLoaded {
            request_id: None,
            messages: Vec::new(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "historyLoaded");
        assert!(json.get("requestId").is_none());
    }
}
