//! Message store boundary.
//!
//! The broadcast core persists through [`MessageStore`] and never touches a
//! concrete backend directly. Production uses Postgres; tests run against
//! the in-memory store.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::db::{self, DbPool};
use crate::error::StoreError;
use crate::models::{validate_message, ChatMessage};

/// Append-and-query log of chat messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Validate and persist a message, assigning id and timestamp with the
    /// write. The returned message is visible to `recent` calls issued
    /// after this returns.
    async fn append(&self, author: &str, body: &str) -> Result<ChatMessage, StoreError>;

    /// The `limit` most recent messages, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<ChatMessage>, StoreError>;

    /// Cheap reachability probe.
    async fn ping(&self) -> bool;
}

/// Postgres-backed store used in production.
pub struct PgMessageStore {
    pool: DbPool,
}

impl PgMessageStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn append(&self, author: &str, body: &str) -> Result<ChatMessage, StoreError> {
        let (author, body) = validate_message(author, body)?;
        db::insert_message(&self.pool, &author, &body)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "Message insert failed");
                StoreError::Unavailable
            })
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChatMessage>, StoreError> {
        db::recent_messages(&self.pool, limit as i64)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, "Recent messages query failed");
                StoreError::Unavailable
            })
    }

    async fn ping(&self) -> bool {
        db::ping(&self.pool).await
    }
}

/// In-memory store for tests and local runs without a database.
/// Reachability can be toggled to exercise the unavailable paths.
pub struct MemoryStore {
    messages: RwLock<Vec<ChatMessage>>,
    reachable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
            reachable: AtomicBool::new(true),
        }
    }

    /// Simulate the backing store dropping off the network.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Number of messages held, for test assertions.
    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append(&self, author: &str, body: &str) -> Result<ChatMessage, StoreError> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        let (author, body) = validate_message(author, body)?;
        let message = ChatMessage {
            id: Uuid::new_v4(),
            author,
            body,
            created_at: Utc::now(),
        };
        self.messages.write().push(message.clone());
        Ok(message)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChatMessage>, StoreError> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        let messages = self.messages.read();
        Ok(messages.iter().rev().take(limit).cloned().collect())
    }

    async fn ping(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_assigns_identity() {
        let store = MemoryStore::new();
        let before = Utc::now();

        let message = store.append("Ana", "gl furia").await.unwrap();
        assert_eq!(message.author, "Ana");
        assert_eq!(message.body, "gl furia");
        assert!(message.created_at >= before);

        // Read-your-own-write: the append is visible to a later query.
        let recent = store.recent(1).await.unwrap();
        assert_eq!(recent, vec![message]);
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_and_bounded() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.append("Ana", &format!("message {}", i)).await.unwrap();
        }

        let recent = store.recent(3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].body, "message 4");
        assert_eq!(recent[2].body, "message 2");
    }

    #[tokio::test]
    async fn test_invalid_append_writes_nothing() {
        let store = MemoryStore::new();
        assert!(store.append("", "hello").await.is_err());
        assert!(store.append("Ana", &"b".repeat(501)).await.is_err());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_both_paths() {
        let store = MemoryStore::new();
        store.set_reachable(false);

        assert!(!store.ping().await);
        assert!(matches!(
            store.append("Ana", "hello").await,
            Err(StoreError::Unavailable)
        ));
        assert!(matches!(
            store.recent(10).await,
            Err(StoreError::Unavailable)
        ));
    }
}
