//! Shared error types for the chat core.

use thiserror::Error;

/// Errors surfaced by a message store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Field-level rejection: empty after trimming or over the length bound.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The backing store cannot be reached. Transient; callers choose
    /// between an explicit rejection and an empty result.
    #[error("store unavailable")]
    Unavailable,
}

/// Exit states of the broadcast engine, reported to the sender only.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("invalid message: {0}")]
    Invalid(String),

    #[error("chat is temporarily unavailable")]
    Unavailable,
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(reason) => ChatError::Invalid(reason),
            StoreError::Unavailable => ChatError::Unavailable,
        }
    }
}
