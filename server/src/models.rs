//! Database models and wire views for the chat domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::StoreError;

/// Upper bound on the author field, matching the persisted column width.
pub const MAX_AUTHOR_LEN: usize = 30;

/// Upper bound on the message body.
pub const MAX_BODY_LEN: usize = 500;

/// A persisted chat message. The store assigns id and timestamp at append
/// time; the row is immutable afterwards.
///
/// Serialized on the wire as `{id, author, body, createdAt}`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Gamification schema reserved for fan features. Maps to `fan_users`;
/// nothing in the chat core reads or writes it.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FanUser {
    pub username: String,
    pub fury_points: i32,
    pub last_activity: DateTime<Utc>,
}

/// Trim and bounds-check an inbound author/body pair.
///
/// Returns the trimmed fields on success so the store persists exactly what
/// was validated.
pub fn validate_message(author: &str, body: &str) -> Result<(String, String), StoreError> {
    let author = author.trim();
    let body = body.trim();

    if author.is_empty() {
        return Err(StoreError::Validation("author must not be empty".into()));
    }
    if body.is_empty() {
        return Err(StoreError::Validation("body must not be empty".into()));
    }
    if author.chars().count() > MAX_AUTHOR_LEN {
        return Err(StoreError::Validation(format!(
            "author exceeds {} characters",
            MAX_AUTHOR_LEN
        )));
    }
    if body.chars().count() > MAX_BODY_LEN {
        return Err(StoreError::Validation(format!(
            "body exceeds {} characters",
            MAX_BODY_LEN
        )));
    }

    Ok((author.to_string(), body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_message_is_trimmed() {
        let (author, body) = validate_message("  Ana ", " gl furia  ").unwrap();
        assert_eq!(author, "Ana");
        assert_eq!(body, "gl furia");
    }

    #[test]
    fn test_empty_after_trim_is_rejected() {
        assert!(validate_message("   ", "hello").is_err());
        assert!(validate_message("Ana", "  \t ").is_err());
        assert!(validate_message("", "").is_err());
    }

    #[test]
    fn test_length_bounds_are_inclusive() {
        let author = "a".repeat(MAX_AUTHOR_LEN);
        let body = "b".repeat(MAX_BODY_LEN);
        assert!(validate_message(&author, &body).is_ok());

        let oversized_author = "a".repeat(MAX_AUTHOR_LEN + 1);
        let oversized_body = "b".repeat(MAX_BODY_LEN + 1);
        assert!(validate_message(&oversized_author, "hi").is_err());
        assert!(validate_message("Ana", &oversized_body).is_err());
    }

    #[test]
    fn test_bounds_count_chars_not_bytes() {
        // 30 multibyte characters still fit the author bound.
        let author = "á".repeat(MAX_AUTHOR_LEN);
        assert!(validate_message(&author, "hi").is_ok());
    }

    #[test]
    fn test_message_wire_shape_is_camel_case() {
        let message = ChatMessage {
            id: Uuid::nil(),
            author: "Ana".to_string(),
            body: "gl".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("created_at").is_none());
    }
}
