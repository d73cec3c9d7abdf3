use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub type MessageId = String;

/// A persisted chat message
///
/// Serialized in the camelCase wire shape clients consume; `timestamp`
/// goes out as an RFC 3339 string.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageModel {
    pub id: MessageId,
    pub conversation_id: String,
    pub author_id: String,
    pub author_name: String, // Display name at send time, not kept in sync
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

impl MessageModel {
    /// Creates a message with a fresh id derived from the timestamp
    pub fn new(
        conversation_id: impl Into<String>,
        author_id: impl Into<String>,
        author_name: impl Into<String>,
        body: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Self::generate_id(timestamp),
            conversation_id: conversation_id.into(),
            author_id: author_id.into(),
            author_name: author_name.into(),
            body: body.into(),
            timestamp,
        }
    }

    /// `msg-<unix millis>-<random>`
    fn generate_id(timestamp: DateTime<Utc>) -> MessageId {
        format!(
            "msg-{}-{}",
            timestamp.timestamp_millis(),
            Uuid::new_v4().simple()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_has_time_prefixed_id() {
        let now = Utc::now();
        let message = MessageModel::new("room-1", "alice", "Alice", "hello", now);

        assert!(message
            .id
            .starts_with(&format!("msg-{}-", now.timestamp_millis())));
        assert_eq!(message.conversation_id, "room-1");
        assert_eq!(message.timestamp, now);
    }

    #[test]
    fn test_ids_are_unique_for_same_timestamp() {
        let now = Utc::now();
        let first = MessageModel::new("room-1", "alice", "Alice", "a", now);
        let second = MessageModel::new("room-1", "alice", "Alice", "a", now);

        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let message = MessageModel::new("room-1", "alice", "Alice", "hello", Utc::now());
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["conversationId"], "room-1");
        assert_eq!(json["authorId"], "alice");
        assert_eq!(json["authorName"], "Alice");
        assert_eq!(json["body"], "hello");
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }
}
