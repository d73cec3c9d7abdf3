use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{MessageId, MessageModel};
use crate::shared::StoreError;

/// Append-only message log
#[async_trait]
pub trait MessageStore {
    /// Atomically inserts one message; fails on a duplicate id
    async fn insert(&self, message: &MessageModel) -> Result<MessageId, StoreError>;

    /// Messages of a conversation, ascending by timestamp then insertion order
    async fn list_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageModel>, StoreError>;
}

/// In-memory implementation of MessageStore for development and testing
pub struct InMemoryMessageStore {
    // Insertion order is the tiebreaker for equal timestamps
    messages: RwLock<Vec<MessageModel>>,
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
        }
    }

    /// Total number of stored messages across conversations
    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    #[instrument(skip(self, message), fields(message_id = %message.id))]
    async fn insert(&self, message: &MessageModel) -> Result<MessageId, StoreError> {
        let mut messages = self.messages.write().await;
        if messages.iter().any(|m| m.id == message.id) {
            warn!(message_id = %message.id, "Message id already exists in memory");
            return Err(StoreError::Duplicate(message.id.clone()));
        }
        messages.push(message.clone());

        debug!(
            conversation_id = %message.conversation_id,
            "Message stored in memory"
        );
        Ok(message.id.clone())
    }

    #[instrument(skip(self))]
    async fn list_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageModel>, StoreError> {
        let messages = self.messages.read().await;
        let mut history: Vec<MessageModel> = messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order among equal timestamps
        history.sort_by_key(|m| m.timestamp);

        debug!(count = history.len(), "Listed conversation messages from memory");
        Ok(history)
    }
}

/// PostgreSQL implementation of the message store
pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    #[instrument(skip(self, message), fields(message_id = %message.id))]
    async fn insert(&self, message: &MessageModel) -> Result<MessageId, StoreError> {
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, author_id, author_name, body, timestamp) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(&message.author_id)
        .bind(&message.author_name)
        .bind(&message.body)
        .bind(message.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to insert message into database");
            match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    StoreError::Duplicate(message.id.clone())
                }
                _ => StoreError::Database(e.to_string()),
            }
        })?;

        debug!(
            conversation_id = %message.conversation_id,
            "Message stored in database"
        );
        Ok(message.id.clone())
    }

    #[instrument(skip(self))]
    async fn list_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageModel>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, conversation_id, author_id, author_name, body, timestamp FROM messages WHERE conversation_id = $1 ORDER BY timestamp ASC, seq ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to list messages from database");
            StoreError::Database(e.to_string())
        })?;

        let history = rows
            .into_iter()
            .map(|row| MessageModel {
                id: row.get("id"),
                conversation_id: row.get("conversation_id"),
                author_id: row.get("author_id"),
                author_name: row.get("author_name"),
                body: row.get("body"),
                timestamp: row.get("timestamp"),
            })
            .collect::<Vec<_>>();

        debug!(count = history.len(), "Listed conversation messages from database");
        Ok(history)
    }
}
