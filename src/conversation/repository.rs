use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::ConversationModel;
use crate::shared::StoreError;

/// Trait for conversation repository operations
#[async_trait]
pub trait ConversationRepository {
    async fn create_conversation(&self, conversation: &ConversationModel)
        -> Result<(), StoreError>;
    async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationModel>, StoreError>;

    /// All conversations, newest first
    async fn list_conversations(&self) -> Result<Vec<ConversationModel>, StoreError>;

    /// Conversations the user participates in, newest first
    async fn list_for_participant(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConversationModel>, StoreError>;

    /// Adds a participant; `None` when the conversation does not exist
    async fn add_participant(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Option<ConversationModel>, StoreError>;
}

/// In-memory implementation of ConversationRepository for development and testing
pub struct InMemoryConversationRepository {
    conversations: RwLock<HashMap<String, ConversationModel>>,
}

impl Default for InMemoryConversationRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
        }
    }

    fn newest_first(mut conversations: Vec<ConversationModel>) -> Vec<ConversationModel> {
        conversations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        conversations
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    #[instrument(skip(self, conversation), fields(conversation_id = %conversation.id))]
    async fn create_conversation(
        &self,
        conversation: &ConversationModel,
    ) -> Result<(), StoreError> {
        let mut conversations = self.conversations.write().await;
        if conversations.contains_key(&conversation.id) {
            warn!("Conversation already exists in memory");
            return Err(StoreError::Duplicate(conversation.id.clone()));
        }
        conversations.insert(conversation.id.clone(), conversation.clone());

        debug!("Conversation created in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationModel>, StoreError> {
        let conversations = self.conversations.read().await;
        let conversation = conversations.get(conversation_id).cloned();

        if conversation.is_none() {
            debug!("Conversation not found in memory");
        }
        Ok(conversation)
    }

    #[instrument(skip(self))]
    async fn list_conversations(&self) -> Result<Vec<ConversationModel>, StoreError> {
        let conversations = self.conversations.read().await;
        Ok(Self::newest_first(conversations.values().cloned().collect()))
    }

    #[instrument(skip(self))]
    async fn list_for_participant(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConversationModel>, StoreError> {
        let conversations = self.conversations.read().await;
        Ok(Self::newest_first(
            conversations
                .values()
                .filter(|c| c.has_participant(user_id))
                .cloned()
                .collect(),
        ))
    }

    #[instrument(skip(self))]
    async fn add_participant(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Option<ConversationModel>, StoreError> {
        let mut conversations = self.conversations.write().await;
        let Some(conversation) = conversations.get_mut(conversation_id) else {
            debug!("Conversation not found for participant addition");
            return Ok(None);
        };

        if conversation.add_participant(user_id.to_string()) {
            debug!("Participant added in memory");
        }
        Ok(Some(conversation.clone()))
    }
}

/// PostgreSQL implementation of the conversation repository
pub struct PostgresConversationRepository {
    pool: PgPool,
}

impl PostgresConversationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn participants_of(&self, conversation_id: &str) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            "SELECT user_id FROM participants WHERE conversation_id = $1 ORDER BY position",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(rows.into_iter().map(|row| row.get("user_id")).collect())
    }

    async fn hydrate(
        &self,
        rows: Vec<sqlx::postgres::PgRow>,
    ) -> Result<Vec<ConversationModel>, StoreError> {
        let mut conversations = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let participants = self.participants_of(&id).await?;
            conversations.push(ConversationModel {
                id,
                title: row.get("title"),
                description: row.get("description"),
                participants,
                created_at: row.get("created_at"),
            });
        }
        Ok(conversations)
    }
}

fn database_error(e: sqlx::Error) -> StoreError {
    warn!(error = %e, "Conversation query failed");
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Duplicate(db.message().to_string())
        }
        _ => StoreError::Database(e.to_string()),
    }
}

#[async_trait]
impl ConversationRepository for PostgresConversationRepository {
    #[instrument(skip(self, conversation), fields(conversation_id = %conversation.id))]
    async fn create_conversation(
        &self,
        conversation: &ConversationModel,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        sqlx::query(
            "INSERT INTO conversations (id, title, description, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&conversation.id)
        .bind(&conversation.title)
        .bind(&conversation.description)
        .bind(conversation.created_at)
        .execute(&mut *tx)
        .await
        .map_err(database_error)?;

        for user_id in &conversation.participants {
            sqlx::query(
                "INSERT INTO participants (conversation_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(&conversation.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;
        }

        tx.commit().await.map_err(database_error)?;

        debug!("Conversation created in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationModel>, StoreError> {
        let row = sqlx::query(
            "SELECT id, title, description, created_at FROM conversations WHERE id = $1",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => {
                debug!("Conversation not found in database");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_conversations(&self) -> Result<Vec<ConversationModel>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, title, description, created_at FROM conversations ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        self.hydrate(rows).await
    }

    #[instrument(skip(self))]
    async fn list_for_participant(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConversationModel>, StoreError> {
        let rows = sqlx::query(
            "SELECT c.id, c.title, c.description, c.created_at FROM conversations c \
             JOIN participants p ON p.conversation_id = c.id \
             WHERE p.user_id = $1 ORDER BY c.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        self.hydrate(rows).await
    }

    #[instrument(skip(self))]
    async fn add_participant(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Option<ConversationModel>, StoreError> {
        if self.get_conversation(conversation_id).await?.is_none() {
            return Ok(None);
        }

        sqlx::query(
            "INSERT INTO participants (conversation_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        self.get_conversation(conversation_id).await
    }
}
