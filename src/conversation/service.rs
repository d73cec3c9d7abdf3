use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{
    models::ConversationModel,
    repository::ConversationRepository,
    types::{ConversationCreateRequest, ConversationResponse},
};
use crate::broadcast::{HELPER_BOT_ID, HELPER_BOT_NAME};
use crate::message::{MessageModel, MessageStore};
use crate::shared::AppError;

/// Service for conversation lifecycle and history
pub struct ConversationService {
    conversations: Arc<dyn ConversationRepository + Send + Sync>,
    messages: Arc<dyn MessageStore + Send + Sync>,
}

impl ConversationService {
    pub fn new(
        conversations: Arc<dyn ConversationRepository + Send + Sync>,
        messages: Arc<dyn MessageStore + Send + Sync>,
    ) -> Self {
        Self {
            conversations,
            messages,
        }
    }

    fn welcome_body(title: &str) -> String {
        format!("Čerstvě naleštěný porcelán hlásí: {title} je otevřená všem přiznáním.")
    }

    /// Creates a conversation owned by `creator_id` with the helper bot already inside
    #[instrument(skip(self, request))]
    pub async fn create_conversation(
        &self,
        creator_id: &str,
        request: ConversationCreateRequest,
    ) -> Result<ConversationResponse, AppError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(AppError::BadRequest("Title is required".to_string()));
        }
        let description = request
            .description
            .map(|d| d.trim().to_string())
            .unwrap_or_default();

        let mut conversation = ConversationModel::new(title.to_string(), description);
        conversation.add_participant(creator_id.to_string());
        conversation.add_participant(HELPER_BOT_ID.to_string());
        debug!(conversation_id = %conversation.id, "Generated conversation ID");

        self.conversations.create_conversation(&conversation).await?;

        let welcome = MessageModel::new(
            conversation.id.as_str(),
            HELPER_BOT_ID,
            HELPER_BOT_NAME,
            Self::welcome_body(title),
            Utc::now(),
        );
        self.messages.insert(&welcome).await?;

        info!(
            conversation_id = %conversation.id,
            creator_id = %creator_id,
            "Conversation created"
        );

        Ok(ConversationResponse::new(conversation, vec![welcome]))
    }

    /// Every conversation, newest first, each with its history
    #[instrument(skip(self))]
    pub async fn list_conversations(&self) -> Result<Vec<ConversationResponse>, AppError> {
        let conversations = self.conversations.list_conversations().await?;

        let mut responses = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let messages = self.messages.list_by_conversation(&conversation.id).await?;
            responses.push(ConversationResponse::new(conversation, messages));
        }
        Ok(responses)
    }

    /// Adds the user as a participant; joining twice is not an error
    #[instrument(skip(self))]
    pub async fn join_conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<ConversationModel, AppError> {
        let conversation = self
            .conversations
            .add_participant(conversation_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Conversation {conversation_id} not found")))?;

        info!(conversation_id = %conversation_id, user_id = %user_id, "Participant added");
        Ok(conversation)
    }

    /// Message history in timestamp order
    #[instrument(skip(self))]
    pub async fn history(&self, conversation_id: &str) -> Result<Vec<MessageModel>, AppError> {
        if self
            .conversations
            .get_conversation(conversation_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(format!(
                "Conversation {conversation_id} not found"
            )));
        }

        Ok(self.messages.list_by_conversation(conversation_id).await?)
    }
}
