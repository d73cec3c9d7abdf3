use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::ConversationModel;
use crate::message::MessageModel;

/// Request payload for creating a conversation
#[derive(Debug, Deserialize)]
pub struct ConversationCreateRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A conversation together with its message history
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub participants: Vec<String>,
    pub messages: Vec<MessageModel>,
    pub created_at: DateTime<Utc>,
}

impl ConversationResponse {
    pub fn new(conversation: ConversationModel, messages: Vec<MessageModel>) -> Self {
        Self {
            id: conversation.id,
            title: conversation.title,
            description: conversation.description,
            participants: conversation.participants,
            messages,
            created_at: conversation.created_at,
        }
    }
}
