use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chat conversation; also the broadcast scope of a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationModel {
    pub id: String, // "room-" followed by a random suffix
    pub title: String,
    pub description: String,
    pub participants: Vec<String>, // User ids, no duplicates
    pub created_at: DateTime<Utc>,
}

impl ConversationModel {
    /// Creates a new conversation with a generated ID and no participants
    pub fn new(title: String, description: String) -> Self {
        Self {
            id: format!("room-{}", Uuid::new_v4().simple()),
            title,
            description,
            participants: vec![],
            created_at: Utc::now(),
        }
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    /// Adds a participant; returns false if they were already present
    pub fn add_participant(&mut self, user_id: String) -> bool {
        if self.has_participant(&user_id) {
            return false;
        }
        self.participants.push(user_id);
        true
    }
}
