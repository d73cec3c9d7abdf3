#![allow(dead_code)] // Test utilities may not all be used in every test

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use porcelain::{
    message::{MessageId, MessageModel, MessageStore},
    websockets::ConnectionManager,
    StoreError,
};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Records every frame pushed to a connection instead of writing to a socket
#[derive(Clone)]
pub struct MockConnectionManager {
    sent_messages: Arc<RwLock<HashMap<String, VecDeque<String>>>>,
    connected: Arc<RwLock<HashSet<String>>>,
}

impl MockConnectionManager {
    pub fn new() -> Self {
        Self {
            sent_messages: Arc::new(RwLock::new(HashMap::new())),
            connected: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub async fn is_connected(&self, connection_id: &str) -> bool {
        self.connected.read().await.contains(connection_id)
    }

    pub async fn get_messages_for(&self, connection_id: &str) -> Vec<String> {
        self.sent_messages
            .read()
            .await
            .get(connection_id)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Pops the oldest unread frame for the connection
    pub async fn consume_message_for(&self, connection_id: &str) -> Option<String> {
        self.sent_messages
            .write()
            .await
            .get_mut(connection_id)
            .and_then(|queue| queue.pop_front())
    }

    pub async fn clear_messages(&self) {
        self.sent_messages.write().await.clear();
    }
}

#[async_trait]
impl ConnectionManager for MockConnectionManager {
    async fn add_connection(&self, connection_id: String, _sender: mpsc::UnboundedSender<String>) {
        self.connected.write().await.insert(connection_id);
    }

    async fn remove_connection(&self, connection_id: &str) {
        self.connected.write().await.remove(connection_id);
    }

    async fn send_to_connection(&self, connection_id: &str, message: &str) {
        // Like a real socket, a closed connection drops the frame
        if !self.is_connected(connection_id).await {
            return;
        }
        self.sent_messages
            .write()
            .await
            .entry(connection_id.to_string())
            .or_default()
            .push_back(message.to_string());
    }

    async fn send_to_connections(&self, connection_ids: &[String], message: &str) {
        for connection_id in connection_ids {
            self.send_to_connection(connection_id, message).await;
        }
    }

    async fn connection_count(&self) -> usize {
        self.connected.read().await.len()
    }
}

/// A message store whose writes always fail
pub struct FailingMessageStore;

#[async_trait]
impl MessageStore for FailingMessageStore {
    async fn insert(&self, _message: &MessageModel) -> Result<MessageId, StoreError> {
        Err(StoreError::Database("disk full".to_string()))
    }

    async fn list_by_conversation(
        &self,
        _conversation_id: &str,
    ) -> Result<Vec<MessageModel>, StoreError> {
        Ok(vec![])
    }
}
