#![allow(dead_code)] // Test utilities may not all be used in every test

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use porcelain::{
    broadcast::{BroadcastCore, BroadcastHandle, HelperReplyPolicy, HELPER_BOT_ID},
    config::BroadcastConfig,
    conversation::{ConversationModel, ConversationRepository, InMemoryConversationRepository},
    message::{InMemoryMessageStore, MessageModel, MessageStore},
    websockets::{
        restore_memberships, ConnectionContext, ConnectionManager, MessageHandler,
        WebsocketReceiveHandler,
    },
};

use super::mocks::{FailingMessageStore, MockConnectionManager};

pub const ROOM_ID: &str = "room-1";
pub const MAX_MESSAGE_LENGTH: usize = 2000;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub broadcast: BroadcastHandle,
    pub mock_conn_manager: Arc<MockConnectionManager>,
    pub conversations: Arc<InMemoryConversationRepository>,
    pub message_store: Arc<dyn MessageStore + Send + Sync>,
    pub input_handler: WebsocketReceiveHandler,
    pub users: Vec<String>, // Participants of ROOM_ID, all connected
    pub _core_handle: JoinHandle<()>,
}

pub struct TestSetupBuilder {
    users: Vec<String>,
    failing_store: bool,
    helper_reply_probability: f64,
    seed: u64,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            users: vec![],
            failing_store: false,
            helper_reply_probability: 0.0,
            seed: 7,
        }
    }

    pub fn with_users(mut self, users: Vec<&str>) -> Self {
        self.users = users.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_two_users(self) -> Self {
        self.with_users(vec!["alice", "bob"])
    }

    pub fn with_failing_store(mut self) -> Self {
        self.failing_store = true;
        self
    }

    /// Every user message schedules a helper reply
    pub fn with_helper_always_replying(mut self) -> Self {
        self.helper_reply_probability = 1.0;
        self
    }

    pub async fn build(self) -> TestSetup {
        let conversations = Arc::new(InMemoryConversationRepository::new());
        let message_store: Arc<dyn MessageStore + Send + Sync> = if self.failing_store {
            Arc::new(FailingMessageStore)
        } else {
            Arc::new(InMemoryMessageStore::new())
        };
        let mock_conn_manager = Arc::new(MockConnectionManager::new());

        // Create room
        let mut room = ConversationModel::new("Kabinka".to_string(), String::new());
        room.id = ROOM_ID.to_string();
        for user in &self.users {
            room.add_participant(user.clone());
        }
        room.add_participant(HELPER_BOT_ID.to_string());
        conversations.create_conversation(&room).await.unwrap();

        let config = BroadcastConfig {
            helper_reply_probability: self.helper_reply_probability,
            ..BroadcastConfig::default()
        };
        let (broadcast, core_handle) = BroadcastCore::new(
            conversations.clone(),
            message_store.clone(),
            mock_conn_manager.clone(),
            config.clone(),
        )
        .with_policy(HelperReplyPolicy::seeded(&config, self.seed))
        .start();

        let input_handler = WebsocketReceiveHandler::new(
            broadcast.clone(),
            conversations.clone(),
            mock_conn_manager.clone(),
            MAX_MESSAGE_LENGTH,
        );

        let setup = TestSetup {
            broadcast,
            mock_conn_manager,
            conversations,
            message_store,
            input_handler,
            users: self.users.clone(),
            _core_handle: core_handle,
        };

        // Connect users the way the gateway does
        for user in &self.users {
            setup.connect(user).await;
        }

        setup
    }
}

impl TestSetup {
    pub fn connection_id(user: &str) -> String {
        format!("conn-{user}")
    }

    pub fn context(user: &str) -> ConnectionContext {
        ConnectionContext {
            connection_id: Self::connection_id(user),
            user_id: user.to_string(),
            display_name: user.to_uppercase(),
        }
    }

    /// Registers the connection and rejoins the user's rooms
    pub async fn connect(&self, user: &str) -> Vec<String> {
        let context = Self::context(user);
        let (sender, _receiver) = mpsc::unbounded_channel();
        self.mock_conn_manager
            .add_connection(context.connection_id.clone(), sender)
            .await;

        let conversations: Arc<dyn ConversationRepository + Send + Sync> =
            self.conversations.clone();
        restore_memberships(&self.broadcast, &conversations, &context)
            .await
            .unwrap()
    }

    pub async fn disconnect(&self, user: &str) -> Vec<String> {
        let connection_id = Self::connection_id(user);
        self.mock_conn_manager
            .remove_connection(&connection_id)
            .await;
        self.broadcast.leave(&connection_id).await.unwrap()
    }

    // ------------------------------------------------------------------
    // Client frames
    // ------------------------------------------------------------------

    pub async fn send_frame(&self, user: &str, frame: serde_json::Value) {
        self.input_handler
            .handle_message(&Self::context(user), frame.to_string())
            .await;
    }

    pub async fn send_message(&self, user: &str, body: &str) {
        self.send_frame(
            user,
            serde_json::json!({
                "type": "send_message",
                "payload": { "conversationId": ROOM_ID, "body": body }
            }),
        )
        .await;
    }

    pub async fn join_room(&self, user: &str, room_id: &str) {
        self.send_frame(
            user,
            serde_json::json!({
                "type": "join_room",
                "payload": { "conversationId": room_id }
            }),
        )
        .await;
    }

    pub async fn history(&self) -> Vec<MessageModel> {
        self.message_store
            .list_by_conversation(ROOM_ID)
            .await
            .unwrap()
    }

    /// Longest helper delay plus slack
    pub fn helper_window() -> Duration {
        BroadcastConfig::default().helper_reply_max_delay + Duration::from_millis(100)
    }
}
