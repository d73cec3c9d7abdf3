//! Test assertion helpers - fluent API for verifying test expectations
#![allow(dead_code)] // Test utilities may not all be used in every test

use porcelain::websockets::{MessageType, WebSocketMessage};

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

pub struct MessageAssertion<'a> {
    setup: &'a TestSetup,
    users: Vec<&'a str>,
}

impl<'a> MessageAssertion<'a> {
    /// Create an assertion for all users in the setup
    pub fn for_all_users(setup: &'a TestSetup) -> Self {
        let users = setup.users.iter().map(|s| s.as_str()).collect();
        Self { setup, users }
    }

    /// Create an assertion for specific users
    pub fn for_users(setup: &'a TestSetup, users: Vec<&'a str>) -> Self {
        Self { setup, users }
    }

    /// Assert that every user received the same frame of this type next (consumes it)
    pub async fn received_message_type(self, expected_type: MessageType) -> MessageContent {
        let mut messages = vec![];

        for user in &self.users {
            let message = self
                .setup
                .mock_conn_manager
                .consume_message_for(&TestSetup::connection_id(user))
                .await;
            assert!(message.is_some(), "{} should have received a message", user);

            let msg: WebSocketMessage = serde_json::from_str(&message.unwrap()).unwrap();
            assert_eq!(
                msg.message_type, expected_type,
                "{} received wrong message type",
                user
            );
            messages.push(msg);
        }

        for (i, msg) in messages.iter().enumerate().skip(1) {
            assert_eq!(
                msg.payload, messages[0].payload,
                "{} payload differs from {}",
                self.users[i], self.users[0]
            );
        }

        MessageContent {
            payload: messages[0].payload.clone(),
        }
    }

    /// Assert that users have no unread frames
    pub async fn received_no_messages(self) {
        for user in &self.users {
            let messages = self
                .setup
                .mock_conn_manager
                .get_messages_for(&TestSetup::connection_id(user))
                .await;
            assert!(
                messages.is_empty(),
                "{} should not have received any messages, got {:?}",
                user,
                messages
            );
        }
    }
}

pub struct MessageContent {
    pub payload: serde_json::Value,
}

impl MessageContent {
    pub fn verify_body(self, expected: &str) -> Self {
        assert_eq!(self.payload["body"], expected, "unexpected message body");
        self
    }

    pub fn verify_author(self, author_id: &str) -> Self {
        assert_eq!(self.payload["authorId"], author_id, "unexpected author");
        self
    }

    pub fn verify_error_contains(self, fragment: &str) -> Self {
        let message = self.payload["message"].as_str().unwrap_or_default();
        assert!(
            message.contains(fragment),
            "error {:?} should mention {:?}",
            message,
            fragment
        );
        self
    }

    pub fn body(&self) -> String {
        self.payload["body"].as_str().unwrap_or_default().to_string()
    }

    pub fn id(&self) -> String {
        self.payload["id"].as_str().unwrap_or_default().to_string()
    }
}
