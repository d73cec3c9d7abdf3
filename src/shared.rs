use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::broadcast::{BroadcastHandle, ChatError};
use crate::conversation::ConversationRepository;
use crate::message::MessageStore;
use crate::session::TokenConfig;
use crate::websockets::ConnectionManager;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub conversation_repository: Arc<dyn ConversationRepository + Send + Sync>,
    pub message_store: Arc<dyn MessageStore + Send + Sync>,
    pub connection_manager: Arc<dyn ConnectionManager>,
    pub broadcast: BroadcastHandle,
    pub token_config: TokenConfig,
    pub max_message_length: usize,
}

impl AppState {
    pub fn new(
        conversation_repository: Arc<dyn ConversationRepository + Send + Sync>,
        message_store: Arc<dyn MessageStore + Send + Sync>,
        connection_manager: Arc<dyn ConnectionManager>,
        broadcast: BroadcastHandle,
        token_config: TokenConfig,
        max_message_length: usize,
    ) -> Self {
        Self {
            conversation_repository,
            message_store,
            connection_manager,
            broadcast,
            token_config,
            max_message_length,
        }
    }
}

/// Persistence failures shared by every store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::DatabaseError(e.to_string())
    }
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::NotFound(id) => AppError::NotFound(format!("Conversation {id} not found")),
            ChatError::StoreFailure(e) => e.into(),
            ChatError::ValidationFailure(msg) => AppError::BadRequest(msg),
            ChatError::Unavailable => AppError::Internal,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::JwtError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
