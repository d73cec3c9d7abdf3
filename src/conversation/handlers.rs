use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    models::ConversationModel,
    service::ConversationService,
    types::{ConversationCreateRequest, ConversationResponse},
};
use crate::message::MessageModel;
use crate::session::SessionClaims;
use crate::shared::{AppError, AppState};

fn service(state: &AppState) -> ConversationService {
    ConversationService::new(
        Arc::clone(&state.conversation_repository),
        Arc::clone(&state.message_store),
    )
}

/// HTTP handler for listing conversations
///
/// GET /api/chat/conversations
#[instrument(name = "list_conversations", skip(state, claims))]
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<Vec<ConversationResponse>>, AppError> {
    let conversations = service(&state).list_conversations().await?;

    info!(
        user_id = %claims.sub,
        conversation_count = conversations.len(),
        "Conversations listed"
    );

    Ok(Json(conversations))
}

/// HTTP handler for creating a conversation
///
/// POST /api/chat/conversations
/// Responds 201 with the conversation and the helper's welcome message
#[instrument(name = "create_conversation", skip(state, claims, request))]
pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(request): Json<ConversationCreateRequest>,
) -> Result<(StatusCode, Json<ConversationResponse>), AppError> {
    let conversation = service(&state)
        .create_conversation(&claims.sub, request)
        .await?;

    Ok((StatusCode::CREATED, Json(conversation)))
}

/// HTTP handler adding the caller to a conversation
///
/// POST /api/chat/conversations/:id/participants
#[instrument(name = "join_conversation", skip(state, claims))]
pub async fn join_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(conversation_id): Path<String>,
) -> Result<Json<ConversationModel>, AppError> {
    let conversation = service(&state)
        .join_conversation(&conversation_id, &claims.sub)
        .await?;

    Ok(Json(conversation))
}

/// HTTP handler returning a conversation's history
///
/// GET /api/chat/conversations/:id/messages
#[instrument(name = "list_messages", skip(state, _claims))]
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(_claims): Extension<SessionClaims>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<MessageModel>>, AppError> {
    let messages = service(&state).history(&conversation_id).await?;

    Ok(Json(messages))
}
