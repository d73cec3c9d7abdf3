use async_trait::async_trait;
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::broadcast::{BroadcastHandle, ChatError};
use crate::conversation::ConversationRepository;
use crate::session::SessionClaims;
use crate::shared::{AppError, AppState};

use super::{
    broadcaster::MessageBroadcaster,
    connection_manager::ConnectionManager,
    messages::{JoinRoomPayload, MessageType, SendMessagePayload, WebSocketMessage},
    socket::{Connection, ConnectionContext, MessageHandler},
};

/// Message handler for receiving WebSocket messages from the client
///
/// Turns client frames into broadcast core commands. Author identity always
/// comes from the authenticated connection, never from the payload.
pub struct WebsocketReceiveHandler {
    broadcast: BroadcastHandle,
    conversations: Arc<dyn ConversationRepository + Send + Sync>,
    connection_manager: Arc<dyn ConnectionManager>,
    max_message_length: usize,
}

impl WebsocketReceiveHandler {
    pub fn new(
        broadcast: BroadcastHandle,
        conversations: Arc<dyn ConversationRepository + Send + Sync>,
        connection_manager: Arc<dyn ConnectionManager>,
        max_message_length: usize,
    ) -> Self {
        Self {
            broadcast,
            conversations,
            connection_manager,
            max_message_length,
        }
    }

    pub fn from_state(app_state: &AppState) -> Self {
        Self::new(
            app_state.broadcast.clone(),
            Arc::clone(&app_state.conversation_repository),
            Arc::clone(&app_state.connection_manager),
            app_state.max_message_length,
        )
    }

    async fn reply(&self, context: &ConnectionContext, message: WebSocketMessage) {
        if let Err(e) = MessageBroadcaster::send_to_connection(
            &self.connection_manager,
            &context.connection_id,
            &message,
        )
        .await
        {
            warn!(connection_id = %context.connection_id, error = %e, "Failed to serialize reply");
        }
    }

    async fn handle_join_room(&self, context: &ConnectionContext, payload: JoinRoomPayload) {
        let conversation_id = payload.conversation_id;

        let conversation = match self.conversations.get_conversation(&conversation_id).await {
            Ok(Some(conversation)) => conversation,
            Ok(None) => {
                self.reply(context, WebSocketMessage::error("Conversation not found"))
                    .await;
                return;
            }
            Err(e) => {
                warn!(room_id = %conversation_id, error = %e, "Failed to load conversation");
                self.reply(context, WebSocketMessage::error("Could not load conversation"))
                    .await;
                return;
            }
        };

        // The core accepts any join; only participants get this far
        if !conversation.has_participant(&context.user_id) {
            warn!(
                room_id = %conversation_id,
                user_id = %context.user_id,
                "Rejected join from non-participant"
            );
            self.reply(
                context,
                WebSocketMessage::error("Not a participant of this conversation"),
            )
            .await;
            return;
        }

        match self
            .broadcast
            .join(&context.connection_id, &conversation_id)
            .await
        {
            Ok(_) => {
                self.reply(context, WebSocketMessage::joined(conversation_id))
                    .await;
            }
            Err(e) => {
                warn!(room_id = %conversation_id, error = %e, "Join failed");
                self.reply(context, WebSocketMessage::error(e.to_string()))
                    .await;
            }
        }
    }

    async fn handle_send_message(&self, context: &ConnectionContext, payload: SendMessagePayload) {
        let length = payload.body.chars().count();
        if length > self.max_message_length {
            let error = ChatError::ValidationFailure(format!(
                "Message is too long ({} > {} characters)",
                length, self.max_message_length
            ));
            self.reply(context, WebSocketMessage::error(error.to_string()))
                .await;
            return;
        }

        match self
            .broadcast
            .send_message(
                &payload.conversation_id,
                &context.user_id,
                &context.display_name,
                &payload.body,
            )
            .await
        {
            Ok(Some(message)) => {
                debug!(message_id = %message.id, "Message accepted");
            }
            Ok(None) => {
                debug!("Empty message ignored");
            }
            Err(e) => {
                warn!(
                    room_id = %payload.conversation_id,
                    error = %e,
                    "Message send failed"
                );
                self.reply(context, WebSocketMessage::error(e.to_string()))
                    .await;
            }
        }
    }
}

#[async_trait]
impl MessageHandler for WebsocketReceiveHandler {
    async fn handle_message(&self, context: &ConnectionContext, message: String) {
        let ws_message = match serde_json::from_str::<WebSocketMessage>(&message) {
            Ok(ws_message) => ws_message,
            Err(e) => {
                warn!(
                    connection_id = %context.connection_id,
                    error = %e,
                    "Failed to parse WebSocket message"
                );
                self.reply(context, WebSocketMessage::error("Malformed message"))
                    .await;
                return;
            }
        };

        debug!(
            connection_id = %context.connection_id,
            message_type = ws_message.message_type.as_ref(),
            "Received message"
        );

        match ws_message.message_type {
            MessageType::JoinRoom => match ws_message.payload_as::<JoinRoomPayload>() {
                Ok(payload) => self.handle_join_room(context, payload).await,
                Err(_) => {
                    self.reply(context, WebSocketMessage::error("Invalid join_room payload"))
                        .await
                }
            },
            MessageType::SendMessage => match ws_message.payload_as::<SendMessagePayload>() {
                Ok(payload) => self.handle_send_message(context, payload).await,
                Err(_) => {
                    self.reply(
                        context,
                        WebSocketMessage::error("Invalid send_message payload"),
                    )
                    .await
                }
            },
            _ => {
                debug!(
                    message_type = ws_message.message_type.as_ref(),
                    "Unhandled message type"
                );
            }
        }
    }
}

/// Joins a fresh connection to every conversation its user participates in
pub async fn restore_memberships(
    broadcast: &BroadcastHandle,
    conversations: &Arc<dyn ConversationRepository + Send + Sync>,
    context: &ConnectionContext,
) -> Result<Vec<String>, ChatError> {
    let rooms = conversations.list_for_participant(&context.user_id).await?;

    let mut joined = Vec::with_capacity(rooms.len());
    for room in rooms {
        broadcast.join(&context.connection_id, &room.id).await?;
        joined.push(room.id);
    }
    Ok(joined)
}

#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    token: Option<String>,
}

/// WebSocket endpoint
/// GET /ws?token=<jwt>, or the JWT in the Sec-WebSocket-Protocol header
#[instrument(name = "websocket_handler", skip_all)]
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WebSocketQuery>,
    headers: HeaderMap,
    State(app_state): State<AppState>,
) -> Result<Response, AppError> {
    let protocol_token = headers
        .get("sec-websocket-protocol")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    let (token, ws) = match (query.token, protocol_token) {
        (Some(token), _) => (token, ws),
        // Browsers require the chosen subprotocol to be echoed back
        (None, Some(token)) => (token.clone(), ws.protocols([token])),
        (None, None) => {
            warn!("Missing authentication token");
            return Err(AppError::Unauthorized(
                "Missing authentication token".to_string(),
            ));
        }
    };

    let claims = app_state.token_config.validate_token(&token)?;

    info!(user_id = %claims.sub, "WebSocket authentication successful");
    Ok(ws.on_upgrade(move |socket| handle_websocket_connection(socket, claims, app_state)))
}

/// Handle the upgraded WebSocket connection
async fn handle_websocket_connection(
    socket: axum::extract::ws::WebSocket,
    claims: SessionClaims,
    app_state: AppState,
) {
    let context = ConnectionContext {
        connection_id: Uuid::new_v4().to_string(),
        user_id: claims.sub,
        display_name: claims.display_name,
    };

    info!(
        connection_id = %context.connection_id,
        user_id = %context.user_id,
        "WebSocket connection established"
    );

    // Create the outbound channel (app -> client)
    let (outbound_sender, outbound_receiver) = mpsc::unbounded_channel::<String>();
    app_state
        .connection_manager
        .add_connection(context.connection_id.clone(), outbound_sender)
        .await;

    match restore_memberships(
        &app_state.broadcast,
        &app_state.conversation_repository,
        &context,
    )
    .await
    {
        Ok(rooms) => {
            info!(
                connection_id = %context.connection_id,
                rooms = rooms.len(),
                "Restored room memberships"
            );
        }
        Err(e) => {
            warn!(
                connection_id = %context.connection_id,
                error = %e,
                "Failed to restore room memberships"
            );
        }
    }

    let message_handler = Arc::new(WebsocketReceiveHandler::from_state(&app_state));
    let connection = Connection::new(
        context.clone(),
        Box::new(socket),
        outbound_receiver,
        message_handler,
    );

    // Run the connection until disconnect
    match connection.run().await {
        Ok(()) => {
            info!(connection_id = %context.connection_id, "WebSocket connection closed cleanly");
        }
        Err(e) => {
            warn!(
                connection_id = %context.connection_id,
                error = ?e,
                "WebSocket connection error"
            );
        }
    }

    // Cleanup: stop delivering, then drop the room subscriptions
    app_state
        .connection_manager
        .remove_connection(&context.connection_id)
        .await;

    if let Err(e) = app_state.broadcast.leave(&context.connection_id).await {
        warn!(connection_id = %context.connection_id, error = %e, "Failed to leave rooms");
    }

    info!(connection_id = %context.connection_id, "WebSocket disconnected");
}
