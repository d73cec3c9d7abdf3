// Library crate for the porcelain group-chat server
// This file exposes the public API for the binary and integration tests

pub mod broadcast;
pub mod config;
pub mod conversation;
pub mod database;
pub mod message;
pub mod room;
pub mod session;
pub mod shared;
pub mod websockets;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

// Re-export commonly used types for easier access in tests
pub use broadcast::{BroadcastCore, BroadcastHandle, ChatError, SendOutcome, SendRequest};
pub use config::{BroadcastConfig, ServerConfig};
pub use message::{MessageModel, MessageStore};
pub use room::RoomRegistry;
pub use shared::{AppError, AppState, StoreError};
pub use websockets::{
    ConnectionContext, ConnectionManager, MessageHandler, MessageType, WebSocketMessage,
    WebsocketReceiveHandler,
};

/// Builds the HTTP and WebSocket routes over the shared state
pub fn app(app_state: AppState) -> Router {
    let chat_routes = Router::new()
        .route(
            "/conversations",
            get(conversation::list_conversations).post(conversation::create_conversation),
        )
        .route(
            "/conversations/:id/participants",
            post(conversation::join_conversation),
        )
        .route(
            "/conversations/:id/messages",
            get(conversation::list_messages),
        )
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            session::jwt_auth,
        ));

    Router::new()
        .route("/", get(|| async { "porcelain" }))
        .route("/api/session", post(session::create_session))
        .nest("/api/chat", chat_routes)
        .route("/ws", get(websockets::websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
