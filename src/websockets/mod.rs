// Public API
pub use broadcaster::MessageBroadcaster;
pub use connection_manager::{ConnectionManager, InMemoryConnectionManager};
pub use handler::{restore_memberships, websocket_handler, WebsocketReceiveHandler};
pub use messages::{MessageType, WebSocketMessage};
pub use socket::{ConnectionContext, MessageHandler};

// Internal modules
mod broadcaster;
mod connection_manager;
mod handler;
mod messages;
mod socket;
