// Public API - what other modules can use
pub use handlers::{create_conversation, join_conversation, list_conversations, list_messages};
pub use models::ConversationModel;
pub use repository::{
    ConversationRepository, InMemoryConversationRepository, PostgresConversationRepository,
};
pub use service::ConversationService;

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
mod service;
pub mod types;
