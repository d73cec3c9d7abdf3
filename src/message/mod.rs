// Public API - what other modules can use
pub use models::{MessageId, MessageModel};
pub use repository::{InMemoryMessageStore, MessageStore, PostgresMessageStore};

// Internal modules
pub mod models;
pub mod repository;
