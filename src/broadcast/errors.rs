use thiserror::Error;

use crate::shared::StoreError;

/// Per-request failures of the broadcast core
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChatError {
    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error("Store failure: {0}")]
    StoreFailure(#[from] StoreError),

    #[error("Validation failure: {0}")]
    ValidationFailure(String),

    /// The core task has stopped and no longer accepts commands
    #[error("Broadcast core unavailable")]
    Unavailable,
}
