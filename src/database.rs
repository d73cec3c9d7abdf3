use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, instrument, warn};

use crate::shared::StoreError;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS conversations (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS participants (
        conversation_id TEXT NOT NULL REFERENCES conversations (id) ON DELETE CASCADE,
        user_id TEXT NOT NULL,
        position BIGSERIAL,
        PRIMARY KEY (conversation_id, user_id)
    )",
    "CREATE INDEX IF NOT EXISTS participants_user_idx ON participants (user_id)",
    "CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        seq BIGSERIAL,
        conversation_id TEXT NOT NULL REFERENCES conversations (id) ON DELETE CASCADE,
        author_id TEXT NOT NULL,
        author_name TEXT NOT NULL,
        body TEXT NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS messages_conversation_idx ON messages (conversation_id, timestamp, seq)",
];

/// Opens a connection pool to PostgreSQL
#[instrument(skip(database_url))]
pub async fn connect(database_url: &str) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to connect to database");
            StoreError::Database(e.to_string())
        })?;

    info!("Connected to database");
    Ok(pool)
}

/// Creates the chat tables when they do not exist yet
#[instrument(skip(pool))]
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await.map_err(|e| {
            warn!(error = %e, "Failed to apply schema statement");
            StoreError::Database(e.to_string())
        })?;
    }

    info!("Database schema ready");
    Ok(())
}
