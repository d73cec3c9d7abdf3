use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use porcelain::{
    broadcast::BroadcastCore,
    config::ServerConfig,
    conversation::{
        ConversationRepository, InMemoryConversationRepository, PostgresConversationRepository,
    },
    database,
    message::{InMemoryMessageStore, MessageStore, PostgresMessageStore},
    session::TokenConfig,
    shared::{AppState, StoreError},
    websockets::{ConnectionManager, InMemoryConnectionManager},
};

type Stores = (
    Arc<dyn ConversationRepository + Send + Sync>,
    Arc<dyn MessageStore + Send + Sync>,
);

/// PostgreSQL when a database is configured, in-memory otherwise
async fn open_stores(config: &ServerConfig) -> Result<Stores, StoreError> {
    let Some(url) = &config.database_url else {
        info!("DATABASE_URL not set, using in-memory stores");
        let conversations: Arc<dyn ConversationRepository + Send + Sync> =
            Arc::new(InMemoryConversationRepository::new());
        let messages: Arc<dyn MessageStore + Send + Sync> = Arc::new(InMemoryMessageStore::new());
        return Ok((conversations, messages));
    };

    let pool = database::connect(url).await?;
    database::ensure_schema(&pool).await?;
    info!("Using PostgreSQL stores");

    let conversations: Arc<dyn ConversationRepository + Send + Sync> =
        Arc::new(PostgresConversationRepository::new(pool.clone()));
    let messages: Arc<dyn MessageStore + Send + Sync> = Arc::new(PostgresMessageStore::new(pool));
    Ok((conversations, messages))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "porcelain=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting porcelain chat server");

    let config = ServerConfig::from_env();

    let (conversations, messages) = open_stores(&config).await?;

    let connection_manager: Arc<dyn ConnectionManager> = Arc::new(InMemoryConnectionManager::new());

    let (broadcast, core_task) = BroadcastCore::new(
        Arc::clone(&conversations),
        Arc::clone(&messages),
        Arc::clone(&connection_manager),
        config.broadcast.clone(),
    )
    .start();

    let app_state = AppState::new(
        conversations,
        messages,
        connection_manager,
        broadcast.clone(),
        TokenConfig::from_config(&config),
        config.max_message_length,
    );

    let app = porcelain::app(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(bind_addr = %config.bind_addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    // Pending helper replies are dropped with the core
    let cancelled = broadcast.shutdown().await.unwrap_or(0);
    info!(cancelled_replies = cancelled, "Cancelled pending helper replies");
    let _ = core_task.await;

    Ok(())
}
