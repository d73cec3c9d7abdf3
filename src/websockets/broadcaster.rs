use std::sync::Arc;

use super::{connection_manager::ConnectionManager, messages::WebSocketMessage};

pub struct MessageBroadcaster;

impl MessageBroadcaster {
    /// Serializes once, then pushes the same frame to every connection
    pub async fn broadcast_to_connections(
        connection_manager: &Arc<dyn ConnectionManager>,
        connection_ids: &[String],
        message: &WebSocketMessage,
    ) -> Result<(), serde_json::Error> {
        let message_json = serde_json::to_string(message)?;
        connection_manager
            .send_to_connections(connection_ids, &message_json)
            .await;
        Ok(())
    }

    pub async fn send_to_connection(
        connection_manager: &Arc<dyn ConnectionManager>,
        connection_id: &str,
        message: &WebSocketMessage,
    ) -> Result<(), serde_json::Error> {
        let message_json = serde_json::to_string(message)?;
        connection_manager
            .send_to_connection(connection_id, &message_json)
            .await;
        Ok(())
    }
}
