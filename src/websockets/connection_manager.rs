use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Outbound side of the session gateway: pushes serialized frames to live
/// connections without waiting on the socket
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    async fn add_connection(&self, connection_id: String, sender: mpsc::UnboundedSender<String>);

    async fn remove_connection(&self, connection_id: &str);

    async fn send_to_connection(&self, connection_id: &str, message: &str);

    async fn send_to_connections(&self, connection_ids: &[String], message: &str);

    async fn connection_count(&self) -> usize;
}

pub struct InMemoryConnectionManager {
    // connection_id -> sender
    connections: Arc<RwLock<HashMap<String, mpsc::UnboundedSender<String>>>>,
}

impl Default for InMemoryConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ConnectionManager for InMemoryConnectionManager {
    async fn add_connection(&self, connection_id: String, sender: mpsc::UnboundedSender<String>) {
        let mut connections = self.connections.write().await;
        connections.insert(connection_id, sender);
    }

    async fn remove_connection(&self, connection_id: &str) {
        let mut connections = self.connections.write().await;
        connections.remove(connection_id);
    }

    async fn send_to_connection(&self, connection_id: &str, message: &str) {
        let connections = self.connections.read().await;
        if let Some(sender) = connections.get(connection_id) {
            if sender.send(message.to_string()).is_err() {
                debug!(connection_id = %connection_id, "Dropped frame for closing connection");
            }
        }
    }

    async fn send_to_connections(&self, connection_ids: &[String], message: &str) {
        let connections = self.connections.read().await;
        for connection_id in connection_ids {
            if let Some(sender) = connections.get(connection_id) {
                let _ = sender.send(message.to_string());
            }
        }
    }

    async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_reaches_only_targeted_connections() {
        let manager = InMemoryConnectionManager::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        manager.add_connection("conn-a".into(), tx_a).await;
        manager.add_connection("conn-b".into(), tx_b).await;

        manager
            .send_to_connections(&["conn-a".to_string(), "conn-z".to_string()], "frame")
            .await;

        assert_eq!(rx_a.try_recv().unwrap(), "frame");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_frames_keep_their_order() {
        let manager = InMemoryConnectionManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.add_connection("conn-a".into(), tx).await;

        for frame in ["one", "two", "three"] {
            manager.send_to_connection("conn-a", frame).await;
        }

        assert_eq!(rx.try_recv().unwrap(), "one");
        assert_eq!(rx.try_recv().unwrap(), "two");
        assert_eq!(rx.try_recv().unwrap(), "three");
    }

    #[tokio::test]
    async fn test_remove_connection() {
        let manager = InMemoryConnectionManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.add_connection("conn-a".into(), tx).await;
        assert_eq!(manager.connection_count().await, 1);

        manager.remove_connection("conn-a").await;
        manager.send_to_connection("conn-a", "late").await;

        assert_eq!(manager.connection_count().await, 0);
        assert!(rx.try_recv().is_err());
    }
}
