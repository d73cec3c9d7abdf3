use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Simple WebSocket abstraction - all we care about is send/receive
#[async_trait]
pub trait SocketWrapper: Send {
    /// Send a text message to the client
    async fn send_message(&mut self, message: String) -> Result<(), SocketError>;

    /// Receive the next message from the client (None if connection closed)
    async fn receive_message(&mut self) -> Result<Option<String>, SocketError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), SocketError>;
}

/// Who is on the other end of a live connection
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionContext {
    /// Unique per socket; one user may hold several
    pub connection_id: String,
    pub user_id: String,
    pub display_name: String,
}

/// Handler for incoming WebSocket messages
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle an incoming message from the client
    async fn handle_message(&self, context: &ConnectionContext, message: String);
}

#[derive(Debug)]
pub enum SocketError {
    ConnectionClosed,
    SendFailed(String),
    ReceiveFailed(String),
}

/// Direct implementation on axum's WebSocket
#[async_trait]
impl SocketWrapper for WebSocket {
    async fn send_message(&mut self, message: String) -> Result<(), SocketError> {
        self.send(Message::Text(message))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn receive_message(&mut self) -> Result<Option<String>, SocketError> {
        loop {
            match self.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(_)) => continue, // Ignore binary/ping/pong
                Some(Err(e)) => return Err(SocketError::ReceiveFailed(e.to_string())),
                None => return Ok(None), // Connection closed
            }
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.send(Message::Close(None))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }
}

/// Connection represents a managed WebSocket connection
/// It is used to send and receive messages to and from the client
/// The outbound receiver is fed by the ConnectionManager
pub struct Connection {
    pub context: ConnectionContext,
    socket: Box<dyn SocketWrapper>,
    outbound_receiver: mpsc::UnboundedReceiver<String>,
    message_handler: Arc<dyn MessageHandler>,
}

impl Connection {
    pub fn new(
        context: ConnectionContext,
        socket: Box<dyn SocketWrapper>,
        outbound_receiver: mpsc::UnboundedReceiver<String>,
        message_handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            context,
            socket,
            outbound_receiver,
            message_handler,
        }
    }

    /// Run the connection - handles both sending and receiving until disconnect
    pub async fn run(mut self) -> Result<(), SocketError> {
        loop {
            tokio::select! {
                // Handle outbound messages (from our app to client)
                msg = self.outbound_receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.socket.send_message(message).await?
                        }
                        None => break, // Channel closed, disconnect
                    }
                }

                // Handle inbound messages (from client to our app)
                msg = self.socket.receive_message() => {
                    match msg {
                        Ok(Some(message)) => {
                            self.message_handler
                                .handle_message(&self.context, message)
                                .await;
                        }
                        Ok(None) => break, // Client disconnected
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        // Clean disconnect
        let _ = self.socket.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted socket: yields the queued inbound frames, then reports close
    struct ScriptedSocket {
        inbound: VecDeque<String>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl SocketWrapper for ScriptedSocket {
        async fn send_message(&mut self, message: String) -> Result<(), SocketError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn receive_message(&mut self) -> Result<Option<String>, SocketError> {
            Ok(self.inbound.pop_front())
        }

        async fn close(&mut self) -> Result<(), SocketError> {
            Ok(())
        }
    }

    struct RecordingHandler(Mutex<Vec<(String, String)>>);

    #[async_trait]
    impl MessageHandler for RecordingHandler {
        async fn handle_message(&self, context: &ConnectionContext, message: String) {
            self.0
                .lock()
                .unwrap()
                .push((context.connection_id.clone(), message));
        }
    }

    fn context() -> ConnectionContext {
        ConnectionContext {
            connection_id: "conn-a".into(),
            user_id: "alice".into(),
            display_name: "Alice".into(),
        }
    }

    #[tokio::test]
    async fn test_inbound_frames_reach_handler_until_close() {
        let sent = Arc::new(Mutex::new(vec![]));
        let socket = ScriptedSocket {
            inbound: VecDeque::from(vec!["one".to_string(), "two".to_string()]),
            sent: sent.clone(),
        };
        let handler = Arc::new(RecordingHandler(Mutex::new(vec![])));
        // Keep the sender alive so only the socket close ends the loop
        let (_outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Connection::new(context(), Box::new(socket), outbound_rx, handler.clone())
            .run()
            .await
            .unwrap();

        let received = handler.0.lock().unwrap().clone();
        assert_eq!(
            received,
            vec![
                ("conn-a".to_string(), "one".to_string()),
                ("conn-a".to_string(), "two".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_connection_ends_cleanly_without_outbound_sender() {
        let sent = Arc::new(Mutex::new(vec![]));
        let socket = ScriptedSocket {
            inbound: VecDeque::new(),
            sent: sent.clone(),
        };
        let handler = Arc::new(RecordingHandler(Mutex::new(vec![])));
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        drop(outbound_tx);

        let result = Connection::new(context(), Box::new(socket), outbound_rx, handler)
            .run()
            .await;

        assert!(result.is_ok());
    }
}
