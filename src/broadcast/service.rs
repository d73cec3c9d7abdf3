use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::{
    commands::{ChatCommand, SendOutcome, SendRequest},
    errors::ChatError,
    helper::{HelperReplyPolicy, HELPER_BOT_ID, HELPER_BOT_NAME},
    scheduler::{ReplyScheduler, ReplyTaskId},
};
use crate::{
    config::BroadcastConfig,
    conversation::ConversationRepository,
    message::{MessageModel, MessageStore},
    room::RoomRegistry,
    websockets::{ConnectionManager, MessageBroadcaster, WebSocketMessage},
};

/// The authoritative path from "user sent a message" to "every live
/// participant sees it"
///
/// Runs as a single task: commands are handled strictly one at a time, so a
/// message is persisted and handed to every subscriber's outbound channel
/// before the next command is looked at. That gives per-room delivery in
/// persistence order without any locking around the registry.
pub struct BroadcastCore {
    registry: RoomRegistry,
    conversations: Arc<dyn ConversationRepository + Send + Sync>,
    messages: Arc<dyn MessageStore + Send + Sync>,
    connection_manager: Arc<dyn ConnectionManager>,
    policy: HelperReplyPolicy,
    scheduler: ReplyScheduler,
    queue_capacity: usize,
    last_timestamp: Option<DateTime<Utc>>,
}

impl BroadcastCore {
    pub fn new(
        conversations: Arc<dyn ConversationRepository + Send + Sync>,
        messages: Arc<dyn MessageStore + Send + Sync>,
        connection_manager: Arc<dyn ConnectionManager>,
        config: BroadcastConfig,
    ) -> Self {
        Self {
            registry: RoomRegistry::new(),
            conversations,
            messages,
            connection_manager,
            policy: HelperReplyPolicy::new(&config),
            scheduler: ReplyScheduler::new(),
            queue_capacity: config.queue_capacity.max(1),
            last_timestamp: None,
        }
    }

    /// Replaces the randomly seeded reply policy
    pub fn with_policy(mut self, policy: HelperReplyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Spawns the core task; it stops once every handle is dropped or on shutdown
    pub fn start(self) -> (BroadcastHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(self.queue_capacity);
        let commands = sender.downgrade();
        let task = tokio::spawn(self.run(receiver, commands));

        (BroadcastHandle { sender }, task)
    }

    async fn run(
        mut self,
        mut receiver: mpsc::Receiver<ChatCommand>,
        commands: mpsc::WeakSender<ChatCommand>,
    ) {
        info!("Broadcast core started");

        while let Some(command) = receiver.recv().await {
            match command {
                ChatCommand::Join {
                    connection_id,
                    conversation_id,
                    respond_to,
                } => {
                    let added = self.registry.join(&connection_id, &conversation_id);
                    let _ = respond_to.send(added);
                }
                ChatCommand::Leave {
                    connection_id,
                    respond_to,
                } => {
                    let left = self.registry.leave(&connection_id);
                    let _ = respond_to.send(left);
                }
                ChatCommand::Send {
                    request,
                    respond_to,
                } => {
                    let result = self.send_message(request, &commands).await;
                    let _ = respond_to.send(result);
                }
                ChatCommand::HelperReply {
                    task_id,
                    conversation_id,
                    body,
                } => {
                    self.post_helper_reply(task_id, conversation_id, body)
                        .await;
                }
                ChatCommand::Subscribers {
                    conversation_id,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.registry.subscribers_of(&conversation_id));
                }
                ChatCommand::PendingReplies { respond_to } => {
                    let _ = respond_to.send(self.scheduler.pending_count());
                }
                ChatCommand::Shutdown { respond_to } => {
                    let _ = respond_to.send(self.scheduler.cancel_all());
                    break;
                }
            }
        }

        let cancelled = self.scheduler.cancel_all();
        info!(
            cancelled_replies = cancelled,
            rooms = self.registry.room_count(),
            "Broadcast core stopped"
        );
    }

    #[instrument(
        skip(self, request, commands),
        fields(room_id = %request.conversation_id, author_id = %request.author_id)
    )]
    async fn send_message(
        &mut self,
        request: SendRequest,
        commands: &mpsc::WeakSender<ChatCommand>,
    ) -> Result<SendOutcome, ChatError> {
        let body = request.body.trim();
        if body.is_empty() {
            debug!("Ignoring message with empty body");
            return Ok(SendOutcome::skipped());
        }

        if self
            .conversations
            .get_conversation(&request.conversation_id)
            .await?
            .is_none()
        {
            warn!("Message sent to unknown conversation");
            return Err(ChatError::NotFound(request.conversation_id));
        }

        let timestamp = self.next_timestamp();
        let message = MessageModel::new(
            &request.conversation_id,
            request.author_id,
            request.author_name,
            body,
            timestamp,
        );
        let message = self.publish(message).await?;

        let helper_reply = self.policy.plan().map(|planned| {
            self.scheduler.schedule(
                planned.delay,
                commands.clone(),
                message.conversation_id.clone(),
                planned.body,
            )
        });

        info!(
            message_id = %message.id,
            helper_reply_scheduled = helper_reply.is_some(),
            "Message sent"
        );

        Ok(SendOutcome {
            message: Some(message),
            helper_reply,
        })
    }

    async fn post_helper_reply(
        &mut self,
        task_id: ReplyTaskId,
        conversation_id: String,
        body: String,
    ) {
        self.scheduler.complete(task_id);

        let timestamp = self.next_timestamp();
        let message = MessageModel::new(
            conversation_id,
            HELPER_BOT_ID,
            HELPER_BOT_NAME,
            body,
            timestamp,
        );

        match self.publish(message).await {
            Ok(message) => {
                info!(
                    task_id,
                    room_id = %message.conversation_id,
                    message_id = %message.id,
                    "Helper reply posted"
                );
            }
            Err(e) => {
                warn!(task_id, error = %e, "Helper reply failed");
            }
        }
    }

    /// Persists first; only a stored message is ever delivered
    async fn publish(&self, message: MessageModel) -> Result<MessageModel, ChatError> {
        self.messages.insert(&message).await.map_err(|e| {
            error!(
                room_id = %message.conversation_id,
                error = %e,
                "Failed to persist message"
            );
            ChatError::StoreFailure(e)
        })?;

        self.deliver(&message).await;
        Ok(message)
    }

    async fn deliver(&self, message: &MessageModel) {
        let subscribers = self.registry.subscribers_of(&message.conversation_id);
        if subscribers.is_empty() {
            debug!(
                room_id = %message.conversation_id,
                "No live subscribers, message kept for history"
            );
            return;
        }

        let event = WebSocketMessage::new_message(message);
        if let Err(e) =
            MessageBroadcaster::broadcast_to_connections(&self.connection_manager, &subscribers, &event)
                .await
        {
            error!(
                room_id = %message.conversation_id,
                error = %e,
                "Failed to serialize new_message event"
            );
            return;
        }

        debug!(
            room_id = %message.conversation_id,
            message_id = %message.id,
            receivers = subscribers.len(),
            "Message delivered"
        );
    }

    /// Server clock, never earlier than a timestamp issued before
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let timestamp = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(timestamp);
        timestamp
    }
}

/// Cloneable handle to a running broadcast core
#[derive(Debug, Clone)]
pub struct BroadcastHandle {
    sender: mpsc::Sender<ChatCommand>,
}

impl BroadcastHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> ChatCommand,
    ) -> Result<T, ChatError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| ChatError::Unavailable)?;
        response.await.map_err(|_| ChatError::Unavailable)
    }

    /// Subscribes a connection to a room. Once this returns the connection
    /// receives every message persisted afterwards. Returns false when it
    /// was already subscribed.
    pub async fn join(&self, connection_id: &str, conversation_id: &str) -> Result<bool, ChatError> {
        self.request(|respond_to| ChatCommand::Join {
            connection_id: connection_id.to_string(),
            conversation_id: conversation_id.to_string(),
            respond_to,
        })
        .await
    }

    /// Drops a connection from every room. Pending helper replies are kept.
    pub async fn leave(&self, connection_id: &str) -> Result<Vec<String>, ChatError> {
        self.request(|respond_to| ChatCommand::Leave {
            connection_id: connection_id.to_string(),
            respond_to,
        })
        .await
    }

    pub async fn send(&self, request: SendRequest) -> Result<SendOutcome, ChatError> {
        self.request(|respond_to| ChatCommand::Send {
            request,
            respond_to,
        })
        .await?
    }

    /// Posts a message; `Ok(None)` when the body is empty
    pub async fn send_message(
        &self,
        conversation_id: &str,
        author_id: &str,
        author_name: &str,
        body: &str,
    ) -> Result<Option<MessageModel>, ChatError> {
        let outcome = self
            .send(SendRequest {
                conversation_id: conversation_id.to_string(),
                author_id: author_id.to_string(),
                author_name: author_name.to_string(),
                body: body.to_string(),
            })
            .await?;
        Ok(outcome.message)
    }

    pub async fn subscribers_of(&self, conversation_id: &str) -> Result<Vec<String>, ChatError> {
        self.request(|respond_to| ChatCommand::Subscribers {
            conversation_id: conversation_id.to_string(),
            respond_to,
        })
        .await
    }

    /// Number of helper replies scheduled but not yet posted
    pub async fn pending_replies(&self) -> Result<usize, ChatError> {
        self.request(|respond_to| ChatCommand::PendingReplies { respond_to })
            .await
    }

    /// Stops the core; returns how many pending helper replies were cancelled
    pub async fn shutdown(&self) -> Result<usize, ChatError> {
        self.request(|respond_to| ChatCommand::Shutdown { respond_to })
            .await
    }
}
