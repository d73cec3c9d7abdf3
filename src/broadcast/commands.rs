use tokio::sync::oneshot;

use super::{errors::ChatError, scheduler::ReplyTaskId};
use crate::message::MessageModel;

/// A user's request to post into a conversation
#[derive(Debug, Clone, PartialEq)]
pub struct SendRequest {
    pub conversation_id: String,
    pub author_id: String,
    pub author_name: String,
    pub body: String,
}

/// Result of a successful send
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    /// `None` when the body was empty and nothing was posted
    pub message: Option<MessageModel>,
    /// Set when a helper reply was scheduled for this message
    pub helper_reply: Option<ReplyTaskId>,
}

impl SendOutcome {
    pub(crate) fn skipped() -> Self {
        Self {
            message: None,
            helper_reply: None,
        }
    }
}

/// Commands consumed by the broadcast core, in arrival order
#[derive(Debug)]
pub(crate) enum ChatCommand {
    Join {
        connection_id: String,
        conversation_id: String,
        respond_to: oneshot::Sender<bool>,
    },
    Leave {
        connection_id: String,
        respond_to: oneshot::Sender<Vec<String>>,
    },
    Send {
        request: SendRequest,
        respond_to: oneshot::Sender<Result<SendOutcome, ChatError>>,
    },
    /// Fired by a scheduled timer; nobody awaits the result
    HelperReply {
        task_id: ReplyTaskId,
        conversation_id: String,
        body: String,
    },
    Subscribers {
        conversation_id: String,
        respond_to: oneshot::Sender<Vec<String>>,
    },
    PendingReplies {
        respond_to: oneshot::Sender<usize>,
    },
    /// Cancels pending helper replies and stops the core
    Shutdown {
        respond_to: oneshot::Sender<usize>,
    },
}
