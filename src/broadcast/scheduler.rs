use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::commands::ChatCommand;

pub type ReplyTaskId = u64;

/// Cancellable delayed helper replies
///
/// Each reply is a timer task holding only a weak sender to the core's
/// queue. When it fires it enqueues a `HelperReply` command, so the reply is
/// persisted and delivered in order with regular traffic. A stopped core
/// makes the upgrade fail and the task ends quietly.
#[derive(Debug, Default)]
pub(crate) struct ReplyScheduler {
    next_id: ReplyTaskId,
    pending: HashMap<ReplyTaskId, JoinHandle<()>>,
}

impl ReplyScheduler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn schedule(
        &mut self,
        delay: Duration,
        commands: mpsc::WeakSender<ChatCommand>,
        conversation_id: String,
        body: String,
    ) -> ReplyTaskId {
        self.next_id += 1;
        let task_id = self.next_id;

        debug!(
            task_id,
            room_id = %conversation_id,
            delay_ms = delay.as_millis() as u64,
            "Scheduling helper reply"
        );

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let Some(sender) = commands.upgrade() else {
                debug!(task_id, "Broadcast core stopped before helper reply fired");
                return;
            };
            let command = ChatCommand::HelperReply {
                task_id,
                conversation_id,
                body,
            };
            if sender.send(command).await.is_err() {
                warn!(task_id, "Broadcast core closed while delivering helper reply");
            }
        });

        self.pending.insert(task_id, handle);
        task_id
    }

    /// Forgets a reply whose timer has fired; returns false if unknown
    pub(crate) fn complete(&mut self, task_id: ReplyTaskId) -> bool {
        self.pending.remove(&task_id).is_some()
    }

    pub(crate) fn cancel(&mut self, task_id: ReplyTaskId) -> bool {
        match self.pending.remove(&task_id) {
            Some(handle) => {
                handle.abort();
                debug!(task_id, "Helper reply cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancels every pending reply; returns how many were pending
    pub(crate) fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
        if count > 0 {
            debug!(count, "Cancelled pending helper replies");
        }
        count
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
