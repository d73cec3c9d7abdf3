// Message broadcast core
//
// A single actor task owns the room registry and processes join, leave and
// send commands one at a time. Handles talk to it over a bounded queue.

// Public API - what other modules can use
pub use commands::{SendOutcome, SendRequest};
pub use errors::ChatError;
pub use helper::{
    HelperReplyPolicy, PlannedReply, HELPER_BOT_ID, HELPER_BOT_NAME, HELPER_RESPONSES,
};
pub use scheduler::ReplyTaskId;
pub use service::{BroadcastCore, BroadcastHandle};

// Internal modules
mod commands;
mod errors;
mod helper;
mod scheduler;
mod service;
