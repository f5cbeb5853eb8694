//! Autohelp conversations
//!
//! A conversation is one user's in-progress diagnostic session in one channel.
//! Analysis events are applied by a single worker task per conversation, so
//! derived state is never recomputed concurrently.

mod blocklist;
mod handle;
mod registry;
mod state;
mod status;
mod worker;

#[cfg(test)]
mod proptests;

pub use handle::{ConversationHandle, ConversationUpdate, ForgetReason};
pub use registry::ConversationRegistry;
pub use status::StatusPayload;

use std::fmt;

/// Identifies at most one live conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub channel_id: u64,
    pub author_id: u64,
}

impl ConversationKey {
    pub fn new(channel_id: u64, author_id: u64) -> Self {
        Self {
            channel_id,
            author_id,
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.author_id)
    }
}
