//! Conversation state.
//!
//! An append-only transcript scoped to a session id. Messages are
//! immutable once appended; the transcript grows monotonically within
//! a run and serializes cleanly so a session can be replayed.

use redscout_provider::Message;
use serde::{Deserialize, Serialize};

/// The ordered transcript of one assessment session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    session_id: String,
    messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation for a session.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
        }
    }

    /// The session this transcript belongs to. Stable for the run's
    /// lifetime.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Append a message. There is no removal or mutation path.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The full transcript in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages in the transcript.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recently appended message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}
