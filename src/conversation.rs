//! Conversation state: roles, messages, and the append-only turn history.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The author of a conversation message.
///
/// `User` and `Assistant` cover every message this crate produces; `Other`
/// preserves role strings from foreign clients arriving at the proxy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human side of the conversation.
    User,

    /// The model side of the conversation.
    Assistant,

    /// Any other role string.
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Other(role) => write!(f, "{role}"),
        }
    }
}

/// A single conversation message. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who authored the message.
    pub role: Role,
    /// The message text.
    pub content: String,
}

impl Message {
    /// Creates a new message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// An ordered, append-only sequence of messages.
///
/// Insertion order is turn order. Under conversation tracking, every
/// completed turn appends exactly one user message followed by one
/// assistant message, so the length is always even.
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message. O(1), never fails.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message::new(role, content));
    }

    /// Returns a read-only view of the history, in insertion order.
    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    /// Discards all messages. There is no way to recover them.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Returns the number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the conversation has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drops every message at index `len` or beyond.
    ///
    /// Used to roll a failed turn back to the pre-turn history.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }
}
