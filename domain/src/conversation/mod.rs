//! Conversation history.
//!
//! A [`Conversation`] is the ordered list of messages carried across scene
//! executions. The summarizer compacts it in place when it grows past the
//! configured thresholds, replacing older turns with a single summary
//! message while keeping the most recent turns verbatim.

use serde::{Deserialize, Serialize};

/// Role of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content)
    }
}

/// Ordered conversation history
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Total characters across all message contents (summarizer threshold input)
    pub fn char_count(&self) -> usize {
        self.messages.iter().map(|m| m.content.chars().count()).sum()
    }

    /// Number of assistant responses recorded so far
    pub fn response_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count()
    }

    /// Replace everything except the trailing `keep_recent` messages with a
    /// single summary turn.
    ///
    /// No-op when the history is not longer than `keep_recent`.
    pub fn compact(&mut self, summary: impl Into<String>, keep_recent: usize) {
        if self.messages.len() <= keep_recent {
            return;
        }
        let tail = self.messages.split_off(self.messages.len() - keep_recent);
        self.messages = Vec::with_capacity(tail.len() + 1);
        self.messages
            .push(Message::system(format!("Summary of earlier conversation: {}", summary.into())));
        self.messages.extend(tail);
    }
}
