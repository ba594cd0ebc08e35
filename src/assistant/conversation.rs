//! Session conversation log.

use crate::models::Message;

/// Append-only, chronologically ordered chat log for one session.
///
/// The first message is always the assistant greeting. Nothing is ever
/// removed; [`ConversationState::recent`] limits what gets sent to the
/// model without touching the log itself.
#[derive(Debug, Clone)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::assistant(greeting)],
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The last `limit` messages, or all of them when `limit` is 0.
    pub fn recent(&self, limit: usize) -> &[Message] {
        if limit == 0 || limit >= self.messages.len() {
            &self.messages
        } else {
            &self.messages[self.messages.len() - limit..]
        }
    }
}

/// `role: content` lines, one per message.
pub fn serialize_messages(messages: &[Message]) -> String {
    messages
        .iter()
        .map(Message::as_transcript_line)
        .collect::<Vec<_>>()
        .join("\n")
}
