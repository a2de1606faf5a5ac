//! The visible chat transcript.

use chrono::{DateTime, Utc};
use llm_core::{Message, Role};
use serde::Serialize;
use uuid::Uuid;

pub const WELCOME_MESSAGE: &str =
    "Hello! I'm here to help you recall your memories. What would you like to remember today?";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Synthetic error reply; never sent back to the model.
    pub is_error: bool,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::new(Role::Assistant, content)
        }
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// A conversation opened by the assistant's greeting.
    pub fn with_welcome() -> Self {
        let mut conversation = Self::new();
        conversation.push(ChatMessage::new(Role::Assistant, WELCOME_MESSAGE));
        conversation
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn push(&mut self, message: ChatMessage) -> Uuid {
        let id = message.id;
        self.messages.push(message);
        id
    }

    /// Append an empty assistant message that a streamed reply fills in.
    pub fn push_placeholder(&mut self) -> Uuid {
        self.push(ChatMessage::new(Role::Assistant, ""))
    }

    /// Returns false when `id` is no longer in the transcript.
    pub fn set_content(&mut self, id: Uuid, content: impl Into<String>) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.content = content.into();
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: Uuid) -> Option<ChatMessage> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(index))
    }

    /// Messages to send as context: user and assistant turns with content,
    /// excluding synthetic error replies.
    pub fn history(&self) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| !m.is_error && !m.content.trim().is_empty())
            .filter(|m| matches!(m.role, Role::User | Role::Assistant))
            .map(|m| Message::new(m.role, m.content.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_welcome_message() {
        let conversation = Conversation::with_welcome();
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0].role, Role::Assistant);
        assert_eq!(conversation.messages()[0].content, WELCOME_MESSAGE);
    }

    #[test]
    fn test_placeholder_lifecycle() {
        let mut conversation = Conversation::new();
        conversation.push(ChatMessage::new(Role::User, "Where did we go in 1998?"));
        let id = conversation.push_placeholder();
        assert_eq!(conversation.get(id).unwrap().content, "");

        assert!(conversation.set_content(id, "You went to Lisbon."));
        assert_eq!(conversation.get(id).unwrap().content, "You went to Lisbon.");

        assert!(conversation.remove(id).is_some());
        assert!(!conversation.set_content(id, "gone"));
        assert_eq!(conversation.len(), 1);
    }

    #[test]
    fn test_history_skips_errors_and_empty_placeholders() {
        let mut conversation = Conversation::with_welcome();
        conversation.push(ChatMessage::new(Role::User, "Hello"));
        conversation.push(ChatMessage::error("I'm sorry, I encountered an error"));
        conversation.push(ChatMessage::new(Role::User, "Try again"));
        conversation.push_placeholder();

        let history = conversation.history();
        assert_eq!(
            history,
            vec![
                Message::assistant(WELCOME_MESSAGE),
                Message::user("Hello"),
                Message::user("Try again"),
            ]
        );
    }
}
