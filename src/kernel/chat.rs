use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::fixtures::WELCOME_MESSAGE;
use super::time::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Player,
    System,
    Ally,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub timestamp: Timestamp,
}

/// Append-only chat history. Seeded messages survive `reset`.
#[derive(Debug, Clone, Default)]
pub struct ChatStore {
    messages: Vec<ChatMessage>,
    seeded: usize,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the system welcome line.
    pub fn with_welcome() -> Self {
        let mut store = Self::new();
        store.seed(Sender::System, WELCOME_MESSAGE);
        store
    }

    /// Seeds are only accepted before the first regular message.
    pub fn seed(&mut self, sender: Sender, text: &str) -> bool {
        if self.messages.len() != self.seeded {
            return false;
        }
        self.messages.push(ChatMessage {
            id: Uuid::new_v4(),
            sender,
            text: text.to_string(),
            timestamp: Timestamp::ZERO,
        });
        self.seeded += 1;
        true
    }

    pub fn append(&mut self, sender: Sender, text: impl Into<String>, at: Timestamp) -> Uuid {
        let id = Uuid::new_v4();
        self.messages.push(ChatMessage {
            id,
            sender,
            text: text.into(),
            timestamp: at,
        });
        id
    }

    /// Drop session messages, keep the seeded ones.
    pub fn reset(&mut self) {
        self.messages.truncate(self.seeded);
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

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_keeps_welcome() {
        let mut chat = ChatStore::with_welcome();
        chat.append(Sender::Player, "gg", Timestamp::new(10));
        chat.append(Sender::Ai, "稳住", Timestamp::new(20));
        assert_eq!(chat.len(), 3);

        chat.reset();
        assert_eq!(chat.len(), 1);
        assert_eq!(chat.messages()[0].sender, Sender::System);
        assert_eq!(chat.messages()[0].text, WELCOME_MESSAGE);
    }

    #[test]
    fn seeding_closes_after_first_append() {
        let mut chat = ChatStore::new();
        assert!(chat.seed(Sender::System, "hi"));
        chat.append(Sender::Player, "yo", Timestamp::ZERO);
        assert!(!chat.seed(Sender::System, "late"));
        chat.reset();
        assert_eq!(chat.len(), 1);
    }

    #[test]
    fn ids_are_unique() {
        let mut chat = ChatStore::new();
        let a = chat.append(Sender::Player, "a", Timestamp::ZERO);
        let b = chat.append(Sender::Player, "a", Timestamp::ZERO);
        assert_ne!(a, b);
    }
}
