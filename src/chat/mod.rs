use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::errors::{HumanizeError, Result};

pub mod jsonl;

pub use jsonl::JsonlChat;

/// One message of the host chat, using the host's field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_user: bool,
    #[serde(rename = "mes", default)]
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { name: None, is_user: true, text: text.into() }
    }

    pub fn character(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { name: Some(name.into()), is_user: false, text: text.into() }
    }

    /// Label used when the turn is quoted as context.
    pub fn speaker_label(&self) -> &str {
        if self.is_user {
            return "User";
        }
        match self.name.as_deref() {
            Some(n) if !n.trim().is_empty() => n,
            _ => "Character",
        }
    }
}

/// Host chat access. Indices are message positions, 0-based, in chat order.
pub trait ChatStore: Send + Sync {
    fn snapshot(&self) -> Vec<ChatTurn>;
    fn replace_text(&self, index: usize, text: &str) -> Result<()>;
    /// Persist the chat after a mutation.
    fn save(&self) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryChat {
    turns: RwLock<Vec<ChatTurn>>,
}

impl MemoryChat {
    pub fn new(turns: Vec<ChatTurn>) -> Self {
        Self { turns: RwLock::new(turns) }
    }
}

impl ChatStore for MemoryChat {
    fn snapshot(&self) -> Vec<ChatTurn> {
        self.turns.read().clone()
    }

    fn replace_text(&self, index: usize, text: &str) -> Result<()> {
        let mut turns = self.turns.write();
        let turn = turns
            .get_mut(index)
            .ok_or_else(|| HumanizeError::Chat(format!("message {index} not found")))?;
        turn.text = text.to_string();
        Ok(())
    }

    fn save(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speaker_label_falls_back_to_character() {
        assert_eq!(ChatTurn::user("hi").speaker_label(), "User");
        assert_eq!(ChatTurn::character("Seraphina", "hello").speaker_label(), "Seraphina");
        let unnamed = ChatTurn { name: Some("  ".into()), is_user: false, text: "x".into() };
        assert_eq!(unnamed.speaker_label(), "Character");
        let missing = ChatTurn { name: None, is_user: false, text: "x".into() };
        assert_eq!(missing.speaker_label(), "Character");
    }

    #[test]
    fn user_label_wins_over_name() {
        let t = ChatTurn { name: Some("Alex".into()), is_user: true, text: "x".into() };
        assert_eq!(t.speaker_label(), "User");
    }

    #[test]
    fn memory_chat_replaces_in_place() {
        let chat = MemoryChat::new(vec![ChatTurn::user("a"), ChatTurn::character("B", "b")]);
        chat.replace_text(1, "rewritten").unwrap();
        assert_eq!(chat.snapshot()[1].text, "rewritten");
        assert!(chat.replace_text(5, "x").is_err());
    }

    #[test]
    fn turn_uses_host_field_names() {
        let t: ChatTurn = serde_json::from_str(r#"{"name":"Eve","is_user":false,"mes":"hey"}"#).unwrap();
        assert_eq!(t, ChatTurn::character("Eve", "hey"));
    }
}
