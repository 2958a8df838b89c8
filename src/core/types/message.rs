use serde::{Deserialize, Serialize};

use super::content::ContentBlock;
use super::role::Role;

/// A single turn in a conversation, in the gateway's canonical dialect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Message {
            role: Role::Assistant,
            content: vec![ContentBlock::text(text)],
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Message {
            role: Role::System,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Concatenation of every text block, ignoring tool/image/thinking
    /// content. Used by adapters that need a flat system prompt string.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let message = Message::assistant("hello");
        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role, message.role);
        assert_eq!(back.text(), message.text());
    }

    #[test]
    fn text_ignores_non_text_blocks() {
        let message = Message {
            role: Role::Assistant,
            content: vec![
                ContentBlock::text("part one"),
                ContentBlock::ToolUse { id: "t1".into(), name: "search".into(), input: serde_json::json!({}) },
            ],
        };
        assert_eq!(message.text(), "part one");
    }
}
