//! Finalized conversation messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::payloads::SidePayloads;
use crate::identifier::MessageId;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The end user.
    User,
    /// The assistant.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// An immutable conversation message.
///
/// A streamed reply becomes one of these once it is finalized, and is then
/// indistinguishable from a reply fetched in one piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Local message ID.
    pub id: MessageId,
    /// Author.
    pub role: Role,
    /// Full text.
    pub content: String,
    /// Products and quick replies shown under the text.
    #[serde(default, skip_serializing_if = "SidePayloads::is_empty")]
    pub side_payloads: SidePayloads,
    /// ID the backend assigned, if it sent one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_message_id: Option<String>,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            side_payloads: SidePayloads::default(),
            server_message_id: None,
            created_at: Utc::now(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Set the side payloads.
    #[must_use]
    pub fn with_side_payloads(mut self, side_payloads: SidePayloads) -> Self {
        self.side_payloads = side_payloads;
        self
    }

    /// Set the backend message ID.
    #[must_use]
    pub fn with_server_message_id(mut self, id: impl Into<String>) -> Self {
        self.server_message_id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::payloads::Product;

    #[test]
    fn test_constructors() {
        let msg = ChatMessage::user("hi");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "hi");
        assert!(msg.side_payloads.is_empty());

        let reply = ChatMessage::assistant("hello").with_server_message_id("m1");
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.server_message_id.as_deref(), Some("m1"));
    }

    #[test]
    fn test_serialization_skips_empty_payloads() {
        let msg = ChatMessage::assistant("hello");
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("side_payloads").is_none());
        assert_eq!(json["role"], "assistant");

        let msg = msg.with_side_payloads(SidePayloads {
            products: vec![Product::new(1, "Course A")],
            quick_replies: Vec::new(),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["side_payloads"]["products"][0]["name"], "Course A");
    }
}
