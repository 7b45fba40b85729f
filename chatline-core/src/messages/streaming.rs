//! The accumulating assistant reply.

use chrono::{DateTime, Utc};

use super::chat::{ChatMessage, Role};
use super::payloads::SidePayloads;
use crate::errors::{ChatError, Result};
use crate::identifier::MessageId;

/// An assistant reply that is still being received.
///
/// Text only ever grows at the end, and only while the message is
/// streaming. Once side payloads are attached the text is sealed, and once
/// the message is finished nothing about it changes.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamingMessage {
    id: MessageId,
    content: String,
    fragments: usize,
    is_streaming: bool,
    text_sealed: bool,
    side_payloads: Option<SidePayloads>,
    server_message_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl Default for StreamingMessage {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingMessage {
    /// Start a new reply with a fresh ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: MessageId::new(),
            content: String::new(),
            fragments: 0,
            is_streaming: true,
            text_sealed: false,
            side_payloads: None,
            server_message_id: None,
            created_at: Utc::now(),
        }
    }

    /// Local message ID.
    #[must_use]
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    /// Always [`Role::Assistant`].
    #[must_use]
    pub fn role(&self) -> Role {
        Role::Assistant
    }

    /// Text received so far.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Number of appends applied.
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    /// True until the message is finished.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    /// Side payloads, once attached.
    #[must_use]
    pub fn side_payloads(&self) -> Option<&SidePayloads> {
        self.side_payloads.as_ref()
    }

    /// Backend message ID, once known.
    #[must_use]
    pub fn server_message_id(&self) -> Option<&str> {
        self.server_message_id.as_deref()
    }

    /// Append text at the end.
    ///
    /// # Errors
    ///
    /// Fails once the text has been sealed or the message finished.
    pub fn push_text(&mut self, text: &str) -> Result<()> {
        if !self.is_streaming || self.text_sealed {
            return Err(ChatError::InvalidState(format!(
                "cannot append to sealed message {}",
                self.id
            )));
        }
        if text.is_empty() {
            return Ok(());
        }
        self.content.push_str(text);
        self.fragments += 1;
        Ok(())
    }

    /// Attach side payloads, sealing the text.
    ///
    /// # Errors
    ///
    /// Fails if payloads were already attached or the message is finished.
    pub fn attach_side_payloads(&mut self, payloads: SidePayloads) -> Result<()> {
        if !self.is_streaming {
            return Err(ChatError::InvalidState(format!(
                "message {} is already finished",
                self.id
            )));
        }
        if self.side_payloads.is_some() {
            return Err(ChatError::InvalidState(format!(
                "side payloads already attached to message {}",
                self.id
            )));
        }
        self.text_sealed = true;
        self.side_payloads = Some(payloads);
        Ok(())
    }

    /// Record the ID the backend assigned.
    pub fn set_server_message_id(&mut self, id: impl Into<String>) {
        if self.is_streaming {
            self.server_message_id = Some(id.into());
        }
    }

    /// Stop streaming. Returns `false` if the message was already finished.
    pub fn finish(&mut self) -> bool {
        if !self.is_streaming {
            return false;
        }
        self.is_streaming = false;
        self.text_sealed = true;
        true
    }

    /// Snapshot as an immutable [`ChatMessage`].
    #[must_use]
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage {
            id: self.id.clone(),
            role: Role::Assistant,
            content: self.content.clone(),
            side_payloads: self.side_payloads.clone().unwrap_or_default(),
            server_message_id: self.server_message_id.clone(),
            created_at: self.created_at,
        }
    }
}
