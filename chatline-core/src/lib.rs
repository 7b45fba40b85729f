//! # chatline-core
//!
//! Core types and error handling for chatline.
//!
//! This crate provides the foundational types shared by the other chatline crates:
//!
//! - **Messages**: finalized [`ChatMessage`]s and the in-progress [`StreamingMessage`]
//! - **Side payloads**: products and quick replies shown under a reply
//! - **Tool notices**: the transient [`ToolActivity`] indicator
//! - **Errors**: the transport / malformed record / backend taxonomy
//! - **Identifiers**: type-safe IDs for messages and conversations
//!
//! ## Example
//!
//! ```rust
//! use chatline_core::{ChatMessage, Role, StreamingMessage};
//!
//! let question = ChatMessage::user("Do you have evening classes?");
//! assert_eq!(question.role, Role::User);
//!
//! let mut reply = StreamingMessage::new();
//! reply.push_text("Yes, ").unwrap();
//! reply.push_text("three of them.").unwrap();
//! reply.finish();
//! assert_eq!(reply.to_message().content, "Yes, three of them.");
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod errors;
pub mod identifier;
pub mod messages;

// Re-exports for convenience
pub use errors::{BackendError, ChatError, MalformedRecordError, Result, TransportError};
pub use identifier::{ConversationId, MessageId};
pub use messages::{
    ChatMessage, Product, QuickReply, QuickReplyAction, Role, SidePayloads, StreamingMessage,
    ToolActivity, ToolStatus,
};

/// Prelude module for common imports.
///
/// ```rust
/// use chatline_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::errors::{BackendError, ChatError, Result, TransportError};
    pub use crate::identifier::{ConversationId, MessageId};
    pub use crate::messages::{
        ChatMessage, Product, QuickReply, Role, SidePayloads, StreamingMessage, ToolActivity,
        ToolStatus,
    };
}
