//! Message types for a chat conversation.
//!
//! - **Finalized messages**: [`ChatMessage`] and [`Role`]
//! - **In-progress replies**: [`StreamingMessage`]
//! - **Side payloads**: [`SidePayloads`], [`Product`], [`QuickReply`]
//! - **Tool notices**: [`ToolActivity`], [`ToolStatus`]
//!
//! ## Example
//!
//! ```rust
//! use chatline_core::messages::{StreamingMessage, SidePayloads};
//!
//! let mut reply = StreamingMessage::new();
//! reply.push_text("Welcome ").unwrap();
//! reply.push_text("back!").unwrap();
//! reply.attach_side_payloads(SidePayloads::new()).unwrap();
//! reply.finish();
//!
//! assert_eq!(reply.to_message().content, "Welcome back!");
//! ```

pub mod chat;
pub mod payloads;
pub mod streaming;
pub mod tool;

// Re-exports for convenience
pub use chat::{ChatMessage, Role};
pub use payloads::{Product, QuickReply, QuickReplyAction, SidePayloads};
pub use streaming::StreamingMessage;
pub use tool::{ToolActivity, ToolStatus};
