//! # chatline - Streamed Chat Replies for Rust
//!
//! chatline renders an assistant's reply while it is still arriving. The
//! backend streams Server-Sent Events; chatline reassembles them, grows a
//! single in-progress message, shows a transient tool notice while the
//! assistant works, and settles the reply exactly once: finalized with its
//! products and quick replies, or aborted with a generic notice.
//!
//! ## Quick Start
//!
//! ```ignore
//! use chatline::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ChatClient::from_env()?;
//!     let mut conversation = Conversation::new(client);
//!
//!     let (observer, mut updates) = ChannelObserver::channel();
//!     tokio::spawn(async move {
//!         while let Some(event) = updates.recv().await {
//!             if let SinkEvent::TextUpdated(text) = event {
//!                 println!("{text}");
//!             }
//!         }
//!     });
//!
//!     let reply = conversation.send("Which courses fit a beginner?", observer).await?;
//!     println!("{} products suggested", reply.side_payloads.products.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! chatline is organized as a workspace of focused crates:
//!
//! - [`chatline_core`] - Messages, side payloads, and errors
//! - [`chatline_streaming`] - SSE reading, record interpretation, and the presentation sink
//! - [`chatline_client`] - HTTP client and conversation turns

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// ============================================================================
// Crate Re-exports
// ============================================================================

/// Messages, side payloads, and errors.
pub use chatline_core as core;

/// Streaming support.
pub use chatline_streaming as streaming;

/// HTTP client and conversations.
pub use chatline_client as client;

// ============================================================================
// Flat Re-exports
// ============================================================================

// Errors
pub use chatline_core::{BackendError, ChatError, MalformedRecordError, Result, TransportError};

// Messages
pub use chatline_core::{
    ChatMessage, ConversationId, MessageId, Product, QuickReply, Role, SidePayloads,
    StreamingMessage, ToolActivity, ToolStatus,
};

// Streaming
pub use chatline_streaming::{
    AbortReason, ChannelObserver, NoopObserver, PresentationSink, RevealPacing, SinkEvent,
    SinkState, StreamConfig, StreamObserver, StreamRecord, StreamSession, UiUpdate,
};

// Client
pub use chatline_client::{
    Canceller, ChatClient, ChatReply, ChatRequest, ClientConfig, Conversation,
};

// ============================================================================
// Prelude Module
// ============================================================================

/// Convenient prelude for common imports.
///
/// ```ignore
/// use chatline::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::{ChatError, ChatMessage, ConversationId, Result, Role};

    // Streaming
    pub use crate::streaming::{
        AbortReason, ChannelObserver, RevealPacing, SinkEvent, StreamObserver,
    };

    // Client
    pub use crate::client::{ChatClient, ChatRequest, ClientConfig, Conversation};
}

// ============================================================================
// Version Information
// ============================================================================

/// Returns the current version of chatline.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
