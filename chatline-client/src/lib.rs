//! # chatline-client
//!
//! HTTP client for the chat backend.
//!
//! ## Core Concepts
//!
//! - **[`ClientConfig`]**: Base URL, endpoint paths, token, and timeouts
//! - **[`ChatClient`]**: Stream a reply into an observer, or fetch it whole
//! - **[`Conversation`]**: One turn at a time, with history and cancellation
//!
//! ## Example
//!
//! ```ignore
//! use chatline_client::{ChatClient, ClientConfig, Conversation};
//! use chatline_streaming::NoopObserver;
//!
//! let client = ChatClient::new(ClientConfig::parse("http://localhost:8000")?)?;
//! let mut conversation = Conversation::new(client);
//!
//! let reply = conversation.send("What courses do you have?", NoopObserver).await?;
//! println!("{}", reply.content);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod conversation;
pub mod transport;

// Re-exports
pub use client::{ChatClient, ChatReply, ChatRequest};
pub use config::{ClientConfig, ENV_API_TOKEN, ENV_BASE_URL, ENV_TIMEOUT_SECS};
pub use conversation::{Canceller, Conversation};
pub use transport::{check_response, transport_error, HttpTransport, EVENT_STREAM, JSON};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{Canceller, ChatClient, ChatRequest, ClientConfig, Conversation};
}
