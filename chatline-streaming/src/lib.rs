//! # chatline-streaming
//!
//! Incremental rendering of streamed chat replies.
//!
//! A reply arrives as Server-Sent Events, one JSON record per event. This
//! crate turns that byte stream into updates of a single in-progress
//! message and reports every change to a UI observer.
//!
//! ## Core Concepts
//!
//! - **[`SseStream`]**: Reassemble SSE events from arbitrarily chunked bytes
//! - **[`StreamRecord`]**: The typed record carried by each event
//! - **[`EventInterpreter`]**: Route records to the sink or the reveal queue
//! - **[`PresentationSink`]**: Own the in-progress reply and its lifecycle
//! - **[`StreamObserver`]**: Receive text, tool, and completion callbacks
//! - **[`StreamSession`]**: Drive one reply to completion or abort
//!
//! ## Example
//!
//! ```ignore
//! use chatline_streaming::{ChannelObserver, StreamConfig, StreamSession};
//! use tokio_util::sync::CancellationToken;
//!
//! let (observer, mut updates) = ChannelObserver::channel();
//! let mut session = StreamSession::new(observer, StreamConfig::default());
//!
//! tokio::spawn(async move {
//!     while let Some(update) = updates.recv().await {
//!         println!("{update:?}");
//!     }
//! });
//!
//! let message = session.run_bytes(response.bytes_stream(), &CancellationToken::new()).await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod interpreter;
pub mod observer;
pub mod record;
pub mod reveal;
pub mod session;
pub mod sink;
pub mod sse;

// Re-exports
pub use error::{StreamError, StreamResult};
pub use interpreter::{Dispatch, EventInterpreter, InterpreterStats};
pub use observer::{
    AbortReason, ChannelObserver, CollectingObserver, NoopObserver, SinkEvent, StreamObserver,
    UiUpdate,
};
pub use record::{RoutingInfo, StreamRecord};
pub use reveal::{RevealPacing, RevealQueue};
pub use session::{StreamConfig, StreamSession, DEFAULT_IDLE_TIMEOUT};
pub use sink::{PresentationSink, SinkState};
pub use sse::{collect_events, SseEvent, SseParser, SseStream, SseStreamExt, MAX_BUFFER_SIZE};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        AbortReason, ChannelObserver, RevealPacing, SinkEvent, StreamConfig, StreamObserver,
        StreamRecord, StreamSession,
    };
}
