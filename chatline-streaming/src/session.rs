//! Drives one streamed reply from start to finish.
//!
//! [`StreamSession::run`] reads records, interprets them, paces text into
//! the sink, and settles the reply exactly once: finalized on `done`,
//! aborted on a backend error, a transport failure, an idle timeout, or
//! cancellation.

use bytes::Bytes;
use chatline_core::{ChatError, ChatMessage, MessageId, Result, TransportError};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::StreamResult;
use crate::interpreter::{Dispatch, EventInterpreter, InterpreterStats};
use crate::observer::{AbortReason, StreamObserver};
use crate::reveal::{RevealPacing, RevealQueue};
use crate::sink::{PresentationSink, SinkState};
use crate::sse::{SseEvent, SseStream, MAX_BUFFER_SIZE};

/// Default gap allowed between two records.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration for a streamed reply.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Longest wait between records before giving up. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// How text is revealed.
    pub reveal: RevealPacing,
    /// Largest undelimited record accepted, in bytes.
    pub max_buffer_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            reveal: RevealPacing::default(),
            max_buffer_bytes: MAX_BUFFER_SIZE,
        }
    }
}

impl StreamConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the idle timeout.
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the reveal pacing.
    #[must_use]
    pub fn with_reveal(mut self, pacing: RevealPacing) -> Self {
        self.reveal = pacing;
        self
    }

    /// Set the record buffer limit.
    #[must_use]
    pub fn with_max_buffer_bytes(mut self, bytes: usize) -> Self {
        self.max_buffer_bytes = bytes;
        self
    }
}

enum Step {
    Cancelled,
    Reveal(String),
    Record(Option<StreamResult<SseEvent>>),
    TimedOut,
}

/// One streamed reply.
#[derive(Debug)]
pub struct StreamSession<O> {
    config: StreamConfig,
    sink: PresentationSink<O>,
    interpreter: EventInterpreter,
    reveal: RevealQueue,
}

impl<O: StreamObserver> StreamSession<O> {
    /// Create a session reporting to `observer`.
    pub fn new(observer: O, config: StreamConfig) -> Self {
        let reveal = RevealQueue::new(config.reveal);
        Self {
            config,
            sink: PresentationSink::new(observer),
            interpreter: EventInterpreter::new(),
            reveal,
        }
    }

    /// The configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// The sink.
    pub fn sink(&self) -> &PresentationSink<O> {
        &self.sink
    }

    /// Record counters.
    pub fn stats(&self) -> InterpreterStats {
        self.interpreter.stats()
    }

    /// Give back the observer.
    pub fn into_observer(self) -> O {
        self.sink.into_observer()
    }

    /// Begin the reply before any record is read.
    ///
    /// [`run`](Self::run) starts it on its own if this was not called.
    ///
    /// # Errors
    ///
    /// Fails if the reply already started.
    pub fn start(&mut self) -> Result<MessageId> {
        self.sink.start()
    }

    /// Abandon the reply and return the matching error.
    pub fn abort(&mut self, reason: AbortReason) -> ChatError {
        self.reveal.clear();
        self.sink.abort(reason.clone());
        reason.into()
    }

    /// Read a byte stream as SSE and drive the reply.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn run_bytes<S, E>(
        &mut self,
        bytes: S,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: Display,
    {
        let events = SseStream::with_max_buffer(bytes, self.config.max_buffer_bytes);
        self.run(events, cancel).await
    }

    /// Drive the reply from a stream of SSE events.
    ///
    /// Returns the finalized message. Records after `done` are never read.
    ///
    /// # Errors
    ///
    /// Returns the reason the reply was aborted: a backend error record,
    /// a transport failure, the idle timeout, the stream ending without
    /// `done`, or cancellation. The observer has already seen `on_aborted`.
    pub async fn run<S>(&mut self, mut records: S, cancel: &CancellationToken) -> Result<ChatMessage>
    where
        S: Stream<Item = StreamResult<SseEvent>> + Unpin,
    {
        match self.sink.state() {
            SinkState::Idle => {
                self.sink.start()?;
            }
            SinkState::Streaming => {}
            state => {
                return Err(ChatError::InvalidState(format!(
                    "cannot run a reply in state {state:?}"
                )))
            }
        }

        let mut deadline = self.idle_deadline();

        loop {
            let step = tokio::select! {
                biased;
                () = cancel.cancelled() => Step::Cancelled,
                Some(text) = self.reveal.next_step() => Step::Reveal(text),
                record = records.next() => Step::Record(record),
                () = idle(deadline) => Step::TimedOut,
            };

            match step {
                Step::Cancelled => return Err(self.abort(AbortReason::Cancelled)),
                Step::Reveal(text) => self.sink.append(&text)?,
                Step::TimedOut => {
                    let after = self.config.idle_timeout.unwrap_or_default();
                    warn!(?after, "no stream record within idle timeout");
                    return Err(self.abort(AbortReason::Timeout(after)));
                }
                Step::Record(None) => {
                    warn!("stream ended before completion");
                    return Err(self.abort(AbortReason::Transport(TransportError::Read(
                        "stream ended before completion".into(),
                    ))));
                }
                Step::Record(Some(Err(error))) => {
                    warn!(%error, "stream read failed");
                    return Err(self.abort(error.into_transport().into()));
                }
                Step::Record(Some(Ok(event))) => {
                    deadline = self.idle_deadline();
                    match self
                        .interpreter
                        .interpret(&event, &mut self.sink, &mut self.reveal)
                    {
                        Dispatch::Continue => {}
                        Dispatch::Finish { message_id } => {
                            return self.complete(message_id, cancel).await;
                        }
                        Dispatch::Abort(error) => {
                            return Err(self.abort(AbortReason::Backend(error)));
                        }
                    }
                }
            }
        }
    }

    async fn complete(
        &mut self,
        message_id: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage> {
        loop {
            let step = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                text = self.reveal.next_step() => Some(text),
            };
            match step {
                None => return Err(self.abort(AbortReason::Cancelled)),
                Some(Some(text)) => self.sink.append(&text)?,
                Some(None) => break,
            }
        }

        if let Some(id) = message_id {
            self.sink.set_server_message_id(id)?;
        }
        let payloads = self.interpreter.take_side_payloads();
        if !payloads.is_empty() {
            self.sink.attach_side_payloads(payloads)?;
        }

        let stats = self.interpreter.stats();
        debug!(
            records = stats.records,
            malformed = stats.malformed,
            unknown = stats.unknown,
            "stream complete"
        );
        self.sink.finalize()
    }

    fn idle_deadline(&self) -> Option<Instant> {
        self.config.idle_timeout.map(|after| Instant::now() + after)
    }
}

async fn idle(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
