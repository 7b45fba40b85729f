//! Server-Sent Events (SSE) reading.
//!
//! This module turns a chunked HTTP response body into complete SSE
//! records. Bytes are buffered undecoded until a blank-line delimiter is
//! seen, so a record (or a multi-byte character) split across chunks is
//! reassembled before it is decoded.

use crate::error::{StreamError, StreamResult};
use bytes::{Buf, Bytes, BytesMut};
use chatline_core::TransportError;
use futures::{Stream, StreamExt};
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Default upper bound for a single undelimited record.
pub const MAX_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// A parsed SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type (if specified).
    pub event: Option<String>,
    /// Event data.
    pub data: String,
    /// Event ID (if specified).
    pub id: Option<String>,
}

impl SseEvent {
    /// Create a new SSE event with just data.
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
            id: None,
        }
    }
}

/// Incremental parser for Server-Sent Events.
#[derive(Debug)]
pub struct SseParser {
    buffer: BytesMut,
    events: VecDeque<SseEvent>,
    max_buffer_size: usize,
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SseParser {
    /// Create a new SSE parser.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_buffer(MAX_BUFFER_SIZE)
    }

    /// Create a parser with a custom buffer limit.
    #[must_use]
    pub fn with_max_buffer(max_buffer_size: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            events: VecDeque::new(),
            max_buffer_size,
        }
    }

    /// Feed bytes into the parser.
    ///
    /// Returns the events completed by this chunk; they are also queued
    /// for [`next_event`](Self::next_event).
    pub fn feed(&mut self, bytes: &[u8]) -> StreamResult<Vec<SseEvent>> {
        self.buffer.extend_from_slice(bytes);
        let events = self.parse_buffer();

        if self.buffer.len() > self.max_buffer_size {
            return Err(StreamError::BufferOverflow {
                limit: self.max_buffer_size,
            });
        }

        Ok(events)
    }

    /// Feed a string into the parser.
    pub fn feed_str(&mut self, s: &str) -> StreamResult<Vec<SseEvent>> {
        self.feed(s.as_bytes())
    }

    /// Call when the stream ends to flush a final undelimited event.
    ///
    /// Whatever is left is parsed once; if it holds no data line it is
    /// dropped silently.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let mut events = self.parse_buffer();

        let rest = self.buffer.split();
        let text = String::from_utf8_lossy(&rest);
        if !text.trim().is_empty() {
            if let Some(event) = self.parse_event(text.trim_end_matches(['\n', '\r'])) {
                self.events.push_back(event.clone());
                events.push(event);
            }
        }

        events
    }

    /// Get the next parsed event.
    pub fn next_event(&mut self) -> Option<SseEvent> {
        self.events.pop_front()
    }

    /// Check if there are pending events.
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Number of undelimited bytes held back.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the parser state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.events.clear();
    }

    fn parse_buffer(&mut self) -> Vec<SseEvent> {
        let mut parsed_events = Vec::new();

        while let Some((pos, delimiter_len)) = self.find_event_boundary() {
            let raw = self.buffer.split_to(pos);
            self.buffer.advance(delimiter_len);
            while matches!(self.buffer.first(), Some(&(b'\n' | b'\r'))) {
                self.buffer.advance(1);
            }

            let text = String::from_utf8_lossy(&raw);
            if let Some(event) = self.parse_event(&text) {
                self.events.push_back(event.clone());
                parsed_events.push(event);
            }
        }

        parsed_events
    }

    fn find_event_boundary(&self) -> Option<(usize, usize)> {
        let newline = find_subslice(&self.buffer, b"\n\n").map(|pos| (pos, 2));
        let carriage = find_subslice(&self.buffer, b"\r\n\r\n").map(|pos| (pos, 4));

        match (newline, carriage) {
            (Some(nl), Some(cr)) => Some(if cr.0 < nl.0 { cr } else { nl }),
            (Some(nl), None) => Some(nl),
            (None, Some(cr)) => Some(cr),
            (None, None) => None,
        }
    }

    fn parse_event(&self, s: &str) -> Option<SseEvent> {
        let mut event = None;
        let mut data_lines = Vec::new();
        let mut id = None;

        for line in s.lines() {
            if line.is_empty() || line.starts_with(':') {
                // Comment or empty line
                continue;
            }

            if let Some(value) = line.strip_prefix("event:") {
                event = Some(value.trim().to_string());
            } else if let Some(value) = line.strip_prefix("data:") {
                data_lines.push(value.strip_prefix(' ').unwrap_or(value).to_string());
            } else if let Some(value) = line.strip_prefix("id:") {
                id = Some(value.trim().to_string());
            } else if line == "data" {
                // "data" without colon means empty data line
                data_lines.push(String::new());
            }
        }

        if data_lines.is_empty() {
            return None;
        }

        Some(SseEvent {
            event,
            data: data_lines.join("\n"),
            id,
        })
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

pin_project! {
    /// Stream adapter that parses SSE from a byte stream.
    ///
    /// Ends when the byte stream ends. After the first error no further
    /// events are produced.
    pub struct SseStream<S> {
        #[pin]
        inner: S,
        parser: SseParser,
        finished: bool,
    }
}

impl<S> SseStream<S> {
    /// Create a new SSE stream from a byte stream.
    pub fn new(inner: S) -> Self {
        Self::with_parser(inner, SseParser::new())
    }

    /// Create a stream with a custom buffer limit.
    pub fn with_max_buffer(inner: S, max_buffer_size: usize) -> Self {
        Self::with_parser(inner, SseParser::with_max_buffer(max_buffer_size))
    }

    fn with_parser(inner: S, parser: SseParser) -> Self {
        Self {
            inner,
            parser,
            finished: false,
        }
    }
}

impl<S, E> Stream for SseStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    type Item = StreamResult<SseEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            // Return buffered events first
            if let Some(event) = this.parser.next_event() {
                return Poll::Ready(Some(Ok(event)));
            }

            if *this.finished {
                return Poll::Ready(None);
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    if let Err(error) = this.parser.feed(&bytes) {
                        *this.finished = true;
                        this.parser.clear();
                        return Poll::Ready(Some(Err(error)));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    *this.finished = true;
                    this.parser.clear();
                    return Poll::Ready(Some(Err(StreamError::Transport(TransportError::read(e)))));
                }
                Poll::Ready(None) => {
                    *this.finished = true;
                    this.parser.finish();
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Extension trait for reading SSE from byte streams.
pub trait SseStreamExt: Stream + Sized {
    /// Parse this byte stream as SSE.
    fn sse_events(self) -> SseStream<Self> {
        SseStream::new(self)
    }
}

impl<S, E> SseStreamExt for S where S: Stream<Item = Result<Bytes, E>> {}

/// Collect every event from a byte stream.
///
/// Convenience for tests and replay tooling.
pub async fn collect_events<S, E>(inner: S) -> StreamResult<Vec<SseEvent>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Display,
{
    let mut stream = SseStream::new(inner);
    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event?);
    }
    Ok(events)
}
