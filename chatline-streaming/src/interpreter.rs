//! Event interpretation.
//!
//! The interpreter classifies each SSE event and routes it: text goes to
//! the reveal queue, tool notices and routing go to the sink, side
//! payloads are held back until the reply completes, and terminal records
//! are handed back to the caller as a [`Dispatch`].

use chatline_core::{BackendError, SidePayloads, ToolActivity};
use tracing::{debug, trace, warn};

use crate::observer::StreamObserver;
use crate::record::StreamRecord;
use crate::reveal::RevealQueue;
use crate::sink::PresentationSink;
use crate::sse::SseEvent;

/// What the caller should do after a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Keep reading.
    Continue,
    /// The reply is complete: drain pending text, then finalize.
    Finish {
        /// Backend message ID, if sent.
        message_id: Option<String>,
    },
    /// The backend failed: abort the reply.
    Abort(BackendError),
}

/// Counters for one reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterpreterStats {
    /// Records dispatched, including unknown kinds.
    pub records: usize,
    /// Records skipped because they could not be parsed.
    pub malformed: usize,
    /// Records with an unknown discriminator.
    pub unknown: usize,
}

/// Routes stream records for one reply.
#[derive(Debug, Default)]
pub struct EventInterpreter {
    pending: SidePayloads,
    stats: InterpreterStats,
}

impl EventInterpreter {
    /// Create a new interpreter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> InterpreterStats {
        self.stats
    }

    /// Side payloads buffered so far.
    #[must_use]
    pub fn pending_side_payloads(&self) -> &SidePayloads {
        &self.pending
    }

    /// Take the buffered side payloads.
    pub fn take_side_payloads(&mut self) -> SidePayloads {
        std::mem::take(&mut self.pending)
    }

    /// Parse and dispatch one SSE event.
    ///
    /// A malformed record is logged and skipped; it never ends the reply.
    pub fn interpret<O: StreamObserver>(
        &mut self,
        event: &SseEvent,
        sink: &mut PresentationSink<O>,
        reveal: &mut RevealQueue,
    ) -> Dispatch {
        match StreamRecord::from_event(event) {
            Ok(record) => self.dispatch(record, sink, reveal),
            Err(error) => {
                self.stats.malformed += 1;
                warn!(%error, data = %event.data, "skipping malformed stream record");
                Dispatch::Continue
            }
        }
    }

    /// Dispatch an already-parsed record.
    pub fn dispatch<O: StreamObserver>(
        &mut self,
        record: StreamRecord,
        sink: &mut PresentationSink<O>,
        reveal: &mut RevealQueue,
    ) -> Dispatch {
        self.stats.records += 1;
        trace!(kind = record.kind(), "stream record");

        match record {
            StreamRecord::Routing(routing) => {
                debug!(agent = ?routing.agent, "routed");
                sink.report_routing(&routing);
            }
            StreamRecord::Text { content } => reveal.push(&content),
            StreamRecord::ToolStart { tool_name } => {
                set_tool(sink, Some(ToolActivity::starting(tool_name)));
            }
            StreamRecord::ToolExecuting { tool_name } => {
                set_tool(sink, Some(ToolActivity::executing(tool_name)));
            }
            StreamRecord::ToolComplete { tool_name } => {
                debug!(tool = %tool_name, "tool complete");
                set_tool(sink, None);
            }
            StreamRecord::Products { products } => self.pending.products.extend(products),
            StreamRecord::QuickReplies { quick_replies } => {
                self.pending.quick_replies.extend(quick_replies);
            }
            StreamRecord::Done { message_id } => return Dispatch::Finish { message_id },
            StreamRecord::Error { error } => {
                warn!(detail = %error, "backend reported an error");
                return Dispatch::Abort(BackendError::new(error));
            }
            StreamRecord::Unknown { kind } => {
                self.stats.unknown += 1;
                debug!(%kind, "ignoring unknown stream record");
            }
        }

        Dispatch::Continue
    }
}

fn set_tool<O: StreamObserver>(sink: &mut PresentationSink<O>, activity: Option<ToolActivity>) {
    if let Err(error) = sink.set_tool_activity(activity) {
        warn!(%error, "dropping tool notice");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{CollectingObserver, SinkEvent};
    use crate::record::RoutingInfo;
    use crate::reveal::RevealPacing;
    use chatline_core::{Product, QuickReply, ToolStatus};
    use pretty_assertions::assert_eq;

    struct Harness {
        interpreter: EventInterpreter,
        sink: PresentationSink<CollectingObserver>,
        reveal: RevealQueue,
    }

    impl Harness {
        fn new() -> Self {
            let mut sink = PresentationSink::new(CollectingObserver::new());
            sink.start().unwrap();
            Self {
                interpreter: EventInterpreter::new(),
                sink,
                reveal: RevealQueue::new(RevealPacing::Immediate),
            }
        }

        fn feed(&mut self, data: &str) -> Dispatch {
            self.interpreter
                .interpret(&SseEvent::data(data), &mut self.sink, &mut self.reveal)
        }
    }

    #[test]
    fn test_text_is_queued_in_order() {
        let mut h = Harness::new();
        assert_eq!(h.feed(r#"{"type":"text","content":"Hel"}"#), Dispatch::Continue);
        assert_eq!(h.feed(r#"{"type":"text","content":"lo"}"#), Dispatch::Continue);

        assert_eq!(h.reveal.take_ready(), "Hello");
        // Nothing reaches the sink until the queue is drained by the session.
        assert!(h.sink.message().unwrap().content().is_empty());
    }

    #[test]
    fn test_tool_lifecycle() {
        let mut h = Harness::new();
        h.feed(r#"{"type":"tool_start","tool_name":"catalog"}"#);
        assert_eq!(
            h.sink.tool_activity().map(|a| a.status),
            Some(ToolStatus::Starting)
        );

        h.feed(r#"{"type":"tool_executing","tool_name":"catalog"}"#);
        assert_eq!(
            h.sink.tool_activity(),
            Some(&ToolActivity::executing("catalog"))
        );

        h.feed(r#"{"type":"tool_complete","tool_name":"catalog"}"#);
        assert!(h.sink.tool_activity().is_none());
        assert!(h.reveal.is_empty());
    }

    #[test]
    fn test_side_payloads_are_buffered() {
        let mut h = Harness::new();
        h.feed(r#"{"type":"products","products":[{"id":1,"name":"Course A"}]}"#);
        h.feed(r#"{"type":"quick_replies","quick_replies":["More info"]}"#);
        h.feed(r#"{"type":"products","products":[{"id":2,"name":"Course B"}]}"#);

        assert!(h.sink.observer().events.is_empty());

        let payloads = h.interpreter.take_side_payloads();
        assert_eq!(
            payloads.products,
            vec![Product::new(1, "Course A"), Product::new(2, "Course B")]
        );
        assert_eq!(payloads.quick_replies, vec![QuickReply::text("More info")]);
        assert!(h.interpreter.pending_side_payloads().is_empty());
    }

    #[test]
    fn test_terminal_records() {
        let mut h = Harness::new();
        assert_eq!(
            h.feed(r#"{"type":"done","message_id":"m1"}"#),
            Dispatch::Finish {
                message_id: Some("m1".into())
            }
        );
        assert_eq!(
            h.feed(r#"{"type":"error","error":"boom"}"#),
            Dispatch::Abort(BackendError::new("boom"))
        );
    }

    #[test]
    fn test_malformed_and_unknown_are_skipped() {
        let mut h = Harness::new();
        assert_eq!(h.feed("{broken"), Dispatch::Continue);
        assert_eq!(h.feed(r#"{"content":"no type"}"#), Dispatch::Continue);
        assert_eq!(h.feed(r#"{"type":"ping"}"#), Dispatch::Continue);

        let stats = h.interpreter.stats();
        assert_eq!(stats.malformed, 2);
        assert_eq!(stats.unknown, 1);
        assert_eq!(stats.records, 1);

        let message = h.sink.message().unwrap();
        assert!(message.is_streaming());
        assert!(message.content().is_empty());
        assert!(h.reveal.is_empty());
    }

    #[test]
    fn test_routing_reaches_observer_only() {
        let mut h = Harness::new();
        h.feed(r#"{"type":"routing","agent":"sales"}"#);

        assert_eq!(
            h.sink.observer().events,
            vec![SinkEvent::Routing(RoutingInfo::agent("sales"))]
        );
        assert!(h.sink.message().unwrap().content().is_empty());
    }
}
