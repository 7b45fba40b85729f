//! The presentation sink.
//!
//! The sink is the only owner of the in-progress reply. Every mutation goes
//! through it, and every mutation is reported to its observer.
//!
//! ```text
//! Idle --start--> Streaming --finalize--> Finalized
//!                     |
//!                     +-----abort-------> Aborted
//! ```

use chatline_core::{
    ChatError, ChatMessage, MessageId, Result, SidePayloads, StreamingMessage, ToolActivity,
};
use tracing::debug;

use crate::observer::{AbortReason, StreamObserver};
use crate::record::RoutingInfo;

/// Lifecycle of one reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// Nothing started yet.
    Idle,
    /// Receiving text.
    Streaming,
    /// Completed successfully.
    Finalized,
    /// Abandoned.
    Aborted,
}

impl SinkState {
    /// Whether no further changes are accepted.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Aborted)
    }
}

/// Owns the [`StreamingMessage`] and the [`ToolActivity`] for one reply.
#[derive(Debug)]
pub struct PresentationSink<O> {
    observer: O,
    state: SinkState,
    message: Option<StreamingMessage>,
    tool_activity: Option<ToolActivity>,
}

impl<O: StreamObserver> PresentationSink<O> {
    /// Create an idle sink.
    pub fn new(observer: O) -> Self {
        Self {
            observer,
            state: SinkState::Idle,
            message: None,
            tool_activity: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> SinkState {
        self.state
    }

    /// The reply being streamed, if any.
    ///
    /// `None` before [`start`](Self::start) and after an abort.
    pub fn message(&self) -> Option<&StreamingMessage> {
        self.message.as_ref()
    }

    /// Current tool notice.
    pub fn tool_activity(&self) -> Option<&ToolActivity> {
        self.tool_activity.as_ref()
    }

    /// The observer.
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Give back the observer.
    pub fn into_observer(self) -> O {
        self.observer
    }

    /// Begin a reply.
    ///
    /// # Errors
    ///
    /// Fails unless the sink is idle.
    pub fn start(&mut self) -> Result<MessageId> {
        if self.state != SinkState::Idle {
            return Err(self.invalid("start"));
        }
        let message = StreamingMessage::new();
        let id = message.id().clone();
        debug!(message_id = %id, "reply started");
        self.message = Some(message);
        self.state = SinkState::Streaming;
        Ok(id)
    }

    /// Append text and report the new content.
    ///
    /// # Errors
    ///
    /// Fails outside the streaming state or after side payloads are attached.
    pub fn append(&mut self, text: &str) -> Result<()> {
        self.streaming_message("append")?.push_text(text)?;
        if text.is_empty() {
            return Ok(());
        }
        if let Some(message) = self.message.as_ref() {
            self.observer.on_text_updated(message.content());
        }
        Ok(())
    }

    /// Replace the tool notice. At most one exists at a time.
    ///
    /// # Errors
    ///
    /// Fails outside the streaming state.
    pub fn set_tool_activity(&mut self, activity: Option<ToolActivity>) -> Result<()> {
        self.streaming_message("set tool activity")?;
        if self.tool_activity == activity {
            return Ok(());
        }
        self.tool_activity = activity;
        self.observer
            .on_tool_activity_changed(self.tool_activity.as_ref());
        Ok(())
    }

    /// Pass routing telemetry to the observer. Does not touch the reply.
    pub fn report_routing(&mut self, routing: &RoutingInfo) {
        if self.state == SinkState::Streaming {
            self.observer.on_routing(routing);
        }
    }

    /// Record the backend's ID for the reply.
    ///
    /// # Errors
    ///
    /// Fails outside the streaming state.
    pub fn set_server_message_id(&mut self, id: impl Into<String>) -> Result<()> {
        self.streaming_message("set server message id")?
            .set_server_message_id(id);
        Ok(())
    }

    /// Attach products and quick replies. Seals the text.
    ///
    /// # Errors
    ///
    /// Fails outside the streaming state or on a second call.
    pub fn attach_side_payloads(&mut self, payloads: SidePayloads) -> Result<()> {
        self.streaming_message("attach side payloads")?
            .attach_side_payloads(payloads)
    }

    /// Complete the reply and report it.
    ///
    /// Any tool notice is cleared first. The observer sees exactly one
    /// `on_finalized` per reply.
    ///
    /// # Errors
    ///
    /// Fails outside the streaming state, including when already finalized;
    /// nothing is reported in that case.
    pub fn finalize(&mut self) -> Result<ChatMessage> {
        self.streaming_message("finalize")?;
        self.clear_tool_activity();

        let message = match self.message.as_mut() {
            Some(message) => {
                message.finish();
                message.to_message()
            }
            None => return Err(self.invalid("finalize")),
        };

        self.state = SinkState::Finalized;
        debug!(
            message_id = %message.id,
            chars = message.content.chars().count(),
            "reply finalized"
        );
        self.observer.on_finalized(&message);
        Ok(message)
    }

    /// Abandon the reply, discarding any partial text.
    ///
    /// Returns `false`, reporting nothing, if the reply already ended.
    pub fn abort(&mut self, reason: AbortReason) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.clear_tool_activity();
        let discarded = self.message.take();
        self.state = SinkState::Aborted;
        debug!(
            message_id = ?discarded.as_ref().map(|m| m.id().to_string()),
            ?reason,
            "reply aborted"
        );
        self.observer.on_aborted(&reason);
        true
    }

    fn clear_tool_activity(&mut self) {
        if self.tool_activity.take().is_some() {
            self.observer.on_tool_activity_changed(None);
        }
    }

    fn streaming_message(&mut self, op: &str) -> Result<&mut StreamingMessage> {
        if self.state != SinkState::Streaming {
            return Err(self.invalid(op));
        }
        let state = self.state;
        self.message.as_mut().ok_or_else(|| {
            ChatError::InvalidState(format!("cannot {op}: no message in state {state:?}"))
        })
    }

    fn invalid(&self, op: &str) -> ChatError {
        ChatError::InvalidState(format!("cannot {op} in state {:?}", self.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{CollectingObserver, SinkEvent};
    use chatline_core::{BackendError, Product};
    use pretty_assertions::assert_eq;

    fn streaming_sink() -> PresentationSink<CollectingObserver> {
        let mut sink = PresentationSink::new(CollectingObserver::new());
        sink.start().unwrap();
        sink
    }

    #[test]
    fn test_lifecycle() {
        let mut sink = PresentationSink::new(CollectingObserver::new());
        assert_eq!(sink.state(), SinkState::Idle);
        assert!(sink.append("early").is_err());

        sink.start().unwrap();
        assert_eq!(sink.state(), SinkState::Streaming);
        assert!(sink.start().is_err());

        sink.append("Hel").unwrap();
        sink.append("lo").unwrap();
        assert!(sink.message().unwrap().is_streaming());

        let message = sink.finalize().unwrap();
        assert_eq!(message.content, "Hello");
        assert_eq!(sink.state(), SinkState::Finalized);
        assert!(!sink.message().unwrap().is_streaming());

        let observer = sink.into_observer();
        assert_eq!(observer.text_updates(), vec!["Hel", "Hello"]);
        assert_eq!(observer.finalized().len(), 1);
    }

    #[test]
    fn test_finalize_twice_reports_once() {
        let mut sink = streaming_sink();
        sink.append("Hi").unwrap();
        sink.finalize().unwrap();

        assert!(sink.finalize().is_err());
        assert!(sink.append("more").is_err());
        assert!(!sink.abort(AbortReason::Cancelled));

        assert_eq!(sink.message().unwrap().content(), "Hi");
        assert_eq!(sink.observer().finalized().len(), 1);
        assert!(sink.observer().aborted().is_empty());
    }

    #[test]
    fn test_abort_discards_message() {
        let mut sink = streaming_sink();
        sink.append("Hel").unwrap();
        sink.set_tool_activity(Some(ToolActivity::starting("search")))
            .unwrap();

        assert!(sink.abort(AbortReason::Backend(BackendError::new("boom"))));
        assert!(sink.message().is_none());
        assert_eq!(sink.state(), SinkState::Aborted);
        assert!(sink.finalize().is_err());
        assert!(!sink.abort(AbortReason::Cancelled));

        let observer = sink.into_observer();
        assert_eq!(observer.aborted().len(), 1);
        assert!(observer.finalized().is_empty());
        assert_eq!(
            observer.events.last(),
            Some(&SinkEvent::Aborted(AbortReason::Backend(BackendError::new(
                "boom"
            ))))
        );
    }

    #[test]
    fn test_abort_from_idle() {
        let mut sink = PresentationSink::new(CollectingObserver::new());
        assert!(sink.abort(AbortReason::Cancelled));
        assert_eq!(sink.observer().aborted().len(), 1);
    }

    #[test]
    fn test_tool_activity_single_slot() {
        let mut sink = streaming_sink();
        sink.set_tool_activity(Some(ToolActivity::starting("search")))
            .unwrap();
        sink.set_tool_activity(Some(ToolActivity::starting("search")))
            .unwrap();
        sink.set_tool_activity(Some(ToolActivity::executing("search")))
            .unwrap();
        sink.set_tool_activity(None).unwrap();

        let changes: Vec<_> = sink
            .observer()
            .events
            .iter()
            .filter(|e| matches!(e, SinkEvent::ToolActivityChanged(_)))
            .cloned()
            .collect();
        assert_eq!(
            changes,
            vec![
                SinkEvent::ToolActivityChanged(Some(ToolActivity::starting("search"))),
                SinkEvent::ToolActivityChanged(Some(ToolActivity::executing("search"))),
                SinkEvent::ToolActivityChanged(None),
            ]
        );
    }

    #[test]
    fn test_finalize_clears_tool_activity() {
        let mut sink = streaming_sink();
        sink.set_tool_activity(Some(ToolActivity::executing("lookup")))
            .unwrap();
        sink.finalize().unwrap();
        assert!(sink.tool_activity().is_none());

        let events = &sink.observer().events;
        assert_eq!(events[events.len() - 2], SinkEvent::ToolActivityChanged(None));
    }

    #[test]
    fn test_side_payloads_once_and_seal_text() {
        let mut sink = streaming_sink();
        sink.append("Courses:").unwrap();
        sink.attach_side_payloads(SidePayloads {
            products: vec![Product::new(1, "Course A")],
            quick_replies: Vec::new(),
        })
        .unwrap();

        assert!(sink.append(" more").is_err());
        assert!(sink.attach_side_payloads(SidePayloads::new()).is_err());

        sink.set_server_message_id("m1").unwrap();
        let message = sink.finalize().unwrap();
        assert_eq!(message.content, "Courses:");
        assert_eq!(message.side_payloads.products, vec![Product::new(1, "Course A")]);
        assert_eq!(message.server_message_id.as_deref(), Some("m1"));
    }

    #[test]
    fn test_routing_only_while_streaming() {
        let mut sink = PresentationSink::new(CollectingObserver::new());
        sink.report_routing(&RoutingInfo::agent("sales"));
        assert!(sink.observer().events.is_empty());

        sink.start().unwrap();
        sink.report_routing(&RoutingInfo::agent("sales"));
        assert_eq!(sink.observer().events.len(), 1);
        assert!(sink.message().unwrap().content().is_empty());
    }
}
