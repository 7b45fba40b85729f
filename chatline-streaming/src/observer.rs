//! Observer hooks for the UI layer.
//!
//! The sink never touches a display; it reports state changes to a
//! [`StreamObserver`] and the UI repaints from there.

use chatline_core::{BackendError, ChatError, ChatMessage, ToolActivity, TransportError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::record::RoutingInfo;

/// Why a reply was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The request failed to open or the connection dropped.
    Transport(TransportError),
    /// The backend sent an error record.
    Backend(BackendError),
    /// The caller cancelled.
    Cancelled,
    /// Nothing arrived for too long.
    Timeout(Duration),
}

impl AbortReason {
    /// Short notice suitable for showing in place of the reply.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Cancelled => "Reply cancelled.",
            Self::Transport(_) | Self::Timeout(_) => {
                "Sorry, we couldn't reach the assistant. Please try again."
            }
            Self::Backend(_) => "Sorry, something went wrong. Please try again.",
        }
    }

    /// Whether the caller ended the reply.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<AbortReason> for ChatError {
    fn from(reason: AbortReason) -> Self {
        match reason {
            AbortReason::Transport(err) => ChatError::Transport(err),
            AbortReason::Backend(err) => ChatError::Backend(err),
            AbortReason::Cancelled => ChatError::Cancelled,
            AbortReason::Timeout(after) => ChatError::Transport(TransportError::Timeout(after)),
        }
    }
}

impl From<TransportError> for AbortReason {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(after) => Self::Timeout(after),
            other => Self::Transport(other),
        }
    }
}

/// Receives state changes from a [`PresentationSink`](crate::PresentationSink).
pub trait StreamObserver {
    /// The visible text changed; `content` is the whole text so far.
    fn on_text_updated(&mut self, content: &str);

    /// A tool notice appeared, changed, or was cleared.
    fn on_tool_activity_changed(&mut self, activity: Option<&ToolActivity>);

    /// The reply is complete. Called at most once per reply.
    fn on_finalized(&mut self, message: &ChatMessage);

    /// The reply was abandoned. Called at most once per reply, and never
    /// together with [`on_finalized`](Self::on_finalized).
    fn on_aborted(&mut self, reason: &AbortReason);

    /// Routing telemetry.
    fn on_routing(&mut self, _routing: &RoutingInfo) {}
}

impl<O: StreamObserver + ?Sized> StreamObserver for &mut O {
    fn on_text_updated(&mut self, content: &str) {
        (**self).on_text_updated(content);
    }

    fn on_tool_activity_changed(&mut self, activity: Option<&ToolActivity>) {
        (**self).on_tool_activity_changed(activity);
    }

    fn on_finalized(&mut self, message: &ChatMessage) {
        (**self).on_finalized(message);
    }

    fn on_aborted(&mut self, reason: &AbortReason) {
        (**self).on_aborted(reason);
    }

    fn on_routing(&mut self, routing: &RoutingInfo) {
        (**self).on_routing(routing);
    }
}

impl<O: StreamObserver + ?Sized> StreamObserver for Box<O> {
    fn on_text_updated(&mut self, content: &str) {
        (**self).on_text_updated(content);
    }

    fn on_tool_activity_changed(&mut self, activity: Option<&ToolActivity>) {
        (**self).on_tool_activity_changed(activity);
    }

    fn on_finalized(&mut self, message: &ChatMessage) {
        (**self).on_finalized(message);
    }

    fn on_aborted(&mut self, reason: &AbortReason) {
        (**self).on_aborted(reason);
    }

    fn on_routing(&mut self, routing: &RoutingInfo) {
        (**self).on_routing(routing);
    }
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StreamObserver for NoopObserver {
    fn on_text_updated(&mut self, _content: &str) {}
    fn on_tool_activity_changed(&mut self, _activity: Option<&ToolActivity>) {}
    fn on_finalized(&mut self, _message: &ChatMessage) {}
    fn on_aborted(&mut self, _reason: &AbortReason) {}
}

/// An observer callback captured as a value.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// Text so far.
    TextUpdated(String),
    /// Current tool notice.
    ToolActivityChanged(Option<ToolActivity>),
    /// Routing telemetry.
    Routing(RoutingInfo),
    /// Final message.
    Finalized(ChatMessage),
    /// Abort reason.
    Aborted(AbortReason),
}

impl SinkEvent {
    /// Whether this event ends the reply.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finalized(_) | Self::Aborted(_))
    }
}

/// Observer that records every callback in order.
#[derive(Debug, Clone, Default)]
pub struct CollectingObserver {
    /// Events seen so far.
    pub events: Vec<SinkEvent>,
}

impl CollectingObserver {
    /// Create an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every text snapshot, in order.
    #[must_use]
    pub fn text_updates(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::TextUpdated(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Finalized messages seen.
    #[must_use]
    pub fn finalized(&self) -> Vec<&ChatMessage> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Finalized(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Abort reasons seen.
    #[must_use]
    pub fn aborted(&self) -> Vec<&AbortReason> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Aborted(reason) => Some(reason),
                _ => None,
            })
            .collect()
    }
}

impl StreamObserver for CollectingObserver {
    fn on_text_updated(&mut self, content: &str) {
        self.events.push(SinkEvent::TextUpdated(content.to_string()));
    }

    fn on_tool_activity_changed(&mut self, activity: Option<&ToolActivity>) {
        self.events
            .push(SinkEvent::ToolActivityChanged(activity.cloned()));
    }

    fn on_finalized(&mut self, message: &ChatMessage) {
        self.events.push(SinkEvent::Finalized(message.clone()));
    }

    fn on_aborted(&mut self, reason: &AbortReason) {
        self.events.push(SinkEvent::Aborted(reason.clone()));
    }

    fn on_routing(&mut self, routing: &RoutingInfo) {
        self.events.push(SinkEvent::Routing(routing.clone()));
    }
}

/// Observer that forwards every callback over a channel.
///
/// Lets a UI task consume updates while the reply streams on another task.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SinkEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("sink event receiver dropped");
        }
    }
}

impl StreamObserver for ChannelObserver {
    fn on_text_updated(&mut self, content: &str) {
        self.send(SinkEvent::TextUpdated(content.to_string()));
    }

    fn on_tool_activity_changed(&mut self, activity: Option<&ToolActivity>) {
        self.send(SinkEvent::ToolActivityChanged(activity.cloned()));
    }

    fn on_finalized(&mut self, message: &ChatMessage) {
        self.send(SinkEvent::Finalized(message.clone()));
    }

    fn on_aborted(&mut self, reason: &AbortReason) {
        self.send(SinkEvent::Aborted(reason.clone()));
    }

    fn on_routing(&mut self, routing: &RoutingInfo) {
        self.send(SinkEvent::Routing(routing.clone()));
    }
}

/// Serializable form of a [`SinkEvent`], for forwarding to a browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiUpdate {
    /// Text so far.
    Text {
        /// The whole text.
        content: String,
    },
    /// Current tool notice.
    Tool {
        /// The notice, or `None` to hide it.
        activity: Option<ToolActivity>,
    },
    /// Final message.
    Final {
        /// The message.
        message: ChatMessage,
    },
    /// Failure notice.
    Failed {
        /// Generic user-facing text.
        notice: String,
    },
}

impl UiUpdate {
    /// Convert a sink event; routing telemetry has no UI form.
    #[must_use]
    pub fn from_event(event: &SinkEvent) -> Option<Self> {
        match event {
            SinkEvent::TextUpdated(content) => Some(Self::Text {
                content: content.clone(),
            }),
            SinkEvent::ToolActivityChanged(activity) => Some(Self::Tool {
                activity: activity.clone(),
            }),
            SinkEvent::Finalized(message) => Some(Self::Final {
                message: message.clone(),
            }),
            SinkEvent::Aborted(reason) => Some(Self::Failed {
                notice: reason.user_message().to_string(),
            }),
            SinkEvent::Routing(_) => None,
        }
    }
}
