//! Conversation turns.
//!
//! A [`Conversation`] sends one message at a time and keeps the finalized
//! history. `send` borrows the conversation mutably, so a second turn
//! cannot start while a reply is still streaming.

use crate::client::{ChatClient, ChatRequest};
use chatline_core::{ChatError, ChatMessage, ConversationId, Result, TransportError};
use chatline_streaming::StreamObserver;
use parking_lot::Mutex;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

type CancelSlot = Arc<Mutex<Option<CancellationToken>>>;

/// Handle that cancels the reply currently streaming, if any.
#[derive(Debug, Clone)]
pub struct Canceller {
    slot: CancelSlot,
}

impl Canceller {
    /// Cancel the in-flight reply.
    ///
    /// Returns `false` if nothing was streaming.
    pub fn cancel(&self) -> bool {
        match self.slot.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a reply is streaming.
    pub fn is_active(&self) -> bool {
        self.slot.lock().is_some()
    }
}

/// Holds the cancel token of one turn; empties the slot when dropped.
struct InFlight(CancelSlot);

impl InFlight {
    fn arm(slot: &CancelSlot, token: CancellationToken) -> Self {
        *slot.lock() = Some(token);
        Self(Arc::clone(slot))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.lock().take();
    }
}

/// One chat conversation.
#[derive(Debug)]
pub struct Conversation {
    client: ChatClient,
    id: ConversationId,
    context: Map<String, JsonValue>,
    history: Vec<ChatMessage>,
    in_flight: CancelSlot,
}

impl Conversation {
    /// Start a new conversation.
    pub fn new(client: ChatClient) -> Self {
        Self::with_id(client, ConversationId::new())
    }

    /// Continue an existing conversation.
    pub fn with_id(client: ChatClient, id: ConversationId) -> Self {
        Self {
            client,
            id,
            context: Map::new(),
            history: Vec::new(),
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Conversation ID.
    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    /// Finalized messages, oldest first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Set a context entry sent with every turn.
    pub fn set_context(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.context.insert(key.into(), value.into());
    }

    /// A handle for cancelling the reply in flight.
    pub fn canceller(&self) -> Canceller {
        Canceller {
            slot: Arc::clone(&self.in_flight),
        }
    }

    /// Send a message and stream the reply into `observer`.
    ///
    /// On success the user message and the reply are appended to the
    /// history; on failure the history is unchanged.
    ///
    /// # Errors
    ///
    /// Fails for a blank message without contacting the backend, and
    /// otherwise for whatever aborted the reply.
    pub async fn send<O: StreamObserver>(
        &mut self,
        text: impl Into<String>,
        observer: O,
    ) -> Result<ChatMessage> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ChatError::Transport(TransportError::InvalidRequest(
                "message is empty".into(),
            )));
        }

        let user = ChatMessage::user(text.clone());
        let mut request = ChatRequest::new(text).with_conversation_id(self.id.clone());
        request.context = self.context.clone();

        let cancel = CancellationToken::new();
        let in_flight = InFlight::arm(&self.in_flight, cancel.clone());
        let result = self.client.stream_message(&request, observer, &cancel).await;
        drop(in_flight);

        let reply = result?;
        debug!(conversation_id = %self.id, message_id = %reply.id, "turn complete");
        self.history.push(user);
        self.history.push(reply.clone());
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use chatline_core::Role;
    use chatline_streaming::{AbortReason, CollectingObserver, NoopObserver, StreamRecord};
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn conversation(server: &MockServer) -> Conversation {
        let client = ChatClient::new(ClientConfig::parse(&server.uri()).unwrap()).unwrap();
        Conversation::with_id(client, ConversationId::from_string("conv_test"))
    }

    fn reply_body(text: &str) -> String {
        [StreamRecord::text(text), StreamRecord::done("m1")]
            .iter()
            .map(|r| r.to_frame().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_send_records_history() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "message": "hi",
                "conversation_id": "conv_test",
                "context": {"page": "/home"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(reply_body("Hello!")))
            .expect(1)
            .mount(&server)
            .await;

        let mut conversation = conversation(&server);
        conversation.set_context("page", "/home");
        let reply = conversation.send("hi", NoopObserver).await.unwrap();

        assert_eq!(reply.content, "Hello!");
        let history = conversation.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "hi");
        assert_eq!(history[1], reply);
        assert!(!conversation.canceller().is_active());
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_history_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let mut conversation = conversation(&server);
        let mut observer = CollectingObserver::new();
        let err = conversation.send("hi", &mut observer).await.unwrap_err();

        assert!(matches!(err, ChatError::Transport(_)));
        assert!(conversation.history().is_empty());
        assert_eq!(observer.aborted().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut conversation = conversation(&server);
        let err = conversation.send("   ", NoopObserver).await.unwrap_err();
        assert!(matches!(
            err,
            ChatError::Transport(TransportError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_canceller_aborts_turn() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(reply_body("late"))
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let mut conversation = conversation(&server);
        let canceller = conversation.canceller();
        assert!(!canceller.cancel());

        let remote = canceller.clone();
        tokio::spawn(async move {
            while !remote.is_active() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            remote.cancel();
        });

        let mut observer = CollectingObserver::new();
        let err = conversation.send("hi", &mut observer).await.unwrap_err();

        assert!(matches!(err, ChatError::Cancelled));
        assert!(conversation.history().is_empty());
        assert!(!canceller.is_active());
        assert_eq!(observer.aborted().len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_turn_releases_canceller() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(reply_body("late"))
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let mut conversation = conversation(&server);
        let canceller = conversation.canceller();
        let mut observer = CollectingObserver::new();

        let turn = conversation.send("hi", &mut observer);
        let outcome = tokio::time::timeout(Duration::from_millis(100), turn).await;
        assert!(outcome.is_err());

        assert!(!canceller.is_active());
        assert!(!canceller.cancel());
        assert!(conversation.history().is_empty());
        assert_eq!(observer.aborted(), vec![&AbortReason::Cancelled]);
        assert!(observer.finalized().is_empty());
    }
}
