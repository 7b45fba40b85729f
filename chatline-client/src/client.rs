//! The chat backend client.

use crate::config::ClientConfig;
use crate::transport::{transport_error, HttpTransport, EVENT_STREAM, JSON};
use chatline_core::{
    ChatMessage, ConversationId, Product, QuickReply, Result, SidePayloads,
};
use chatline_streaming::{AbortReason, SinkState, StreamObserver, StreamSession};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Body of a chat request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
    /// Conversation to continue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    /// Page or user context forwarded to the backend.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, JsonValue>,
}

impl ChatRequest {
    /// Create a request for a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id: None,
            context: Map::new(),
        }
    }

    /// Set the conversation.
    #[must_use]
    pub fn with_conversation_id(mut self, id: ConversationId) -> Self {
        self.conversation_id = Some(id);
        self
    }

    /// Add a context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Reply body from the non-streaming endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Full reply text.
    #[serde(alias = "response")]
    pub content: String,
    /// Backend message ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Product suggestions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<Product>,
    /// Quick reply suggestions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quick_replies: Vec<QuickReply>,
}

impl ChatReply {
    /// Convert into a finalized assistant message.
    pub fn into_message(self) -> ChatMessage {
        let message = ChatMessage::assistant(self.content).with_side_payloads(SidePayloads {
            products: self.products,
            quick_replies: self.quick_replies,
        });
        match self.message_id {
            Some(id) => message.with_server_message_id(id),
            None => message,
        }
    }
}

impl From<ChatReply> for ChatMessage {
    fn from(reply: ChatReply) -> Self {
        reply.into_message()
    }
}

/// Client for the chat backend.
#[derive(Debug, Clone)]
pub struct ChatClient {
    transport: HttpTransport,
}

impl ChatClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            transport: HttpTransport::new(config)?,
        })
    }

    /// Create with a custom reqwest client.
    pub fn with_client(client: reqwest::Client, config: ClientConfig) -> Self {
        Self {
            transport: HttpTransport::with_client(client, config),
        }
    }

    /// Create from the environment. See [`ClientConfig::from_env`].
    ///
    /// # Errors
    ///
    /// Fails if the configuration is missing or invalid.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ClientConfig {
        self.transport.config()
    }

    /// Send a message and stream the reply into `observer`.
    ///
    /// The observer sees exactly one of `on_finalized` or `on_aborted`,
    /// including when the request fails to open or the returned future is
    /// dropped before the reply settles.
    ///
    /// # Errors
    ///
    /// Returns why the reply was aborted.
    pub async fn stream_message<O: StreamObserver>(
        &self,
        request: &ChatRequest,
        observer: O,
        cancel: &CancellationToken,
    ) -> Result<ChatMessage> {
        let url = self.config().stream_url()?;
        let mut guard = AbortOnDrop(StreamSession::new(
            observer,
            self.config().stream_config(),
        ));
        let session = &mut guard.0;
        let message_id = session.start()?;
        debug!(%message_id, url = %url, "opening reply stream");

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(session.abort(AbortReason::Cancelled)),
            opened = self.transport.post_json(url, request, EVENT_STREAM) => opened,
        };
        let response = match opened {
            Ok(response) => response,
            Err(error) => return Err(session.abort(error.into())),
        };

        let reply = session
            .run_bytes(Box::pin(response.bytes_stream()), cancel)
            .await;
        reply
    }

    /// Send a message and wait for the whole reply.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or a reply body that does not decode.
    pub async fn send_message(&self, request: &ChatRequest) -> Result<ChatMessage> {
        let url = self.config().message_url()?;
        let response = self.transport.post_json(url, request, JSON).await?;
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, self.config().connect_timeout))?;
        let reply: ChatReply = serde_json::from_str(&body)?;
        Ok(reply.into_message())
    }
}

/// Aborts a session that is dropped while its reply is still streaming.
struct AbortOnDrop<O: StreamObserver>(StreamSession<O>);

impl<O: StreamObserver> Drop for AbortOnDrop<O> {
    fn drop(&mut self) {
        if self.0.sink().state() == SinkState::Streaming {
            debug!("reply dropped while streaming");
            let _ = self.0.abort(AbortReason::Cancelled);
        }
    }
}
