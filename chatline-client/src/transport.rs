//! HTTP transport.

use crate::config::ClientConfig;
use chatline_core::{ChatError, Result, TransportError};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Media type of a streamed reply.
pub const EVENT_STREAM: &str = "text/event-stream";
/// Media type of a whole reply.
pub const JSON: &str = "application/json";

/// Map a reqwest failure onto the transport taxonomy.
pub fn transport_error(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else if err.is_connect() {
        TransportError::Connection(err.to_string())
    } else if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::read(err)
    }
}

/// reqwest client bound to a [`ClientConfig`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: ClientConfig,
}

impl HttpTransport {
    /// Create a transport with its own reqwest client.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Configuration`] if the client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ChatError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Create with a custom reqwest client.
    pub fn with_client(client: Client, config: ClientConfig) -> Self {
        Self { client, config }
    }

    /// Get a reference to the underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// POST a JSON body and return the response once its headers arrive.
    ///
    /// The wait for headers is bounded by the idle timeout.
    ///
    /// # Errors
    ///
    /// Fails on connection problems, on the idle timeout, and on any
    /// non-2xx status.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
        accept: &str,
    ) -> std::result::Result<Response, TransportError> {
        debug!(method = "POST", url = %url, accept, "Making HTTP request");

        let mut request = self
            .client
            .post(url)
            .header(ACCEPT, accept)
            .json(body);
        if let Some(token) = &self.config.api_token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        for (name, value) in &self.config.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = match self.config.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, request.send())
                .await
                .map_err(|_| TransportError::Timeout(limit))?,
            None => request.send().await,
        }
        .map_err(|e| transport_error(e, self.config.connect_timeout))?;

        check_response(response).await
    }
}

/// Check an HTTP response and convert to TransportError if needed.
pub async fn check_response(response: Response) -> std::result::Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), body = %body, "HTTP request failed");
    Err(TransportError::http(status.as_u16(), body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn transport(server: &MockServer) -> HttpTransport {
        let config = ClientConfig::parse(&server.uri())
            .unwrap()
            .with_api_token("secret")
            .with_header("x-widget", "test");
        HttpTransport::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_post_sends_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(header("accept", JSON))
            .and(header("authorization", "Bearer secret"))
            .and(header("x-widget", "test"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = transport(&server).await;
        let url = transport.config().message_url().unwrap();
        let response = transport
            .post_json(url, &serde_json::json!({"message": "hi"}), JSON)
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let transport = transport(&server).await;
        let url = transport.config().stream_url().unwrap();
        let err = transport
            .post_json(url, &serde_json::json!({}), EVENT_STREAM)
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::http(503, "overloaded"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_response_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let config = ClientConfig::parse(&server.uri())
            .unwrap()
            .with_idle_timeout(Some(Duration::from_millis(100)));
        let transport = HttpTransport::new(config).unwrap();
        let url = transport.config().stream_url().unwrap();
        let err = transport
            .post_json(url, &serde_json::json!({}), EVENT_STREAM)
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Timeout(Duration::from_millis(100)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let config = ClientConfig::parse("http://127.0.0.1:1").unwrap();
        let transport = HttpTransport::new(config).unwrap();
        let url = transport.config().stream_url().unwrap();
        let err = transport
            .post_json(url, &serde_json::json!({}), EVENT_STREAM)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connection(_)));
    }
}
