//! Client configuration.

use chatline_core::{ChatError, Result};
use chatline_streaming::{RevealPacing, StreamConfig, DEFAULT_IDLE_TIMEOUT};
use std::time::Duration;
use url::Url;

/// Environment variable holding the backend base URL.
pub const ENV_BASE_URL: &str = "CHATLINE_BASE_URL";
/// Environment variable holding an optional bearer token.
pub const ENV_API_TOKEN: &str = "CHATLINE_API_TOKEN";
/// Environment variable overriding the idle timeout, in seconds. `0` disables it.
pub const ENV_TIMEOUT_SECS: &str = "CHATLINE_TIMEOUT_SECS";

/// Configuration for talking to the chat backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL. Endpoint paths are resolved against it.
    pub base_url: Url,
    /// Streaming endpoint path.
    pub stream_path: String,
    /// Non-streaming endpoint path.
    pub message_path: String,
    /// Bearer token sent with every request.
    pub api_token: Option<String>,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Longest wait for the response or between stream records.
    pub idle_timeout: Option<Duration>,
    /// How reply text is revealed.
    pub reveal: RevealPacing,
    /// Extra headers sent with every request.
    pub headers: Vec<(String, String)>,
}

impl ClientConfig {
    /// Default streaming endpoint path.
    pub const DEFAULT_STREAM_PATH: &'static str = "chat/stream";
    /// Default non-streaming endpoint path.
    pub const DEFAULT_MESSAGE_PATH: &'static str = "chat";
    /// Default connect timeout.
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a config for a base URL.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url: with_trailing_slash(base_url),
            stream_path: Self::DEFAULT_STREAM_PATH.to_string(),
            message_path: Self::DEFAULT_MESSAGE_PATH.to_string(),
            api_token: None,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            reveal: RevealPacing::default(),
            headers: Vec::new(),
        }
    }

    /// Create a config from a base URL string.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Configuration`] if the URL does not parse.
    pub fn parse(base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url)
            .map_err(|e| ChatError::Configuration(format!("invalid base URL {base_url:?}: {e}")))?;
        Ok(Self::new(url))
    }

    /// Create from `CHATLINE_BASE_URL`, `CHATLINE_API_TOKEN`, and
    /// `CHATLINE_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Fails if the base URL is missing or invalid, or the timeout is not a
    /// whole number of seconds.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reading from `lookup`.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_BASE_URL)
            .ok_or_else(|| ChatError::Configuration(format!("{ENV_BASE_URL} not set")))?;
        let mut config = Self::parse(&base_url)?;

        if let Some(token) = lookup(ENV_API_TOKEN).filter(|t| !t.is_empty()) {
            config.api_token = Some(token);
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ChatError::Configuration(format!("{ENV_TIMEOUT_SECS} must be seconds, got {raw:?}"))
            })?;
            config.idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Set the streaming endpoint path.
    #[must_use]
    pub fn with_stream_path(mut self, path: impl Into<String>) -> Self {
        self.stream_path = path.into();
        self
    }

    /// Set the non-streaming endpoint path.
    #[must_use]
    pub fn with_message_path(mut self, path: impl Into<String>) -> Self {
        self.message_path = path.into();
        self
    }

    /// Set the bearer token.
    #[must_use]
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the idle timeout. `None` waits forever.
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

    /// Add a header sent with every request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Full URL of the streaming endpoint.
    ///
    /// # Errors
    ///
    /// Fails if the path cannot be joined onto the base URL.
    pub fn stream_url(&self) -> Result<Url> {
        self.endpoint(&self.stream_path)
    }

    /// Full URL of the non-streaming endpoint.
    ///
    /// # Errors
    ///
    /// Fails if the path cannot be joined onto the base URL.
    pub fn message_url(&self) -> Result<Url> {
        self.endpoint(&self.message_path)
    }

    /// Streaming settings for one reply.
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig::new()
            .with_idle_timeout(self.idle_timeout)
            .with_reveal(self.reveal)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ChatError::Configuration(format!("invalid endpoint path {path:?}: {e}")))
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::parse("https://example.com").unwrap();
        assert_eq!(config.stream_path, "chat/stream");
        assert_eq!(config.message_path, "chat");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(300)));
        assert_eq!(config.reveal, RevealPacing::Immediate);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_endpoints_keep_base_path() {
        let config = ClientConfig::parse("https://example.com/api/v1").unwrap();
        assert_eq!(
            config.stream_url().unwrap().as_str(),
            "https://example.com/api/v1/chat/stream"
        );

        let config = config.with_message_path("/messages");
        assert_eq!(
            config.message_url().unwrap().as_str(),
            "https://example.com/api/v1/messages"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ClientConfig::parse("not a url"),
            Err(ChatError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_lookup() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "http://localhost:8000"),
            (ENV_API_TOKEN, "secret"),
            (ENV_TIMEOUT_SECS, "30"),
        ]))
        .unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:8000/");
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(30)));

        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "http://localhost:8000"),
            (ENV_TIMEOUT_SECS, "0"),
        ]))
        .unwrap();
        assert!(config.idle_timeout.is_none());
    }

    #[test]
    fn test_from_lookup_errors() {
        assert!(matches!(
            ClientConfig::from_lookup(lookup(&[])),
            Err(ChatError::Configuration(msg)) if msg.contains(ENV_BASE_URL)
        ));
        assert!(matches!(
            ClientConfig::from_lookup(lookup(&[
                (ENV_BASE_URL, "http://localhost:8000"),
                (ENV_TIMEOUT_SECS, "soon"),
            ])),
            Err(ChatError::Configuration(_))
        ));
    }

    #[test]
    fn test_stream_config() {
        let config = ClientConfig::parse("http://localhost")
            .unwrap()
            .with_idle_timeout(None)
            .with_reveal(RevealPacing::typing());
        let stream = config.stream_config();
        assert!(stream.idle_timeout.is_none());
        assert_eq!(stream.reveal, RevealPacing::typing());
    }
}
