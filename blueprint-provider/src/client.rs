//! HTTP client that opens a streaming chat request.

use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::config::ProviderConfig;
use crate::error::{ProviderError, map_http_status, map_reqwest_error};
use crate::mapping::to_stream_request;
use crate::types::Message;

/// Stream of non-empty text deltas from one provider response.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

/// Client for the streaming chat endpoints of every supported provider.
///
/// The client carries no provider settings; each call receives the
/// [`ProviderConfig`] to use, so a settings change takes effect on the
/// next request.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use blueprint_provider::ChatClient;
///
/// let http = reqwest::Client::builder()
///     .connect_timeout(Duration::from_secs(10))
///     .build()
///     .unwrap();
/// let client = ChatClient::with_http_client(http);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChatClient {
    /// Shared HTTP client.
    pub(crate) http: reqwest::Client,
}

impl ChatClient {
    /// Create a client with a fresh connection pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an existing `reqwest` client, e.g. one with proxy or timeout
    /// settings.
    #[must_use]
    pub fn with_http_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// POST a streaming chat request and return its text deltas.
    ///
    /// The configuration is validated first, so an incomplete provider
    /// fails before any network call. A non-success status is returned as
    /// an error carrying the response body.
    pub async fn stream_chat(
        &self,
        config: &ProviderConfig,
        messages: &[Message],
        blueprint: &str,
    ) -> Result<DeltaStream, ProviderError> {
        config.validate()?;
        let request = to_stream_request(config, messages, blueprint);

        tracing::debug!(
            provider = %config.kind,
            model = %config.model,
            url = %request.url,
            messages = messages.len(),
            "sending streaming chat request"
        );

        let mut builder = self
            .http
            .post(&request.url)
            .header("content-type", "application/json")
            .json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.map_err(map_reqwest_error)?;
            return Err(map_http_status(status, retry_after.as_deref(), &body));
        }

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error));
        Ok(Box::pin(blueprint_wire::decode_deltas(
            config.kind.dialect(),
            bytes,
        )))
    }
}
