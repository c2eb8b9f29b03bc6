//! Provider errors and mapping from HTTP/reqwest failures.

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors from starting or reading a provider stream.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    // Retryable errors
    /// Network-level error (connection reset, DNS failure, etc.).
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    /// Rate limited by the provider.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit {
        /// Suggested retry delay, if the API provided one.
        retry_after: Option<Duration>,
    },
    /// Request timed out.
    #[error("request timed out")]
    Timeout,
    /// Provider service is temporarily unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    // Terminal errors
    /// Authentication/authorization failure.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Malformed or invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Requested model does not exist.
    #[error("model not found: {0}")]
    ModelNotFound(String),
    /// The provider configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ProviderError {
    /// Whether this error is likely transient and the request can be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimit { .. } | Self::Timeout | Self::ServiceUnavailable(_)
        )
    }
}

/// Map a non-success HTTP status to a [`ProviderError`].
///
/// `body` is the response text, kept verbatim in the error message.
/// `retry_after` is the `Retry-After` header, preferred over any delay
/// mentioned in the body.
pub(crate) fn map_http_status(
    status: reqwest::StatusCode,
    retry_after: Option<&str>,
    body: &str,
) -> ProviderError {
    let detail = format!("HTTP {status}: {body}");
    match status.as_u16() {
        401 | 403 => ProviderError::Authentication(detail),
        400 => ProviderError::InvalidRequest(detail),
        404 => ProviderError::ModelNotFound(detail),
        429 => ProviderError::RateLimit {
            retry_after: retry_after
                .and_then(parse_retry_after_header)
                .or_else(|| parse_retry_after(body)),
        },
        // 529 is Anthropic's overloaded status
        500..=599 => ProviderError::ServiceUnavailable(detail),
        _ => ProviderError::InvalidRequest(detail),
    }
}

/// Parse a `Retry-After` header given in seconds. HTTP dates are ignored.
fn parse_retry_after_header(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Best-effort parse of a retry delay from an error body.
///
/// Looks for "retry after <N>" (OpenAI) or a Google `retryDelay` of the
/// form `"<N>s"`.
fn parse_retry_after(body: &str) -> Option<Duration> {
    let lower = body.to_lowercase();
    let after = if let Some(idx) = lower.find("retry after ") {
        &lower[idx + "retry after ".len()..]
    } else if let Some(idx) = lower.find("\"retrydelay\"") {
        lower[idx + "\"retrydelay\"".len()..].trim_start_matches([':', ' ', '"'])
    } else {
        return None;
    };

    let digits: String = after.chars().take_while(char::is_ascii_digit).collect();
    digits.parse::<u64>().ok().map(Duration::from_secs)
}

/// Map a [`reqwest::Error`] to a [`ProviderError`].
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Network(err)
    }
}
