//! Errors from running a chat turn.

use blueprint_provider::{ConfigError, ProviderError};
use thiserror::Error;

/// Why a chat turn failed.
///
/// Cancellation is not an error; it is reported through
/// [`TurnStatus::Cancelled`](crate::TurnStatus::Cancelled).
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ChatError {
    /// The prompt is empty or whitespace only.
    #[error("prompt is empty")]
    EmptyPrompt,

    /// No usable provider is configured.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The provider request failed or the stream broke off.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ChatError {
    /// Whether sending the same prompt again may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(e) if e.is_retryable())
    }
}
