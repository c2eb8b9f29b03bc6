//! Provider configuration.
//!
//! A [`ProviderSettings`] snapshot is handed to the chat layer when a
//! session is created. Settings are an ordered list: the first configured
//! provider is the active one, the rest are kept only so the list
//! round-trips unchanged.

use std::path::Path;

use blueprint_wire::Dialect;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the provider kind for [`ProviderSettings::from_env`].
pub const ENV_PROVIDER: &str = "BLUEPRINT_PROVIDER";
/// Environment variable holding the model identifier.
pub const ENV_MODEL: &str = "BLUEPRINT_MODEL";
/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "BLUEPRINT_API_KEY";
/// Optional environment variable overriding the base URL.
pub const ENV_BASE_URL: &str = "BLUEPRINT_BASE_URL";

/// Errors raised while loading or validating provider configuration.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No provider is configured at all.
    #[error("no AI provider configured")]
    NoProvider,

    /// A required field is empty or absent.
    #[error("provider {kind} is missing {field}")]
    MissingField {
        /// Which provider is incomplete.
        kind: ProviderKind,
        /// The name of the missing field.
        field: &'static str,
    },

    /// An unrecognized provider kind.
    #[error("unknown provider kind: {0}")]
    UnknownKind(String),

    /// A required environment variable is not set.
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    /// The settings document is not valid JSON of the expected shape.
    #[error("invalid provider settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// The settings file could not be read.
    #[error("cannot read provider settings: {0}")]
    Io(#[from] std::io::Error),
}

/// Which vendor API a provider talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// OpenAI Chat Completions.
    #[serde(rename = "OpenAI")]
    OpenAi,
    /// OpenRouter (OpenAI-compatible).
    OpenRouter,
    /// Anthropic Messages.
    Anthropic,
    /// Google Gemini.
    Google,
}

impl ProviderKind {
    /// Default API base URL for this kind.
    #[must_use]
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
            Self::Google => "https://generativelanguage.googleapis.com/v1beta",
        }
    }

    /// Wire dialect of this kind's streaming endpoint.
    #[must_use]
    pub fn dialect(self) -> Dialect {
        match self {
            Self::OpenAi | Self::OpenRouter => Dialect::OpenAi,
            Self::Anthropic => Dialect::Anthropic,
            Self::Google => Dialect::Google,
        }
    }

    /// Display name, as stored in settings files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::OpenRouter => "OpenRouter",
            Self::Anthropic => "Anthropic",
            Self::Google => "Google",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "openrouter" => Ok(Self::OpenRouter),
            "anthropic" => Ok(Self::Anthropic),
            "google" | "gemini" => Ok(Self::Google),
            _ => Err(ConfigError::UnknownKind(s.to_string())),
        }
    }
}

/// One configured provider. Immutable for the duration of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Vendor API.
    #[serde(rename = "name")]
    pub kind: ProviderKind,
    /// Model identifier sent with every request.
    pub model: String,
    /// API key.
    pub api_key: String,
    /// Base URL override; `None` uses [`ProviderKind::default_base_url`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// Create a config with the default base URL for `kind`.
    #[must_use]
    pub fn new(kind: ProviderKind, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            kind,
            model: model.into(),
            api_key: api_key.into(),
            base_url: None,
        }
    }

    /// Override the API base URL.
    ///
    /// Useful for testing with a local mock server or an API proxy.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// The base URL requests are sent to, without a trailing slash.
    #[must_use]
    pub fn endpoint_base(&self) -> &str {
        self.base_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(self.kind.default_base_url())
            .trim_end_matches('/')
    }

    /// Check that every field needed for a request is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::MissingField {
                kind: self.kind,
                field: "model",
            });
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingField {
                kind: self.kind,
                field: "apiKey",
            });
        }
        Ok(())
    }
}

/// Ordered snapshot of configured providers.
///
/// Serializes as a bare JSON array, the same shape the settings screen
/// persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderSettings {
    providers: Vec<ProviderConfig>,
}

impl ProviderSettings {
    /// Wrap an ordered provider list.
    #[must_use]
    pub fn new(providers: Vec<ProviderConfig>) -> Self {
        Self { providers }
    }

    /// Parse settings from a JSON array.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read settings from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Build a single-provider snapshot from `BLUEPRINT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let var = |name: &'static str| std::env::var(name).map_err(|_| ConfigError::MissingEnv(name));

        let kind: ProviderKind = var(ENV_PROVIDER)?.parse()?;
        let mut config = ProviderConfig::new(kind, var(ENV_MODEL)?, var(ENV_API_KEY)?);
        if let Ok(url) = std::env::var(ENV_BASE_URL) {
            config = config.base_url(url);
        }
        Ok(Self::new(vec![config]))
    }

    /// The active provider: the first one configured.
    #[must_use]
    pub fn active(&self) -> Option<&ProviderConfig> {
        self.providers.first()
    }

    /// The active provider, validated, or a configuration error.
    pub fn require_active(&self) -> Result<&ProviderConfig, ConfigError> {
        let config = self.active().ok_or(ConfigError::NoProvider)?;
        config.validate()?;
        Ok(config)
    }

    /// All configured providers, in order.
    #[must_use]
    pub fn providers(&self) -> &[ProviderConfig] {
        &self.providers
    }

    /// Whether no provider is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
