//! Vendor-shaped streaming request construction.
//!
//! Each vendor wants the transcript, the system prompt and the current
//! blueprint in a different place. The blueprint is only sent when there
//! is one.

use serde_json::{Value, json};

use crate::config::{ProviderConfig, ProviderKind};
use crate::prompt::{BLUEPRINT_CONTEXT_HEADING, SYSTEM_PROMPT};
use crate::types::{Message, Role};

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Output budget for Anthropic, which requires one.
const ANTHROPIC_MAX_TOKENS: u32 = 4096;

/// Application title reported to OpenRouter.
const OPENROUTER_TITLE: &str = "Blueprint AI Studio";

/// A fully-built streaming request, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    /// Endpoint URL.
    pub url: String,
    /// Headers besides `content-type`.
    pub headers: Vec<(&'static str, String)>,
    /// JSON body.
    pub body: Value,
}

/// Build the streaming request for `config`.
///
/// `blueprint` is the current canonical blueprint text; empty means none.
#[must_use]
pub fn to_stream_request(config: &ProviderConfig, messages: &[Message], blueprint: &str) -> StreamRequest {
    let base = config.endpoint_base();
    let blueprint = blueprint.trim();

    match config.kind {
        ProviderKind::OpenAi | ProviderKind::OpenRouter => {
            let mut headers = vec![("authorization", format!("Bearer {}", config.api_key))];
            if config.kind == ProviderKind::OpenRouter {
                headers.push(("x-title", OPENROUTER_TITLE.to_string()));
            }

            let mut wire_messages = vec![json!({"role": "system", "content": SYSTEM_PROMPT})];
            wire_messages.extend(messages.iter().map(|m| json!({"role": m.role, "content": m.content})));
            if !blueprint.is_empty() {
                wire_messages.push(json!({
                    "role": "user",
                    "content": format!("{BLUEPRINT_CONTEXT_HEADING}\n```\n{blueprint}\n```"),
                }));
            }

            StreamRequest {
                url: format!("{base}/chat/completions"),
                headers,
                body: json!({
                    "model": config.model,
                    "messages": wire_messages,
                    "stream": true,
                }),
            }
        }
        ProviderKind::Anthropic => {
            let mut system = SYSTEM_PROMPT.to_string();
            if !blueprint.is_empty() {
                system.push_str(&format!("\n\n{BLUEPRINT_CONTEXT_HEADING}\n{blueprint}"));
            }

            StreamRequest {
                url: format!("{base}/messages"),
                headers: vec![
                    ("x-api-key", config.api_key.clone()),
                    ("anthropic-version", ANTHROPIC_VERSION.to_string()),
                ],
                body: json!({
                    "model": config.model,
                    "messages": messages
                        .iter()
                        .map(|m| json!({"role": m.role, "content": m.content}))
                        .collect::<Vec<_>>(),
                    "system": system,
                    "max_tokens": ANTHROPIC_MAX_TOKENS,
                    "stream": true,
                }),
            }
        }
        ProviderKind::Google => {
            let mut contents: Vec<Value> = messages
                .iter()
                .map(|m| {
                    let role = match m.role {
                        Role::User => "user",
                        Role::Assistant => "model",
                    };
                    json!({"role": role, "parts": [{"text": m.content}]})
                })
                .collect();
            if !blueprint.is_empty() {
                contents.push(json!({
                    "role": "user",
                    "parts": [{"text": format!("{BLUEPRINT_CONTEXT_HEADING}\n{blueprint}")}],
                }));
            }

            StreamRequest {
                url: format!("{base}/models/{}:streamGenerateContent", config.model),
                headers: vec![("x-goog-api-key", config.api_key.clone())],
                body: json!({
                    "contents": contents,
                    "systemInstruction": {"parts": [{"text": SYSTEM_PROMPT}]},
                }),
            }
        }
    }
}
